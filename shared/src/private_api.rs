//! SigV4-signed client for the private reset API.

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use std::future::Future;
use std::time::SystemTime;
use tracing::{error, info, warn};

use crate::models::ResetInitialStateRequest;
use crate::{Config, Error, Result};

/// Status and body returned by the private API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamStatus {
    pub status: u16,
    pub body: String,
}

impl DownstreamStatus {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What happened to the downstream reset call.
///
/// Recorded for observability only; the caller of the Lambda gets 200
/// whichever variant occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamOutcome {
    /// Private API answered 2xx
    Delivered { status: u16 },
    /// Private API answered with an error status
    Rejected { status: u16, body: String },
    /// Request never got a response (signing, credentials or transport)
    Failed { reason: String },
}

impl DownstreamOutcome {
    /// Classify the result of a reset call and log it.
    pub fn from_result(result: Result<DownstreamStatus>) -> Self {
        let outcome = match result {
            Ok(status) if status.is_success() => DownstreamOutcome::Delivered {
                status: status.status,
            },
            Ok(status) => DownstreamOutcome::Rejected {
                status: status.status,
                body: status.body,
            },
            Err(e) => DownstreamOutcome::Failed {
                reason: e.to_string(),
            },
        };

        match &outcome {
            DownstreamOutcome::Delivered { status } => {
                info!(status = *status, "Initial state reset delivered");
            }
            DownstreamOutcome::Rejected { status, body } => {
                warn!(status = *status, body = %body, "Private API rejected reset");
            }
            DownstreamOutcome::Failed { reason } => {
                error!(reason = %reason, "Reset call failed");
            }
        }

        outcome
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DownstreamOutcome::Delivered { .. })
    }
}

/// Issues the reset call against the private API.
pub trait ResetClient {
    fn reset_initial_state(
        &self,
        event_id: &str,
    ) -> impl Future<Output = Result<DownstreamStatus>> + Send;
}

/// Add SigV4 headers to `request` for the given credentials.
pub fn sign_request(
    request: &mut reqwest::Request,
    credentials: Credentials,
    region: &str,
    service: &str,
    time: SystemTime,
) -> Result<()> {
    let identity: Identity = credentials.into();
    let signing_params = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(service)
        .time(time)
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| Error::Signing(format!("Invalid signing params: {}", e)))?
        .into();

    let body = request
        .body()
        .and_then(|b| b.as_bytes())
        .unwrap_or_default();

    let headers = request
        .headers()
        .iter()
        .map(|(name, value)| {
            value
                .to_str()
                .map(|v| (name.as_str(), v))
                .map_err(|e| Error::Signing(format!("Non-ASCII header {}: {}", name, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let signable = SignableRequest::new(
        request.method().as_str(),
        request.url().as_str(),
        headers.into_iter(),
        SignableBody::Bytes(body),
    )
    .map_err(|e| Error::Signing(format!("Unsignable request: {}", e)))?;

    let (instructions, _signature) = sign(signable, &signing_params)
        .map_err(|e| Error::Signing(format!("Failed to sign request: {}", e)))?
        .into_parts();

    let mut signed_headers = Vec::new();
    for (name, value) in instructions.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Signing(format!("Bad header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Signing(format!("Bad header value: {}", e)))?;
        signed_headers.push((name, value));
    }

    let target = request.headers_mut();
    for (name, value) in signed_headers {
        target.insert(name, value);
    }

    Ok(())
}

/// Client for the private API Gateway endpoint.
pub struct PrivateApiClient {
    http_client: reqwest::Client,
    credentials: SharedCredentialsProvider,
    reset_url: String,
    region: String,
    service: String,
}

impl PrivateApiClient {
    /// Create a new private API client.
    pub fn new(
        http_client: reqwest::Client,
        credentials: SharedCredentialsProvider,
        config: &Config,
    ) -> Self {
        Self {
            http_client,
            credentials,
            reset_url: config.reset_url(),
            region: config.region.clone(),
            service: config.service.clone(),
        }
    }

    /// Send resets to `url` instead of the configured private API hostname,
    /// e.g. a VPC endpoint DNS name.
    pub fn with_reset_url(mut self, url: impl Into<String>) -> Self {
        self.reset_url = url.into();
        self
    }

    /// Build the signed reset request without sending it.
    pub async fn build_reset_request(&self, event_id: &str) -> Result<reqwest::Request> {
        let payload = serde_json::to_vec(&ResetInitialStateRequest {
            event_id: event_id.to_string(),
        })?;

        let mut request = self
            .http_client
            .post(&self.reset_url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .build()?;

        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| Error::Signing(format!("Failed to load credentials: {}", e)))?;

        sign_request(
            &mut request,
            credentials,
            &self.region,
            &self.service,
            SystemTime::now(),
        )?;

        Ok(request)
    }
}

impl ResetClient for PrivateApiClient {
    async fn reset_initial_state(&self, event_id: &str) -> Result<DownstreamStatus> {
        let request = self.build_reset_request(event_id).await?;

        info!(url = %self.reset_url, event_id, "Sending reset request");

        let response = self.http_client.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(DownstreamStatus { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_credentials(session_token: Option<&str>) -> Credentials {
        Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            session_token.map(str::to_string),
            None,
            "test",
        )
    }

    fn test_config() -> Config {
        Config {
            private_api_hostname: "abc123.execute-api.ap-northeast-1.amazonaws.com".to_string(),
            event_id: "event-42".to_string(),
            region: "ap-northeast-1".to_string(),
            service: "execute-api".to_string(),
            code_suffix: "X".to_string(),
            credentials: crate::config::CredentialSource::DefaultChain,
        }
    }

    // 2024-01-01T00:00:00Z
    fn fixed_time() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200)
    }

    #[test]
    fn test_sign_request_adds_authorization() {
        let mut request = reqwest::Client::new()
            .post("https://abc123.execute-api.ap-northeast-1.amazonaws.com/api/reset_initial_state")
            .header(CONTENT_TYPE, "application/json")
            .body(r#"{"event_id":"event-42"}"#)
            .build()
            .unwrap();

        sign_request(
            &mut request,
            test_credentials(None),
            "ap-northeast-1",
            "execute-api",
            fixed_time(),
        )
        .unwrap();

        let headers = request.headers();
        let authorization = headers["authorization"].to_str().unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/ap-northeast-1/execute-api/aws4_request"
        ));
        assert!(authorization.contains("SignedHeaders="));
        assert!(authorization.contains("host"));
        assert_eq!(headers["x-amz-date"], "20240101T000000Z");
        assert!(headers.get("x-amz-security-token").is_none());
    }

    #[test]
    fn test_sign_request_includes_session_token() {
        let mut request = reqwest::Client::new()
            .post("https://api.internal/api/reset_initial_state")
            .body("{}")
            .build()
            .unwrap();

        sign_request(
            &mut request,
            test_credentials(Some("session-token")),
            "ap-northeast-1",
            "execute-api",
            fixed_time(),
        )
        .unwrap();

        assert_eq!(request.headers()["x-amz-security-token"], "session-token");
    }

    #[test]
    fn test_signature_depends_on_body() {
        let sign_body = |body: &'static str| {
            let mut request = reqwest::Client::new()
                .post("https://api.internal/api/reset_initial_state")
                .body(body)
                .build()
                .unwrap();
            sign_request(
                &mut request,
                test_credentials(None),
                "ap-northeast-1",
                "execute-api",
                fixed_time(),
            )
            .unwrap();
            request.headers()["authorization"].clone()
        };

        assert_ne!(
            sign_body(r#"{"event_id":"a"}"#),
            sign_body(r#"{"event_id":"b"}"#)
        );
    }

    #[tokio::test]
    async fn test_build_reset_request() {
        let client = PrivateApiClient::new(
            reqwest::Client::new(),
            SharedCredentialsProvider::new(test_credentials(None)),
            &test_config(),
        );

        let request = client.build_reset_request("event-42").await.unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://abc123.execute-api.ap-northeast-1.amazonaws.com/api/reset_initial_state"
        );
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert!(request.headers().contains_key("authorization"));
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"event_id":"event-42"}"#);
    }

    /// Accept one connection, capture the raw request and answer `response`.
    async fn serve_once(
        response: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 1024];

            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before request completed");
                raw.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(raw).unwrap()
        });

        (format!("http://{}/api/reset_initial_state", addr), server)
    }

    #[tokio::test]
    async fn test_reset_sends_one_signed_post_and_captures_rejection() {
        let (url, server) = serve_once(
            "HTTP/1.1 502 Bad Gateway\r\ncontent-length: 4\r\nconnection: close\r\n\r\nboom",
        )
        .await;

        let client = PrivateApiClient::new(
            reqwest::Client::new(),
            SharedCredentialsProvider::new(test_credentials(None)),
            &test_config(),
        )
        .with_reset_url(url);

        let result = client.reset_initial_state("event-42").await;
        assert_eq!(
            result.as_ref().unwrap(),
            &DownstreamStatus {
                status: 502,
                body: "boom".to_string()
            }
        );
        assert_eq!(
            DownstreamOutcome::from_result(result),
            DownstreamOutcome::Rejected {
                status: 502,
                body: "boom".to_string()
            }
        );

        let raw = server.await.unwrap();
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /api/reset_initial_state HTTP/1.1\r\n"));
        assert_eq!(body, r#"{"event_id":"event-42"}"#);

        let head = head.to_ascii_lowercase();
        assert!(head.contains("content-type: application/json"));
        assert!(head.contains("x-amz-date: "));
        assert!(head.contains(
            "authorization: aws4-hmac-sha256 credential=akidexample/"
        ));
        assert!(head.contains("/ap-northeast-1/execute-api/aws4_request"));
    }

    #[tokio::test]
    async fn test_reset_success_is_delivered() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
        )
        .await;

        let client = PrivateApiClient::new(
            reqwest::Client::new(),
            SharedCredentialsProvider::new(test_credentials(None)),
            &test_config(),
        )
        .with_reset_url(url);

        let outcome = DownstreamOutcome::from_result(client.reset_initial_state("event-42").await);

        assert_eq!(outcome, DownstreamOutcome::Delivered { status: 200 });
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_api_is_failed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PrivateApiClient::new(
            reqwest::Client::new(),
            SharedCredentialsProvider::new(test_credentials(None)),
            &test_config(),
        )
        .with_reset_url(format!("http://{}/api/reset_initial_state", addr));

        let outcome = DownstreamOutcome::from_result(client.reset_initial_state("event-42").await);

        assert!(matches!(outcome, DownstreamOutcome::Failed { .. }));
    }

    #[test]
    fn test_outcome_classification() {
        let delivered = DownstreamOutcome::from_result(Ok(DownstreamStatus {
            status: 200,
            body: "{}".to_string(),
        }));
        assert_eq!(delivered, DownstreamOutcome::Delivered { status: 200 });
        assert!(delivered.is_delivered());

        let rejected = DownstreamOutcome::from_result(Ok(DownstreamStatus {
            status: 403,
            body: "Forbidden".to_string(),
        }));
        assert_eq!(
            rejected,
            DownstreamOutcome::Rejected {
                status: 403,
                body: "Forbidden".to_string()
            }
        );

        let failed =
            DownstreamOutcome::from_result(Err(Error::Downstream("connection reset".to_string())));
        assert!(matches!(failed, DownstreamOutcome::Failed { reason } if reason.contains("connection reset")));
    }
}
