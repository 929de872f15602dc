//! Configuration management for the reset Lambda.

use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use std::env;
use std::fmt;

use crate::{Error, Result};

/// Region of the private API. Fixed, not read from the environment.
pub const PRIVATE_API_REGION: &str = "ap-northeast-1";

/// SigV4 service name for API Gateway.
pub const PRIVATE_API_SERVICE: &str = "execute-api";

/// Token appended to the date before hashing.
pub const DEFAULT_CODE_SUFFIX: &str = "濃いめ";

/// Where signing credentials come from.
#[derive(Clone)]
pub enum CredentialSource {
    /// Keys supplied through `ACCESS_KEY` / `SECRET_KEY`
    Static {
        access_key: String,
        secret_key: String,
        session_token: Option<String>,
    },
    /// Lambda execution role via the default provider chain
    DefaultChain,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Static {
                access_key,
                session_token,
                ..
            } => f
                .debug_struct("Static")
                .field("access_key", access_key)
                .field("secret_key", &"** redacted **")
                .field("session_token", &session_token.as_ref().map(|_| "** redacted **"))
                .finish(),
            CredentialSource::DefaultChain => f.write_str("DefaultChain"),
        }
    }
}

impl CredentialSource {
    /// Build the credentials provider used to sign downstream requests.
    pub async fn provider(&self) -> Result<SharedCredentialsProvider> {
        match self {
            CredentialSource::Static {
                access_key,
                secret_key,
                session_token,
            } => Ok(SharedCredentialsProvider::new(Credentials::new(
                access_key,
                secret_key,
                session_token.clone(),
                None,
                "environment",
            ))),
            CredentialSource::DefaultChain => {
                let sdk_config =
                    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                sdk_config.credentials_provider().ok_or_else(|| {
                    Error::Config("No credentials provider in the default chain".to_string())
                })
            }
        }
    }
}

/// Reset Lambda configuration, read once at cold start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hostname of the private API (no scheme)
    pub private_api_hostname: String,
    /// Event whose initial state is reset
    pub event_id: String,
    /// SigV4 signing region
    pub region: String,
    /// SigV4 signing service
    pub service: String,
    /// Token appended to the date when deriving the daily code
    pub code_suffix: String,
    /// Signing credentials
    pub credentials: CredentialSource,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::Config(format!("{} not set", key)))
        };

        let optional = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let credentials = match (optional("ACCESS_KEY"), optional("SECRET_KEY")) {
            (Some(access_key), Some(secret_key)) => CredentialSource::Static {
                access_key,
                secret_key,
                session_token: optional("SESSION_TOKEN"),
            },
            (None, None) => CredentialSource::DefaultChain,
            _ => {
                return Err(Error::Config(
                    "ACCESS_KEY and SECRET_KEY must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            private_api_hostname: required("PRIVATE_API_HOSTNAME")?,
            event_id: required("EVENT_ID")?,
            region: PRIVATE_API_REGION.to_string(),
            service: PRIVATE_API_SERVICE.to_string(),
            code_suffix: optional("RESET_CODE_SUFFIX")
                .unwrap_or_else(|| DEFAULT_CODE_SUFFIX.to_string()),
            credentials,
        })
    }

    /// Full URL of the reset endpoint.
    pub fn reset_url(&self) -> String {
        format!("https://{}/api/reset_initial_state", self.private_api_hostname)
    }
}
