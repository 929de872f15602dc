//! Reset handler: checks the daily code and triggers the downstream reset.

use chrono::NaiveDate;
use lambda_http::{Body, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::daily_code::{codes_match, expected_code};
use crate::http::json_response;
use crate::models::{EmptyBody, ErrorBody, MessageBody};
use crate::private_api::{DownstreamOutcome, ResetClient};
use crate::sanitize::deep_clean;
use crate::{Config, Error, Result};

/// Body of the 400 response.
pub const INVALID_CODE_ERROR: &str = "Invalid code";

/// Body of the 403 response. The spelling is part of the client contract.
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "Authentication failured";

/// Result of one reset invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetDecision {
    /// Body unparsable, or `code` missing or null
    InvalidCode,
    /// Code present but not today's code
    AuthenticationFailed,
    /// Code accepted; downstream outcome kept for observability
    Accepted(DownstreamOutcome),
}

impl ResetDecision {
    pub fn status_code(&self) -> u16 {
        match self {
            ResetDecision::InvalidCode => 400,
            ResetDecision::AuthenticationFailed => 403,
            ResetDecision::Accepted(_) => 200,
        }
    }

    /// Build the HTTP response returned to the caller.
    pub fn into_response(self) -> std::result::Result<Response<Body>, lambda_http::Error> {
        let status = self.status_code();
        match self {
            ResetDecision::InvalidCode => json_response(
                status,
                &ErrorBody {
                    error: INVALID_CODE_ERROR.to_string(),
                },
            ),
            ResetDecision::AuthenticationFailed => json_response(
                status,
                &MessageBody {
                    message: AUTHENTICATION_FAILED_MESSAGE.to_string(),
                },
            ),
            ResetDecision::Accepted(_) => json_response(status, &EmptyBody {}),
        }
    }
}

/// Pull the sanitized `code` out of a request body.
///
/// Returns `Ok(None)` when the field is present but null.
pub fn extract_code(body: &[u8]) -> Result<Option<Value>> {
    let parsed: Value = serde_json::from_slice(body)
        .map_err(|e| Error::MalformedInput(format!("Invalid request body: {}", e)))?;

    let code = match parsed {
        Value::Object(mut fields) => fields
            .remove("code")
            .ok_or_else(|| Error::MalformedInput("Missing code field".to_string()))?,
        _ => {
            return Err(Error::MalformedInput(
                "Request body must be a JSON object".to_string(),
            ))
        }
    };

    match deep_clean(code) {
        Value::Null => Ok(None),
        cleaned => Ok(Some(cleaned)),
    }
}

/// Check a sanitized code against the expected daily code.
pub fn authenticate(code: &Value, expected: &str) -> Result<()> {
    match code.as_str() {
        Some(candidate) if codes_match(candidate, expected) => Ok(()),
        _ => Err(Error::AuthenticationMismatch),
    }
}

/// Handle one reset request.
///
/// Exactly one downstream call is made, and only when the code matches.
pub async fn handle_reset<C: ResetClient>(
    config: &Config,
    client: &C,
    today: NaiveDate,
    body: &[u8],
) -> ResetDecision {
    let expected = expected_code(today, &config.code_suffix);
    debug!(expected_code = %expected, "Computed daily code");

    let code = match extract_code(body) {
        Ok(Some(code)) => code,
        Ok(None) => {
            warn!("Reset request with null code");
            return ResetDecision::InvalidCode;
        }
        Err(e) => {
            warn!("Rejecting reset request: {}", e);
            return ResetDecision::InvalidCode;
        }
    };

    if let Err(e) = authenticate(&code, &expected) {
        warn!("Rejecting reset request: {}", e);
        return ResetDecision::AuthenticationFailed;
    }

    info!(event_id = %config.event_id, "Code accepted, resetting initial state");

    let result = client.reset_initial_state(&config.event_id).await;
    ResetDecision::Accepted(DownstreamOutcome::from_result(result))
}
