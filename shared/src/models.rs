//! Request and response payloads.

use serde::{Deserialize, Serialize};

/// Body sent to the private API's reset endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetInitialStateRequest {
    pub event_id: String,
}

/// Body of a 400 response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of a 403 response.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

/// Empty JSON object, the body of a successful reset.
#[derive(Debug, Serialize)]
pub struct EmptyBody {}
