//! HTTP helpers for the reset Lambda.

use lambda_http::{Body, Response};
use serde::Serialize;

/// Headers attached to every response.
pub const RESPONSE_HEADERS: [(&str, &str); 2] = [
    ("content-type", "application/json"),
    ("access-control-allow-origin", "*"),
];

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    let mut builder = Response::builder().status(status);
    for (name, value) in RESPONSE_HEADERS {
        builder = builder.header(name, value);
    }

    Ok(builder
        .body(Body::from(serde_json::to_string(data)?))
        .map_err(Box::new)?)
}
