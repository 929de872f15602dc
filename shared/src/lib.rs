//! Shared library for the event reset Lambda.
//!
//! This crate provides the configuration, daily code derivation, input
//! sanitization and signed private API client used by the reset handler.

pub mod config;
pub mod daily_code;
pub mod error;
pub mod http;
pub mod models;
pub mod private_api;
pub mod reset;
pub mod sanitize;

pub use config::{Config, CredentialSource};
pub use daily_code::{codes_match, expected_code, today_local};
pub use error::{Error, Result};
pub use models::ResetInitialStateRequest;
pub use private_api::{DownstreamOutcome, DownstreamStatus, PrivateApiClient, ResetClient};
pub use reset::{handle_reset, ResetDecision};
pub use sanitize::deep_clean;
