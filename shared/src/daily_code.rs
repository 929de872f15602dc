//! Daily-rotating reset code.
//!
//! The code is the hex SHA-512 digest of the local date (`YYYY-MM-DD`)
//! followed by a fixed suffix. It is derived on every invocation so it rolls
//! over at local midnight without any cached state.

use chrono::{Local, NaiveDate};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

/// Compute the code accepted on `date`.
pub fn expected_code(date: NaiveDate, suffix: &str) -> String {
    let message = format!("{}{}", date.format("%Y-%m-%d"), suffix);
    hex::encode(Sha512::digest(message.as_bytes()))
}

/// Current date according to the process's local clock.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Exact comparison of a supplied code against the expected one.
pub fn codes_match(candidate: &str, expected: &str) -> bool {
    candidate.len() == expected.len()
        && bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}
