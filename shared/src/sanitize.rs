//! Neutralization of untrusted JSON input.

use ammonia::Builder;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Sanitizer that allows no tags at all.
static CLEANER: OnceLock<Builder<'static>> = OnceLock::new();

fn cleaner() -> &'static Builder<'static> {
    CLEANER.get_or_init(|| {
        let mut builder = Builder::default();
        builder.tags(HashSet::new());
        builder
    })
}

/// Clean a single string: control characters dropped, markup stripped.
pub fn clean_str(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| !c.is_control()).collect();
    cleaner().clean(&stripped).to_string()
}

/// Recursively clean every string inside a JSON value.
///
/// Object keys are cleaned as well. Numbers, booleans and null are returned
/// untouched.
pub fn deep_clean(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(deep_clean).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (clean_str(&k), deep_clean(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}
