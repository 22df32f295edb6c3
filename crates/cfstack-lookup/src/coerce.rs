//! Conversion of stringified metadata back into typed values
//!
//! CloudFormation templates stringify scalars inside resource metadata, so `"1"`, `"true"` and
//! `"null"` arrive as strings. [coerce] turns them back into [Value::Integer], [Value::Boolean]
//! and [Value::Null]. Anything that is not exactly one of those literals stays a string.
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMERIC_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?([1-9]\d*|0)(\.\d+)?([eE][+-]?\d+)?$").expect("numeric literal pattern")
});

/// Recursively coerce string literals into native values
///
/// Object keys are never touched. Non-string scalars pass through unchanged, which makes the
/// conversion idempotent.
pub fn coerce(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| (key, coerce(value)))
                .collect(),
        ),
        Value::Array(array) => Value::Array(array.into_iter().map(coerce).collect()),
        Value::String(string) => coerce_string(string),
        other => other,
    }
}

fn coerce_string(string: String) -> Value {
    match string.as_str() {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        "null" => return Value::Null,
        _ => {}
    }

    if !NUMERIC_LITERAL.is_match(&string) {
        return Value::String(string);
    }

    if !string.contains('.') {
        if let Ok(int) = string.parse::<i64>() {
            return Value::Integer(int);
        }
    }

    // exponent notation or out of i64 range
    match string.parse::<f64>() {
        Ok(decimal) => Value::Decimal(decimal),
        Err(_) => Value::String(string),
    }
}
