//! Numeric normalization for data crossing an ingestion boundary
//!
//! Venue rows, exchange payloads and decision responses all report numbers in
//! loose shapes: floats that may be NaN, strings with thousands separators,
//! JSON numbers or JSON strings. Every such value is funnelled through
//! [`finite`], so the rest of the crate only ever sees `Option<f64>` where
//! `None` means "unknown".

use serde_json::Value;

/// Normalize a raw float: non-finite values become `None`.
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Parse a textual number such as `"2,431.55"` or `" 0.02 "`.
pub fn parse_number(text: &str) -> Option<f64> {
    let clean: String = text.chars().filter(|c| *c != ',').collect();
    clean.trim().parse::<f64>().ok().and_then(finite)
}

/// Read a JSON value that may be a number or a numeric string.
pub fn from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(finite),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Like [`from_json`] but for an optional field.
pub fn from_json_opt(value: Option<&Value>) -> Option<f64> {
    value.and_then(from_json)
}

/// Round to a fixed number of decimal places for reporting.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}
