//! Locale-aware amount parsing
//!
//! Ledger exports mix native numbers with strings such as `"R$ 1.234,56"`
//! (Brazilian convention) or `"1234.56"`. A comma anywhere in the cleaned
//! string marks it as comma-decimal: periods are thousands separators.

use serde_json::Value;

/// Why an amount could not be read
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("not a number: {0}")]
    Invalid(String),
}

/// Parse an amount, degrading to 0 on anything unreadable
///
/// Never fails: null, empty and malformed values all yield `0.0`.
pub fn parse_amount(value: &Value) -> f64 {
    try_parse_amount(value).unwrap_or(0.0)
}

/// Parse an amount string, degrading to 0 on anything unreadable
pub fn parse_amount_str(s: &str) -> f64 {
    try_parse_amount_str(s).unwrap_or(0.0)
}

/// Strict variant of [`parse_amount`] for callers that want to reject rows
pub fn try_parse_amount(value: &Value) -> Result<f64, AmountError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AmountError::Invalid(n.to_string())),
        Value::Null => Err(AmountError::Empty),
        Value::String(s) => try_parse_amount_str(s),
        Value::Bool(false) => Err(AmountError::Empty),
        other => Err(AmountError::Invalid(other.to_string())),
    }
}

/// Strict variant of [`parse_amount_str`]
pub fn try_parse_amount_str(s: &str) -> Result<f64, AmountError> {
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let mut cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if cleaned.contains(',') {
        cleaned = cleaned.replace('.', "").replace(',', ".");
    }

    leading_float(&cleaned).ok_or_else(|| AmountError::Invalid(s.to_string()))
}

/// Read the longest numeric prefix (`-?digits[.digits]`) of a cleaned string
///
/// Trailing garbage after the prefix is ignored, so `"1.234.567"` reads as
/// `1.234`. Returns None when the prefix holds no digit.
fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;

    if bytes.first() == Some(&b'-') {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    let number = s[..end].trim_end_matches('.');
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}
