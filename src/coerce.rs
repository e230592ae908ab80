//! Numeric coercion for loosely-typed CMS payloads.
//!
//! Drupal 7 serializes integer columns inconsistently: the same `nid` arrives
//! as `42` from one endpoint and `"42"` from another. These helpers implement
//! the two parse flavours the schema pipeline relies on:
//!
//! - [`parse_number`]: the whole string must be numeric (surrounding
//!   whitespace allowed). Used for inference and for coercion on read.
//! - [`parse_int_prefix`]: leading-integer parse that ignores trailing
//!   garbage. Used by the builder's pre-pass over [`NUMERIC_FIELDS`].

use serde_json::{Number, Value};

/// Field names that are integers in the source CMS regardless of how they
/// were serialized.
pub const NUMERIC_FIELDS: &[&str] = &[
    "nid",
    "created",
    "changed",
    "uid",
    "vid",
    "revision_id",
    "revision_uid",
];

pub fn is_numeric_field(key: &str) -> bool {
    NUMERIC_FIELDS.contains(&key)
}

/// Parse a string that must be numeric in its entirety.
///
/// Accepts decimal and exponent forms (`"1.5"`, `".5"`, `"1e3"`, `"+7"`),
/// `0x`/`0o`/`0b` integer literals, and `Infinity`. Returns `None` for empty
/// or whitespace-only input and for anything with trailing characters.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
        }
    }

    match t {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    // Rust's float parser also accepts "inf" and "nan" spellings; the CMS never
    // means those as numbers.
    if t
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }

    t.parse::<f64>().ok()
}

/// Parse the leading integer of a string, ignoring anything after it.
///
/// `"42abc"` → `42`, `"  -7 "` → `-7`, `"abc"` → `None`.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let t = s.trim_start();
    let (negative, rest) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let n: i64 = digits.parse().ok()?;
    Some(if negative { -n } else { n })
}

/// Coerce a JSON value to a number: numbers pass through, numeric strings
/// are parsed with [`parse_number`], anything else is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Build a JSON number, keeping integral values as integers so that
/// `"42"` stores as `42` rather than `42.0`.
pub fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(Value::Number(Number::from(n as i64)))
    } else {
        Number::from_f64(n).map(Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_number_accepts_loose_forms() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("  42 "), Some(42.0));
        assert_eq!(parse_number("1.5"), Some(1.5));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("+7"), Some(7.0));
        assert_eq!(parse_number("-7"), Some(-7.0));
        assert_eq!(parse_number("0x1A"), Some(26.0));
        assert_eq!(parse_number("0b101"), Some(5.0));
        assert_eq!(parse_number("Infinity"), Some(f64::INFINITY));
    }

    #[test]
    fn parse_number_rejects_non_numeric() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("42abc"), None);
        assert_eq!(parse_number("Hello"), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("1 2"), None);
    }

    #[test]
    fn parse_int_prefix_stops_at_garbage() {
        assert_eq!(parse_int_prefix("42abc"), Some(42));
        assert_eq!(parse_int_prefix("  -7 "), Some(-7));
        assert_eq!(parse_int_prefix("12.9"), Some(12));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
    }

    #[test]
    fn coerce_number_by_value_kind() {
        assert_eq!(coerce_number(&json!(3)), Some(3.0));
        assert_eq!(coerce_number(&json!("1690000000")), Some(1_690_000_000.0));
        assert_eq!(coerce_number(&json!("x")), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&json!(null)), None);
    }

    #[test]
    fn number_value_keeps_integers_integral() {
        assert_eq!(number_value(42.0), Some(json!(42)));
        assert_eq!(number_value(1.5), Some(json!(1.5)));
        assert_eq!(number_value(f64::INFINITY), None);
    }

    #[test]
    fn allowlist_membership() {
        assert!(is_numeric_field("nid"));
        assert!(is_numeric_field("revision_uid"));
        assert!(!is_numeric_field("title"));
    }
}
