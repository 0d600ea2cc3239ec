//! Typed format validators
//!
//! Each [`FormatKind`] validates one value and returns its canonical form,
//! or a [`FormatFailure`] sentinel. Validators are pure; writing the
//! normalized value back into a document is the checker's job.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

use super::phone::{normalize_phone, PhoneRegion};
use super::report::ErrorKind;
use crate::model::{FormatKind, MAX_SAFE_INTEGER};

/// Settings shared by all validators of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Region used for national phone numbers without a rule-level region
    pub default_region: PhoneRegion,
}

impl FormatOptions {
    pub fn with_region(default_region: PhoneRegion) -> Self {
        Self { default_region }
    }
}

/// A value rejected by a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatFailure;

/// Result of running one validator
pub type FormatResult = Result<Value, FormatFailure>;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

impl FormatKind {
    /// Error tag reported on failure; `None` for unknown kinds
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            FormatKind::Email => Some(ErrorKind::Email),
            FormatKind::Phone { .. } => Some(ErrorKind::Phone),
            FormatKind::Trigram => Some(ErrorKind::Trigram),
            FormatKind::OneOf { .. } => Some(ErrorKind::OneOf),
            FormatKind::Date => Some(ErrorKind::Date),
            FormatKind::Time => Some(ErrorKind::Time),
            FormatKind::Int { .. } => Some(ErrorKind::Int),
            FormatKind::Unknown { .. } => None,
        }
    }

    /// Message reported when `path` fails this validator
    pub fn failure_message(&self, path: &str) -> String {
        match self {
            FormatKind::Email => format!("{} must be a valid email", path),
            FormatKind::Phone { .. } => format!("{} must be a valid phone number", path),
            FormatKind::Trigram => format!("{} must be a valid trigram", path),
            FormatKind::OneOf { values, .. } => {
                format!("{} must be one of {}", path, display_set(values))
            }
            FormatKind::Date => format!("{} must be a valid date", path),
            FormatKind::Time => format!("{} must be a valid time", path),
            FormatKind::Int { min, max } => {
                format!("{} must be a valid integer within {} and {}", path, min, max)
            }
            FormatKind::Unknown { tag } => format!("{} has unknown format type '{}'", path, tag),
        }
    }

    /// Validates `value` and returns its normalized form
    pub fn normalize(&self, value: &Value, options: &FormatOptions) -> FormatResult {
        match self {
            FormatKind::Email => normalize_email(value),
            FormatKind::Phone { region } => {
                let region = region
                    .as_deref()
                    .and_then(PhoneRegion::from_code)
                    .unwrap_or(options.default_region);
                let raw = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) if n.is_u64() => n.to_string(),
                    _ => return Err(FormatFailure),
                };
                normalize_phone(&raw, region)
                    .map(Value::String)
                    .ok_or(FormatFailure)
            }
            FormatKind::Trigram => normalize_trigram(value),
            FormatKind::OneOf { values, default } => {
                if categorical_match(value, values) {
                    Ok(value.clone())
                } else {
                    default.clone().ok_or(FormatFailure)
                }
            }
            FormatKind::Date => parse_instant(value, true)
                .map(Value::from)
                .ok_or(FormatFailure),
            FormatKind::Time => parse_instant(value, false)
                .map(Value::from)
                .ok_or(FormatFailure),
            FormatKind::Int { min, max } => parse_int(value)
                .filter(|n| (*min..=*max).contains(n))
                .map(Value::from)
                .ok_or(FormatFailure),
            FormatKind::Unknown { .. } => Err(FormatFailure),
        }
    }
}

/// Categorical match: `value` equals one member of `set`.
///
/// Numbers compare by numeric value, so `1` matches `1.0`.
pub fn categorical_match(value: &Value, set: &[Value]) -> bool {
    set.iter().any(|candidate| match (value, candidate) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => value == candidate,
    })
}

/// Renders a value for messages: strings bare, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_set(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(display_value).collect();
    format!("[{}]", items.join(", "))
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
            )
            .ok()
        })
        .as_ref()
}

fn normalize_email(value: &Value) -> FormatResult {
    let candidate = value.as_str().ok_or(FormatFailure)?.trim();
    let pattern = email_pattern().ok_or(FormatFailure)?;
    if pattern.is_match(candidate) {
        Ok(Value::String(candidate.to_lowercase()))
    } else {
        Err(FormatFailure)
    }
}

fn normalize_trigram(value: &Value) -> FormatResult {
    let candidate = value.as_str().ok_or(FormatFailure)?.trim();
    if candidate.len() == 3 && candidate.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(Value::String(candidate.to_ascii_uppercase()))
    } else {
        Err(FormatFailure)
    }
}

/// Parses an instant into Unix seconds.
///
/// Date-only strings are accepted when `allow_date_only` is set and map to
/// midnight UTC.
fn parse_instant(value: &Value, allow_date_only: bool) -> Option<i64> {
    let raw = match value {
        Value::Number(n) => return n.as_i64(),
        Value::String(s) => s.trim(),
        _ => return None,
    };

    if let Ok(seconds) = raw.parse::<i64>() {
        return Some(seconds);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.timestamp());
    }
    if !allow_date_only {
        if let Ok(instant) = DateTime::parse_from_rfc2822(raw) {
            return Some(instant.timestamp());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    if allow_date_only {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).timestamp());
    }
    None
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let float = n.as_f64()?;
            let integral = float.fract() == 0.0 && float.abs() <= MAX_SAFE_INTEGER as f64;
            integral.then_some(float as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
