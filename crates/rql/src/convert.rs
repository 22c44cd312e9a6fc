//! Value conversion registry
//!
//! Converts raw query tokens into typed values. A token may carry a
//! `name:` prefix selecting a specific converter (`number:`, `epoch:`,
//! `isodate:`, `date:`, `boolean:`, `string:`, `re:`, `RE:`, `glob:`);
//! without one the `auto` converter applies. Tokens of the form `$1`, `$2`,
//! … are positional parameter references resolved against a caller-supplied
//! array instead of being converted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use percent_encoding::percent_decode_str;
use regex::{Regex, RegexBuilder};
use rql_core::error::RqlError;
use rql_core::result::RqlResult;
use rql_core::value::Value;
use std::sync::LazyLock;

/// Strict wire date shape, always interpreted as UTC
static STRICT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{3})?Z$").unwrap());

/// Known token converters, selected by a `name:` prefix on the token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Literal / numeric / quoted-string detection (the default)
    Auto,
    /// Lenient numeric parse
    Number,
    /// Milliseconds since the Unix epoch
    Epoch,
    /// Partial ISO date, padded out to a full timestamp
    IsoDate,
    /// Full `YYYY-MM-DDTHH:mm:ss(.fff)?Z` timestamp
    Date,
    /// `"true"` or anything else
    Boolean,
    /// URL-decode only
    String,
    /// `re:` case-insensitive regular expression
    Re,
    /// `RE:` case-sensitive regular expression
    ReCaseSensitive,
    /// Shell-style glob compiled to a case-insensitive regex
    Glob,
}

impl Converter {
    /// Look up a converter by its wire name
    pub fn from_name(name: &str) -> RqlResult<Self> {
        match name {
            "auto" => Ok(Self::Auto),
            "number" => Ok(Self::Number),
            "epoch" => Ok(Self::Epoch),
            "isodate" => Ok(Self::IsoDate),
            "date" => Ok(Self::Date),
            "boolean" => Ok(Self::Boolean),
            "string" => Ok(Self::String),
            "re" => Ok(Self::Re),
            "RE" => Ok(Self::ReCaseSensitive),
            "glob" => Ok(Self::Glob),
            _ => Err(RqlError::UnknownConverter {
                name: name.to_string(),
            }),
        }
    }

    /// Convert one raw (still percent-encoded) token
    pub fn apply(&self, token: &str) -> RqlResult<Value> {
        match self {
            Self::Auto => auto(token),
            Self::Number => number(token),
            Self::Epoch => epoch(token),
            Self::IsoDate => isodate(token),
            Self::Date => date(token),
            Self::Boolean => Ok(lenient_bool(token)),
            Self::String => Ok(Value::String(url_decode(token))),
            Self::Re => compile_regex(token, true),
            Self::ReCaseSensitive => compile_regex(token, false),
            Self::Glob => glob(token),
        }
    }
}

/// Convert one raw token, honoring `$n` references and `name:` prefixes
///
/// Parameter indices are 1-based; out-of-range references resolve to
/// `Value::Undefined` rather than erroring.
pub fn convert_token(token: &str, parameters: &[Value]) -> RqlResult<Value> {
    if let Some(index) = parameter_index(token) {
        return Ok(parameters.get(index).cloned().unwrap_or(Value::Undefined));
    }
    if let Some((prefix, rest)) = token.split_once(':') {
        // only an identifier-like prefix selects a converter; a bare date
        // like 1970-01-01T00:00:00Z contains ':' but is not a prefix
        if looks_like_converter_name(prefix) {
            return Converter::from_name(prefix)?.apply(rest);
        }
    }
    Converter::Auto.apply(token)
}

fn looks_like_converter_name(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic())
}

fn parameter_index(token: &str) -> Option<usize> {
    let digits = token.strip_prefix('$')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // $1 refers to the first parameter; $0 resolves out of range
    digits.parse::<usize>().ok().map(|n| n.wrapping_sub(1))
}

fn url_decode(token: &str) -> String {
    percent_decode_str(token).decode_utf8_lossy().into_owned()
}

fn auto(token: &str) -> RqlResult<Value> {
    match token {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        "undefined" => return Ok(Value::Undefined),
        "Infinity" => return Ok(Value::Number(f64::INFINITY)),
        "-Infinity" => return Ok(Value::Number(f64::NEG_INFINITY)),
        _ => {}
    }

    // accept a numeric token only when its canonical rendering round-trips,
    // so "1e2", "01" and "1.0" stay strings instead of silently coercing
    if let Ok(parsed) = token.parse::<f64>() {
        if parsed.is_finite() && format!("{}", parsed) == token {
            return Ok(Value::Number(parsed));
        }
    }

    let decoded = url_decode(token);

    if decoded.len() >= 2 && decoded.starts_with('\'') && decoded.ends_with('\'') {
        let inner = &decoded[1..decoded.len() - 1];
        // quoted strings are JSON string literals with backslash escapes
        if let Ok(unescaped) = serde_json::from_str::<String>(&format!("\"{}\"", inner)) {
            return Ok(Value::String(unescaped));
        }
        return Ok(Value::String(decoded));
    }

    if STRICT_DATE.is_match(&decoded) {
        if let Ok(value) = date(&decoded) {
            return Ok(value);
        }
    }

    Ok(Value::String(decoded))
}

fn number(token: &str) -> RqlResult<Value> {
    token
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| RqlError::InvalidNumber {
            token: token.to_string(),
        })
}

fn epoch(token: &str) -> RqlResult<Value> {
    let invalid = || RqlError::InvalidDate {
        token: token.to_string(),
    };
    let millis = token.parse::<f64>().map_err(|_| invalid())?;
    if !millis.is_finite() {
        return Err(invalid());
    }
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
        .map(Value::Date)
        .ok_or_else(invalid)
}

fn isodate(token: &str) -> RqlResult<Value> {
    const TEMPLATE: &str = "0000-01-01T00:00:00Z";

    let mut padded = String::with_capacity(TEMPLATE.len());
    if token.len() < 4 {
        padded.push_str(&"0000"[..4 - token.len()]);
    }
    padded.push_str(token);
    if padded.len() < TEMPLATE.len() {
        padded.push_str(&TEMPLATE[padded.len()..]);
    }
    date(&padded)
}

fn date(token: &str) -> RqlResult<Value> {
    let decoded = url_decode(token);

    if STRICT_DATE.is_match(&decoded) {
        let format = if decoded.contains('.') {
            "%Y-%m-%dT%H:%M:%S%.3fZ"
        } else {
            "%Y-%m-%dT%H:%M:%SZ"
        };
        if let Ok(naive) = NaiveDateTime::parse_from_str(&decoded, format) {
            return Ok(Value::Date(naive.and_utc()));
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&decoded) {
        return Ok(Value::Date(parsed.with_timezone(&Utc)));
    }
    if let Ok(day) = NaiveDate::parse_from_str(&decoded, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(Value::Date(midnight.and_utc()));
        }
    }

    Err(RqlError::InvalidDate { token: decoded })
}

/// `"true"` maps to true and every other token to false
///
/// The leniency matches the wire format's historical behavior; swap this
/// function out for a strict variant if unrecognized tokens should error.
fn lenient_bool(token: &str) -> Value {
    Value::Bool(token == "true")
}

fn compile_regex(token: &str, case_insensitive: bool) -> RqlResult<Value> {
    let pattern = url_decode(token);
    RegexBuilder::new(&pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map(Value::Regex)
        .map_err(|_| RqlError::InvalidRegex { pattern })
}

fn glob(token: &str) -> RqlResult<Value> {
    let decoded = url_decode(token);
    let mut pattern = regex::escape(&decoded)
        .replace("\\*", ".*")
        .replace("\\?", ".?");

    // a leading/trailing wildcard already floats the match, so anchor only
    // the fixed ends
    match pattern.strip_prefix(".*") {
        Some(stripped) => pattern = stripped.to_string(),
        None => pattern.insert(0, '^'),
    }
    match pattern.strip_suffix(".*") {
        Some(stripped) => pattern = stripped.to_string(),
        None => pattern.push('$'),
    }

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(Value::Regex)
        .map_err(|_| RqlError::InvalidRegex { pattern })
}
