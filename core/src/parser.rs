//! Conversion of raw response bodies into typed results.
//!
//! # Design
//! The remote API is inconsistent about what it puts in a body: most
//! endpoints answer with a JSON envelope whose `data` member holds the
//! payload, older revisions put the payload fields at the top level, and a
//! few answer with a bare primitive (`true`, `42`, an unquoted word). The
//! functions here try those shapes in a fixed order and return `None` rather
//! than an error, so the caller decides whether a miss is fatal.
//!
//! When nothing matches, [`log_failure`] classifies the body so a developer
//! can tell an HTML error page (wrong base URL, proxy, bad auth) from a JSON
//! shape mismatch.
//!
//! The client itself only needs [`convert`] and the `bool`/`String`
//! [`RawType`]s. [`Empty`], [`convert_empty`] and the numeric [`RawType`]s
//! are public for hosts that drive their own endpoints through this parser
//! and get back `{}`, a count or an amount.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const EMPTY_JSON_RESPONSE: &str = "{}";
const HTML_MARKERS: [&str; 3] = ["<!doctype html", "<html", "<head"];

/// Distinguished value for a successful call whose body is an empty object.
///
/// Produced by [`convert_empty`]; no built-in operation answers with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Rough classification of a response body, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Empty,
    Html,
    JsonObject,
    JsonArray,
    Boolean,
    Number,
    String,
    Text,
}

impl BodyKind {
    pub fn classify(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return BodyKind::Empty;
        }
        let lowered = trimmed
            .get(..trimmed.len().min(64))
            .unwrap_or(trimmed)
            .to_ascii_lowercase();
        if HTML_MARKERS.iter().any(|m| lowered.starts_with(m)) {
            return BodyKind::Html;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(_)) => BodyKind::JsonObject,
            Ok(Value::Array(_)) => BodyKind::JsonArray,
            Ok(Value::Bool(_)) => BodyKind::Boolean,
            Ok(Value::Number(_)) => BodyKind::Number,
            Ok(Value::String(_)) => BodyKind::String,
            Ok(Value::Null) | Err(_) => {
                if RawBody::looks_boolean(trimmed) {
                    BodyKind::Boolean
                } else if trimmed.parse::<f64>().is_ok() {
                    BodyKind::Number
                } else {
                    BodyKind::Text
                }
            }
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BodyKind::Empty => "an empty body",
            BodyKind::Html => "an HTML page",
            BodyKind::JsonObject => "a JSON object",
            BodyKind::JsonArray => "a JSON array",
            BodyKind::Boolean => "a boolean",
            BodyKind::Number => "a number",
            BodyKind::String => "a string",
            BodyKind::Text => "plain text",
        };
        f.write_str(name)
    }
}

/// Convert a body into `T`.
///
/// Tries the envelope's `data` member first, then the whole body. Returns
/// `None` for an empty body or when neither shape deserializes.
pub fn convert<T: DeserializeOwned>(body: &str) -> Option<T> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    if let Some(data) = value.get("data").filter(|d| !d.is_null()) {
        if let Ok(parsed) = T::deserialize(data) {
            return Some(parsed);
        }
    }
    T::deserialize(&value).ok()
}

/// Map an empty JSON object body to [`Empty`].
pub fn convert_empty(body: &str) -> Option<Empty> {
    (body.trim() == EMPTY_JSON_RESPONSE).then_some(Empty {})
}

/// Primitive response shapes that may arrive as non-JSON bodies.
///
/// Implemented for `bool`, `String`, `i32`, `i64` and `f64`.
pub trait RawType: Sized {
    /// Strict parse of a well-formed JSON scalar.
    fn strict(body: &str) -> Option<Self>;
    /// Lenient parse of the literal text.
    fn permissive(body: &str) -> Option<Self>;
}

/// Convert a body into a primitive, strict JSON first, then the literal text.
pub fn convert_raw<T: RawType>(body: &str) -> Option<T> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    T::strict(trimmed).or_else(|| T::permissive(trimmed))
}

struct RawBody;

impl RawBody {
    fn looks_boolean(s: &str) -> bool {
        s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")
    }
}

impl RawType for bool {
    fn strict(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn permissive(body: &str) -> Option<Self> {
        RawBody::looks_boolean(body).then(|| body.eq_ignore_ascii_case("true"))
    }
}

impl RawType for i64 {
    fn strict(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn permissive(body: &str) -> Option<Self> {
        body.trim_matches('"').parse().ok()
    }
}

impl RawType for i32 {
    fn strict(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn permissive(body: &str) -> Option<Self> {
        body.trim_matches('"').parse().ok()
    }
}

impl RawType for f64 {
    fn strict(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn permissive(body: &str) -> Option<Self> {
        body.trim_matches('"').parse().ok()
    }
}

impl RawType for String {
    fn strict(body: &str) -> Option<Self> {
        serde_json::from_str::<String>(body)
            .ok()
            .filter(|s| !s.is_empty())
    }

    /// Any body that is not a JSON object or array is taken verbatim.
    fn permissive(body: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(_)) | Ok(Value::Array(_)) => None,
            _ => Some(body.to_string()),
        }
    }
}

/// Log why a body could not be converted into `expected`.
///
/// Never fails; returns the classification so the caller can build a
/// [`crate::ApiError::Parse`].
pub fn log_failure(body: &str, expected: &'static str) -> BodyKind {
    let found = BodyKind::classify(body);
    match found {
        BodyKind::Html => tracing::warn!(
            expected,
            "response is an HTML page, check the base URL and API key; enable logging to see the full response"
        ),
        BodyKind::Empty => tracing::warn!(expected, "response body was empty"),
        BodyKind::JsonObject | BodyKind::JsonArray => tracing::warn!(
            expected,
            %found,
            body,
            "response could not be converted using the expected type"
        ),
        _ => tracing::warn!(
            expected,
            %found,
            body,
            "response was instead resolved as a primitive"
        ),
    }
    found
}
