//! Response envelopes and the domain-error normalizer.
//!
//! # Design
//! Two envelope revisions are live on the remote service:
//!
//! - flat: `{"successful": false, "code": 400, "data": {...}}`, sometimes
//!   with `hasError` instead of `successful`;
//! - nested: `{"error": {"errorMessage": "...", "missingInfo": ["..."]}}`.
//!
//! [`check_for_error`] tries both against every body and raises
//! [`ApiError::Domain`] when either signals failure. A body that parses as
//! neither is treated as "no error" so an odd success body is handed to the
//! parser instead of being rejected here.
//!
//! Members are read one at a time from the parsed value, so a `null`
//! `missingInfo` or a `"400"` code does not hide the failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, GENERIC_ERROR};

/// Flat envelope wrapping a payload in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            successful: Some(true),
            has_error: None,
            code: Some(200),
            data: Some(data),
        }
    }

    /// `false` when either flag marks the envelope as failed.
    pub fn is_successful(&self) -> bool {
        self.successful != Some(false) && self.has_error != Some(true)
    }
}

/// Nested error envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_info: Vec<String>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorInfo {
                error_message: Some(message.into()),
                missing_info: Vec::new(),
            },
        }
    }

    pub fn into_error(self) -> ApiError {
        ApiError::Domain {
            message: self
                .error
                .error_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_ERROR.to_string()),
            detail: None,
            missing_info: self.error.missing_info,
        }
    }
}

/// Inspect a body and raise a domain error when the envelope signals one.
pub fn check_for_error(body: &str) -> Result<(), ApiError> {
    match detect(body) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Return the domain error carried by `body`, if any.
pub fn detect(body: &str) -> Option<ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    if !value.is_object() {
        return None;
    }
    nested_error(&value).or_else(|| flat_error(&value))
}

fn nested_error(value: &Value) -> Option<ApiError> {
    match value.get("error")? {
        Value::Object(info) => {
            let envelope = ErrorEnvelope {
                error: ErrorInfo {
                    error_message: info
                        .get("errorMessage")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    missing_info: string_list(info.get("missingInfo")),
                },
            };
            Some(envelope.into_error())
        }
        Value::String(message) if !message.trim().is_empty() => Some(ApiError::Domain {
            message: message.clone(),
            detail: None,
            missing_info: Vec::new(),
        }),
        _ => None,
    }
}

fn flat_error(value: &Value) -> Option<ApiError> {
    let envelope = Envelope {
        successful: value.get("successful").and_then(flag),
        has_error: value.get("hasError").and_then(flag),
        code: value.get("code").and_then(number),
        data: value.get("data").filter(|d| !d.is_null()),
    };
    if envelope.is_successful() {
        return None;
    }
    let data = envelope.data;
    let message = first_text(value, &["errorMessage", "message"])
        .or_else(|| data.and_then(|d| first_text(d, &["errorMessage", "message", "resultMessage"])))
        .or_else(|| data.and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| GENERIC_ERROR.to_string());
    let detail = data
        .and_then(|d| first_text(d, &["errorDescription", "description"]))
        .or_else(|| envelope.code.map(|c| format!("code {c}")));
    Some(ApiError::Domain {
        message,
        detail,
        missing_info: string_list(data.and_then(|d| d.get("missingInfo"))),
    })
}

/// `true`/`false`, also when sent as a string.
fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn number(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// String members of an array; anything else yields an empty list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}
