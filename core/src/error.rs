//! Error types for the verification API client.
//!
//! # Design
//! Failures fall into five categories that callers handle differently:
//! local preconditions (nothing was sent), domain errors (the server answered
//! and said no), parse errors (the server answered with something we could
//! not read), transport errors (no answer at all) and resource errors (an
//! image could not be brought under the upload budget). `ErrorKind` exposes
//! the category; `message` / `detail` give the display strings an embedding
//! app shows to the user.

use thiserror::Error;

use crate::parser::BodyKind;

pub(crate) const MUST_INCLUDE_ACCESS_CODE: &str = "You must include the AccessCode in this call";
pub(crate) const MISSING_AUTH_KEY: &str = "You did not include your authKey. This is obtained when you register for an account. Calls will not function without this key";
pub(crate) const UNAUTHORIZED_REQUEST: &str = "Unauthorized request";
pub(crate) const GENERIC_ERROR: &str = "An unknown error has occurred";
pub(crate) const PARSING_CONVERSION_ERROR: &str =
    "Could not convert server response data. Please enable logging to see full request and response logs.";

/// Category of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Domain,
    Parse,
    Transport,
    Resource,
}

/// Errors produced by request building, execution and response parsing.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The session token (`accessCode`) was absent or blank. No request was sent.
    #[error("{}", MUST_INCLUDE_ACCESS_CODE)]
    MissingAccessCode,

    /// The company API key was absent or blank. No request was sent.
    #[error("{}", MISSING_AUTH_KEY)]
    MissingAuthKey,

    /// A required image was missing, empty, or could not be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The response envelope reported a failure.
    #[error("{message}")]
    Domain {
        message: String,
        detail: Option<String>,
        missing_info: Vec<String>,
    },

    /// The server returned a non-2xx status without a readable error envelope.
    #[error("HTTP {status}: {}", status_message(*.status))]
    HttpStatus { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("{}", PARSING_CONVERSION_ERROR)]
    Parse { expected: &'static str, found: BodyKind },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// No response was obtained (DNS, timeout, connection refused, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// An image stayed over the size budget after the bounded fallback.
    #[error("image could not be processed: {0}")]
    Resource(String),
}

fn status_message(status: u16) -> &'static str {
    match status {
        401 | 403 => UNAUTHORIZED_REQUEST,
        _ => GENERIC_ERROR,
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingAccessCode
            | ApiError::MissingAuthKey
            | ApiError::InvalidImage(_)
            | ApiError::Serialization(_) => ErrorKind::Precondition,
            ApiError::Domain { .. } | ApiError::HttpStatus { .. } => ErrorKind::Domain,
            ApiError::Parse { .. } => ErrorKind::Parse,
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Resource(_) => ErrorKind::Resource,
        }
    }

    /// True when the error was raised locally and nothing reached the network.
    pub fn is_precondition(&self) -> bool {
        self.kind() == ErrorKind::Precondition
    }

    /// Human-readable message suitable for showing to an end user.
    pub fn message(&self) -> String {
        match self {
            ApiError::Domain { message, .. } => message.clone(),
            ApiError::HttpStatus { status, .. } => status_message(*status).to_string(),
            ApiError::Transport(_) => GENERIC_ERROR.to_string(),
            other => other.to_string(),
        }
    }

    /// Optional secondary text: envelope detail, missing fields, raw status
    /// body or the underlying transport message.
    pub fn detail(&self) -> Option<String> {
        match self {
            ApiError::Domain {
                detail,
                missing_info,
                ..
            } => match (detail, missing_info.is_empty()) {
                (Some(d), _) => Some(d.clone()),
                (None, false) => Some(format!("missing: {}", missing_info.join(", "))),
                (None, true) => None,
            },
            ApiError::HttpStatus { status, body } if body.is_empty() => Some(format!("HTTP {status}")),
            ApiError::HttpStatus { status, body } => Some(format!("HTTP {status}: {body}")),
            ApiError::Parse { expected, found } => {
                Some(format!("expected {expected}, response resolved as {found}"))
            }
            ApiError::Transport(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
