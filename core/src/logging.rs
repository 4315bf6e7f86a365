//! Diagnostic wire logging.
//!
//! `WireLog` emits `tracing` events for every request and response while it
//! is switched on. It is infallible: redaction works on a best-effort copy of
//! the body and nothing it does can fail a call. The switch is an atomic so
//! it can be flipped from any thread while calls are in flight.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, AUTH_HEADER};
use crate::operation::Operation;

const REDACTED: &str = "<redacted>";
const SENSITIVE_FIELDS: [&str; 1] = ["ssn"];
const IMAGE_FIELDS: [&str; 4] = ["img1", "img2", "idFront", "idBack"];
const MAX_LOGGED_BODY: usize = 4096;

#[derive(Debug, Default)]
pub struct WireLog {
    enabled: AtomicBool,
}

impl WireLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn request(&self, operation: Operation, request: &HttpRequest) {
        if !self.is_enabled() {
            return;
        }
        let headers: Vec<String> = request
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case(AUTH_HEADER) {
                    format!("{k}: {}", mask(v))
                } else {
                    format!("{k}: {v}")
                }
            })
            .collect();
        tracing::info!(
            %operation,
            url = %request.url,
            headers = %headers.join(", "),
            body = %redact_body(&request.body),
            "outbound request"
        );
    }

    pub fn response(&self, operation: Operation, response: &HttpResponse) {
        if !self.is_enabled() {
            return;
        }
        tracing::info!(
            %operation,
            status = response.status,
            body = %redact_body(&response.body),
            "inbound response"
        );
    }

    pub fn failure(&self, operation: Operation, err: &ApiError) {
        if !self.is_enabled() {
            return;
        }
        tracing::info!(
            %operation,
            kind = ?err.kind(),
            message = %err.message(),
            detail = %err.detail().unwrap_or_default(),
            "call failed"
        );
    }
}

/// Show only the last four characters of a secret.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

/// Copy of `body` safe to write to logs.
///
/// JSON bodies have sensitive fields replaced and image payloads shortened
/// to their length; anything else is truncated.
pub fn redact_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(mut value) if value.is_object() || value.is_array() => {
            scrub(&mut value);
            value.to_string()
        }
        _ => truncate(body),
    }
}

fn scrub(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if SENSITIVE_FIELDS.contains(&key.as_str()) && !field.is_null() {
                    *field = Value::String(REDACTED.to_string());
                } else if IMAGE_FIELDS.contains(&key.as_str()) {
                    if let Value::String(data) = field {
                        *field = Value::String(format!("<{} base64 chars>", data.len()));
                    }
                } else {
                    scrub(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(scrub),
        _ => {}
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_LOGGED_BODY {
        return body.to_string();
    }
    let mut end = MAX_LOGGED_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle() {
        let log = WireLog::new(false);
        assert!(!log.is_enabled());
        log.set_enabled(true);
        assert!(log.is_enabled());
    }

    #[test]
    fn mask_hides_short_and_long_keys() {
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("0123456789abcdef"), "****cdef");
    }

    #[test]
    fn ssn_is_redacted_at_any_depth() {
        let body = r#"{"successful":true,"data":{"firstName":"John","ssn":"123456789"}}"#;
        let redacted = redact_body(body);
        assert!(!redacted.contains("123456789"));
        assert!(redacted.contains("<redacted>"));
        assert!(redacted.contains("John"));
    }

    #[test]
    fn images_are_summarized() {
        let body = format!(r#"{{"accessCode":"abc123","idFront":"{}"}}"#, "A".repeat(5000));
        let redacted = redact_body(&body);
        assert!(redacted.contains("<5000 base64 chars>"));
        assert!(redacted.len() < 200);
    }

    #[test]
    fn non_json_is_truncated() {
        let body = "x".repeat(10_000);
        let logged = redact_body(&body);
        assert!(logged.ends_with("(10000 bytes)"));
        assert_eq!(redact_body("<html>bad</html>"), "<html>bad</html>");
    }

    #[test]
    fn logging_never_panics_when_disabled_or_enabled() {
        let request = HttpRequest {
            url: "http://localhost/api/v2/getUser".into(),
            headers: vec![("authKey".into(), "0123456789".into())],
            body: "{not json".into(),
        };
        for enabled in [false, true] {
            let log = WireLog::new(enabled);
            log.request(Operation::GetUser, &request);
            log.response(Operation::GetUser, &HttpResponse::new(500, "\u{1F600}".repeat(3000)));
            log.failure(Operation::GetUser, &ApiError::MissingAccessCode);
        }
    }
}
