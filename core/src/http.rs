//! HTTP request and response described as plain data.
//!
//! # Design
//! `AuthenticatingClient` builds `HttpRequest` values and parses
//! `HttpResponse` values without touching the network. Whoever executes the
//! round-trip (the bundled `UreqTransport`, a test stub, or a mobile host
//! across the C boundary) only has to move these values in and out.
//!
//! Every endpoint of the verification API is a `POST` with a JSON body, so
//! the request carries no method field and the body is always present.
//! All fields are owned so values can cross the FFI boundary freely.

pub const METHOD: &str = "POST";
pub const CONTENT_TYPE: &str = "application/json";
pub const AUTH_HEADER: &str = "authKey";

/// A `POST` request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response as received by the transport. Non-2xx statuses are data here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Convenience constructor for a response without headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
