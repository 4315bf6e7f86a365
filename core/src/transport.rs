//! Executing `HttpRequest`s.
//!
//! # Design
//! [`Transport`] is the seam between request building and the network. The
//! bundled [`UreqTransport`] uses a blocking `ureq` agent built once on
//! first use with the configured timeouts; status-as-error is disabled so a
//! 4xx/5xx comes back as an `HttpResponse` and the client decides what it
//! means. Only failures to obtain a response at all become
//! [`ApiError::Transport`]. A body that is not valid UTF-8 is decoded
//! lossily and left to the parser; one over the agent's size limit is a
//! [`ApiError::Parse`]. Nothing is retried.

use std::sync::OnceLock;
use std::time::Duration;

use crate::config::SdkConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::parser::BodyKind;

pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

pub struct UreqTransport {
    connect_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
    agent: OnceLock<ureq::Agent>,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("agent_built", &self.agent.get().is_some())
            .finish()
    }
}

impl UreqTransport {
    pub fn new(connect_timeout: Duration, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            read_timeout,
            write_timeout,
            agent: OnceLock::new(),
        }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(config.connect_timeout, config.read_timeout, config.write_timeout)
    }

    fn agent(&self) -> &ureq::Agent {
        self.agent.get_or_init(|| {
            tracing::debug!(
                connect = ?self.connect_timeout,
                read = ?self.read_timeout,
                write = ?self.write_timeout,
                "building HTTP agent"
            );
            ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_connect(Some(self.connect_timeout))
                .timeout_send_request(Some(self.write_timeout))
                .timeout_send_body(Some(self.write_timeout))
                .timeout_recv_response(Some(self.read_timeout))
                .timeout_recv_body(Some(self.read_timeout))
                .build()
                .new_agent()
        })
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.agent().post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder.send(request.body.as_bytes())?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let bytes = response.body_mut().read_to_vec().map_err(body_error)?;
        let body = match String::from_utf8(bytes) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(status, len = err.as_bytes().len(), "response body is not valid UTF-8");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        Ok(HttpResponse { status, headers, body })
    }
}

/// A response arrived; only a broken connection while reading it is a transport failure.
fn body_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::BodyExceedsLimit(limit) => {
            tracing::warn!(limit, "response body exceeds the size limit");
            ApiError::Parse {
                expected: "a response body within the size limit",
                found: BodyKind::Text,
            }
        }
        other => other.into(),
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
