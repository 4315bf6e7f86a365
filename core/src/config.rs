//! SDK configuration.
//!
//! # Design
//! Everything that used to be a compiled-in constant (base URL, API version,
//! timeouts) is a field here with the old value as its default. A config is
//! validated when it is turned into a client, so an unusable setup fails
//! loudly at construction rather than on the first call.
//!
//! JSON form (used across the C boundary):
//!
//! ```json
//! {"api_key": "...", "base_url": "https://api.authenticating.com/",
//!  "connect_timeout_secs": 30, "log_json": true}
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::photo::DEFAULT_MAX_IMAGE_BYTES;

pub const DEFAULT_BASE_URL: &str = "https://api.authenticating.com/";
pub const DEFAULT_API_VERSION: &str = "v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_API_KEY: &str = "AUTHENTICATING_API_KEY";
pub const ENV_BASE_URL: &str = "AUTHENTICATING_BASE_URL";
pub const ENV_API_VERSION: &str = "AUTHENTICATING_API_VERSION";
pub const ENV_TIMEOUT_SECS: &str = "AUTHENTICATING_TIMEOUT_SECS";
pub const ENV_LOG_JSON: &str = "AUTHENTICATING_LOG_JSON";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("api key is empty")]
    MissingApiKey,
    #[error("base URL {0:?} must start with http:// or https://")]
    InvalidBaseUrl(String),
    #[error("api version is empty")]
    MissingApiVersion,
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("image budget must be greater than zero")]
    ZeroImageBudget,
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("invalid config JSON: {0}")]
    Json(String),
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub base_url: String,
    pub api_version: String,
    pub api_key: String,
    #[serde(rename = "connect_timeout_secs", with = "secs")]
    pub connect_timeout: Duration,
    #[serde(rename = "read_timeout_secs", with = "secs")]
    pub read_timeout: Duration,
    #[serde(rename = "write_timeout_secs", with = "secs")]
    pub write_timeout: Duration,
    pub log_json: bool,
    pub max_image_bytes: u64,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key: String::new(),
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            log_json: false,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("api_key", &crate::logging::mask(&self.api_key))
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("log_json", &self.log_json)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish()
    }
}

impl SdkConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.api_version = api_version.to_string();
        self
    }

    /// Set connect, read and write timeouts together.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.read_timeout = timeout;
        self.write_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_json = enabled;
        self
    }

    pub fn with_max_image_bytes(mut self, bytes: u64) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. `from_env` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(&lookup(ENV_API_KEY).unwrap_or_default());
        if let Some(url) = lookup(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Some(version) = lookup(ENV_API_VERSION) {
            config.api_version = version;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup(ENV_LOG_JSON) {
            config.log_json = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: ENV_LOG_JSON,
                        value: raw,
                    })
                }
            };
        }
        config.validate()
    }

    /// Check the config and normalize the base URL to end with `/`.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let url = self.base_url.trim().trim_end_matches('/');
        let host = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or_default();
        if host.is_empty() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url));
        }
        self.base_url = format!("{url}/");
        self.api_version = self.api_version.trim().trim_matches('/').to_string();
        if self.api_version.is_empty() {
            return Err(ConfigError::MissingApiVersion);
        }
        for (name, timeout) in [
            ("connect timeout", self.connect_timeout),
            ("read timeout", self.read_timeout),
            ("write timeout", self.write_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::ZeroImageBudget);
        }
        Ok(self)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = SdkConfig::new("key").validate().unwrap();
        assert_eq!(config.base_url, "https://api.authenticating.com/");
        assert_eq!(config.api_version, "v2");
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.max_image_bytes, 2_000_000);
        assert!(!config.log_json);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert_eq!(SdkConfig::new("  ").validate(), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            SdkConfig::new("k").with_base_url("ftp://x").validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            SdkConfig::new("k").with_base_url("").validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert_eq!(
            SdkConfig::new("k").with_read_timeout(Duration::ZERO).validate(),
            Err(ConfigError::ZeroTimeout("read timeout"))
        );
        assert_eq!(
            SdkConfig::new("k").with_max_image_bytes(0).validate(),
            Err(ConfigError::ZeroImageBudget)
        );
        assert_eq!(
            SdkConfig::new("k").with_api_version("/").validate(),
            Err(ConfigError::MissingApiVersion)
        );
    }

    #[test]
    fn base_url_gets_single_trailing_slash() {
        let config = SdkConfig::new("k").with_base_url("http://127.0.0.1:8080//").validate().unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080/");
    }

    #[test]
    fn from_json_with_partial_fields() {
        let config = SdkConfig::from_json(r#"{"api_key":"k","read_timeout_secs":5,"log_json":true}"#).unwrap();
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.log_json);
        assert!(matches!(SdkConfig::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn from_lookup_reads_variables() {
        let config = SdkConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "secret"),
            (ENV_BASE_URL, "http://localhost:3000"),
            (ENV_TIMEOUT_SECS, "12"),
            (ENV_LOG_JSON, "yes"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.base_url, "http://localhost:3000/");
        assert_eq!(config.write_timeout, Duration::from_secs(12));
        assert!(config.log_json);
    }

    #[test]
    fn from_lookup_rejects_garbage() {
        let err = SdkConfig::from_lookup(lookup(&[(ENV_API_KEY, "k"), (ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                name: ENV_TIMEOUT_SECS,
                value: "soon".into()
            }
        );
        assert_eq!(SdkConfig::from_lookup(lookup(&[])), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn debug_masks_key() {
        let printed = format!("{:?}", SdkConfig::new("super-secret-key"));
        assert!(!printed.contains("super-secret-key"));
    }
}
