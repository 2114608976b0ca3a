//! Per-request limits
//!
//! # Example
//!
//! ```
//! use httpserver_core::{Request, RequestConfig};
//!
//! let config = RequestConfig::new().content_size_limit(1024);
//! let req = Request::new().with_config(&config);
//! assert_eq!(req.content_size_limit(), 1024);
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Environment variable read by [`RequestConfig::from_env`].
pub const CONTENT_SIZE_LIMIT_ENV: &str = "HTTPSERVER_CONTENT_SIZE_LIMIT";

/// Limits applied to every request built with this configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Maximum size in bytes of the body and of each argument value.
    pub content_size_limit: usize,
}

impl RequestConfig {
    /// Unbounded configuration.
    pub fn new() -> Self {
        Self {
            content_size_limit: usize::MAX,
        }
    }

    /// Set the content size limit.
    pub fn content_size_limit(mut self, limit: usize) -> Self {
        self.content_size_limit = limit;
        self
    }

    /// Remove the content size limit.
    pub fn unbounded(mut self) -> Self {
        self.content_size_limit = usize::MAX;
        self
    }

    /// Read the configuration from `HTTPSERVER_CONTENT_SIZE_LIMIT`.
    ///
    /// A missing variable leaves the limit unbounded.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Some(value) = lookup(CONTENT_SIZE_LIMIT_ENV) {
            config.content_size_limit =
                value
                    .trim()
                    .parse()
                    .map_err(|source| ConfigError::InvalidValue {
                        var: CONTENT_SIZE_LIMIT_ENV,
                        value,
                        source,
                    })?;
        }

        Ok(config)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self::new()
    }
}
