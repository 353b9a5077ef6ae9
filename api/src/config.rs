//! Configuration for the catalog API client
//!
//! The API and the image CDN live under the same origin:
//!
//! - `{origin}/api/weblarek` - JSON API
//! - `{origin}/content/weblarek` - product images
//!
//! # Environment Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `API_ORIGIN` | `https://larek-api.nomoreparties.co` |
//! | `API_TIMEOUT_SECS` | `10` |
//!
//! # Example
//!
//! ```
//! use storefront_api::ApiConfig;
//!
//! let config = ApiConfig::from_origin("http://localhost:3000").unwrap();
//! assert_eq!(config.api_url, "http://localhost:3000/api/weblarek");
//! assert_eq!(config.cdn_url, "http://localhost:3000/content/weblarek");
//! ```

use crate::error::ConfigError;
use std::time::Duration;

/// Origin used when `API_ORIGIN` is unset
pub const DEFAULT_ORIGIN: &str = "https://larek-api.nomoreparties.co";

/// Request timeout used when `API_TIMEOUT_SECS` is unset
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the API lives and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the JSON API, without trailing slash
    pub api_url: String,
    /// Base URL prepended to product image paths, without trailing slash
    pub cdn_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    /// Create a configuration from explicit URLs
    #[must_use]
    pub fn new(api_url: impl Into<String>, cdn_url: impl Into<String>) -> Self {
        Self {
            api_url: trim_slash(api_url.into()),
            cdn_url: trim_slash(cdn_url.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Derive both URLs from a shared origin
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the origin is not an http(s) URL.
    pub fn from_origin(origin: &str) -> Result<Self, ConfigError> {
        let origin = origin.trim().trim_end_matches('/');
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(origin.to_string()));
        }

        Ok(Self::new(
            format!("{origin}/api/weblarek"),
            format!("{origin}/content/weblarek"),
        ))
    }

    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origin = lookup("API_ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        let mut config = Self::from_origin(&origin)?;

        if let Some(raw) = lookup("API_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "API_TIMEOUT_SECS".to_string(),
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(
            format!("{DEFAULT_ORIGIN}/api/weblarek"),
            format!("{DEFAULT_ORIGIN}/content/weblarek"),
        )
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
