//! Client configuration
//!
//! Values come from `Default`, then `LIBRIS_*` environment variables
//! (`.env` files are loaded by the binary through dotenvy), then CLI flags.

use crate::error::{ClientError, ClientResult};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Configuration for the HTTP layer and background sync
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Per-request timeout enforced by the transport
    pub timeout_secs: u64,
    /// Idle connection lifetime in the pool
    pub pool_idle_timeout_secs: u64,
    /// Maximum idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// Interval between background notification syncs
    pub poll_interval_secs: u64,
    /// Page size used when listing notifications
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            pool_idle_timeout_secs: 30,
            pool_max_idle_per_host: 16,
            poll_interval_secs: 60,
            page_size: 20,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Build a configuration from `LIBRIS_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed numbers are an error.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("LIBRIS_API_URL") {
            config.base_url = url;
        }
        if let Some(v) = lookup("LIBRIS_TIMEOUT_SECS") {
            config.timeout_secs = parse_number("LIBRIS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("LIBRIS_POLL_INTERVAL_SECS") {
            config.poll_interval_secs = parse_number("LIBRIS_POLL_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("LIBRIS_PAGE_SIZE") {
            config.page_size = parse_number("LIBRIS_PAGE_SIZE", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the base URL parses and the numeric settings are usable.
    pub fn validate(&self) -> ClientResult<()> {
        let url = url::Url::parse(&self.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout must be positive".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ClientError::Config(
                "poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Base URL without a trailing slash.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ClientResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("LIBRIS_API_URL", "https://books.example.com/api/"),
            ("LIBRIS_POLL_INTERVAL_SECS", "15"),
            ("LIBRIS_PAGE_SIZE", "50"),
        ]))
        .unwrap();

        assert_eq!(config.normalized_base_url(), "https://books.example.com/api");
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_from_env_rejects_bad_values() {
        let err = ClientConfig::from_lookup(lookup_from(&[("LIBRIS_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err = ClientConfig::from_lookup(lookup_from(&[("LIBRIS_API_URL", "ftp://x")]))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err = ClientConfig::from_lookup(lookup_from(&[("LIBRIS_API_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
