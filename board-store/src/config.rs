//! Connection settings for the hosted element table.

use std::time::Duration;

use board_core::{BoardError, BoardResult};

/// Default table holding board elements.
pub const DEFAULT_ELEMENTS_TABLE: &str = "vision_board_elements";
/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Where and how to reach the element table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Service base URL, e.g. `https://project.example.co`.
    pub api_url: String,
    /// Anonymous or session key sent with every request.
    pub api_key: String,
    /// Table name under `/rest/v1/`.
    pub elements_table: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl StoreConfig {
    /// Create a config with default table and timeout.
    #[must_use]
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            elements_table: DEFAULT_ELEMENTS_TABLE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Override the table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.elements_table = table.into();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read the configuration from the environment.
    ///
    /// Environment variables:
    /// - `BOARD_API_URL`: service base URL (required)
    /// - `BOARD_API_KEY`: API key (required)
    /// - `BOARD_ELEMENTS_TABLE`: table name (default: `vision_board_elements`)
    /// - `BOARD_REQUEST_TIMEOUT_SECS`: request timeout (default: 10)
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotConfigured`] if the URL or key is missing.
    pub fn from_env() -> BoardResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotConfigured`] if the URL or key is missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BoardResult<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BoardError::NotConfigured(format!("{name} is not set")))
        };
        let api_url = required("BOARD_API_URL")?;
        let api_key = required("BOARD_API_KEY")?;

        let mut config = Self::new(api_url, api_key);
        if let Some(table) = lookup("BOARD_ELEMENTS_TABLE").filter(|v| !v.trim().is_empty()) {
            config.elements_table = table;
        }
        if let Some(secs) = lookup("BOARD_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = StoreConfig::from_lookup(vars(&[
            ("BOARD_API_URL", "https://project.example.co"),
            ("BOARD_API_KEY", "anon"),
        ]))
        .expect("config");
        assert_eq!(config.elements_table, DEFAULT_ELEMENTS_TABLE);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides_and_bad_timeout() {
        let config = StoreConfig::from_lookup(vars(&[
            ("BOARD_API_URL", "https://project.example.co"),
            ("BOARD_API_KEY", "anon"),
            ("BOARD_ELEMENTS_TABLE", "boards_staging"),
            ("BOARD_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .expect("config");
        assert_eq!(config.elements_table, "boards_staging");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let err = StoreConfig::from_lookup(vars(&[("BOARD_API_URL", "https://x.example")]))
            .unwrap_err();
        assert!(matches!(err, BoardError::NotConfigured(ref m) if m.contains("BOARD_API_KEY")));
    }
}
