//! # Configuration
//!
//! Backend connection settings. The only externally supplied value is the
//! research backend's base URL.

use serde::{Deserialize, Serialize};

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "LABBOARD_API_URL";

/// Local development backend address, used when the env var is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Connection settings for the research backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabConfig {
    /// Base URL of the backend, without a trailing slash
    pub base_url: String,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl LabConfig {
    /// Read the config from the environment, falling back to the local
    /// development address.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(base_url)
    }

    /// Create a config pointing at a specific backend.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_backend() {
        let config = LabConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = LabConfig::with_base_url("https://lab.example.com/");
        assert_eq!(config.base_url, "https://lab.example.com");
    }
}
