//! Session configuration
//!
//! Connection and cache settings shared by every session a process opens.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ORCHESTRATOR_URL: &str = "http://localhost:8080";
const DEFAULT_ACCOUNT_ID: &str = "default";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Authoring service base URL (e.g., "http://localhost:8080")
    pub orchestrator_url: String,

    /// Directory holding cached session records
    pub cache_dir: PathBuf,

    /// Timeout applied to every remote call
    pub request_timeout: Duration,

    /// Account used when a scope does not name one
    pub account_id: String,
}

impl SessionConfig {
    /// Creates a new configuration with defaults
    pub fn new(orchestrator_url: impl Into<String>) -> Self {
        Self {
            orchestrator_url: orchestrator_url.into(),
            cache_dir: default_cache_dir(std::env::var_os("HOME").map(PathBuf::from)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - RIVET_ORCHESTRATOR_URL (optional, default: http://localhost:8080)
    /// - RIVET_CACHE_DIR (optional, default: ~/.cache/rivet/sessions)
    /// - RIVET_REQUEST_TIMEOUT (optional, seconds, default: 30)
    /// - RIVET_ACCOUNT_ID (optional, default: "default")
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let orchestrator_url =
            var("RIVET_ORCHESTRATOR_URL").unwrap_or_else(|| DEFAULT_ORCHESTRATOR_URL.to_string());

        let cache_dir = var("RIVET_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_cache_dir(var("HOME").map(PathBuf::from)));

        let request_timeout = match var("RIVET_REQUEST_TIMEOUT") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| anyhow::anyhow!("RIVET_REQUEST_TIMEOUT must be a number of seconds"))?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let account_id = var("RIVET_ACCOUNT_ID").unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string());

        Ok(Self {
            orchestrator_url,
            cache_dir,
            request_timeout,
            account_id,
        })
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.orchestrator_url.is_empty() {
            anyhow::bail!("orchestrator_url cannot be empty");
        }

        if !self.orchestrator_url.starts_with("http://")
            && !self.orchestrator_url.starts_with("https://")
        {
            anyhow::bail!("orchestrator_url must start with http:// or https://");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.account_id.trim().is_empty() {
            anyhow::bail!("account_id cannot be empty");
        }

        if self.cache_dir.as_os_str().is_empty() {
            anyhow::bail!("cache_dir cannot be empty");
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ORCHESTRATOR_URL)
    }
}

fn default_cache_dir(home: Option<PathBuf>) -> PathBuf {
    match home {
        Some(home) => home.join(".cache").join("rivet").join("sessions"),
        None => PathBuf::from(".rivet").join("sessions"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.account_id, "default");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = SessionConfig::from_vars(vars(&[("HOME", "/home/dev")])).unwrap();
        assert_eq!(config.orchestrator_url, "http://localhost:8080");
        assert_eq!(config.cache_dir, PathBuf::from("/home/dev/.cache/rivet/sessions"));
    }

    #[test]
    fn test_from_vars_without_home_uses_local_dir() {
        let config = SessionConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from(".rivet/sessions"));
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = SessionConfig::from_vars(vars(&[
            ("RIVET_ORCHESTRATOR_URL", "https://pipelines.example.com"),
            ("RIVET_CACHE_DIR", "/tmp/rivet"),
            ("RIVET_REQUEST_TIMEOUT", "5"),
            ("RIVET_ACCOUNT_ID", "acme"),
        ]))
        .unwrap();

        assert_eq!(config.orchestrator_url, "https://pipelines.example.com");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/rivet"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.account_id, "acme");
    }

    #[test]
    fn test_from_vars_rejects_bad_timeout() {
        assert!(SessionConfig::from_vars(vars(&[("RIVET_REQUEST_TIMEOUT", "soon")])).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SessionConfig::default();
        assert!(config.validate().is_ok());

        config.orchestrator_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
        config.orchestrator_url = "http://localhost:8080".to_string();

        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.request_timeout = Duration::from_secs(1);

        config.account_id = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
