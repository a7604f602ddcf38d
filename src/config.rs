//! Inventory connection settings.
//!
//! Settings come from an optional JSON file (`config.json`) and are overlaid by
//! the `NETBOX_URL` / `NETBOX_TOKEN` environment variables. The resulting
//! [`InventoryConfig`] is passed explicitly to the inventory client.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "config.json";

/// Default per-request timeout for inventory calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default pause between retry attempts.
pub const DEFAULT_RETRY_DELAY_MSEC: u64 = 500;

pub const ENV_URL: &str = "NETBOX_URL";
pub const ENV_TOKEN: &str = "NETBOX_TOKEN";

/// How often an inventory call is attempted before giving up.
///
/// The default is a single attempt; retries happen only when the caller asks.
/// Creating a record is never retried: a create that timed out may already be
/// committed upstream, and repeating it would fail as a duplicate prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub delay_ms: u64,
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MSEC
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 1,
            delay_ms: DEFAULT_RETRY_DELAY_MSEC,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(max_attempts: u32, delay_ms: u64) -> Self {
        RetryPolicy {
            max_attempts,
            delay_ms,
        }
    }
}

/// On-disk layout, keys as in the legacy `config.json`.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(rename = "NETBOX_URL")]
    url: Option<String>,
    #[serde(rename = "NETBOX_TOKEN")]
    token: Option<String>,
    #[serde(rename = "TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    #[serde(rename = "RETRY")]
    retry: Option<RetryPolicy>,
}

/// Connection settings for the remote inventory.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub url: String,
    pub token: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl InventoryConfig {
    pub fn new(url: &str, token: &str) -> Self {
        InventoryConfig {
            url: url.to_string(),
            token: token.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Load from `path` (or [`CONFIG_FILE`]) and the process environment.
    ///
    /// Only the default file may be absent; an explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) if !path.exists() => {
                return Err(Error::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )))
            }
            Some(path) => path,
            None => Path::new(CONFIG_FILE),
        };
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load from `path` with environment lookups going through `env`.
    ///
    /// A missing file is not an error as long as the environment supplies
    /// the URL and token.
    pub fn load_with_env<F>(path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = if path.exists() {
            log::info!("Reading inventory config from {}", path.display());
            let json = std::fs::read_to_string(path)?;
            serde_json::from_str::<ConfigFile>(&json).map_err(|e| {
                Error::Config(format!("error parsing {}: {e}", path.display()))
            })?
        } else {
            log::debug!("Config file {} not found, using environment only", path.display());
            ConfigFile::default()
        };

        let url = env(ENV_URL)
            .or(file.url)
            .ok_or_else(|| Error::Config(format!("{ENV_URL} is not set")))?;
        let token = env(ENV_TOKEN)
            .or(file.token)
            .ok_or_else(|| Error::Config(format!("{ENV_TOKEN} is not set")))?;

        let config = InventoryConfig {
            url,
            token,
            timeout_secs: file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            retry: file.retry.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("invalid {ENV_URL} '{}': {e}", self.url)))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(Error::Config(format!(
                    "unsupported URL scheme '{scheme}' in {ENV_URL}"
                )))
            }
        }
        if self.token.trim().is_empty() {
            return Err(Error::Config(format!("{ENV_TOKEN} is empty")));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "RETRY.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("TIMEOUT_SECS must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"NETBOX_URL": "https://netbox.local/api", "NETBOX_TOKEN": "abc",
                "TIMEOUT_SECS": 5, "RETRY": {{"max_attempts": 3}}}}"#
        )
        .unwrap();

        let config = InventoryConfig::load_with_env(file.path(), no_env).unwrap();
        assert_eq!(config.url, "https://netbox.local/api");
        assert_eq!(config.token, "abc");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.retry, RetryPolicy::attempts(3, DEFAULT_RETRY_DELAY_MSEC));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"NETBOX_URL": "https://netbox.local/api", "NETBOX_TOKEN": "abc"}}"#
        )
        .unwrap();

        let config = InventoryConfig::load_with_env(file.path(), |key| match key {
            ENV_TOKEN => Some("from-env".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.url, "https://netbox.local/api");
        assert_eq!(config.token, "from-env");
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_missing_file_uses_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = InventoryConfig::load_with_env(&path, |key| match key {
            ENV_URL => Some("http://127.0.0.1:8000/api".to_string()),
            ENV_TOKEN => Some("t".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.url, "http://127.0.0.1:8000/api");
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = InventoryConfig::load_with_env(&path, |key| match key {
            ENV_URL => Some("http://127.0.0.1:8000/api".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert_eq!(err.kind(), "Config");
        assert!(err.to_string().contains(ENV_TOKEN));
    }

    #[test]
    fn test_validate() {
        assert!(InventoryConfig::new("https://netbox/api", "t").validate().is_ok());
        assert!(InventoryConfig::new("ftp://netbox/api", "t").validate().is_err());
        assert!(InventoryConfig::new("not a url", "t").validate().is_err());
        assert!(InventoryConfig::new("https://netbox/api", " ").validate().is_err());
        assert!(InventoryConfig::new("https://netbox/api", "t")
            .with_retry(RetryPolicy::attempts(0, 10))
            .validate()
            .is_err());
        assert!(InventoryConfig::new("https://netbox/api", "t")
            .with_timeout(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = InventoryConfig::load(Some(&path)).unwrap_err();
        assert_eq!(err.kind(), "Config");
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = InventoryConfig::load_with_env(file.path(), no_env).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }
}
