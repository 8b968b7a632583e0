//! Configuration loading for cloudflare-update-dns.

use crate::error::{DdnsError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default Cloudflare API root.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com";

/// Default plain-text IP echo service.
pub const DEFAULT_IP_SERVICE: &str = "https://api.ipify.org";

/// Config file name looked up in the default locations.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Validated run configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Cloudflare API token, sent as a bearer credential.
    pub api_key: String,
    /// Zone whose records are rewritten.
    pub zone_id: String,
    /// API root, without the `/client/v4` prefix.
    pub base_url: String,
    /// URL answering with the caller's IP as plain text.
    pub ip_service: String,
}

/// On-disk shape. Fields are optional so that absent and `null` both end up
/// as [`DdnsError::ConfigIncomplete`] rather than a parse failure.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(rename = "API_KEY")]
    api_key: Option<String>,
    #[serde(rename = "ZONE_ID")]
    zone_id: Option<String>,
    #[serde(rename = "BASE_URL")]
    base_url: Option<String>,
    #[serde(rename = "IP_SERVICE")]
    ip_service: Option<String>,
}

// The API key must never end up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .field("ip_service", &self.ip_service)
            .finish()
    }
}

impl Config {
    /// Build a config from credentials, using the default endpoints.
    pub fn new(api_key: impl Into<String>, zone_id: impl Into<String>) -> Result<Self> {
        Self::validate(RawConfig {
            api_key: Some(api_key.into()),
            zone_id: Some(zone_id.into()),
            ..RawConfig::default()
        })
    }

    /// Candidate locations searched when no path is given, in order.
    pub fn default_candidates() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE_NAME));
        }
        candidates.push(
            PathBuf::from("/etc")
                .join(env!("CARGO_PKG_NAME"))
                .join(CONFIG_FILE_NAME),
        );
        candidates
    }

    /// First existing default location, or `./config.json` if none exists.
    pub fn default_path() -> PathBuf {
        Self::default_candidates()
            .into_iter()
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Load and validate configuration from a specific path.
    ///
    /// Files ending in `.toml` are parsed as TOML, anything else as JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DdnsError::ConfigMissing(path.to_path_buf()));
        }

        let unreadable = |reason: String| DdnsError::ConfigUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let raw: RawConfig = if is_toml {
            toml::from_str(&content).map_err(|e| unreadable(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?
        };

        let config = Self::validate(raw)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded config");
        Ok(config)
    }

    fn validate(raw: RawConfig) -> Result<Self> {
        let api_key = raw.api_key.as_deref().map(resolve_env).unwrap_or_default();
        let zone_id = raw.zone_id.as_deref().map(resolve_env).unwrap_or_default();

        if api_key.is_empty() || zone_id.is_empty() {
            return Err(DdnsError::ConfigIncomplete);
        }

        Ok(Self {
            api_key,
            zone_id,
            base_url: raw
                .base_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ip_service: raw
                .ip_service
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_IP_SERVICE.to_string()),
        })
    }
}

/// Resolve environment variable references (values starting with $).
fn resolve_env(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| {
            tracing::warn!("Environment variable {} not set", var_name);
            value.to_string()
        })
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_config(".json", r#"{"API_KEY":"key-123","ZONE_ID":"zone-abc"}"#);
        let config = Config::load_from(file.path()).unwrap();

        assert_eq!(config.api_key, "key-123");
        assert_eq!(config.zone_id, "zone-abc");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.ip_service, DEFAULT_IP_SERVICE);
    }

    #[test]
    fn test_load_valid_toml() {
        let file = write_config(
            ".toml",
            "API_KEY = \"key-123\"\nZONE_ID = \"zone-abc\"\nIP_SERVICE = \"http://127.0.0.1:9/ip\"\n",
        );
        let config = Config::load_from(file.path()).unwrap();

        assert_eq!(config.zone_id, "zone-abc");
        assert_eq!(config.ip_service, "http://127.0.0.1:9/ip");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        match Config::load_from(&path) {
            Err(DdnsError::ConfigMissing(p)) => assert_eq!(p, path),
            other => panic!("expected ConfigMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load_from(dir.path()),
            Err(DdnsError::ConfigMissing(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config(".json", "{ API_KEY: nope");
        assert!(matches!(
            Config::load_from(file.path()),
            Err(DdnsError::ConfigUnreadable { .. })
        ));
    }

    #[test]
    fn test_missing_fields() {
        for content in [
            r#"{"ZONE_ID":"zone"}"#,
            r#"{"API_KEY":"key"}"#,
            r#"{}"#,
            r#"{"API_KEY":"","ZONE_ID":"zone"}"#,
            r#"{"API_KEY":"key","ZONE_ID":null}"#,
        ] {
            let file = write_config(".json", content);
            assert!(
                matches!(
                    Config::load_from(file.path()),
                    Err(DdnsError::ConfigIncomplete)
                ),
                "expected ConfigIncomplete for {}",
                content
            );
        }
    }

    #[test]
    fn test_env_reference() {
        std::env::set_var("CF_UPDATE_DNS_TEST_KEY", "from-env");
        let file = write_config(
            ".json",
            r#"{"API_KEY":"$CF_UPDATE_DNS_TEST_KEY","ZONE_ID":"zone"}"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        std::env::remove_var("CF_UPDATE_DNS_TEST_KEY");

        assert_eq!(config.api_key, "from-env");
    }

    #[test]
    fn test_resolve_env_with_missing_var() {
        assert_eq!(resolve_env("$NONEXISTENT_VAR_12345"), "$NONEXISTENT_VAR_12345");
        assert_eq!(resolve_env("plain_value"), "plain_value");
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = Config::new("super-secret", "zone").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("zone"));
    }

    #[test]
    fn test_default_candidates_start_local() {
        let candidates = Config::default_candidates();
        assert_eq!(candidates[0], PathBuf::from(CONFIG_FILE_NAME));
        assert!(candidates.len() >= 2);
    }
}
