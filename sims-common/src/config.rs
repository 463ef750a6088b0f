//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a TOML file, resolved in priority
//! order:
//! 1. Command-line argument (highest priority)
//! 2. `SIMS_CONFIG` environment variable
//! 3. User config file (`<config dir>/sims/config.toml`)
//! 4. `/etc/sims/config.toml` (Linux only)
//! 5. Compiled defaults (fallback)
//!
//! A missing file never stops startup: a warning is logged and defaults are
//! used. A file that exists but does not parse is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::key::KeyEncoding;
use crate::rows::RowKind;
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "SIMS_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Interface the HTTP server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of events buffered per SSE subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Bulk-upsert target
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bulk-upsert REST endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the REST API (e.g. `http://127.0.0.1:8080/api`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds; unset means no timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Path (relative to `base_url`) of the class entitlement bulk upsert
    #[serde(default = "default_class_entitlements_path")]
    pub class_entitlements_path: String,

    /// Path (relative to `base_url`) of the student issue bulk upsert
    #[serde(default = "default_student_issues_path")]
    pub student_issues_path: String,
}

/// Consolidation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    #[serde(default)]
    pub key_encoding: KeyEncoding,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_event_capacity() -> usize {
    100
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_class_entitlements_path() -> String {
    "class-inventory-entitlements/bulk-upsert".to_string()
}

fn default_student_issues_path() -> String {
    "student-inventory/bulk-upsert".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            event_capacity: default_event_capacity(),
            upstream: UpstreamConfig::default(),
            consolidation: ConsolidationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            class_entitlements_path: default_class_entitlements_path(),
            student_issues_path: default_student_issues_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl UpstreamConfig {
    /// Full URL of the bulk-upsert endpoint for a row kind
    pub fn endpoint_url(&self, kind: RowKind) -> String {
        let path = match kind {
            RowKind::ClassEntitlement => &self.class_entitlements_path,
            RowKind::StudentIssue => &self.student_issues_path,
        };
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reject values the service cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be non-zero".to_string()));
        }
        let base = self.upstream.base_url.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "upstream.base_url must be an http(s) URL: {}",
                base
            )));
        }
        if self.upstream.timeout_secs == Some(0) {
            return Err(Error::Config(
                "upstream.timeout_secs must be non-zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the config file path following the documented priority order
///
/// Returns `None` when no candidate is named or found.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3/4: platform config locations
    default_config_file()
}

/// Find an existing config file in the platform locations
fn default_config_file() -> Option<PathBuf> {
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("sims").join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/sims/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load configuration, falling back to defaults when no file exists
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            TomlConfig::from_file(&path)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        assert_eq!(default_port(), 5790);
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.consolidation.key_encoding, KeyEncoding::Tuple);
        assert_eq!(config.upstream.timeout(), None);
    }

    #[test]
    fn test_endpoint_url_joins_slashes() {
        let upstream = UpstreamConfig {
            base_url: "http://erp.local/api/".to_string(),
            student_issues_path: "/student-inventory/bulk".to_string(),
            ..Default::default()
        };
        assert_eq!(
            upstream.endpoint_url(RowKind::StudentIssue),
            "http://erp.local/api/student-inventory/bulk"
        );
        assert_eq!(
            upstream.endpoint_url(RowKind::ClassEntitlement),
            "http://erp.local/api/class-inventory-entitlements/bulk-upsert"
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TomlConfig::default();
        config.upstream.base_url = "erp.local".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = TomlConfig::default();
        config.upstream.timeout_secs = Some(0);
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.event_capacity = 0;
        assert!(config.validate().is_err());
    }
}
