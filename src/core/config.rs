//! Configuration management for the MCP server.
//!
//! Configuration is read once at startup from environment variables (a
//! `.env` file is loaded first when present) and is immutable afterwards.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Default timeout for calls to the Jira REST API.
pub const DEFAULT_JIRA_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Remote Jira instance and credentials.
    pub jira: JiraConfig,

    /// Security and path validation configuration.
    pub security: SecurityConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Connection settings for the Jira instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://example.atlassian.net`.
    pub base_url: Option<String>,

    /// Account email for Basic auth. Bearer auth is used when absent.
    pub username: Option<String>,

    /// API token or personal access token.
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            api_token: None,
            timeout_secs: DEFAULT_JIRA_TIMEOUT_SECS,
        }
    }
}

/// Configuration for local file access (attachment upload and download).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Optional root directory for file operations.
    /// If None, no path restrictions are enforced.
    pub root_path: Option<PathBuf>,

    /// Whether to allow symlinks in path validation.
    /// If false, symlinks pointing outside the root are rejected.
    pub allow_symlinks: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            allow_symlinks: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "jira-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            jira: JiraConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Jira settings use the `JIRA_` prefix, everything else `MCP_`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_env();

        config.jira.base_url = non_empty_var("JIRA_URL");
        config.jira.username = non_empty_var("JIRA_USERNAME");
        config.jira.api_token = non_empty_var("JIRA_API_TOKEN");
        if let Ok(timeout) = std::env::var("JIRA_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => config.jira.timeout_secs = secs,
                _ => warn!(
                    "Invalid JIRA_TIMEOUT_SECS '{}', using {}s",
                    timeout, DEFAULT_JIRA_TIMEOUT_SECS
                ),
            }
        }

        if let Ok(root_path) = std::env::var("MCP_ROOT_PATH") {
            config.security.root_path = Some(PathBuf::from(root_path));
            info!(
                "Path security enabled: root directory set to {:?}",
                config.security.root_path
            );
        }

        if let Ok(allow_symlinks) = std::env::var("MCP_ALLOW_SYMLINKS") {
            config.security.allow_symlinks = allow_symlinks.parse().unwrap_or(true);
        }

        config
    }

    /// Check that the settings needed to reach Jira are present.
    pub fn validate(&self) -> Result<()> {
        let url = self
            .jira
            .base_url
            .as_deref()
            .ok_or_else(|| Error::config("JIRA_URL must be set"))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config(format!(
                "JIRA_URL must start with http:// or https://, got '{url}'"
            )));
        }
        if self.jira.api_token.is_none() {
            return Err(Error::config("JIRA_API_TOKEN must be set"));
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Mutex to ensure env var tests run serially
#[cfg(test)]
pub(crate) static ENV_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    const JIRA_VARS: [&str; 4] = [
        "JIRA_URL",
        "JIRA_USERNAME",
        "JIRA_API_TOKEN",
        "JIRA_TIMEOUT_SECS",
    ];

    fn clear_jira_env() {
        for var in JIRA_VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_jira_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_jira_env();
        unsafe {
            std::env::set_var("JIRA_URL", "https://example.atlassian.net");
            std::env::set_var("JIRA_USERNAME", "dev@example.com");
            std::env::set_var("JIRA_API_TOKEN", "secret_token");
            std::env::set_var("JIRA_TIMEOUT_SECS", "12");
        }
        let config = Config::from_env();
        assert_eq!(
            config.jira.base_url.as_deref(),
            Some("https://example.atlassian.net")
        );
        assert_eq!(config.jira.username.as_deref(), Some("dev@example.com"));
        assert_eq!(config.jira.timeout_secs, 12);
        assert!(config.validate().is_ok());
        clear_jira_env();
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let _lock = ENV_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_jira_env();
        unsafe {
            std::env::set_var("JIRA_URL", "https://example.atlassian.net");
        }
        let config = Config::from_env();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JIRA_API_TOKEN"));
        clear_jira_env();
    }

    #[test]
    fn test_bad_timeout_falls_back() {
        let _lock = ENV_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_jira_env();
        unsafe {
            std::env::set_var("JIRA_TIMEOUT_SECS", "soon");
        }
        let config = Config::from_env();
        assert_eq!(config.jira.timeout_secs, DEFAULT_JIRA_TIMEOUT_SECS);
        clear_jira_env();
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.jira.base_url = Some("example.atlassian.net".into());
        config.jira.api_token = Some("t".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_redacted_in_debug() {
        let jira = JiraConfig {
            api_token: Some("super_secret_token".to_string()),
            ..JiraConfig::default()
        };
        let debug_str = format!("{:?}", jira);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("super_secret_token"));
    }
}
