//! Configuration management for the RemoFS daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/remofs/config.toml`.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    #[error("host must be an IP address, got {0:?}")]
    InvalidHost(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("root must be an existing directory: {0}")]
    InvalidRoot(PathBuf),

    #[error("stat_timeout_ms must be at most {max}, got {0}", max = MAX_STAT_TIMEOUT_MS)]
    InvalidStatTimeout(u64),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for the drive capacity stat timeout.
const MAX_STAT_TIMEOUT_MS: u64 = 60_000;

/// Main configuration structure for the RemoFS daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// HTTP listener configuration.
    pub server: ServerConfig,

    /// Filesystem exploration settings.
    pub explorer: ExplorerConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,
}

/// Filesystem exploration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Directory outside which no path validates. Unset means every path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Timeout for each drive capacity stat in milliseconds (0 = no timeout).
    pub stat_timeout_ms: u64,

    /// Count folder children when a request does not say otherwise.
    pub count_children: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8849,
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            root: None,
            stat_timeout_ms: 2000,
            count_children: false,
        }
    }
}

impl ServerConfig {
    /// The socket address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl ExplorerConfig {
    /// The drive stat timeout, or `None` when disabled.
    pub fn stat_timeout(&self) -> Option<Duration> {
        match self.stat_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("remofs")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - REMOFS_HOST: Override the listen address
    /// - REMOFS_PORT: Override the listen port
    /// - REMOFS_ROOT: Override the permitted root
    /// - REMOFS_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("REMOFS_HOST") {
            if !host.is_empty() {
                tracing::info!("Overriding host from environment: {}", host);
                self.server.host = host;
            }
        }

        if let Ok(port) = std::env::var("REMOFS_PORT") {
            if !port.is_empty() {
                match port.parse::<u16>() {
                    Ok(port) => {
                        tracing::info!("Overriding port from environment: {}", port);
                        self.server.port = port;
                    }
                    Err(e) => tracing::warn!("Ignoring REMOFS_PORT={:?}: {}", port, e),
                }
            }
        }

        if let Ok(root) = std::env::var("REMOFS_ROOT") {
            if !root.is_empty() {
                tracing::info!("Overriding root from environment: {}", root);
                self.explorer.root = Some(PathBuf::from(root));
            }
        }

        if let Ok(level) = std::env::var("REMOFS_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.daemon.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        self.server.socket_addr()?;

        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        if let Some(root) = &self.explorer.root {
            if !root.is_dir() {
                return Err(ConfigError::InvalidRoot(root.clone()));
            }
        }

        if self.explorer.stat_timeout_ms > MAX_STAT_TIMEOUT_MS {
            return Err(ConfigError::InvalidStatTimeout(self.explorer.stat_timeout_ms));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for var in ["REMOFS_HOST", "REMOFS_PORT", "REMOFS_ROOT", "REMOFS_LOG_LEVEL"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8849);
        assert_eq!(config.explorer.root, None);
        assert_eq!(config.explorer.stat_timeout_ms, 2000);
        assert!(!config.explorer.count_children);
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[server]
port = 9000
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.daemon.log_level, "info");
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[daemon]
log_level = "debug"

[server]
host = "0.0.0.0"
port = 8080

[explorer]
root = "/srv/share"
stat_timeout_ms = 500
count_children = true
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.explorer.root, Some(PathBuf::from("/srv/share")));
        assert_eq!(config.explorer.stat_timeout_ms, 500);
        assert!(config.explorer.count_children);
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let result = Config::from_toml("[server\nport = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[server]
port = "not a number"
"#;
        let err = Config::from_toml(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut config = Config::default();
        config.server.port = 9100;
        config.explorer.root = Some(PathBuf::from("/data"));
        config.explorer.count_children = true;

        let toml = config.to_toml().unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_to_toml_omits_unset_root() {
        let toml = Config::default().to_toml().unwrap();
        assert!(toml.contains("[explorer]"));
        assert!(!toml.contains("root"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/config.toml");

        let mut config = Config::default();
        config.daemon.log_level = "warn".to_string();
        config.save(&path).unwrap();

        assert!(path.exists());
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("remofs/config.toml"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::default();
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:8849".parse::<SocketAddr>().unwrap()
        );

        let v6 = ServerConfig {
            host: "::1".to_string(),
            port: 80,
        };
        assert_eq!(v6.socket_addr().unwrap().port(), 80);
    }

    #[test]
    fn test_stat_timeout() {
        let mut config = ExplorerConfig::default();
        assert_eq!(config.stat_timeout(), Some(Duration::from_millis(2000)));
        config.stat_timeout_ms = 0;
        assert_eq!(config.stat_timeout(), None);
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_port_zero() {
        let mut config = Config::default();
        config.server.port = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPort(0)));
    }

    #[test]
    fn test_validate_host() {
        let mut config = Config::default();
        config.server.host = "not a host".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidHost("not a host".to_string()))
        );
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.daemon.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.daemon.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_validate_root() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("file.txt"), "x").unwrap();

        let mut config = Config::default();
        config.explorer.root = Some(temp_dir.path().to_path_buf());
        assert!(config.validate().is_ok());

        let file = temp_dir.path().join("file.txt");
        config.explorer.root = Some(file.clone());
        assert_eq!(config.validate(), Err(ConfigError::InvalidRoot(file)));

        let missing = temp_dir.path().join("missing");
        config.explorer.root = Some(missing.clone());
        assert_eq!(config.validate(), Err(ConfigError::InvalidRoot(missing)));
    }

    #[test]
    fn test_validate_stat_timeout_boundary() {
        let mut config = Config::default();
        config.explorer.stat_timeout_ms = MAX_STAT_TIMEOUT_MS;
        assert!(config.validate().is_ok());

        config.explorer.stat_timeout_ms = MAX_STAT_TIMEOUT_MS + 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidStatTimeout(MAX_STAT_TIMEOUT_MS + 1))
        );

        config.explorer.stat_timeout_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("REMOFS_HOST", "0.0.0.0");
        std::env::set_var("REMOFS_PORT", "9999");
        std::env::set_var("REMOFS_ROOT", "/srv");
        std::env::set_var("REMOFS_LOG_LEVEL", "trace");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.explorer.root, Some(PathBuf::from("/srv")));
        assert_eq!(config.daemon.log_level, "trace");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        clear_env();
        std::env::set_var("REMOFS_HOST", "");
        std::env::set_var("REMOFS_ROOT", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_port_ignored() {
        clear_env();
        std::env::set_var("REMOFS_PORT", "eighty");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.server.port, 8849);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_unset_does_not_override() {
        clear_env();

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());
    }
}
