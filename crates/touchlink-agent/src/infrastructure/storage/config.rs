//! TOML-based configuration for the agent.
//!
//! The agent reads an optional `touchlink.toml`.  Every field has a default,
//! so a missing file, an empty file, or a file from an older release all
//! load cleanly:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 24810
//!
//! [gesture]
//! min_segment_duration_ms = 8
//! default_tap_duration_ms = 50
//! default_swipe_duration_ms = 300
//!
//! [text]
//! sync_delay_ms = 500
//! idle_resync_ms = 1000
//! retention_ms = 10000
//! batch_yield_ms = 5
//! clipboard_label = "touchlink"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, and whole
//! sections annotated with `#[serde(default)]` fall back to their `Default`
//! impl when the section itself is missing.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::gesture_engine::GestureConfig;
use crate::application::text_sync::TextSyncConfig;

/// Default file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "touchlink.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gesture: GestureSettings,
    #[serde(default)]
    pub text: TextSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command channel listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// WebSocket port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Stroke timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureSettings {
    #[serde(default = "default_min_segment_duration_ms")]
    pub min_segment_duration_ms: u64,
    #[serde(default = "default_tap_duration_ms")]
    pub default_tap_duration_ms: u64,
    #[serde(default = "default_swipe_duration_ms")]
    pub default_swipe_duration_ms: u64,
}

/// Text reconciliation timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextSettings {
    #[serde(default = "default_sync_delay_ms")]
    pub sync_delay_ms: u64,
    #[serde(default = "default_idle_resync_ms")]
    pub idle_resync_ms: u64,
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
    #[serde(default = "default_batch_yield_ms")]
    pub batch_yield_ms: u64,
    #[serde(default = "default_clipboard_label")]
    pub clipboard_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    24810
}
fn default_min_segment_duration_ms() -> u64 {
    8
}
fn default_tap_duration_ms() -> u64 {
    50
}
fn default_swipe_duration_ms() -> u64 {
    300
}
fn default_sync_delay_ms() -> u64 {
    500
}
fn default_idle_resync_ms() -> u64 {
    1000
}
fn default_retention_ms() -> u64 {
    10_000
}
fn default_batch_yield_ms() -> u64 {
    5
}
fn default_clipboard_label() -> String {
    "touchlink".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            min_segment_duration_ms: default_min_segment_duration_ms(),
            default_tap_duration_ms: default_tap_duration_ms(),
            default_swipe_duration_ms: default_swipe_duration_ms(),
        }
    }
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            sync_delay_ms: default_sync_delay_ms(),
            idle_resync_ms: default_idle_resync_ms(),
            retention_ms: default_retention_ms(),
            batch_yield_ms: default_batch_yield_ms(),
            clipboard_label: default_clipboard_label(),
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

// ── Conversions into application config ───────────────────────────────────────

impl ServerConfig {
    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBindAddress`] if `bind_address` is not an IP.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl GestureSettings {
    pub fn to_gesture_config(&self) -> GestureConfig {
        GestureConfig {
            min_segment_duration_ms: self.min_segment_duration_ms.max(1),
            default_tap_duration_ms: self.default_tap_duration_ms,
            default_swipe_duration_ms: self.default_swipe_duration_ms,
        }
    }
}

impl TextSettings {
    pub fn to_sync_config(&self) -> TextSyncConfig {
        TextSyncConfig {
            sync_delay: Duration::from_millis(self.sync_delay_ms),
            idle_resync: Duration::from_millis(self.idle_resync_ms),
            retention: Duration::from_millis(self.retention_ms),
            batch_yield: Duration::from_millis(self.batch_yield_ms),
            clipboard_label: self.clipboard_label.clone(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `AgentConfig` from `path`, returning `AgentConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &AgentConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.server.port, 24810);
        assert_eq!(cfg.server.bind_address, "0.0.0.0");
        assert_eq!(cfg.gesture.min_segment_duration_ms, 8);
        assert_eq!(cfg.text.sync_delay_ms, 500);
        assert_eq!(cfg.text.idle_resync_ms, 1000);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: AgentConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        // Arrange
        let toml_str = r#"
[text]
sync_delay_ms = 250
"#;

        // Act
        let cfg: AgentConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.text.sync_delay_ms, 250);
        assert_eq!(cfg.text.retention_ms, 10_000);
        assert_eq!(cfg.server.port, 24810);
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result: Result<AgentConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/touchlink.toml");

        let cfg = load_config(&path).unwrap();

        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("touchlink_test_{}", Uuid::new_v4()));
        let path = dir.join("touchlink.toml");
        let mut cfg = AgentConfig::default();
        cfg.server.port = 9001;
        cfg.text.clipboard_label = "remote".to_string();

        // Act
        save_config(&path, &cfg).unwrap();
        let loaded = load_config(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_socket_addr_rejects_hostnames() {
        let server = ServerConfig {
            bind_address: "localhost".to_string(),
            port: 1,
        };
        assert!(matches!(
            server.socket_addr(),
            Err(ConfigError::InvalidBindAddress(_))
        ));
    }

    #[test]
    fn test_text_settings_convert_to_durations() {
        let sync = TextSettings::default().to_sync_config();
        assert_eq!(sync.sync_delay, Duration::from_millis(500));
        assert_eq!(sync.retention, Duration::from_secs(10));
        assert_eq!(sync.clipboard_label, "touchlink");
    }

    #[test]
    fn test_zero_min_segment_duration_is_raised_to_one() {
        let settings = GestureSettings {
            min_segment_duration_ms: 0,
            ..GestureSettings::default()
        };
        assert_eq!(settings.to_gesture_config().min_segment_duration_ms, 1);
    }
}
