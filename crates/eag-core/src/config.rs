//! Configuration types for the sync system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Authoritative registry configuration
    pub source: SourceConfig,

    /// Target registry configuration
    pub target: TargetConfig,

    /// Session store configuration
    #[serde(default)]
    pub session_store: SessionStoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        self.target.validate()?;
        self.session_store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Authoritative registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Eero cloud API
    Eero {
        /// Email address or phone number used to log in
        user: Option<String>,
        /// Network to sync, by index or name (prompted when several exist)
        network: Option<String>,
        /// Include the eero nodes themselves as devices
        #[serde(default = "default_include_network_devices")]
        include_network_devices: bool,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Eero { user, network, .. } => {
                if user.as_deref().is_some_and(|u| u.trim().is_empty()) {
                    return Err(crate::Error::config("Eero user cannot be empty"));
                }
                if network.as_deref().is_some_and(|n| n.trim().is_empty()) {
                    return Err(crate::Error::config("Eero network cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

fn default_include_network_devices() -> bool {
    true
}

/// Target registry configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetConfig {
    /// AdGuard Home
    Adguard {
        /// Base URL or host of the AdGuard Home web interface
        host: String,
        /// Admin username
        username: String,
        /// Admin password
        password: String,
    },
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetConfig::Adguard { host, username, .. } => f
                .debug_struct("Adguard")
                .field("host", host)
                .field("username", username)
                .field("password", &"<REDACTED>")
                .finish(),
        }
    }
}

impl TargetConfig {
    /// Validate the target configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            TargetConfig::Adguard {
                host,
                username,
                password,
            } => {
                if host.trim().is_empty() {
                    return Err(crate::Error::config("AdGuard host cannot be empty"));
                }
                if host.contains("://") && !host.starts_with("http://") && !host.starts_with("https://")
                {
                    return Err(crate::Error::config(format!(
                        "AdGuard host must use HTTP or HTTPS scheme. Got: {}",
                        host
                    )));
                }
                if username.is_empty() {
                    return Err(crate::Error::config("AdGuard username cannot be empty"));
                }
                if password.is_empty() {
                    return Err(crate::Error::config("AdGuard password cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionStoreConfig {
    /// File-based session store
    File {
        /// Path to the session file
        path: PathBuf,
    },

    /// In-memory session store (not persistent)
    #[default]
    Memory,
}

impl SessionStoreConfig {
    /// Validate the session store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SessionStoreConfig::File { path } if path.as_os_str().is_empty() => Err(
                crate::Error::config("Session store path cannot be empty"),
            ),
            _ => Ok(()),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the progress event channel
    ///
    /// When full, events are dropped (with a warning log). The sync itself
    /// is unaffected.
    ///
    /// Default: 256 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Report intended changes without calling any mutating target operation
    #[serde(default)]
    pub dry_run: bool,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            dry_run: false,
        }
    }
}

fn default_event_channel_capacity() -> usize {
    256
}

/// Per-run parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Delete target devices that are not in the authoritative set
    pub allow_delete: bool,
    /// Delete every target device first, then recreate from the source
    pub overwrite: bool,
    /// Skip interactive confirmations (CLI only; the engine ignores it)
    pub confirm: bool,
}

impl RunOptions {
    /// Create run options
    ///
    /// Overwrite mode already removes every target device, so it turns
    /// `allow_delete` off.
    pub fn new(allow_delete: bool, overwrite: bool, confirm: bool) -> Self {
        Self {
            allow_delete: allow_delete && !overwrite,
            overwrite,
            confirm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adguard(host: &str, password: &str) -> TargetConfig {
        TargetConfig::Adguard {
            host: host.to_string(),
            username: "admin".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_target_validation() {
        assert!(adguard("192.168.1.2", "pw").validate().is_ok());
        assert!(adguard("https://adguard.lan", "pw").validate().is_ok());
        assert!(adguard("", "pw").validate().is_err());
        assert!(adguard("ftp://adguard.lan", "pw").validate().is_err());
        assert!(adguard("192.168.1.2", "").validate().is_err());
    }

    #[test]
    fn test_target_debug_redacts_password() {
        let debug_str = format!("{:?}", adguard("192.168.1.2", "hunter22"));
        assert!(!debug_str.contains("hunter22"));
        assert!(debug_str.contains("REDACTED"));
    }

    #[test]
    fn test_overwrite_disables_delete() {
        let options = RunOptions::new(true, true, false);
        assert!(options.overwrite);
        assert!(!options.allow_delete);

        let options = RunOptions::new(true, false, true);
        assert!(options.allow_delete);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: SyncConfig = serde_json::from_value(serde_json::json!({
            "source": { "type": "eero", "user": "me@example.org", "network": null },
            "target": {
                "type": "adguard",
                "host": "192.168.1.2",
                "username": "admin",
                "password": "pw"
            }
        }))
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.engine.event_channel_capacity, 256);
        assert!(!config.engine.dry_run);
        assert!(matches!(config.session_store, SessionStoreConfig::Memory));
        assert!(matches!(
            config.source,
            SourceConfig::Eero { include_network_devices: true, .. }
        ));
    }
}
