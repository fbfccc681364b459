//! # Configuration Management
//!
//! This module handles loading and parsing the local kiosker.toml file. It
//! covers what the device needs before it can reach its remote configuration:
//! where persisted state lives, how connectivity is probed, how long downloads
//! may take, and the default log filter.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default location of the local configuration file
pub const CONFIG_FILE: &str = "kiosker.toml";

#[derive(Error, Debug)]
pub enum LocalConfigError {
    #[error("config IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file format: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config encode: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Application configuration loaded from kiosker.toml
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Local device settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Directory holding device.toml and safe_settings.json
    pub state_dir: PathBuf,
}

/// Connectivity probe and download settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host that must accept a TCP connection for the device to count as online
    pub probe_host: String,
    pub probe_port: u16,
    pub probe_timeout_secs: u64,
    /// Upper bound for one configuration download
    pub fetch_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter used when RUST_LOG is not set
    pub filter: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            state_dir: PathBuf::from("/var/lib/kiosker"),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            probe_host: "1.1.1.1".to_string(),
            probe_port: 443,
            probe_timeout_secs: 3,
            fetch_timeout_secs: 60,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

impl Config {
    /// Read configuration from `path`. A missing file yields `Ok(None)`;
    /// callers fall back to [`Config::default`].
    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Option<Self>, LocalConfigError> {
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(toml::from_str::<Config>(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Save current configuration to `path`
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), LocalConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.probe_port, 443);
        assert_eq!(config.network.fetch_timeout(), Duration::from_secs(60));
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_config_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.device.state_dir = PathBuf::from("/tmp/kiosk-state");
        config.save_to_path(file.path()).unwrap();

        assert_eq!(Config::try_load(file.path()).unwrap(), Some(config));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[log]\nfilter = \"debug\"\n").unwrap();

        let config = Config::try_load(file.path()).unwrap().unwrap();
        assert_eq!(config.log.filter, "debug");
        assert_eq!(config.network, NetworkConfig::default());
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(Config::try_load("/nonexistent/path").unwrap().is_none());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[network\n").unwrap();
        assert!(matches!(
            Config::try_load(file.path()),
            Err(LocalConfigError::Parse(_))
        ));
    }
}
