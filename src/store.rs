//! # Persisted Device Settings
//!
//! File-backed [`SettingsStore`]. Two files live in the state directory:
//!
//! - `device.toml`: device identifier and base configuration source
//! - `safe_settings.json`: the last configuration that was applied
//!   successfully, stamped with the time it was saved
//!
//! The safe settings keep the device presenting something useful when a
//! download fails. They are wiped by a maintenance reset.

use crate::collaborators::{SettingsStore, StoreError};
use crate::configuration::Configuration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DEVICE_FILE: &str = "device.toml";
const SAFE_SETTINGS_FILE: &str = "safe_settings.json";

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct DeviceRecord {
    #[serde(default)]
    device_id: String,
    #[serde(default)]
    base_source: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SafeSettings {
    saved_at: DateTime<Utc>,
    configuration: Configuration,
}

#[derive(Debug)]
pub struct FileSettingsStore {
    dir: PathBuf,
    record: DeviceRecord,
}

impl FileSettingsStore {
    /// Open (or create) the store in `dir`. A device without an identifier
    /// gets a generated one, saved right away.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let record = match fs::read_to_string(dir.join(DEVICE_FILE)) {
            Ok(contents) => toml::from_str::<DeviceRecord>(&contents).unwrap_or_else(|e| {
                warn!(error = %e, "invalid device file, starting fresh");
                DeviceRecord::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => DeviceRecord::default(),
            Err(e) => return Err(e.into()),
        };

        let mut store = Self { dir, record };
        if store.record.device_id.is_empty() {
            store.record.device_id = format!("kiosk-{:08x}", rand::random::<u32>());
            info!(device_id = %store.record.device_id, "generated device id");
            store.save_record()?;
        }
        Ok(store)
    }

    fn save_record(&self) -> Result<(), StoreError> {
        let contents = toml::to_string_pretty(&self.record)?;
        fs::write(self.dir.join(DEVICE_FILE), contents)?;
        Ok(())
    }

    fn safe_settings_path(&self) -> PathBuf {
        self.dir.join(SAFE_SETTINGS_FILE)
    }
}

impl SettingsStore for FileSettingsStore {
    fn device_id(&self) -> String {
        self.record.device_id.clone()
    }

    fn set_device_id(&mut self, id: &str) -> Result<(), StoreError> {
        self.record.device_id = id.to_string();
        self.save_record()
    }

    fn base_source(&self) -> Option<String> {
        self.record.base_source.clone()
    }

    fn set_base_source(&mut self, url: Option<&str>) -> Result<(), StoreError> {
        self.record.base_source = url.map(str::to_string);
        self.save_record()
    }

    fn load_safe_settings(&self) -> Option<Configuration> {
        let data = fs::read(self.safe_settings_path()).ok()?;
        match serde_json::from_slice::<SafeSettings>(&data) {
            Ok(safe) => {
                debug!(saved_at = %safe.saved_at, "loaded safe settings");
                Some(safe.configuration)
            }
            Err(e) => {
                warn!(error = %e, "corrupt safe settings ignored");
                None
            }
        }
    }

    fn save_safe_settings(&mut self, config: &Configuration) -> Result<(), StoreError> {
        let safe = SafeSettings {
            saved_at: Utc::now(),
            configuration: config.clone(),
        };
        fs::write(self.safe_settings_path(), serde_json::to_vec(&safe)?)?;
        Ok(())
    }

    fn clear_safe_settings(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(self.safe_settings_path()) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
