//! Persisted browser settings.
//!
//! `BrowserSettings` lives in one JSON file under the platform config
//! directory. A missing file means defaults; a malformed one is an error so
//! the caller can decide whether to fall back.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::BrowserSettings;

const SETTINGS_FILE: &str = "settings.json";

pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<BrowserSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &BrowserSettings;
    /// Replaces one leaf setting addressed as `section.field`, then saves.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

pub struct SettingsEngine {
    config_path: String,
    settings: BrowserSettings,
}

impl SettingsEngine {
    /// Uses `path_override` when given, else `settings.json` in the platform
    /// config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override.unwrap_or_else(|| {
            platform::get_config_dir()
                .join(SETTINGS_FILE)
                .to_string_lossy()
                .into_owned()
        });
        Self {
            config_path,
            settings: BrowserSettings::default(),
        }
    }
}

/// Finds the existing slot for a dotted key inside serialized settings.
fn settings_slot<'a>(root: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    if key.split('.').any(str::is_empty) {
        return None;
    }
    let (parent, field) = match key.rsplit_once('.') {
        Some((parent, field)) => (format!("/{}", parent.replace('.', "/")), field),
        None => (String::new(), key),
    };
    root.pointer_mut(&parent)?.as_object_mut()?.get_mut(field)
}

impl SettingsEngineTrait for SettingsEngine {
    fn load(&mut self) -> Result<BrowserSettings, SettingsError> {
        let content = match fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.config_path, "no settings file, using defaults");
                self.settings = BrowserSettings::default();
                return Ok(self.settings.clone());
            }
            Err(e) => {
                return Err(SettingsError::IoError(format!(
                    "reading {}: {}",
                    self.config_path, e
                )))
            }
        };

        self.settings = serde_json::from_str(&content)
            .map_err(|e| SettingsError::SerializationError(format!("{}: {}", self.config_path, e)))?;
        info!(path = %self.config_path, "settings loaded");
        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SettingsError::IoError(format!("creating {}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| SettingsError::SerializationError(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("writing {}: {}", self.config_path, e)))
    }

    fn get_settings(&self) -> &BrowserSettings {
        &self.settings
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut root = serde_json::to_value(&self.settings)
            .map_err(|e| SettingsError::SerializationError(e.to_string()))?;
        let slot = settings_slot(&mut root, key)
            .ok_or_else(|| SettingsError::InvalidKey(format!("unknown settings key '{}'", key)))?;
        *slot = value;

        // Deserializing again rejects values of the wrong shape.
        self.settings = serde_json::from_value(root)
            .map_err(|e| SettingsError::InvalidValue(format!("{}: {}", key, e)))?;
        debug!(key, "setting updated");
        self.save()
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        info!("settings reset to defaults");
        self.settings = BrowserSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
