//! TOML-based application configuration.
//!
//! Stores:
//! - Journey defaults offered when starting a walk
//! - Engine cadence (tick and ETA refresh intervals)
//! - Routing provider settings
//! - Notification preferences
//!
//! Configuration is stored at `~/.config/wander/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;

/// Defaults offered when starting a new journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyDefaults {
    #[serde(default = "default_duration_min")]
    pub default_duration_min: u32,
    #[serde(default = "default_buffer_min")]
    pub default_buffer_min: u32,
}

/// Session runtime cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Delay between the end of one ETA request and the start of the next.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingProvider {
    Osrm,
    StraightLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_provider")]
    pub provider: RoutingProvider,
    #[serde(default = "default_osrm_base_url")]
    pub osrm_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_walking_speed_mps")]
    pub walking_speed_mps: f64,
    #[serde(default = "default_detour_factor")]
    pub detour_factor: f64,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_immediate_delay_secs")]
    pub immediate_delay_secs: u64,
    #[serde(default = "default_reminder_period_secs")]
    pub reminder_period_secs: u64,
    /// Sound file name passed to the notifier (optional).
    #[serde(default = "default_sound")]
    pub sound: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/wander/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub journey: JourneyDefaults,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_duration_min() -> u32 {
    60
}
fn default_buffer_min() -> u32 {
    5
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_refresh_interval_secs() -> u64 {
    15
}
fn default_provider() -> RoutingProvider {
    RoutingProvider::StraightLine
}
fn default_osrm_base_url() -> String {
    "https://router.project-osrm.org".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_walking_speed_mps() -> f64 {
    1.4
}
fn default_detour_factor() -> f64 {
    1.3
}
fn default_true() -> bool {
    true
}
fn default_immediate_delay_secs() -> u64 {
    1
}
fn default_reminder_period_secs() -> u64 {
    60
}
fn default_sound() -> Option<String> {
    Some("DogBark.wav".into())
}

impl Default for JourneyDefaults {
    fn default() -> Self {
        Self {
            default_duration_min: default_duration_min(),
            default_buffer_min: default_buffer_min(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            osrm_base_url: default_osrm_base_url(),
            timeout_secs: default_timeout_secs(),
            walking_speed_mps: default_walking_speed_mps(),
            detour_factor: default_detour_factor(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            immediate_delay_secs: default_immediate_delay_secs(),
            reminder_period_secs: default_reminder_period_secs(),
            sound: default_sound(),
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Path of the config file inside the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing the defaults there if the file does not exist.
    ///
    /// # Errors
    /// Same as [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    /// Same as [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown or
    /// the resulting configuration is invalid.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the session runtime cannot work with.
    ///
    /// # Errors
    /// Returns `InvalidValue` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if self.journey.default_duration_min == 0 {
            return invalid("journey.default_duration_min", "must be greater than zero");
        }
        if self.engine.tick_interval_ms == 0 {
            return invalid("engine.tick_interval_ms", "must be greater than zero");
        }
        if self.engine.refresh_interval_secs == 0 {
            return invalid("engine.refresh_interval_secs", "must be greater than zero");
        }
        if !self.routing.walking_speed_mps.is_finite() || self.routing.walking_speed_mps <= 0.0 {
            return invalid("routing.walking_speed_mps", "must be a positive finite number");
        }
        if self.routing.timeout_secs == 0 {
            return invalid("routing.timeout_secs", "must be greater than zero");
        }
        if self.notifications.reminder_period_secs == 0 {
            return invalid("notifications.reminder_period_secs", "must be greater than zero");
        }
        Ok(())
    }
}
