//! Global balancing settings, persisted across restarts.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::sim::types::Tick;

/// Host ticks per real-time second.
pub const TICKS_PER_SECOND: Tick = 60;

/// Settings shared by every broker in every domain.
///
/// # Examples
///
/// ```
/// use backup_power::settings::{BrokerSettings, TICKS_PER_SECOND};
///
/// let settings = BrokerSettings::default();
/// assert_eq!(settings.update_interval, TICKS_PER_SECOND);
/// assert_eq!(settings.minimum_on_time, 10 * TICKS_PER_SECOND);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerSettings {
    /// Ticks between two evaluations of the balancing loop.
    pub update_interval: Tick,
    /// Ticks a generator must run after a start before it may be stopped.
    pub minimum_on_time: Tick,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            update_interval: TICKS_PER_SECOND,
            minimum_on_time: 10 * TICKS_PER_SECOND,
        }
    }
}

impl BrokerSettings {
    /// Smallest and largest update interval offered to players.
    pub const UPDATE_INTERVAL_RANGE: (Tick, Tick) = (TICKS_PER_SECOND, 60 * TICKS_PER_SECOND);
    /// Smallest and largest minimum run time offered to players.
    pub const MINIMUM_ON_TIME_RANGE: (Tick, Tick) = (0, 60 * TICKS_PER_SECOND);

    /// Returns a copy with both values pulled into their allowed ranges.
    ///
    /// The engine itself only needs `update_interval >= 1`; the wider ranges
    /// mirror what a settings screen would let a player choose.
    pub fn clamped(self) -> Self {
        let (ui_min, ui_max) = Self::UPDATE_INTERVAL_RANGE;
        let (mo_min, mo_max) = Self::MINIMUM_ON_TIME_RANGE;
        Self {
            update_interval: self.update_interval.clamp(ui_min, ui_max),
            minimum_on_time: self.minimum_on_time.clamp(mo_min, mo_max),
        }
    }

    /// Parses settings from TOML; missing keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Decode`] on malformed TOML or unknown keys.
    pub fn from_toml_str(s: &str) -> Result<Self, PersistError> {
        Ok(toml::from_str(s)?)
    }

    /// Serializes settings to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encode`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, PersistError> {
        Ok(toml::to_string(self)?)
    }

    /// Loads settings from a file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the file cannot be read, or
    /// [`PersistError::Decode`] if its contents are not valid settings.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Writes settings to a file.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
