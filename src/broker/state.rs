use serde::{Deserialize, Serialize};

use crate::error::PersistError;

use super::StorageTargetRange;

/// The part of a broker saved alongside its generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerState {
    pub storage_target: StorageTargetRange,
    pub run_on_batteries_only: bool,
}

impl Default for BrokerState {
    fn default() -> Self {
        Self {
            storage_target: StorageTargetRange::FULL,
            run_on_batteries_only: true,
        }
    }
}

impl BrokerState {
    /// Parses saved broker data; absent keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, PersistError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, PersistError> {
        Ok(toml::to_string(self)?)
    }
}
