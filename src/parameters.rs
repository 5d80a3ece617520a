use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EpiError;

/// Ticks an entity stays INFECTED before turning IMMUNE.
pub const DEFAULT_INFECTED_DURATION: u32 = 3;
/// Ticks an entity stays IMMUNE before turning SUSCEPTIBLE again.
pub const DEFAULT_IMMUNE_DURATION: u32 = 3;

/// Model parameters shared by both engines. Missing keys in a parameters file fall back to the
/// defaults.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub infected_duration: u32,
    pub immune_duration: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            infected_duration: DEFAULT_INFECTED_DURATION,
            immune_duration: DEFAULT_IMMUNE_DURATION,
        }
    }
}

impl Parameters {
    /// Reads parameters from a JSON file.
    ///
    /// # Errors
    /// Returns an `EpiError` if the file cannot be read or parsed, or if a duration is zero.
    pub fn load(path: &Path) -> Result<Parameters, EpiError> {
        let data = fs::read_to_string(path)?;
        let parameters: Parameters = serde_json::from_str(&data)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// # Errors
    /// Returns `EpiError::Config` if either duration is zero.
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.infected_duration == 0 {
            return Err(EpiError::Config(
                "infected_duration must be at least 1".to_string(),
            ));
        }
        if self.immune_duration == 0 {
            return Err(EpiError::Config(
                "immune_duration must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
