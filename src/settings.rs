//! Simulation configuration
//!
//! Collision classes and physics tuning shared by every entity. Loaded once
//! at startup and read-only while the world steps.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors reading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// World-wide simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Added to vertical velocity each physics step (pixels/tick²)
    pub gravity: f32,
    /// Ground-layer codes that block movement from every side
    pub ground_codes: BTreeSet<u16>,
    /// Ground-layer codes that only block a downward landing on their top edge
    pub platform_codes: BTreeSet<u16>,
    /// Distance an entity may travel past the map edge before removal
    pub out_of_bounds_slack: i32,
    /// Camera follow damping used by `Camera::update`
    pub camera_damping: f32,
    /// Phantom layer alpha change per tick
    pub phantom_fade_step: f32,
    /// Seed for the world, animator and camera generators
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            ground_codes: BTreeSet::new(),
            platform_codes: BTreeSet::new(),
            out_of_bounds_slack: DEFAULT_OUT_OF_BOUNDS_SLACK,
            camera_damping: DEFAULT_CAMERA_DAMPING,
            phantom_fade_step: DEFAULT_PHANTOM_FADE_STEP,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    /// Config with the given collision classes and default tuning
    pub fn with_codes(ground: impl IntoIterator<Item = u16>, platform: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ground_codes: ground.into_iter().collect(),
            platform_codes: platform.into_iter().collect(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_ground(&self, code: u16) -> bool {
        self.ground_codes.contains(&code)
    }

    #[inline]
    pub fn is_platform(&self, code: u16) -> bool {
        self.platform_codes.contains(&code)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded simulation config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load from a JSON file, falling back to defaults when it is missing
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No config at {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Simulation config saved to {}", path.as_ref().display());
        Ok(())
    }
}
