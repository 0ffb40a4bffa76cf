//! Engine configuration
//!
//! Tunables for the playback engine, loadable from JSON. Every field has a
//! default so partial documents are accepted.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MixdeckError, Result};

/// Optional engine subsystems that can be switched on and off at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerModule {
    /// Transport and playlist; always enabled
    Core,
    Fx,
    Equalizer,
    MultiLayer,
    Automation,
    Analysis,
    Looping,
    OutputRouting,
}

impl PlayerModule {
    pub const ALL: [PlayerModule; 8] = [
        PlayerModule::Core,
        PlayerModule::Fx,
        PlayerModule::Equalizer,
        PlayerModule::MultiLayer,
        PlayerModule::Automation,
        PlayerModule::Analysis,
        PlayerModule::Looping,
        PlayerModule::OutputRouting,
    ];
}

/// Configuration for a [`crate::engine::PlaybackEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of the position/loop/automation tick in milliseconds
    pub tick_interval_ms: u64,
    /// Maximum number of simultaneous layers
    pub max_layers: usize,
    /// Gain multiplier applied while focus is lost with ducking allowed
    pub duck_gain: f32,
    /// `previous()` restarts the current item past this position
    pub previous_restart_threshold_ms: u64,
    /// Default step for skip forward/backward
    pub skip_step_ms: u64,
    /// Capacity of the observer broadcast channel
    pub event_capacity: usize,
    /// Initial main volume in [0, 1]
    pub default_volume: f32,
    /// Modules enabled at construction
    pub enabled_modules: BTreeSet<PlayerModule>,
    /// Apply the suggested listening mode whenever the output changes
    pub auto_listening_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            max_layers: crate::layers::MAX_LAYERS,
            duck_gain: 0.3,
            previous_restart_threshold_ms: 3000,
            skip_step_ms: 10_000,
            event_capacity: 1024,
            default_volume: 1.0,
            enabled_modules: PlayerModule::ALL.into_iter().collect(),
            auto_listening_mode: false,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MixdeckError::FileNotFound {
                path: path.display().to_string(),
                source: None,
            });
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(MixdeckError::Config {
                reason: "tick_interval_ms must be positive".to_string(),
            });
        }
        if self.max_layers == 0 || self.max_layers > crate::layers::MAX_LAYERS {
            return Err(MixdeckError::Config {
                reason: format!(
                    "max_layers must be between 1 and {}",
                    crate::layers::MAX_LAYERS
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.duck_gain) {
            return Err(MixdeckError::Config {
                reason: format!("duck_gain {} outside [0, 1]", self.duck_gain),
            });
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(MixdeckError::Config {
                reason: format!("default_volume {} outside [0, 1]", self.default_volume),
            });
        }
        if self.event_capacity == 0 {
            return Err(MixdeckError::Config {
                reason: "event_capacity must be positive".to_string(),
            });
        }
        Ok(())
    }
}
