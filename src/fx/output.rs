//! Output-type effect profiles
//!
//! Every output type has a built-in profile. A user profile stored for a type
//! takes precedence over the built-in one and survives restarts through the
//! [`ConfigStore`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::store::{load_json, save_json, ConfigStore};
use crate::error::Result;

/// Physical/logical audio output class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    #[default]
    Speaker,
    Headphones,
    Bluetooth,
    Usb,
    Virtual,
}

impl OutputType {
    pub const ALL: [OutputType; 5] = [
        OutputType::Speaker,
        OutputType::Headphones,
        OutputType::Bluetooth,
        OutputType::Usb,
        OutputType::Virtual,
    ];

    pub fn key(self) -> &'static str {
        match self {
            OutputType::Speaker => "speaker",
            OutputType::Headphones => "headphones",
            OutputType::Bluetooth => "bluetooth",
            OutputType::Usb => "usb",
            OutputType::Virtual => "virtual",
        }
    }

    /// Outputs worn on the head
    pub fn is_personal(self) -> bool {
        matches!(self, OutputType::Headphones | OutputType::Bluetooth)
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Effect settings applied when an output type becomes active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputProfile {
    pub name: String,
    pub output_type: OutputType,
    pub eq_enabled: bool,
    /// Empty leaves the current band levels untouched
    #[serde(default)]
    pub eq_band_levels: Vec<i16>,
    pub bass_boost: i32,
    pub virtualizer: i32,
    pub loudness_gain: i32,
    #[serde(default)]
    pub reverb_preset: i32,
}

impl OutputProfile {
    /// Built-in profile for an output type
    pub fn builtin(output_type: OutputType) -> Self {
        let (name, eq_enabled, bass_boost, virtualizer, loudness_gain) = match output_type {
            OutputType::Speaker => ("Speaker", true, 500, 0, 300),
            OutputType::Headphones => ("Headphones", true, 200, 400, 0),
            OutputType::Bluetooth => ("Bluetooth", true, 300, 200, 400),
            OutputType::Usb => ("USB DAC", false, 0, 0, 0),
            OutputType::Virtual => ("Virtual", false, 0, 0, 0),
        };
        Self {
            name: name.to_string(),
            output_type,
            eq_enabled,
            eq_band_levels: Vec::new(),
            bass_boost,
            virtualizer,
            loudness_gain,
            reverb_preset: 0,
        }
    }
}

/// Resolves the profile to apply for an output type
#[derive(Debug, Default)]
pub struct OutputProfileResolver {
    user: HashMap<OutputType, OutputProfile>,
}

impl OutputProfileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every stored user profile
    pub fn load(store: &dyn ConfigStore) -> Self {
        let user = OutputType::ALL
            .into_iter()
            .filter_map(|t| load_json::<OutputProfile>(store, &store_key(t)).map(|p| (t, p)))
            .collect();
        Self { user }
    }

    /// User profile if one exists, built-in otherwise
    pub fn resolve(&self, output_type: OutputType) -> OutputProfile {
        self.user
            .get(&output_type)
            .cloned()
            .unwrap_or_else(|| OutputProfile::builtin(output_type))
    }

    pub fn has_user_profile(&self, output_type: OutputType) -> bool {
        self.user.contains_key(&output_type)
    }

    /// Record a user profile and persist it
    pub fn set_user_profile(
        &mut self,
        output_type: OutputType,
        mut profile: OutputProfile,
        store: &mut dyn ConfigStore,
    ) -> Result<()> {
        profile.output_type = output_type;
        save_json(store, &store_key(output_type), &profile)?;
        self.user.insert(output_type, profile);
        Ok(())
    }

    /// Drop the user profile so the built-in one applies again
    pub fn clear_user_profile(&mut self, output_type: OutputType, store: &mut dyn ConfigStore) {
        store.remove(&store_key(output_type));
        self.user.remove(&output_type);
    }
}

fn store_key(output_type: OutputType) -> String {
    format!("output_profile.{}", output_type.key())
}
