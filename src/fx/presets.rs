//! Listening modes
//!
//! A listening mode is a named bundle of effect settings. The built-in table
//! can be overridden per mode; overrides are persisted through the
//! [`ConfigStore`] and win over the built-ins until reset.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::output::OutputType;
use crate::device::store::{load_json, save_json, ConfigStore};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningMode {
    #[default]
    Normal,
    Focus,
    Night,
    Workout,
    Podcast,
    LowLatency,
    Car,
    AudioFocus,
    VisualFocus,
}

impl ListeningMode {
    pub const ALL: [ListeningMode; 9] = [
        ListeningMode::Normal,
        ListeningMode::Focus,
        ListeningMode::Night,
        ListeningMode::Workout,
        ListeningMode::Podcast,
        ListeningMode::LowLatency,
        ListeningMode::Car,
        ListeningMode::AudioFocus,
        ListeningMode::VisualFocus,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ListeningMode::Normal => "normal",
            ListeningMode::Focus => "focus",
            ListeningMode::Night => "night",
            ListeningMode::Workout => "workout",
            ListeningMode::Podcast => "podcast",
            ListeningMode::LowLatency => "low_latency",
            ListeningMode::Car => "car",
            ListeningMode::AudioFocus => "audio_focus",
            ListeningMode::VisualFocus => "visual_focus",
        }
    }

    /// Built-in settings for this mode
    pub fn builtin(self) -> ModeSettings {
        let (bass_boost, virtualizer, loudness_gain, eq_preset, description) = match self {
            ListeningMode::Normal => (0, 0, 0, "Flat", "Balanced, unprocessed sound"),
            ListeningMode::Focus => (200, 500, 500, "Clarity", "Clear mids for concentration"),
            ListeningMode::Night => (300, 300, -200, "Soft", "Reduced peaks for late listening"),
            ListeningMode::Workout => (800, 600, 800, "Bass Heavy", "Punchy bass for exercise"),
            ListeningMode::Podcast => (0, 200, 600, "Voice", "Speech clarity"),
            ListeningMode::LowLatency => (0, 0, 0, "Bypass", "All effects bypassed"),
            ListeningMode::Car => (600, 300, 700, "Car", "Compensates for road noise"),
            ListeningMode::AudioFocus => (400, 600, 500, "Immersive", "Wide, detailed stage"),
            ListeningMode::VisualFocus => (100, 100, 0, "Flat", "Subtle audio behind video"),
        };
        ModeSettings {
            bass_boost,
            virtualizer,
            loudness_gain,
            eq_preset: eq_preset.to_string(),
            disable_all_fx: self == ListeningMode::LowLatency,
            description: description.to_string(),
        }
    }
}

impl fmt::Display for ListeningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Effect settings carried by a listening mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSettings {
    /// Bass boost strength, 0..=1000
    pub bass_boost: i32,
    /// Virtualizer strength, 0..=1000
    pub virtualizer: i32,
    /// Loudness gain in millibels
    pub loudness_gain: i32,
    pub eq_preset: String,
    pub disable_all_fx: bool,
    pub description: String,
}

/// Suggest a listening mode from the listening context
///
/// Car wins over everything, then night hours (22:00–06:59), then
/// headphones. Everything else is Normal.
pub fn suggest_mode(output: OutputType, in_car: bool, hour: u32) -> ListeningMode {
    if in_car {
        ListeningMode::Car
    } else if hour >= 22 || hour <= 6 {
        ListeningMode::Night
    } else if output == OutputType::Headphones {
        ListeningMode::Focus
    } else {
        ListeningMode::Normal
    }
}

/// Built-in mode table plus persisted per-mode overrides
#[derive(Debug, Default)]
pub struct ListeningModeResolver {
    overrides: HashMap<ListeningMode, ModeSettings>,
}

impl ListeningModeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(store: &dyn ConfigStore) -> Self {
        let overrides = ListeningMode::ALL
            .into_iter()
            .filter_map(|m| load_json::<ModeSettings>(store, &store_key(m)).map(|s| (m, s)))
            .collect();
        Self { overrides }
    }

    pub fn settings(&self, mode: ListeningMode) -> ModeSettings {
        self.overrides
            .get(&mode)
            .cloned()
            .unwrap_or_else(|| mode.builtin())
    }

    pub fn set_override(
        &mut self,
        mode: ListeningMode,
        settings: ModeSettings,
        store: &mut dyn ConfigStore,
    ) -> Result<()> {
        save_json(store, &store_key(mode), &settings)?;
        self.overrides.insert(mode, settings);
        Ok(())
    }

    pub fn reset(&mut self, mode: ListeningMode, store: &mut dyn ConfigStore) {
        store.remove(&store_key(mode));
        self.overrides.remove(&mode);
    }
}

fn store_key(mode: ListeningMode) -> String {
    format!("listening_mode.{}", mode.key())
}
