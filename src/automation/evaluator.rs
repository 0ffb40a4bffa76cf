//! Automation evaluator
//!
//! Holds one [`AutomationTrack`] per parameter name and evaluates them at a
//! playback position. Only the parameters in [`AutomationTarget`] are routed
//! to the engine; other names are stored and evaluated but have no effect.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::track::{AutomationPoint, AutomationTrack, Interpolation};

/// Parameters the engine applies on every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutomationTarget {
    /// Main volume in [0, 1]
    Volume,
    /// Bass boost strength, 0..=1000
    BassBoost,
    /// Virtualizer strength, 0..=1000
    Virtualizer,
    /// Loudness gain in millibels
    Loudness,
    /// Reverb preset index
    Reverb,
}

impl AutomationTarget {
    pub const ALL: [AutomationTarget; 5] = [
        AutomationTarget::Volume,
        AutomationTarget::BassBoost,
        AutomationTarget::Virtualizer,
        AutomationTarget::Loudness,
        AutomationTarget::Reverb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AutomationTarget::Volume => "volume",
            AutomationTarget::BassBoost => "bass_boost",
            AutomationTarget::Virtualizer => "virtualizer",
            AutomationTarget::Loudness => "loudness",
            AutomationTarget::Reverb => "reverb",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    tracks: BTreeMap<String, AutomationTrack>,
}

impl Automation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn parameters(&self) -> Vec<&str> {
        self.tracks.keys().map(String::as_str).collect()
    }

    pub fn track(&self, param: &str) -> Option<&AutomationTrack> {
        self.tracks.get(param)
    }

    pub fn has_automation(&self, param: &str) -> bool {
        self.tracks.contains_key(param)
    }

    pub fn add_point(&mut self, param: &str, time_ms: u64, value: f32) {
        self.tracks
            .entry(param.to_string())
            .or_default()
            .insert(AutomationPoint::new(time_ms, value));
        debug!("[AUTOMATION] {} @ {}ms = {}", param, time_ms, value);
    }

    /// Remove every point of `param` at `time_ms`; an emptied track is dropped
    pub fn remove_point(&mut self, param: &str, time_ms: u64) -> bool {
        let Some(track) = self.tracks.get_mut(param) else {
            return false;
        };
        let removed = track.remove_at(time_ms) > 0;
        if track.is_empty() {
            self.tracks.remove(param);
        }
        removed
    }

    pub fn update_point(&mut self, param: &str, time_ms: u64, value: f32) -> bool {
        self.tracks
            .get_mut(param)
            .is_some_and(|t| t.update_value(time_ms, value))
    }

    pub fn move_point(&mut self, param: &str, from_ms: u64, to_ms: u64) -> bool {
        self.tracks
            .get_mut(param)
            .is_some_and(|t| t.move_point(from_ms, to_ms))
    }

    pub fn clear_parameter(&mut self, param: &str) {
        self.tracks.remove(param);
    }

    pub fn clear_all(&mut self) {
        self.tracks.clear();
    }

    pub fn set_interpolation(&mut self, param: &str, interpolation: Interpolation) {
        if let Some(track) = self.tracks.get_mut(param) {
            track.set_interpolation(interpolation);
        }
    }

    /// Value of `param` at `position_ms`; `None` if it has no points
    pub fn value_at(&self, param: &str, position_ms: u64) -> Option<f32> {
        self.tracks.get(param)?.value_at(position_ms)
    }

    /// Every automated parameter's value at `position_ms`
    pub fn values_at(&self, position_ms: u64) -> Vec<(&str, f32)> {
        self.tracks
            .iter()
            .filter_map(|(name, t)| t.value_at(position_ms).map(|v| (name.as_str(), v)))
            .collect()
    }

    /// Values of the routed parameters at `position_ms`
    pub fn routed_values_at(&self, position_ms: u64) -> Vec<(AutomationTarget, f32)> {
        AutomationTarget::ALL
            .into_iter()
            .filter_map(|t| self.value_at(t.name(), position_ms).map(|v| (t, v)))
            .collect()
    }

    // ========================================================================
    // Editing helpers
    // ========================================================================

    pub fn copy_parameter(&mut self, from: &str, to: &str) {
        if let Some(track) = self.tracks.get(from).cloned() {
            self.tracks.insert(to.to_string(), track);
        }
    }

    pub fn scale_values(&mut self, param: &str, factor: f32) {
        if let Some(track) = self.tracks.get_mut(param) {
            track.scale_values(factor);
        }
    }

    pub fn shift_times(&mut self, param: &str, delta_ms: i64) {
        if let Some(track) = self.tracks.get_mut(param) {
            track.shift_times(delta_ms);
        }
    }

    /// Replace `param` with a smooth ramp from `from` to `to`
    pub fn create_fade(&mut self, param: &str, start_ms: u64, end_ms: u64, from: f32, to: f32) {
        self.clear_parameter(param);
        self.add_point(param, start_ms, from);
        self.add_point(param, end_ms, to);
        self.set_interpolation(param, Interpolation::Smooth);
    }

    pub fn create_fade_in(&mut self, param: &str, start_ms: u64, end_ms: u64) {
        self.create_fade(param, start_ms, end_ms, 0.0, 1.0);
    }

    pub fn create_fade_out(&mut self, param: &str, start_ms: u64, end_ms: u64) {
        self.create_fade(param, start_ms, end_ms, 1.0, 0.0);
    }

    /// Replace `param` with a dip: high at `start_ms`, low at `dip_ms`,
    /// high again at `end_ms`
    pub fn create_crossfade(
        &mut self,
        param: &str,
        start_ms: u64,
        dip_ms: u64,
        end_ms: u64,
        low: f32,
        high: f32,
    ) {
        self.clear_parameter(param);
        self.add_point(param, start_ms, high);
        self.add_point(param, dip_ms, low);
        self.add_point(param, end_ms, high);
        self.set_interpolation(param, Interpolation::Smooth);
    }
}
