//! Effect controller
//!
//! Owns the [`FxState`] of the main session and pushes changes to the bound
//! [`FxControl`] surface. Values are clamped before they reach the surface.
//! A setter the surface rejects leaves the state untouched. Without a bound
//! surface, changes are recorded and pushed when a session is bound.

use tracing::{debug, warn};

use super::output::OutputProfile;
use super::presets::ModeSettings;
use super::state::{clamp_loudness, FxState, ReverbPreset, Strength};
use crate::device::fx_control::FxControl;
use crate::error::{MixdeckError, Result};

#[derive(Default)]
pub struct FxController {
    state: FxState,
    surface: Option<Box<dyn FxControl>>,
    session_id: Option<u32>,
}

impl std::fmt::Debug for FxController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FxController")
            .field("state", &self.state)
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl FxController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FxState {
        &self.state
    }

    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    pub fn is_bound(&self) -> bool {
        self.surface.is_some()
    }

    /// Attach a surface for a new session and push the whole state to it
    pub fn bind(&mut self, surface: Box<dyn FxControl>, session_id: u32) {
        self.release();

        let bands = surface.eq_band_count();
        let (lo, hi) = surface.eq_band_level_range();
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        self.state.eq_band_range = (lo, hi);
        self.state.eq_band_levels.resize(bands, 0);
        for level in self.state.eq_band_levels.iter_mut() {
            *level = (*level).clamp(lo, hi);
        }

        self.surface = Some(surface);
        self.session_id = Some(session_id);
        debug!("[FX] Bound session {} ({} EQ bands)", session_id, bands);
        self.push_all();
    }

    /// Free the surface; state is kept for the next session
    pub fn release(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.release();
            debug!("[FX] Released session {:?}", self.session_id);
        }
        self.session_id = None;
    }

    fn push_all(&mut self) {
        let s = self.state.clone();
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let results = [
            ("equalizer", surface.set_eq_enabled(s.eq_enabled)),
            ("bass boost", surface.set_bass_boost(s.bass_boost_enabled, s.bass_boost)),
            ("virtualizer", surface.set_virtualizer(s.virtualizer_enabled, s.virtualizer)),
            ("loudness", surface.set_loudness(s.loudness_enabled, s.loudness_gain_mb)),
            ("reverb", surface.set_reverb(s.reverb_enabled, s.reverb_preset)),
        ];
        for (feature, result) in results {
            if let Err(e) = result {
                debug!("[FX] {} not applied on bind: {}", feature, e);
            }
        }
        for (band, level) in s.eq_band_levels.iter().enumerate() {
            if let Err(e) = surface.set_eq_band_level(band, *level) {
                debug!("[FX] EQ band {} not applied on bind: {}", band, e);
                break;
            }
        }
    }

    /// Run `op` against the surface. `true` means the state may be updated.
    fn push<F>(&mut self, feature: &str, op: F) -> bool
    where
        F: FnOnce(&mut dyn FxControl) -> Result<()>,
    {
        let Some(surface) = self.surface.as_mut() else {
            return true;
        };
        match op(surface.as_mut()) {
            Ok(()) => true,
            Err(MixdeckError::Unsupported { .. }) => {
                debug!("[FX] {} unsupported by session {:?}", feature, self.session_id);
                false
            }
            Err(e) => {
                warn!("[FX] {} failed: {}", feature, e);
                false
            }
        }
    }

    // ========================================================================
    // Equalizer
    // ========================================================================

    pub fn set_eq_enabled(&mut self, enabled: bool) -> bool {
        if self.push("equalizer", |s| s.set_eq_enabled(enabled)) {
            self.state.eq_enabled = enabled;
            return true;
        }
        false
    }

    /// Set one band; out-of-range bands are ignored
    pub fn set_eq_band_level(&mut self, band: usize, level_mb: i32) -> bool {
        if band >= self.state.eq_band_levels.len() {
            debug!("[FX] EQ band {} out of range", band);
            return false;
        }
        let level = self.state.clamp_band_level(level_mb);
        if self.push("equalizer band", |s| s.set_eq_band_level(band, level)) {
            self.state.eq_band_levels[band] = level;
            self.state.eq_preset = None;
            return true;
        }
        false
    }

    /// Set every band from a list; extra entries are ignored
    pub fn set_eq_band_levels(&mut self, levels: &[i16]) {
        for (band, level) in levels.iter().enumerate() {
            self.set_eq_band_level(band, *level as i32);
        }
    }

    pub fn set_eq_preset_name(&mut self, name: Option<String>) {
        self.state.eq_preset = name;
    }

    // ========================================================================
    // Bass boost / virtualizer
    // ========================================================================

    /// Set bass boost strength (0..=1000); non-zero strength enables it
    pub fn set_bass_boost(&mut self, strength: i32) -> bool {
        let strength = Strength::new(strength);
        let enabled = !strength.is_zero();
        if self.push("bass boost", |s| s.set_bass_boost(enabled, strength)) {
            self.state.bass_boost = strength;
            self.state.bass_boost_enabled = enabled;
            return true;
        }
        false
    }

    pub fn set_bass_boost_enabled(&mut self, enabled: bool) -> bool {
        let strength = self.state.bass_boost;
        if self.push("bass boost", |s| s.set_bass_boost(enabled, strength)) {
            self.state.bass_boost_enabled = enabled;
            return true;
        }
        false
    }

    /// Set virtualizer strength (0..=1000); non-zero strength enables it
    pub fn set_virtualizer(&mut self, strength: i32) -> bool {
        let strength = Strength::new(strength);
        let enabled = !strength.is_zero();
        if self.push("virtualizer", |s| s.set_virtualizer(enabled, strength)) {
            self.state.virtualizer = strength;
            self.state.virtualizer_enabled = enabled;
            return true;
        }
        false
    }

    pub fn set_virtualizer_enabled(&mut self, enabled: bool) -> bool {
        let strength = self.state.virtualizer;
        if self.push("virtualizer", |s| s.set_virtualizer(enabled, strength)) {
            self.state.virtualizer_enabled = enabled;
            return true;
        }
        false
    }

    // ========================================================================
    // Loudness / reverb
    // ========================================================================

    /// Set loudness gain in millibels (clamped to -1000..=2000)
    pub fn set_loudness_gain(&mut self, gain_mb: i32) -> bool {
        let gain = clamp_loudness(gain_mb);
        let enabled = gain != 0;
        if self.push("loudness", |s| s.set_loudness(enabled, gain)) {
            self.state.loudness_gain_mb = gain;
            self.state.loudness_enabled = enabled;
            return true;
        }
        false
    }

    pub fn set_loudness_enabled(&mut self, enabled: bool) -> bool {
        let gain = self.state.loudness_gain_mb;
        if self.push("loudness", |s| s.set_loudness(enabled, gain)) {
            self.state.loudness_enabled = enabled;
            return true;
        }
        false
    }

    /// Select a reverb preset by index (clamped to 0..=6); preset 0 disables
    pub fn set_reverb_preset(&mut self, index: i32) -> bool {
        let preset = ReverbPreset::from_index(index);
        let enabled = preset != ReverbPreset::None;
        if self.push("reverb", |s| s.set_reverb(enabled, preset)) {
            self.state.reverb_preset = preset;
            self.state.reverb_enabled = enabled;
            return true;
        }
        false
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) -> bool {
        let preset = self.state.reverb_preset;
        if self.push("reverb", |s| s.set_reverb(enabled, preset)) {
            self.state.reverb_enabled = enabled;
            return true;
        }
        false
    }

    /// Switch every effect off, keeping the stored levels
    pub fn disable_all(&mut self) {
        self.set_eq_enabled(false);
        self.set_bass_boost_enabled(false);
        self.set_virtualizer_enabled(false);
        self.set_loudness_enabled(false);
        self.set_reverb_enabled(false);
    }

    // ========================================================================
    // Presets
    // ========================================================================

    /// Apply a listening mode's settings
    pub fn apply_mode(&mut self, settings: &ModeSettings) {
        if settings.disable_all_fx {
            self.disable_all();
            self.state.eq_preset = Some(settings.eq_preset.clone());
            return;
        }
        self.set_bass_boost(settings.bass_boost);
        self.set_virtualizer(settings.virtualizer);
        self.set_loudness_gain(settings.loudness_gain);
        self.state.eq_preset = Some(settings.eq_preset.clone());
    }

    /// Apply an output profile, overwriting the current settings
    pub fn apply_profile(&mut self, profile: &OutputProfile) {
        self.set_eq_enabled(profile.eq_enabled);
        if !profile.eq_band_levels.is_empty() {
            self.set_eq_band_levels(&profile.eq_band_levels);
        }
        self.set_bass_boost(profile.bass_boost);
        self.set_virtualizer(profile.virtualizer);
        self.set_loudness_gain(profile.loudness_gain);
        self.set_reverb_preset(profile.reverb_preset);
    }
}
