//! Effects, listening modes, output profiles and automation routing

use chrono::Timelike;
use tracing::{debug, info};

use super::events::EngineEvent;
use super::player::PlaybackEngine;
use crate::automation::{Automation, AutomationTarget, Interpolation};
use crate::config::PlayerModule;
use crate::fx::output::{OutputProfile, OutputType};
use crate::fx::presets::{suggest_mode, ListeningMode, ModeSettings};
use crate::fx::state::FxState;
use crate::fx::FxController;

impl PlaybackEngine {
    // ========================================================================
    // Effects
    // ========================================================================

    pub fn fx_state(&self) -> &FxState {
        self.fx.state()
    }

    fn emit_fx(&self) {
        self.emit(EngineEvent::FxStateChanged(self.fx.state().clone()));
    }

    fn fx_command<F>(&mut self, module: PlayerModule, op: F) -> bool
    where
        F: FnOnce(&mut FxController) -> bool,
    {
        if !self.is_module_enabled(module) {
            debug!("[FX] {:?} module disabled", module);
            return false;
        }
        let applied = op(&mut self.fx);
        if applied {
            self.emit_fx();
        }
        applied
    }

    pub fn set_eq_enabled(&mut self, enabled: bool) -> bool {
        self.fx_command(PlayerModule::Equalizer, |fx| fx.set_eq_enabled(enabled))
    }

    pub fn set_eq_band_level(&mut self, band: usize, level_mb: i32) -> bool {
        self.fx_command(PlayerModule::Equalizer, |fx| {
            fx.set_eq_band_level(band, level_mb)
        })
    }

    pub fn set_eq_band_levels(&mut self, levels: &[i16]) -> bool {
        self.fx_command(PlayerModule::Equalizer, |fx| {
            fx.set_eq_band_levels(levels);
            true
        })
    }

    pub fn set_bass_boost(&mut self, strength: i32) -> bool {
        self.fx_command(PlayerModule::Fx, |fx| fx.set_bass_boost(strength))
    }

    pub fn set_bass_boost_enabled(&mut self, enabled: bool) -> bool {
        self.fx_command(PlayerModule::Fx, |fx| fx.set_bass_boost_enabled(enabled))
    }

    pub fn set_virtualizer(&mut self, strength: i32) -> bool {
        self.fx_command(PlayerModule::Fx, |fx| fx.set_virtualizer(strength))
    }

    pub fn set_virtualizer_enabled(&mut self, enabled: bool) -> bool {
        self.fx_command(PlayerModule::Fx, |fx| fx.set_virtualizer_enabled(enabled))
    }

    pub fn set_loudness_gain(&mut self, gain_mb: i32) -> bool {
        self.fx_command(PlayerModule::Fx, |fx| fx.set_loudness_gain(gain_mb))
    }

    pub fn set_loudness_enabled(&mut self, enabled: bool) -> bool {
        self.fx_command(PlayerModule::Fx, |fx| fx.set_loudness_enabled(enabled))
    }

    pub fn set_reverb_preset(&mut self, index: i32) -> bool {
        self.fx_command(PlayerModule::Fx, |fx| fx.set_reverb_preset(index))
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) -> bool {
        self.fx_command(PlayerModule::Fx, |fx| fx.set_reverb_enabled(enabled))
    }

    pub fn disable_all_fx(&mut self) {
        self.fx.disable_all();
        self.emit_fx();
    }

    // ========================================================================
    // Listening modes
    // ========================================================================

    pub fn listening_mode(&self) -> ListeningMode {
        self.listening_mode
    }

    /// Effective settings of a mode, overrides included
    pub fn mode_settings(&self, mode: ListeningMode) -> ModeSettings {
        self.modes.settings(mode)
    }

    pub fn set_listening_mode(&mut self, mode: ListeningMode) {
        let settings = self.modes.settings(mode);
        info!("[FX] Listening mode {} ({})", mode, settings.description);
        self.listening_mode = mode;
        self.fx.apply_mode(&settings);
        self.emit(EngineEvent::ListeningModeChanged(mode));
        self.emit_fx();
    }

    /// Persist custom settings for a mode and re-apply it if active
    pub fn update_mode_settings(&mut self, mode: ListeningMode, settings: ModeSettings) -> bool {
        if let Err(e) = self
            .modes
            .set_override(mode, settings, self.collab.store.as_mut())
        {
            self.emit_error(&e);
            return false;
        }
        if mode == self.listening_mode {
            self.set_listening_mode(mode);
        }
        true
    }

    /// Drop a mode's overrides so the built-in settings apply again
    pub fn reset_mode(&mut self, mode: ListeningMode) {
        self.modes.reset(mode, self.collab.store.as_mut());
        if mode == self.listening_mode {
            self.set_listening_mode(mode);
        }
    }

    /// Mode suggested for the current output and time of day
    pub fn suggested_mode(&self) -> ListeningMode {
        let hour = chrono::Local::now().hour();
        suggest_mode(self.output, self.collab.topology.is_car(), hour)
    }

    pub fn apply_suggested_mode(&mut self) -> ListeningMode {
        let mode = self.suggested_mode();
        if mode != self.listening_mode {
            self.set_listening_mode(mode);
        }
        mode
    }

    // ========================================================================
    // Output routing
    // ========================================================================

    pub fn output(&self) -> OutputType {
        self.output
    }

    /// Profile that applies to an output: the user's, else the built-in
    pub fn output_profile(&self, output_type: OutputType) -> OutputProfile {
        self.profiles.resolve(output_type)
    }

    pub fn has_user_profile(&self, output_type: OutputType) -> bool {
        self.profiles.has_user_profile(output_type)
    }

    /// Persist a user profile; applied right away for the active output
    pub fn set_output_profile(&mut self, output_type: OutputType, profile: OutputProfile) -> bool {
        if let Err(e) =
            self.profiles
                .set_user_profile(output_type, profile, self.collab.store.as_mut())
        {
            self.emit_error(&e);
            return false;
        }
        if output_type == self.output {
            self.apply_output_profile();
        }
        true
    }

    pub fn clear_output_profile(&mut self, output_type: OutputType) {
        self.profiles
            .clear_user_profile(output_type, self.collab.store.as_mut());
        if output_type == self.output {
            self.apply_output_profile();
        }
    }

    pub(super) fn apply_output_profile(&mut self) {
        if !self.is_module_enabled(PlayerModule::OutputRouting) {
            return;
        }
        let profile = self.profiles.resolve(self.output);
        debug!("[FX] Applying profile '{}'", profile.name);
        self.fx.apply_profile(&profile);
        self.emit_fx();
    }

    /// The active output changed. The resolved profile is always re-applied.
    pub(super) fn on_output_changed(&mut self, output: OutputType) {
        info!("[FX] Output {} -> {}", self.output, output);
        self.output = output;
        self.emit(EngineEvent::OutputChanged(output));
        self.apply_output_profile();
        if self.config.auto_listening_mode {
            self.apply_suggested_mode();
        }
    }

    // ========================================================================
    // Automation
    // ========================================================================

    pub fn automation(&self) -> &Automation {
        &self.automation
    }

    /// Direct access for bulk edits (fades, shifts, scaling)
    pub fn automation_mut(&mut self) -> &mut Automation {
        &mut self.automation
    }

    pub fn add_automation_point(&mut self, param: &str, time_ms: u64, value: f32) -> bool {
        if !self.is_module_enabled(PlayerModule::Automation) {
            debug!("[AUTOMATION] Module disabled, dropping point for '{}'", param);
            return false;
        }
        self.automation.add_point(param, time_ms, value);
        true
    }

    pub fn remove_automation_point(&mut self, param: &str, time_ms: u64) -> bool {
        self.automation.remove_point(param, time_ms)
    }

    pub fn clear_automation(&mut self, param: &str) {
        self.automation.clear_parameter(param);
    }

    pub fn clear_all_automation(&mut self) {
        self.automation.clear_all();
    }

    pub fn set_automation_interpolation(&mut self, param: &str, interpolation: Interpolation) {
        self.automation.set_interpolation(param, interpolation);
    }

    /// Route automated values at `position_ms` to volume and effects
    pub(super) fn apply_automation(&mut self, position_ms: u64) {
        if !self.is_module_enabled(PlayerModule::Automation) || self.automation.is_empty() {
            return;
        }
        let fx_enabled = self.is_module_enabled(PlayerModule::Fx);
        let before = self.fx.state().clone();
        let mut volume_changed = false;

        for (target, value) in self.automation.routed_values_at(position_ms) {
            match target {
                AutomationTarget::Volume => {
                    let volume = value.clamp(0.0, 1.0);
                    if (volume - self.state.volume).abs() > f32::EPSILON {
                        self.state.volume = volume;
                        volume_changed = true;
                    }
                }
                _ if !fx_enabled => {}
                AutomationTarget::BassBoost => {
                    self.fx.set_bass_boost(value.round() as i32);
                }
                AutomationTarget::Virtualizer => {
                    self.fx.set_virtualizer(value.round() as i32);
                }
                AutomationTarget::Loudness => {
                    self.fx.set_loudness_gain(value.round() as i32);
                }
                AutomationTarget::Reverb => {
                    self.fx.set_reverb_preset(value.round() as i32);
                }
            }
        }

        if volume_changed {
            self.push_volume();
        }
        if self.fx.state() != &before {
            self.emit_fx();
        }
    }
}
