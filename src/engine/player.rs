//! Playback engine
//!
//! `PlaybackEngine` owns the main session, the layer mixer, automation,
//! effects, looping and focus. It is a plain `&mut self` state owner: every
//! command runs to completion, and asynchronous collaborator signals are
//! queued on the input funnel until [`PlaybackEngine::process_pending_inputs`]
//! or [`PlaybackEngine::handle_input`] consumes them.
//!
//! Commands never return errors. Failures are published as
//! [`EngineEvent::Error`] and, where useful, reported through a sentinel
//! return value.

use std::collections::BTreeSet;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::events::{EngineEvent, EventHub};
use super::input::{self, InputReceiver, InputSink};
use super::state::{PlaybackState, RepeatMode};
use super::transport::{PlaybackStatus, Transport};
use crate::automation::Automation;
use crate::config::{EngineConfig, PlayerModule};
use crate::device::analysis::AudioAnalysis;
use crate::device::focus_broker::FocusRequestResult;
use crate::device::output::{DeviceTarget, OutputDevice};
use crate::device::Collaborators;
use crate::error::{MixdeckError, Result};
use crate::focus::{FocusArbiter, FocusState};
use crate::fx::output::{OutputProfileResolver, OutputType};
use crate::fx::presets::{ListeningMode, ListeningModeResolver};
use crate::fx::FxController;
use crate::layers::LayerMixer;
use crate::looping::LoopController;
use crate::media::{MediaItem, Playlist};

/// Speed range accepted by `set_speed`
pub const MIN_SPEED: f32 = 0.25;
pub const MAX_SPEED: f32 = 4.0;

pub struct PlaybackEngine {
    pub(super) config: EngineConfig,
    pub(super) modules: BTreeSet<PlayerModule>,
    pub(super) transport: Transport,
    pub(super) state: PlaybackState,
    pub(super) playlist: Playlist,
    pub(super) device: Option<Box<dyn OutputDevice>>,
    /// Token of the current main device; events carrying another are stale
    pub(super) session_token: u64,
    pub(super) next_token: u64,
    pub(super) mixer: LayerMixer,
    pub(super) automation: Automation,
    pub(super) fx: FxController,
    pub(super) modes: ListeningModeResolver,
    pub(super) listening_mode: ListeningMode,
    pub(super) profiles: OutputProfileResolver,
    pub(super) output: OutputType,
    pub(super) looping: LoopController,
    pub(super) focus: FocusArbiter,
    pub(super) analysis: Option<AudioAnalysis>,
    pub(super) collab: Collaborators,
    pub(super) events: EventHub,
    pub(super) inputs: InputSink,
    pub(super) input_rx: Option<InputReceiver>,
    pub(super) rng: StdRng,
}

impl PlaybackEngine {
    /// Build an engine around its collaborators.
    ///
    /// Registers with the output topology, loads persisted profiles and mode
    /// overrides, and applies the profile of the current output.
    pub fn new(config: EngineConfig, mut collab: Collaborators) -> Result<Self> {
        config.validate()?;

        let (inputs, input_rx) = input::channel();
        collab.topology.watch(inputs.clone());
        let output = collab.topology.current();
        let profiles = OutputProfileResolver::load(collab.store.as_ref());
        let modes = ListeningModeResolver::load(collab.store.as_ref());

        let mut modules = config.enabled_modules.clone();
        modules.insert(PlayerModule::Core);

        let state = PlaybackState {
            volume: config.default_volume.clamp(0.0, 1.0),
            ..Default::default()
        };

        let mut engine = Self {
            modules,
            transport: Transport::new(),
            state,
            playlist: Playlist::new(),
            device: None,
            session_token: 0,
            next_token: 0,
            mixer: LayerMixer::new(config.max_layers),
            automation: Automation::new(),
            fx: FxController::new(),
            modes,
            listening_mode: ListeningMode::Normal,
            profiles,
            output,
            looping: LoopController::new(),
            focus: FocusArbiter::new(config.duck_gain),
            analysis: None,
            collab,
            events: EventHub::new(config.event_capacity),
            inputs,
            input_rx: Some(input_rx),
            rng: StdRng::from_entropy(),
            config,
        };

        if engine.is_module_enabled(PlayerModule::OutputRouting) {
            let profile = engine.profiles.resolve(output);
            engine.fx.apply_profile(&profile);
        }
        info!("Engine ready on {} output", output);
        Ok(engine)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.transport.status()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_item(&self) -> Option<&MediaItem> {
        self.playlist.current()
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus.state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn event_hub(&self) -> EventHub {
        self.events.clone()
    }

    /// Sink collaborators may use to reach the engine
    pub fn input_sink(&self) -> InputSink {
        self.inputs.clone()
    }

    pub(crate) fn take_input_receiver(&mut self) -> Option<InputReceiver> {
        self.input_rx.take()
    }

    /// Seed the shuffle generator for reproducible orders
    pub fn set_shuffle_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    // ========================================================================
    // Event helpers
    // ========================================================================

    pub(super) fn emit(&self, event: EngineEvent) {
        self.events.emit(event);
    }

    pub(super) fn emit_error(&self, err: &MixdeckError) {
        self.events.emit(EngineEvent::error(err));
    }

    pub(super) fn emit_state(&self) {
        self.events
            .emit(EngineEvent::PlaybackStateChanged(self.state.clone()));
    }

    pub(super) fn emit_playlist(&self) {
        self.events.emit(EngineEvent::PlaylistChanged {
            items: self.playlist.items().to_vec(),
            current_index: self.playlist.current_index(),
        });
    }

    fn sync_status(&mut self) {
        self.state.status = self.transport.status();
        self.state.is_playing = self.transport.is_playing();
    }

    // ========================================================================
    // Starting playback
    // ========================================================================

    /// Play a single item, replacing the playlist
    pub fn play(&mut self, item: MediaItem) {
        self.playlist = Playlist::single(item.clone());
        self.emit_playlist();
        self.open_item(item);
    }

    pub fn play_stream(&mut self, url: &str, title: &str, artist: &str) {
        self.play(MediaItem::stream(url, title, artist));
    }

    /// Play a local file. A missing file is reported and changes nothing.
    pub fn play_file(&mut self, path: &Path) {
        if !path.exists() {
            let err = MixdeckError::FileNotFound {
                path: path.display().to_string(),
                source: None,
            };
            warn!("[TRANSPORT] {}", err);
            self.emit_error(&err);
            return;
        }
        self.play(MediaItem::from_file(path));
    }

    /// Replace the playlist and start at `start` (clamped)
    pub fn play_playlist(&mut self, items: Vec<MediaItem>, start: usize) {
        if items.is_empty() {
            debug!("[TRANSPORT] Ignoring empty playlist");
            return;
        }
        self.playlist = Playlist::from_items(items, start);
        if self.state.shuffle_enabled {
            self.playlist.shuffle(&mut self.rng);
        }
        self.emit_playlist();
        if let Some(item) = self.playlist.current().cloned() {
            self.open_item(item);
        }
    }

    /// Load `item` on a fresh main device. Playback starts once the device
    /// reports prepared.
    pub(super) fn open_item(&mut self, item: MediaItem) {
        self.release_session();
        self.request_focus();

        self.analysis = None;
        self.looping.clear_region();
        self.looping.markers_mut().set_detected(Vec::new());
        self.state.reset_session();
        self.transport.begin_prepare();
        self.sync_status();

        self.next_token += 1;
        self.session_token = self.next_token;
        debug!(
            "[TRANSPORT] Opening '{}' (session {})",
            item.title, self.session_token
        );
        self.emit(EngineEvent::MediaChanged(Some(item.clone())));

        match self
            .collab
            .devices
            .create(DeviceTarget::Main, self.session_token, self.inputs.clone())
        {
            Ok(device) => self.device = Some(device),
            Err(e) => {
                self.fail_session(e);
                return;
            }
        }
        if let Some(device) = self.device.as_deref_mut() {
            if let Err(e) = load_and_prepare(device, &item.uri) {
                self.fail_session(e);
                return;
            }
        }
        self.emit_state();
    }

    /// The main device reported prepared: bind effects, request analysis
    /// and start.
    pub(super) fn on_main_prepared(&mut self, duration_ms: u64, session_id: u32) {
        if !self.transport.prepared() {
            return;
        }
        self.state.is_prepared = true;
        self.state.duration_ms = duration_ms;
        self.sync_status();
        self.emit_state();

        if self.is_module_enabled(PlayerModule::Fx) {
            self.bind_fx(session_id);
        }
        if self.is_module_enabled(PlayerModule::Analysis) {
            if let Some(item) = self.playlist.current() {
                self.collab.analysis.analyze(
                    item,
                    duration_ms,
                    self.session_token,
                    self.inputs.clone(),
                );
            }
        }

        self.push_volume();
        self.push_speed();
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.start() {
                self.fail_session(e);
                return;
            }
        }
        self.transport.start();
        self.sync_status();
        self.apply_automation(0);
        self.emit_state();
    }

    pub(super) fn bind_fx(&mut self, session_id: u32) {
        match self.collab.fx.bind(session_id) {
            Ok(surface) => {
                self.fx.bind(surface, session_id);
                self.emit(EngineEvent::FxStateChanged(self.fx.state().clone()));
            }
            Err(e) => warn!("[FX] Cannot bind session {}: {}", session_id, e),
        }
    }

    /// Main session failure: status Error, no retry
    pub(super) fn fail_session(&mut self, err: MixdeckError) {
        warn!("[TRANSPORT] Playback failed: {}", err);
        if let Some(device) = self.device.as_mut() {
            let _ = device.stop();
        }
        self.transport.fail();
        self.sync_status();
        self.emit_error(&err);
        self.emit_state();
    }

    /// Release the main device and the effect surface bound to it
    fn release_session(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.stop() {
                debug!("[TRANSPORT] Stop before release failed: {}", e);
            }
            device.release();
        }
        self.fx.release();
    }

    // ========================================================================
    // Focus
    // ========================================================================

    /// Ask for focus unless already held. Denial is reported and playback
    /// proceeds anyway.
    pub(super) fn request_focus(&mut self) {
        if self.focus.has_focus() {
            return;
        }
        self.focus.begin_request();
        match self.collab.focus.request(self.inputs.clone()) {
            FocusRequestResult::Granted => {
                self.focus.granted();
                debug!("[FOCUS] Granted");
            }
            FocusRequestResult::Denied => {
                self.focus.denied();
                warn!("[FOCUS] Request denied, playing anyway");
                self.emit_error(&MixdeckError::FocusDenied);
            }
        }
    }

    fn abandon_focus(&mut self) {
        if self.focus.state() != FocusState::Unfocused {
            self.collab.focus.abandon();
        }
        self.focus.abandon();
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Pause from Playing. A user pause cancels any focus auto-resume.
    pub fn pause(&mut self) {
        if self.pause_session() {
            self.focus.on_user_transport();
        }
    }

    pub(super) fn pause_session(&mut self) -> bool {
        if !self.transport.pause() {
            return false;
        }
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.pause() {
                warn!("[TRANSPORT] Device pause failed: {}", e);
            }
            self.state.position_ms = device.current_position();
        }
        self.sync_status();
        self.emit_state();
        true
    }

    /// Resume from Paused, asking for focus again if it was given up
    pub fn resume(&mut self) {
        if !self.transport.is_paused() {
            debug!("[TRANSPORT] Resume ignored in {}", self.transport.status());
            return;
        }
        self.focus.on_user_transport();
        self.request_focus();
        self.resume_session();
    }

    pub(super) fn resume_session(&mut self) -> bool {
        if !self.transport.is_paused() {
            return false;
        }
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.start() {
                self.fail_session(e);
                return false;
            }
        }
        self.transport.start();
        self.push_volume();
        self.sync_status();
        self.emit_state();
        true
    }

    /// Pause when playing, resume when paused, restart the current item
    /// after a stop or an error
    pub fn toggle_play_pause(&mut self) {
        match self.transport.status() {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Paused => self.resume(),
            PlaybackStatus::Stopped | PlaybackStatus::Error => {
                if let Some(item) = self.playlist.current().cloned() {
                    self.open_item(item);
                }
            }
            status => debug!("[TRANSPORT] Toggle ignored in {}", status),
        }
    }

    /// Release the main device, effects surface and focus. Volume, speed,
    /// repeat and shuffle are kept. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let changed = self.transport.stop();
        if !changed && self.device.is_none() {
            return;
        }
        self.release_session();
        self.abandon_focus();
        self.state.reset_session();
        self.sync_status();
        debug!("[TRANSPORT] Stopped");
        self.emit_state();
    }

    /// Seek the main session. Clamped to the duration when it is known.
    pub fn seek_to(&mut self, position_ms: u64) {
        let target = if self.state.duration_ms > 0 {
            position_ms.min(self.state.duration_ms)
        } else {
            position_ms
        };
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.seek_to(target) {
                warn!("[TRANSPORT] Seek failed: {}", e);
            }
        }
        self.state.position_ms = target;
        debug!("[TRANSPORT] Seek to {}ms", target);
        self.emit_state();
    }

    /// Seek to a fraction of the duration
    pub fn seek_to_percent(&mut self, fraction: f32) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = (self.state.duration_ms as f64 * fraction as f64).round() as u64;
        self.seek_to(target);
    }

    /// Skip ahead by `step_ms`, or the configured step
    pub fn skip_forward(&mut self, step_ms: Option<u64>) {
        self.refresh_position();
        let step = step_ms.unwrap_or(self.config.skip_step_ms);
        self.seek_to(self.state.position_ms.saturating_add(step));
    }

    pub fn skip_backward(&mut self, step_ms: Option<u64>) {
        self.refresh_position();
        let step = step_ms.unwrap_or(self.config.skip_step_ms);
        self.seek_to(self.state.position_ms.saturating_sub(step));
    }

    pub(super) fn refresh_position(&mut self) {
        if let Some(device) = self.device.as_ref() {
            if self.state.is_prepared {
                self.state.position_ms = device.current_position();
            }
        }
    }

    // ========================================================================
    // Playlist
    // ========================================================================

    /// Move to the next item. Wraps only with repeat All. Returns false at
    /// the end of the playlist.
    pub fn next(&mut self) -> bool {
        let wrap = self.state.repeat_mode == RepeatMode::All;
        match self.playlist.advance(wrap).cloned() {
            Some(item) => {
                self.emit_playlist();
                self.open_item(item);
                true
            }
            None => {
                debug!("[TRANSPORT] No next item");
                false
            }
        }
    }

    /// Restart the current item when past the restart threshold, otherwise
    /// move to the previous item
    pub fn previous(&mut self) -> bool {
        self.refresh_position();
        if self.state.position_ms > self.config.previous_restart_threshold_ms {
            self.seek_to(0);
            return true;
        }
        let wrap = self.state.repeat_mode == RepeatMode::All;
        match self.playlist.retreat(wrap).cloned() {
            Some(item) => {
                self.emit_playlist();
                self.open_item(item);
                true
            }
            None => {
                debug!("[TRANSPORT] No previous item");
                false
            }
        }
    }

    /// The main device played to its end
    pub(super) fn on_main_completed(&mut self) {
        if !self.transport.is_playing() {
            return;
        }
        debug!(
            "[TRANSPORT] Completed (repeat {:?})",
            self.state.repeat_mode
        );
        match self.state.repeat_mode {
            RepeatMode::One => {
                if let Some(device) = self.device.as_mut() {
                    let restarted = device.seek_to(0).and_then(|_| device.start());
                    if let Err(e) = restarted {
                        self.fail_session(e);
                        return;
                    }
                }
                self.state.position_ms = 0;
                self.apply_automation(0);
                self.emit_state();
            }
            RepeatMode::All => {
                self.next();
            }
            RepeatMode::Off => {
                if !self.playlist.is_last() {
                    self.next();
                } else {
                    self.transport.stop();
                    self.state.position_ms = 0;
                    self.sync_status();
                    self.emit_state();
                }
            }
        }
    }

    // ========================================================================
    // Preferences
    // ========================================================================

    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        self.state.volume = volume.clamp(0.0, 1.0);
        self.push_volume();
        self.emit_state();
    }

    /// Push the volume, scaled by the focus gain, to the main device
    pub(super) fn push_volume(&mut self) {
        let gain = self.state.volume * self.focus.gain();
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.set_volume(gain, gain) {
                debug!("[TRANSPORT] Volume not applied: {}", e);
            }
        }
    }

    /// Set the playback speed, clamped to 0.25..=4.0. Returns false when the
    /// device can't change speed; the previous speed is kept.
    pub fn set_speed(&mut self, speed: f32) -> bool {
        if !speed.is_finite() {
            return false;
        }
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.set_speed(speed) {
                debug!("[TRANSPORT] Speed {} not applied: {}", speed, e);
                return false;
            }
        }
        self.state.speed = speed;
        self.emit_state();
        true
    }

    fn push_speed(&mut self) {
        if (self.state.speed - 1.0).abs() < f32::EPSILON {
            return;
        }
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.set_speed(self.state.speed) {
                debug!("[TRANSPORT] Speed not supported, back to 1.0: {}", e);
                self.state.speed = 1.0;
            }
        }
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.state.repeat_mode = mode;
        self.emit_state();
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        let mode = self.state.repeat_mode.cycle();
        self.set_repeat_mode(mode);
        mode
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        let enabled = !self.state.shuffle_enabled;
        self.set_shuffle(enabled);
        enabled
    }

    /// Shuffle keeps the current item at its index; turning it off restores
    /// the original order
    pub fn set_shuffle(&mut self, enabled: bool) {
        self.state.shuffle_enabled = enabled;
        if enabled {
            if !self.playlist.is_empty() {
                self.playlist.shuffle(&mut self.rng);
            }
        } else {
            self.playlist.unshuffle();
        }
        self.emit_playlist();
        self.emit_state();
    }

    // ========================================================================
    // Modules
    // ========================================================================

    pub fn is_module_enabled(&self, module: PlayerModule) -> bool {
        self.modules.contains(&module)
    }

    pub fn enabled_modules(&self) -> &BTreeSet<PlayerModule> {
        &self.modules
    }

    /// Switch a module on or off. Core can't be disabled. Disabling a module
    /// drops what it owns.
    pub fn set_module_enabled(&mut self, module: PlayerModule, enabled: bool) -> bool {
        if module == PlayerModule::Core {
            return enabled;
        }
        if enabled {
            if !self.modules.insert(module) {
                return true;
            }
            debug!("Module {:?} enabled", module);
            match module {
                PlayerModule::Fx => {
                    let session = self.device.as_ref().and_then(|d| d.session_id());
                    if let Some(session) = session {
                        self.bind_fx(session);
                    }
                }
                PlayerModule::Equalizer => {
                    self.fx.set_eq_enabled(true);
                    self.emit(EngineEvent::FxStateChanged(self.fx.state().clone()));
                }
                PlayerModule::OutputRouting => self.apply_output_profile(),
                _ => {}
            }
        } else {
            if !self.modules.remove(&module) {
                return true;
            }
            debug!("Module {:?} disabled", module);
            match module {
                PlayerModule::Automation => self.automation.clear_all(),
                PlayerModule::Looping => {
                    self.looping.clear_all();
                    self.emit(EngineEvent::LoopChanged(None));
                }
                PlayerModule::MultiLayer => self.remove_all_layers(),
                PlayerModule::Fx => self.fx.release(),
                PlayerModule::Equalizer => {
                    self.fx.set_eq_enabled(false);
                    self.emit(EngineEvent::FxStateChanged(self.fx.state().clone()));
                }
                PlayerModule::Analysis => self.analysis = None,
                _ => {}
            }
        }
        true
    }

    pub fn enable_module(&mut self, module: PlayerModule) {
        self.set_module_enabled(module, true);
    }

    pub fn disable_module(&mut self, module: PlayerModule) {
        self.set_module_enabled(module, false);
    }

    /// Stop, remove every layer and release effects
    pub fn release(&mut self) {
        self.stop();
        self.remove_all_layers();
        self.fx.release();
        info!("Engine released");
    }
}

fn load_and_prepare(device: &mut dyn OutputDevice, uri: &str) -> Result<()> {
    device.load(uri)?;
    device.prepare()
}
