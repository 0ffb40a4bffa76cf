//! Simulated collaborators
//!
//! These don't render audio but keep a shared record of every call and let
//! the caller drive time, completions, failures, focus and output changes.
//! Used by the test suite and by the CLI `simulate` command.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::analysis::{AnalysisProvider, AudioAnalysis};
use super::focus_broker::{FocusBroker, FocusChange, FocusRequestResult};
use super::fx_control::{FxControl, FxFactory};
use super::output::{DeviceEvent, DeviceEventKind, DeviceFactory, DeviceTarget, OutputDevice};
use super::store::MemoryConfigStore;
use super::topology::OutputTopology;
use super::Collaborators;
use crate::engine::input::{EngineInput, InputSink};
use crate::error::{MixdeckError, Result};
use crate::fx::output::OutputType;
use crate::fx::state::{ReverbPreset, Strength};
use crate::layers::LayerId;
use crate::media::MediaItem;

/// Default length reported for every simulated source
pub const SIM_DEFAULT_DURATION_MS: u64 = 180_000;

/// Recorded state of one simulated output device
#[derive(Debug, Clone, PartialEq)]
pub struct SimDeviceState {
    pub target: DeviceTarget,
    pub token: u64,
    pub uri: Option<String>,
    pub prepared: bool,
    pub playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub volume: (f32, f32),
    pub speed: f32,
    pub seeks: Vec<u64>,
    pub starts: usize,
    pub pauses: usize,
    pub stops: usize,
    pub released: bool,
    pub session_id: Option<u32>,
}

/// Effect features that can be marked unsupported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimFxFeature {
    Equalizer,
    BassBoost,
    Virtualizer,
    Loudness,
    Reverb,
}

/// Recorded state of the simulated effect surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimFxState {
    pub session_id: Option<u32>,
    pub eq_enabled: bool,
    pub eq_band_levels: Vec<i16>,
    pub bass_boost: (bool, u16),
    pub virtualizer: (bool, u16),
    pub loudness: (bool, i32),
    pub reverb: (bool, u8),
    pub binds: usize,
    pub released: usize,
}

struct DeviceSlot {
    state: SimDeviceState,
    sink: InputSink,
}

struct World {
    devices: Vec<DeviceSlot>,
    auto_prepare: bool,
    duration_ms: u64,
    next_session: u32,
    failing_uris: HashSet<String>,
    speed_supported: bool,
    fx: SimFxState,
    fx_unsupported: HashSet<SimFxFeature>,
    eq_bands: usize,
    grant_focus: bool,
    focus_requests: usize,
    focus_abandons: usize,
    focus_listener: Option<InputSink>,
    output: OutputType,
    in_car: bool,
    topology_listener: Option<InputSink>,
    analysis: Option<AudioAnalysis>,
    analysis_requests: usize,
}

impl World {
    fn latest(&mut self, target: DeviceTarget) -> Option<&mut DeviceSlot> {
        self.devices
            .iter_mut()
            .rev()
            .find(|d| d.state.target == target && !d.state.released)
    }

    fn finish_prepare(&mut self, index: usize) {
        let session = self.next_session;
        self.next_session += 1;
        let duration = self.duration_ms;
        let slot = &mut self.devices[index];
        slot.state.prepared = true;
        slot.state.duration_ms = duration;
        slot.state.session_id = Some(session);
        slot.sink.send(EngineInput::Device(DeviceEvent {
            target: slot.state.target,
            token: slot.state.token,
            kind: DeviceEventKind::Prepared {
                duration_ms: duration,
                session_id: session,
            },
        }));
    }
}

/// Shared handle to the simulated world
#[derive(Clone)]
pub struct SimBackend {
    world: Arc<Mutex<World>>,
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBackend {
    pub fn new() -> Self {
        Self {
            world: Arc::new(Mutex::new(World {
                devices: Vec::new(),
                auto_prepare: true,
                duration_ms: SIM_DEFAULT_DURATION_MS,
                next_session: 1,
                failing_uris: HashSet::new(),
                speed_supported: true,
                fx: SimFxState::default(),
                fx_unsupported: HashSet::new(),
                eq_bands: 5,
                grant_focus: true,
                focus_requests: 0,
                focus_abandons: 0,
                focus_listener: None,
                output: OutputType::Speaker,
                in_car: false,
                topology_listener: None,
                analysis: None,
                analysis_requests: 0,
            })),
        }
    }

    fn world(&self) -> MutexGuard<'_, World> {
        lock(&self.world)
    }

    /// Collaborator set backed by this world and a fresh in-memory store
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            devices: Box::new(SimDeviceFactory {
                world: self.world.clone(),
            }),
            fx: self.fx_factory(),
            focus: Box::new(SimFocusBroker {
                world: self.world.clone(),
            }),
            topology: Box::new(SimTopology {
                world: self.world.clone(),
            }),
            analysis: Box::new(SimAnalysis {
                world: self.world.clone(),
            }),
            store: Box::new(MemoryConfigStore::new()),
        }
    }

    pub fn fx_factory(&self) -> Box<dyn FxFactory> {
        Box::new(SimFxFactory {
            world: self.world.clone(),
        })
    }

    // ========================================================================
    // Behaviour switches
    // ========================================================================

    /// When off, devices stay unprepared until `finish_prepare`
    pub fn set_auto_prepare(&self, auto: bool) {
        self.world().auto_prepare = auto;
    }

    pub fn set_duration(&self, duration_ms: u64) {
        self.world().duration_ms = duration_ms;
    }

    /// Make `load` fail for a locator
    pub fn fail_uri(&self, uri: &str) {
        self.world().failing_uris.insert(uri.to_string());
    }

    pub fn set_speed_supported(&self, supported: bool) {
        self.world().speed_supported = supported;
    }

    pub fn set_focus_granted(&self, granted: bool) {
        self.world().grant_focus = granted;
    }

    pub fn set_analysis(&self, analysis: AudioAnalysis) {
        self.world().analysis = Some(analysis);
    }

    pub fn mark_fx_unsupported(&self, feature: SimFxFeature) {
        self.world().fx_unsupported.insert(feature);
    }

    pub fn set_in_car(&self, in_car: bool) {
        self.world().in_car = in_car;
    }

    // ========================================================================
    // Driving the world
    // ========================================================================

    /// Advance every playing device by `ms`, stopping at its duration
    pub fn advance(&self, ms: u64) {
        for slot in self.world().devices.iter_mut() {
            let s = &mut slot.state;
            if s.playing && !s.released {
                s.position_ms = (s.position_ms + ms).min(s.duration_ms);
            }
        }
    }

    pub fn set_position(&self, target: DeviceTarget, position_ms: u64) {
        if let Some(slot) = self.world().latest(target) {
            slot.state.position_ms = position_ms;
        }
    }

    /// Deliver `Prepared` for the newest device of `target`
    pub fn finish_prepare(&self, target: DeviceTarget) {
        let mut world = self.world();
        let index = world
            .devices
            .iter()
            .rposition(|d| d.state.target == target && !d.state.released);
        if let Some(index) = index {
            world.finish_prepare(index);
        }
    }

    /// Play the newest device of `target` to its end
    pub fn complete(&self, target: DeviceTarget) {
        if let Some(slot) = self.world().latest(target) {
            slot.state.playing = false;
            slot.state.position_ms = slot.state.duration_ms;
            slot.sink.send(EngineInput::Device(DeviceEvent {
                target,
                token: slot.state.token,
                kind: DeviceEventKind::Completed,
            }));
        }
    }

    pub fn fail(&self, target: DeviceTarget, code: i32) {
        if let Some(slot) = self.world().latest(target) {
            slot.state.playing = false;
            slot.sink.send(EngineInput::Device(DeviceEvent {
                target,
                token: slot.state.token,
                kind: DeviceEventKind::Error {
                    code,
                    message: format!("simulated failure {}", code),
                },
            }));
        }
    }

    /// Push a focus change to whoever holds focus. False if nobody asked.
    pub fn focus_change(&self, change: FocusChange) -> bool {
        match &self.world().focus_listener {
            Some(sink) => sink.send(EngineInput::Focus(change)),
            None => false,
        }
    }

    pub fn change_output(&self, output: OutputType) {
        let mut world = self.world();
        world.output = output;
        if let Some(sink) = &world.topology_listener {
            sink.send(EngineInput::OutputChanged(output));
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn devices(&self) -> Vec<SimDeviceState> {
        self.world().devices.iter().map(|d| d.state.clone()).collect()
    }

    /// Newest main-session device, released or not
    pub fn main_device(&self) -> Option<SimDeviceState> {
        self.device_for(DeviceTarget::Main)
    }

    pub fn layer_device(&self, id: LayerId) -> Option<SimDeviceState> {
        self.device_for(DeviceTarget::Layer(id))
    }

    fn device_for(&self, target: DeviceTarget) -> Option<SimDeviceState> {
        self.world()
            .devices
            .iter()
            .rev()
            .find(|d| d.state.target == target)
            .map(|d| d.state.clone())
    }

    pub fn fx_state(&self) -> SimFxState {
        self.world().fx.clone()
    }

    pub fn focus_requests(&self) -> usize {
        self.world().focus_requests
    }

    pub fn focus_abandons(&self) -> usize {
        self.world().focus_abandons
    }

    pub fn analysis_requests(&self) -> usize {
        self.world().analysis_requests
    }
}

fn lock(world: &Arc<Mutex<World>>) -> MutexGuard<'_, World> {
    world.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Output devices
// ============================================================================

struct SimDeviceFactory {
    world: Arc<Mutex<World>>,
}

impl DeviceFactory for SimDeviceFactory {
    fn create(
        &mut self,
        target: DeviceTarget,
        token: u64,
        events: InputSink,
    ) -> Result<Box<dyn OutputDevice>> {
        let mut world = lock(&self.world);
        world.devices.push(DeviceSlot {
            state: SimDeviceState {
                target,
                token,
                uri: None,
                prepared: false,
                playing: false,
                position_ms: 0,
                duration_ms: 0,
                volume: (1.0, 1.0),
                speed: 1.0,
                seeks: Vec::new(),
                starts: 0,
                pauses: 0,
                stops: 0,
                released: false,
                session_id: None,
            },
            sink: events,
        });
        Ok(Box::new(SimDevice {
            world: self.world.clone(),
            index: world.devices.len() - 1,
        }))
    }
}

struct SimDevice {
    world: Arc<Mutex<World>>,
    index: usize,
}

impl SimDevice {
    fn with<R>(&self, f: impl FnOnce(&mut SimDeviceState) -> R) -> R {
        let mut world = lock(&self.world);
        f(&mut world.devices[self.index].state)
    }
}

impl OutputDevice for SimDevice {
    fn load(&mut self, uri: &str) -> Result<()> {
        let mut world = lock(&self.world);
        if world.failing_uris.contains(uri) {
            return Err(MixdeckError::playback(1, format!("cannot open {}", uri)));
        }
        world.devices[self.index].state.uri = Some(uri.to_string());
        Ok(())
    }

    fn prepare(&mut self) -> Result<()> {
        let mut world = lock(&self.world);
        if world.devices[self.index].state.uri.is_none() {
            return Err(MixdeckError::playback(-38, "prepare without source"));
        }
        if world.auto_prepare {
            world.finish_prepare(self.index);
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.with(|s| {
            if !s.prepared {
                return Err(MixdeckError::playback(-38, "start before prepare"));
            }
            s.playing = true;
            s.starts += 1;
            Ok(())
        })
    }

    fn pause(&mut self) -> Result<()> {
        self.with(|s| {
            s.playing = false;
            s.pauses += 1;
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.with(|s| {
            s.playing = false;
            s.prepared = false;
            s.stops += 1;
        });
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.with(|s| {
            s.position_ms = if s.duration_ms > 0 {
                position_ms.min(s.duration_ms)
            } else {
                position_ms
            };
            s.seeks.push(position_ms);
        });
        Ok(())
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        self.with(|s| s.volume = (left, right));
        Ok(())
    }

    fn set_speed(&mut self, speed: f32) -> Result<()> {
        let mut world = lock(&self.world);
        if !world.speed_supported {
            return Err(MixdeckError::unsupported("playback speed"));
        }
        world.devices[self.index].state.speed = speed;
        Ok(())
    }

    fn current_position(&self) -> u64 {
        self.with(|s| s.position_ms)
    }

    fn is_playing(&self) -> bool {
        self.with(|s| s.playing)
    }

    fn session_id(&self) -> Option<u32> {
        self.with(|s| s.session_id)
    }

    fn release(&mut self) {
        self.with(|s| {
            s.released = true;
            s.playing = false;
        });
    }
}

// ============================================================================
// Effects
// ============================================================================

struct SimFxFactory {
    world: Arc<Mutex<World>>,
}

impl FxFactory for SimFxFactory {
    fn bind(&mut self, session_id: u32) -> Result<Box<dyn FxControl>> {
        let mut world = lock(&self.world);
        let bands = world.eq_bands;
        world.fx.session_id = Some(session_id);
        world.fx.binds += 1;
        world.fx.eq_band_levels.resize(bands, 0);
        Ok(Box::new(SimFx {
            world: self.world.clone(),
        }))
    }
}

struct SimFx {
    world: Arc<Mutex<World>>,
}

impl SimFx {
    fn apply(&self, feature: SimFxFeature, f: impl FnOnce(&mut SimFxState)) -> Result<()> {
        let mut world = lock(&self.world);
        if world.fx_unsupported.contains(&feature) {
            return Err(MixdeckError::unsupported(format!("{:?}", feature)));
        }
        f(&mut world.fx);
        Ok(())
    }
}

impl FxControl for SimFx {
    fn eq_band_count(&self) -> usize {
        lock(&self.world).eq_bands
    }

    fn set_eq_enabled(&mut self, enabled: bool) -> Result<()> {
        self.apply(SimFxFeature::Equalizer, |fx| fx.eq_enabled = enabled)
    }

    fn set_eq_band_level(&mut self, band: usize, level_mb: i16) -> Result<()> {
        self.apply(SimFxFeature::Equalizer, |fx| {
            if let Some(level) = fx.eq_band_levels.get_mut(band) {
                *level = level_mb;
            }
        })
    }

    fn set_bass_boost(&mut self, enabled: bool, strength: Strength) -> Result<()> {
        self.apply(SimFxFeature::BassBoost, |fx| {
            fx.bass_boost = (enabled, strength.permille())
        })
    }

    fn set_virtualizer(&mut self, enabled: bool, strength: Strength) -> Result<()> {
        self.apply(SimFxFeature::Virtualizer, |fx| {
            fx.virtualizer = (enabled, strength.permille())
        })
    }

    fn set_loudness(&mut self, enabled: bool, gain_mb: i32) -> Result<()> {
        self.apply(SimFxFeature::Loudness, |fx| fx.loudness = (enabled, gain_mb))
    }

    fn set_reverb(&mut self, enabled: bool, preset: ReverbPreset) -> Result<()> {
        self.apply(SimFxFeature::Reverb, |fx| fx.reverb = (enabled, preset.index()))
    }

    fn release(&mut self) {
        let mut world = lock(&self.world);
        world.fx.released += 1;
        world.fx.session_id = None;
    }
}

// ============================================================================
// Focus, topology, analysis
// ============================================================================

struct SimFocusBroker {
    world: Arc<Mutex<World>>,
}

impl FocusBroker for SimFocusBroker {
    fn request(&mut self, listener: InputSink) -> FocusRequestResult {
        let mut world = lock(&self.world);
        world.focus_requests += 1;
        if world.grant_focus {
            world.focus_listener = Some(listener);
            FocusRequestResult::Granted
        } else {
            FocusRequestResult::Denied
        }
    }

    fn abandon(&mut self) {
        let mut world = lock(&self.world);
        world.focus_abandons += 1;
        world.focus_listener = None;
    }
}

struct SimTopology {
    world: Arc<Mutex<World>>,
}

impl OutputTopology for SimTopology {
    fn current(&self) -> OutputType {
        lock(&self.world).output
    }

    fn is_car(&self) -> bool {
        lock(&self.world).in_car
    }

    fn watch(&mut self, listener: InputSink) {
        lock(&self.world).topology_listener = Some(listener);
    }
}

struct SimAnalysis {
    world: Arc<Mutex<World>>,
}

impl AnalysisProvider for SimAnalysis {
    fn analyze(&mut self, _item: &MediaItem, _duration_ms: u64, token: u64, reply: InputSink) {
        let mut world = lock(&self.world);
        world.analysis_requests += 1;
        if let Some(analysis) = world.analysis.clone() {
            reply.send(EngineInput::AnalysisReady { token, analysis });
        }
    }
}
