//! Layer Mixer
//!
//! Up to [`MAX_LAYERS`](super::MAX_LAYERS) independent layers, each with its
//! own output device, volume, pan, mute and solo. Device gains are derived
//! from the stored values and pushed whenever anything that affects them
//! changes:
//! - a muted layer is silent
//! - while any layer is soloed, every non-soloed layer is silent
//! - otherwise gains follow the pan law on `volume * master_volume`
//!
//! Mute and solo never modify the stored volume or pan.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::gain::pan_gains;
use super::LayerId;
use crate::device::output::OutputDevice;
use crate::error::{MixdeckError, Result};

/// One mixer layer
pub struct AudioLayer {
    pub id: LayerId,
    pub name: String,
    device: Box<dyn OutputDevice>,
    token: u64,
    uri: Option<String>,
    volume: f32,
    pan: f32,
    is_muted: bool,
    is_solo: bool,
    is_prepared: bool,
    fx_enabled: bool,
}

impl AudioLayer {
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn is_solo(&self) -> bool {
        self.is_solo
    }

    pub fn is_prepared(&self) -> bool {
        self.is_prepared
    }

    pub fn fx_enabled(&self) -> bool {
        self.fx_enabled
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Read-only view of a layer for observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub id: LayerId,
    pub name: String,
    pub uri: Option<String>,
    pub volume: f32,
    pub pan: f32,
    pub is_muted: bool,
    pub is_solo: bool,
    pub is_prepared: bool,
    pub fx_enabled: bool,
    /// Gains currently applied to the device
    pub gains: (f32, f32),
}

pub struct LayerMixer {
    layers: Vec<AudioLayer>,
    max_layers: usize,
    master_volume: f32,
}

impl LayerMixer {
    pub fn new(max_layers: usize) -> Self {
        Self {
            layers: Vec::new(),
            max_layers,
            master_volume: 1.0,
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.layers.len() >= self.max_layers
    }

    pub fn max_layers(&self) -> usize {
        self.max_layers
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn layer(&self, id: LayerId) -> Option<&AudioLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut AudioLayer> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| MixdeckError::LayerNotFound { id: id.to_string() })
    }

    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    /// Name given to the next layer created without one
    pub fn default_name(&self) -> String {
        format!("Layer {}", self.layers.len() + 1)
    }

    /// Add a layer backed by `device`. Fails when the mixer is full.
    pub fn add_layer(
        &mut self,
        id: LayerId,
        name: Option<String>,
        device: Box<dyn OutputDevice>,
        token: u64,
    ) -> Result<LayerId> {
        if self.is_full() {
            return Err(MixdeckError::LayerLimitExceeded {
                max: self.max_layers,
            });
        }
        let name = name.unwrap_or_else(|| self.default_name());
        debug!("[MIXER] Created layer '{}' ({})", name, id);
        self.layers.push(AudioLayer {
            id,
            name,
            device,
            token,
            uri: None,
            volume: 1.0,
            pan: 0.0,
            is_muted: false,
            is_solo: false,
            is_prepared: false,
            fx_enabled: true,
        });
        self.refresh_gains();
        Ok(id)
    }

    /// Release the layer's device and drop it
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(idx) = self.layers.iter().position(|l| l.id == id) else {
            return false;
        };
        let mut layer = self.layers.remove(idx);
        layer.device.release();
        debug!("[MIXER] Removed layer '{}'", layer.name);
        // Removing the last soloed layer un-silences the rest
        self.refresh_gains();
        true
    }

    pub fn remove_all(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.device.release();
        }
        self.layers.clear();
    }

    // ========================================================================
    // Media
    // ========================================================================

    /// Load a source into a layer and start asynchronous preparation
    pub fn load_media(&mut self, id: LayerId, uri: &str) -> Result<()> {
        let layer = self.layer_mut(id)?;
        layer.is_prepared = false;
        layer.uri = Some(uri.to_string());
        layer.device.load(uri)?;
        layer.device.prepare()
    }

    /// Mark a layer prepared if `token` matches its device
    pub fn mark_prepared(&mut self, id: LayerId, token: u64) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id && l.token == token) {
            Some(layer) => {
                layer.is_prepared = true;
                debug!("[MIXER] Layer '{}' prepared", layer.name);
                true
            }
            None => false,
        }
    }

    /// Mark a layer unprepared after a device error
    pub fn mark_failed(&mut self, id: LayerId, token: u64) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id && l.token == token) {
            Some(layer) => {
                layer.is_prepared = false;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Levels
    // ========================================================================

    pub fn set_layer_volume(&mut self, id: LayerId, volume: f32) -> Result<()> {
        let layer = self.layer_mut(id)?;
        layer.volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        self.refresh_gains();
        Ok(())
    }

    pub fn set_layer_pan(&mut self, id: LayerId, pan: f32) -> Result<()> {
        let layer = self.layer_mut(id)?;
        layer.pan = if pan.is_finite() { pan.clamp(-1.0, 1.0) } else { 0.0 };
        self.refresh_gains();
        Ok(())
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        self.refresh_gains();
    }

    pub fn set_layer_muted(&mut self, id: LayerId, muted: bool) -> Result<()> {
        self.layer_mut(id)?.is_muted = muted;
        self.refresh_gains();
        Ok(())
    }

    pub fn toggle_layer_mute(&mut self, id: LayerId) -> Result<bool> {
        let layer = self.layer_mut(id)?;
        layer.is_muted = !layer.is_muted;
        let muted = layer.is_muted;
        self.refresh_gains();
        Ok(muted)
    }

    pub fn set_layer_solo(&mut self, id: LayerId, solo: bool) -> Result<()> {
        self.layer_mut(id)?.is_solo = solo;
        self.refresh_gains();
        Ok(())
    }

    pub fn toggle_layer_solo(&mut self, id: LayerId) -> Result<bool> {
        let layer = self.layer_mut(id)?;
        layer.is_solo = !layer.is_solo;
        let solo = layer.is_solo;
        self.refresh_gains();
        Ok(solo)
    }

    pub fn clear_all_solos(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.is_solo = false;
        }
        self.refresh_gains();
    }

    pub fn mute_all(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.is_muted = true;
        }
        self.refresh_gains();
    }

    pub fn unmute_all(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.is_muted = false;
        }
        self.refresh_gains();
    }

    pub fn set_layer_fx_enabled(&mut self, id: LayerId, enabled: bool) -> Result<()> {
        self.layer_mut(id)?.fx_enabled = enabled;
        Ok(())
    }

    pub fn any_solo(&self) -> bool {
        self.layers.iter().any(|l| l.is_solo)
    }

    /// Gains a layer should currently have
    pub fn effective_gains(&self, id: LayerId) -> Option<(f32, f32)> {
        let any_solo = self.any_solo();
        self.layer(id).map(|l| self.gains_for(l, any_solo))
    }

    fn gains_for(&self, layer: &AudioLayer, any_solo: bool) -> (f32, f32) {
        if layer.is_muted || (any_solo && !layer.is_solo) {
            return (0.0, 0.0);
        }
        pan_gains(layer.volume * self.master_volume, layer.pan)
    }

    fn refresh_gains(&mut self) {
        let any_solo = self.any_solo();
        let master = self.master_volume;
        for layer in self.layers.iter_mut() {
            let (l, r) = if layer.is_muted || (any_solo && !layer.is_solo) {
                (0.0, 0.0)
            } else {
                pan_gains(layer.volume * master, layer.pan)
            };
            if let Err(e) = layer.device.set_volume(l, r) {
                warn!("[MIXER] Could not set gains on '{}': {}", layer.name, e);
            }
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub fn play_layer(&mut self, id: LayerId) -> Result<()> {
        let layer = self.layer_mut(id)?;
        if !layer.is_prepared {
            debug!("[MIXER] Layer '{}' not prepared, ignoring play", layer.name);
            return Ok(());
        }
        layer.device.start()
    }

    pub fn pause_layer(&mut self, id: LayerId) -> Result<()> {
        let layer = self.layer_mut(id)?;
        if layer.device.is_playing() {
            layer.device.pause()?;
        }
        Ok(())
    }

    pub fn seek_layer(&mut self, id: LayerId, position_ms: u64) -> Result<()> {
        self.layer_mut(id)?.device.seek_to(position_ms)
    }

    /// Start every prepared, non-muted layer. Returns how many started.
    pub fn play_all(&mut self) -> usize {
        let mut started = 0;
        for layer in self.layers.iter_mut() {
            if !layer.is_prepared || layer.is_muted {
                continue;
            }
            match layer.device.start() {
                Ok(()) => started += 1,
                Err(e) => warn!("[MIXER] Layer '{}' failed to start: {}", layer.name, e),
            }
        }
        started
    }

    pub fn pause_all(&mut self) {
        for layer in self.layers.iter_mut() {
            if !layer.device.is_playing() {
                continue;
            }
            if let Err(e) = layer.device.pause() {
                warn!("[MIXER] Layer '{}' failed to pause: {}", layer.name, e);
            }
        }
    }

    pub fn seek_all(&mut self, position_ms: u64) {
        for layer in self.layers.iter_mut() {
            if !layer.is_prepared {
                continue;
            }
            if let Err(e) = layer.device.seek_to(position_ms) {
                warn!("[MIXER] Layer '{}' failed to seek: {}", layer.name, e);
            }
        }
    }

    pub fn stop_all(&mut self) {
        for layer in self.layers.iter_mut() {
            if let Err(e) = layer.device.stop() {
                warn!("[MIXER] Layer '{}' failed to stop: {}", layer.name, e);
            }
            layer.is_prepared = false;
        }
    }

    pub fn snapshots(&self) -> Vec<LayerSnapshot> {
        let any_solo = self.any_solo();
        self.layers
            .iter()
            .map(|l| LayerSnapshot {
                id: l.id,
                name: l.name.clone(),
                uri: l.uri.clone(),
                volume: l.volume,
                pan: l.pan,
                is_muted: l.is_muted,
                is_solo: l.is_solo,
                is_prepared: l.is_prepared,
                fx_enabled: l.fx_enabled,
                gains: self.gains_for(l, any_solo),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::output::{DeviceFactory, DeviceTarget};
    use crate::device::sim::SimBackend;
    use crate::engine::input;
    use approx::assert_relative_eq;

    struct Rig {
        backend: SimBackend,
        mixer: LayerMixer,
        sink: crate::engine::input::InputSink,
        _rx: crate::engine::input::InputReceiver,
        factory: Box<dyn DeviceFactory>,
    }

    impl Rig {
        fn new() -> Self {
            let backend = SimBackend::new();
            let factory = backend.collaborators().devices;
            let (sink, rx) = input::channel();
            Self {
                backend,
                mixer: LayerMixer::new(8),
                sink,
                _rx: rx,
                factory,
            }
        }

        fn add(&mut self, name: Option<&str>) -> Result<LayerId> {
            let id = LayerId::new();
            let device = self
                .factory
                .create(DeviceTarget::Layer(id), 1, self.sink.clone())?;
            self.mixer.add_layer(id, name.map(String::from), device, 1)
        }

        fn device_volume(&self, id: LayerId) -> (f32, f32) {
            self.backend.layer_device(id).unwrap().volume
        }
    }

    #[test]
    fn test_default_names() {
        let mut rig = Rig::new();
        let a = rig.add(None).unwrap();
        let b = rig.add(Some("Drums")).unwrap();
        let c = rig.add(None).unwrap();
        assert_eq!(rig.mixer.layer(a).unwrap().name, "Layer 1");
        assert_eq!(rig.mixer.layer(b).unwrap().name, "Drums");
        assert_eq!(rig.mixer.layer(c).unwrap().name, "Layer 3");
    }

    #[test]
    fn test_layer_limit() {
        let mut rig = Rig::new();
        for _ in 0..8 {
            rig.add(None).unwrap();
        }
        assert!(rig.mixer.is_full());
        let err = rig.add(None).unwrap_err();
        assert!(matches!(err, MixdeckError::LayerLimitExceeded { max: 8 }));
        assert_eq!(rig.mixer.len(), 8);
    }

    #[test]
    fn test_pan_pushed_to_device() {
        let mut rig = Rig::new();
        let id = rig.add(None).unwrap();
        rig.mixer.set_layer_volume(id, 0.5).unwrap();
        rig.mixer.set_layer_pan(id, 1.0).unwrap();
        let (l, r) = rig.device_volume(id);
        assert_relative_eq!(l, 0.25);
        assert_relative_eq!(r, 0.75);
    }

    #[test]
    fn test_master_volume_scales_layers() {
        let mut rig = Rig::new();
        let id = rig.add(None).unwrap();
        rig.mixer.set_layer_volume(id, 0.8).unwrap();
        rig.mixer.set_master_volume(0.5);
        let (l, r) = rig.device_volume(id);
        assert_relative_eq!(l, 0.4);
        assert_relative_eq!(r, 0.4);
    }

    #[test]
    fn test_mute_keeps_volume() {
        let mut rig = Rig::new();
        let id = rig.add(None).unwrap();
        rig.mixer.set_layer_volume(id, 0.7).unwrap();
        assert!(rig.mixer.toggle_layer_mute(id).unwrap());
        assert_eq!(rig.device_volume(id), (0.0, 0.0));
        assert_relative_eq!(rig.mixer.layer(id).unwrap().volume(), 0.7);

        rig.mixer.toggle_layer_mute(id).unwrap();
        assert_eq!(rig.device_volume(id), (0.7, 0.7));
    }

    #[test]
    fn test_solo_silences_others_and_unsolo_restores() {
        let mut rig = Rig::new();
        let a = rig.add(None).unwrap();
        let b = rig.add(None).unwrap();
        let c = rig.add(None).unwrap();
        rig.mixer.set_layer_volume(b, 0.6).unwrap();
        rig.mixer.set_layer_muted(c, true).unwrap();

        rig.mixer.set_layer_solo(a, true).unwrap();
        assert_eq!(rig.device_volume(a), (1.0, 1.0));
        assert_eq!(rig.device_volume(b), (0.0, 0.0));
        assert_eq!(rig.device_volume(c), (0.0, 0.0));
        assert_relative_eq!(rig.mixer.layer(b).unwrap().volume(), 0.6);

        rig.mixer.set_layer_solo(a, false).unwrap();
        assert_eq!(rig.device_volume(b), (0.6, 0.6));
        // Muted layers stay silent after the solo ends
        assert_eq!(rig.device_volume(c), (0.0, 0.0));
    }

    #[test]
    fn test_multiple_solos() {
        let mut rig = Rig::new();
        let a = rig.add(None).unwrap();
        let b = rig.add(None).unwrap();
        let c = rig.add(None).unwrap();
        rig.mixer.set_layer_solo(a, true).unwrap();
        rig.mixer.set_layer_solo(b, true).unwrap();
        assert_eq!(rig.device_volume(a), (1.0, 1.0));
        assert_eq!(rig.device_volume(b), (1.0, 1.0));
        assert_eq!(rig.device_volume(c), (0.0, 0.0));

        rig.mixer.set_layer_solo(a, false).unwrap();
        assert_eq!(rig.device_volume(c), (0.0, 0.0));
        rig.mixer.clear_all_solos();
        assert_eq!(rig.device_volume(c), (1.0, 1.0));
    }

    #[test]
    fn test_removing_soloed_layer_restores_others() {
        let mut rig = Rig::new();
        let a = rig.add(None).unwrap();
        let b = rig.add(None).unwrap();
        rig.mixer.set_layer_solo(a, true).unwrap();
        assert!(rig.mixer.remove_layer(a));
        assert_eq!(rig.device_volume(b), (1.0, 1.0));
        assert!(rig.backend.layer_device(a).unwrap().released);
    }

    #[test]
    fn test_play_all_skips_unprepared_and_muted() {
        let mut rig = Rig::new();
        let a = rig.add(None).unwrap();
        let b = rig.add(None).unwrap();
        let c = rig.add(None).unwrap();
        for id in [a, b, c] {
            rig.mixer.load_media(id, "/loops/beat.wav").unwrap();
        }
        rig.mixer.mark_prepared(a, 1);
        rig.mixer.mark_prepared(b, 1);
        rig.mixer.set_layer_muted(b, true).unwrap();

        assert_eq!(rig.mixer.play_all(), 1);
        assert!(rig.backend.layer_device(a).unwrap().playing);
        assert!(!rig.backend.layer_device(b).unwrap().playing);
        assert!(!rig.backend.layer_device(c).unwrap().playing);
    }

    #[test]
    fn test_stale_token_ignored() {
        let mut rig = Rig::new();
        let a = rig.add(None).unwrap();
        assert!(!rig.mixer.mark_prepared(a, 99));
        assert!(!rig.mixer.layer(a).unwrap().is_prepared());
    }

    #[test]
    fn test_unknown_layer() {
        let mut rig = Rig::new();
        let err = rig.mixer.set_layer_pan(LayerId::new(), 0.5).unwrap_err();
        assert_eq!(err.error_code(), "LAYER_NOT_FOUND");
    }
}
