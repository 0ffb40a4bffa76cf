//! Layer commands
//!
//! Layers are independent of the main session: they have their own devices
//! and transport, and survive `stop()`. Every change publishes a fresh
//! [`EngineEvent::LayersChanged`] snapshot.

use tracing::{debug, warn};

use super::events::EngineEvent;
use super::player::PlaybackEngine;
use crate::config::PlayerModule;
use crate::device::output::DeviceTarget;
use crate::error::{MixdeckError, Result};
use crate::layers::{LayerId, LayerSnapshot};

impl PlaybackEngine {
    pub fn layers(&self) -> Vec<LayerSnapshot> {
        self.mixer.snapshots()
    }

    pub fn layer_count(&self) -> usize {
        self.mixer.len()
    }

    pub fn master_volume(&self) -> f32 {
        self.mixer.master_volume()
    }

    fn emit_layers(&self) {
        self.emit(EngineEvent::LayersChanged(self.mixer.snapshots()));
    }

    /// Publish the outcome of a layer operation
    fn layer_result<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.emit_layers();
                Some(value)
            }
            Err(e) => {
                warn!("[MIXER] {}", e);
                self.emit_error(&e);
                None
            }
        }
    }

    /// Create a layer with its own output device. `None` when the mixer is
    /// full or multi-layer playback is disabled.
    pub fn create_layer(&mut self, name: Option<&str>) -> Option<LayerId> {
        if !self.is_module_enabled(PlayerModule::MultiLayer) {
            debug!("[MIXER] Multi-layer module disabled");
            return None;
        }
        if self.mixer.is_full() {
            let err = MixdeckError::LayerLimitExceeded {
                max: self.mixer.max_layers(),
            };
            warn!("[MIXER] {}", err);
            self.emit_error(&err);
            return None;
        }

        let id = LayerId::new();
        self.next_token += 1;
        let token = self.next_token;
        let created = self
            .collab
            .devices
            .create(DeviceTarget::Layer(id), token, self.inputs.clone())
            .and_then(|device| {
                self.mixer
                    .add_layer(id, name.map(str::to_string), device, token)
            });
        self.layer_result(created)
    }

    /// Load a source; the layer becomes prepared when its device says so
    pub fn load_layer_media(&mut self, id: LayerId, uri: &str) -> bool {
        let result = self.mixer.load_media(id, uri);
        self.layer_result(result).is_some()
    }

    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let removed = self.mixer.remove_layer(id);
        if removed {
            self.emit_layers();
        }
        removed
    }

    pub fn remove_all_layers(&mut self) {
        if self.mixer.is_empty() {
            return;
        }
        self.mixer.remove_all();
        self.emit_layers();
    }

    pub fn set_layer_volume(&mut self, id: LayerId, volume: f32) -> bool {
        let result = self.mixer.set_layer_volume(id, volume);
        self.layer_result(result).is_some()
    }

    pub fn set_layer_pan(&mut self, id: LayerId, pan: f32) -> bool {
        let result = self.mixer.set_layer_pan(id, pan);
        self.layer_result(result).is_some()
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.mixer.set_master_volume(volume);
        self.emit_layers();
    }

    pub fn set_layer_muted(&mut self, id: LayerId, muted: bool) -> bool {
        let result = self.mixer.set_layer_muted(id, muted);
        self.layer_result(result).is_some()
    }

    /// Returns the new mute state
    pub fn toggle_layer_mute(&mut self, id: LayerId) -> Option<bool> {
        let result = self.mixer.toggle_layer_mute(id);
        self.layer_result(result)
    }

    pub fn set_layer_solo(&mut self, id: LayerId, solo: bool) -> bool {
        let result = self.mixer.set_layer_solo(id, solo);
        self.layer_result(result).is_some()
    }

    /// Returns the new solo state
    pub fn toggle_layer_solo(&mut self, id: LayerId) -> Option<bool> {
        let result = self.mixer.toggle_layer_solo(id);
        self.layer_result(result)
    }

    pub fn clear_all_solos(&mut self) {
        self.mixer.clear_all_solos();
        self.emit_layers();
    }

    pub fn mute_all_layers(&mut self) {
        self.mixer.mute_all();
        self.emit_layers();
    }

    pub fn unmute_all_layers(&mut self) {
        self.mixer.unmute_all();
        self.emit_layers();
    }

    pub fn set_layer_fx_enabled(&mut self, id: LayerId, enabled: bool) -> bool {
        let result = self.mixer.set_layer_fx_enabled(id, enabled);
        self.layer_result(result).is_some()
    }

    pub fn play_layer(&mut self, id: LayerId) -> bool {
        let result = self.mixer.play_layer(id);
        self.layer_result(result).is_some()
    }

    pub fn pause_layer(&mut self, id: LayerId) -> bool {
        let result = self.mixer.pause_layer(id);
        self.layer_result(result).is_some()
    }

    pub fn seek_layer(&mut self, id: LayerId, position_ms: u64) -> bool {
        let result = self.mixer.seek_layer(id, position_ms);
        self.layer_result(result).is_some()
    }

    /// Start every prepared, non-muted layer; returns how many started
    pub fn play_all_layers(&mut self) -> usize {
        let started = self.mixer.play_all();
        debug!("[MIXER] Started {} of {} layers", started, self.mixer.len());
        self.emit_layers();
        started
    }

    pub fn pause_all_layers(&mut self) {
        self.mixer.pause_all();
        self.emit_layers();
    }

    pub fn seek_all_layers(&mut self, position_ms: u64) {
        self.mixer.seek_all(position_ms);
        self.emit_layers();
    }

    /// A layer device reported prepared
    pub(super) fn on_layer_prepared(&mut self, id: LayerId, token: u64) {
        if self.mixer.mark_prepared(id, token) {
            self.emit_layers();
        } else {
            debug!("[MIXER] Stale prepared event for {}", id);
        }
    }

    /// A layer device failed. Other layers and the main session go on.
    pub(super) fn on_layer_failed(&mut self, id: LayerId, token: u64, err: MixdeckError) {
        if self.mixer.mark_failed(id, token) {
            warn!("[MIXER] Layer {} failed: {}", id, err);
            self.emit_error(&err);
            self.emit_layers();
        }
    }
}
