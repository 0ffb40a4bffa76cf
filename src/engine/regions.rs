//! Loop regions, bookmarks, jump markers and analysis-driven navigation

use tracing::{debug, warn};
use uuid::Uuid;

use super::events::EngineEvent;
use super::player::PlaybackEngine;
use crate::config::PlayerModule;
use crate::device::analysis::AudioAnalysis;
use crate::looping::{detect_markers, Bookmark, JumpMarker, LoopRegion};

impl PlaybackEngine {
    fn looping_enabled(&self) -> bool {
        let enabled = self.is_module_enabled(PlayerModule::Looping);
        if !enabled {
            debug!("[LOOP] Looping module disabled");
        }
        enabled
    }

    fn emit_loop(&self) {
        self.emit(EngineEvent::LoopChanged(self.looping.region().copied()));
    }

    /// Publish a region change and report whether it happened
    fn loop_changed(&self, changed: bool) -> bool {
        if changed {
            self.emit_loop();
        }
        changed
    }

    fn tempo(&self) -> Option<f32> {
        self.analysis
            .as_ref()
            .filter(|a| a.has_tempo())
            .map(|a| a.bpm)
    }

    // ========================================================================
    // Loop region
    // ========================================================================

    pub fn loop_region(&self) -> Option<&LoopRegion> {
        self.looping.region()
    }

    pub fn is_looping(&self) -> bool {
        self.looping.is_looping()
    }

    /// Loop `start_ms..end_ms`. Ignored unless `end_ms > start_ms`.
    pub fn set_loop_region(&mut self, start_ms: u64, end_ms: u64) -> bool {
        if !self.looping_enabled() {
            return false;
        }
        let changed = self
            .looping
            .set_region(start_ms, end_ms, self.state.duration_ms);
        self.loop_changed(changed)
    }

    /// Loop `beats` beats from the current position. Needs a known tempo.
    pub fn set_loop_by_beats(&mut self, beats: u32) -> bool {
        if !self.looping_enabled() {
            return false;
        }
        let Some(bpm) = self.tempo() else {
            debug!("[LOOP] No tempo, can't loop by beats");
            return false;
        };
        self.refresh_position();
        let changed = self.looping.set_region_by_beats(
            self.state.position_ms,
            bpm,
            beats,
            self.state.duration_ms,
        );
        self.loop_changed(changed)
    }

    pub fn set_loop_by_bars(&mut self, bars: u32) -> bool {
        if !self.looping_enabled() {
            return false;
        }
        let Some(bpm) = self.tempo() else {
            debug!("[LOOP] No tempo, can't loop by bars");
            return false;
        };
        self.refresh_position();
        let changed = self.looping.set_region_by_bars(
            self.state.position_ms,
            bpm,
            bars,
            self.state.duration_ms,
        );
        self.loop_changed(changed)
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.looping.set_enabled(enabled);
        self.loop_changed(changed)
    }

    /// Returns the new enabled state
    pub fn toggle_loop(&mut self) -> bool {
        let enabled = self.looping.toggle();
        self.emit_loop();
        enabled
    }

    pub fn clear_loop(&mut self) {
        self.looping.clear_region();
        self.emit_loop();
    }

    /// Move the region edges onto the nearest beats
    pub fn snap_loop_to_beats(&mut self) -> bool {
        let Some(analysis) = self.analysis.as_ref() else {
            return false;
        };
        let changed = self.looping.snap_region_to_beats(analysis);
        self.loop_changed(changed)
    }

    /// Loop the section between the markers around the current position
    pub fn set_loop_to_next_marker(&mut self) -> bool {
        if !self.looping_enabled() {
            return false;
        }
        self.refresh_position();
        let changed = self
            .looping
            .set_region_to_next_marker(self.state.position_ms, self.state.duration_ms);
        self.loop_changed(changed)
    }

    /// Seek back to the region start once playback reaches its end
    pub(super) fn enforce_loop(&mut self) {
        if !self.is_module_enabled(PlayerModule::Looping) {
            return;
        }
        let position = self.state.position_ms;
        let Some(target) = self.looping.check(position) else {
            return;
        };
        debug!("[LOOP] {}ms -> {}ms", position, target);
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.seek_to(target) {
                warn!("[LOOP] Seek failed: {}", e);
                return;
            }
        }
        self.state.position_ms = target;
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    /// Bookmarks in creation order
    pub fn bookmarks(&self) -> &[Bookmark] {
        self.looping.bookmarks().list()
    }

    /// Bookmark the current position
    pub fn add_bookmark(&mut self, name: Option<&str>) -> Option<Uuid> {
        if !self.looping_enabled() {
            return None;
        }
        self.refresh_position();
        let bookmark = self
            .looping
            .bookmarks_mut()
            .add(self.state.position_ms, name.map(str::to_string));
        debug!("[LOOP] Bookmark '{}' at {}ms", bookmark.name, bookmark.position_ms);
        Some(bookmark.id)
    }

    pub fn rename_bookmark(&mut self, id: Uuid, name: &str) -> bool {
        self.looping.bookmarks_mut().rename(id, name)
    }

    pub fn jump_to_bookmark(&mut self, id: Uuid) -> bool {
        let Some(position) = self.looping.bookmarks().get(id).map(|b| b.position_ms) else {
            return false;
        };
        self.seek_to(position);
        true
    }

    pub fn jump_to_next_bookmark(&mut self) -> bool {
        self.refresh_position();
        let target = self
            .looping
            .bookmarks()
            .next_after(self.state.position_ms)
            .map(|b| b.position_ms);
        self.seek_if_some(target)
    }

    pub fn jump_to_previous_bookmark(&mut self) -> bool {
        self.refresh_position();
        let target = self
            .looping
            .bookmarks()
            .previous_before(self.state.position_ms)
            .map(|b| b.position_ms);
        self.seek_if_some(target)
    }

    pub fn nearest_bookmark(&self) -> Option<&Bookmark> {
        self.looping.bookmarks().nearest(self.state.position_ms)
    }

    fn seek_if_some(&mut self, target: Option<u64>) -> bool {
        match target {
            Some(position) => {
                self.seek_to(position);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Jump markers
    // ========================================================================

    pub fn markers(&self) -> &[JumpMarker] {
        self.looping.markers().list()
    }

    /// Add a custom marker at the current position
    pub fn add_custom_marker(&mut self, label: &str) -> bool {
        if !self.looping_enabled() {
            return false;
        }
        self.refresh_position();
        self.looping
            .markers_mut()
            .add_custom(self.state.position_ms, label);
        true
    }

    pub fn jump_to_next_marker(&mut self) -> bool {
        self.refresh_position();
        let target = self
            .looping
            .markers()
            .next_after(self.state.position_ms)
            .map(|m| m.time_ms);
        self.seek_if_some(target)
    }

    pub fn jump_to_previous_marker(&mut self) -> bool {
        self.refresh_position();
        let target = self
            .looping
            .markers()
            .previous_before(self.state.position_ms)
            .map(|m| m.time_ms);
        self.seek_if_some(target)
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    pub fn analysis(&self) -> Option<&AudioAnalysis> {
        self.analysis.as_ref()
    }

    /// Seek to the nearest beat
    pub fn snap_to_beat(&mut self) -> bool {
        self.refresh_position();
        let target = self
            .analysis
            .as_ref()
            .filter(|a| !a.beat_positions.is_empty())
            .map(|a| a.snap_to_beat(self.state.position_ms));
        self.seek_if_some(target)
    }

    /// Inside a silent region, seek to its end
    pub fn skip_silence(&mut self) -> bool {
        self.refresh_position();
        let target = self
            .analysis
            .as_ref()
            .and_then(|a| a.silence_at(self.state.position_ms))
            .map(|(_, end)| end);
        self.seek_if_some(target)
    }

    /// Seek to the start of the next silent region
    pub fn jump_to_next_silence(&mut self) -> bool {
        self.refresh_position();
        let target = self
            .analysis
            .as_ref()
            .and_then(|a| a.next_silence(self.state.position_ms))
            .map(|(start, _)| start);
        self.seek_if_some(target)
    }

    /// Seek to the next scene change
    pub fn jump_to_next_scene(&mut self) -> bool {
        self.refresh_position();
        let target = self
            .analysis
            .as_ref()
            .and_then(|a| a.next_scene_change(self.state.position_ms));
        self.seek_if_some(target)
    }

    /// Whether `position_ms` lies in a spoken span
    pub fn is_dialogue_at(&self, position_ms: u64) -> bool {
        self.analysis
            .as_ref()
            .is_some_and(|a| a.is_dialogue(position_ms))
    }

    pub(super) fn on_analysis_ready(&mut self, token: u64, analysis: AudioAnalysis) {
        if token != self.session_token {
            debug!("Dropping analysis for stale session {}", token);
            return;
        }
        if !self.is_module_enabled(PlayerModule::Analysis) {
            return;
        }
        debug!(
            "Analysis ready: {:.1} bpm, {} beats",
            analysis.bpm,
            analysis.beat_positions.len()
        );
        if self.is_module_enabled(PlayerModule::Looping) {
            let markers = detect_markers(&analysis, self.state.duration_ms);
            self.looping.markers_mut().set_detected(markers);
        }
        self.emit(EngineEvent::AudioAnalysisReady(analysis.clone()));
        self.analysis = Some(analysis);
    }
}
