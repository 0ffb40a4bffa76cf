//! Looping Module
//!
//! Loop region enforcement, bookmarks and jump markers for the main session.

pub mod bookmarks;
pub mod markers;
pub mod region;

use tracing::debug;

pub use bookmarks::{Bookmark, Bookmarks};
pub use markers::{detect_markers, JumpMarker, MarkerKind, MarkerSet};
pub use region::{beats_to_ms, LoopKind, LoopRegion, BEATS_PER_BAR};

use crate::device::analysis::AudioAnalysis;

#[derive(Debug, Default)]
pub struct LoopController {
    region: Option<LoopRegion>,
    bookmarks: Bookmarks,
    markers: MarkerSet,
}

impl LoopController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(&self) -> Option<&LoopRegion> {
        self.region.as_ref()
    }

    pub fn is_looping(&self) -> bool {
        self.region.is_some_and(|r| r.enabled)
    }

    fn install(&mut self, mut region: LoopRegion, duration_ms: u64) {
        region.clamp_to(duration_ms);
        debug!(
            "[LOOP] Region {}..{}ms ({:?})",
            region.start_ms, region.end_ms, region.kind
        );
        self.region = Some(region);
    }

    /// Set and enable a time region. Ignored unless `end_ms > start_ms`.
    pub fn set_region(&mut self, start_ms: u64, end_ms: u64, duration_ms: u64) -> bool {
        match LoopRegion::new(start_ms, end_ms) {
            Some(region) => {
                self.install(region, duration_ms);
                true
            }
            None => {
                debug!("[LOOP] Ignoring empty region {}..{}ms", start_ms, end_ms);
                false
            }
        }
    }

    /// Loop `beats` beats from `start_ms`. No-op without a positive tempo.
    pub fn set_region_by_beats(&mut self, start_ms: u64, bpm: f32, beats: u32, duration_ms: u64) -> bool {
        match LoopRegion::from_beats(start_ms, bpm, beats) {
            Some(region) => {
                self.install(region, duration_ms);
                true
            }
            None => false,
        }
    }

    /// Loop `bars` bars (four beats each) from `start_ms`
    pub fn set_region_by_bars(&mut self, start_ms: u64, bpm: f32, bars: u32, duration_ms: u64) -> bool {
        match LoopRegion::from_bars(start_ms, bpm, bars) {
            Some(region) => {
                self.install(region, duration_ms);
                true
            }
            None => false,
        }
    }

    /// Enable or disable the current region. False when there is none.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        match self.region.as_mut() {
            Some(region) => {
                region.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Flip the enabled flag; returns the new state
    pub fn toggle(&mut self) -> bool {
        match self.region.as_mut() {
            Some(region) => {
                region.enabled = !region.enabled;
                region.enabled
            }
            None => false,
        }
    }

    pub fn clear_region(&mut self) {
        self.region = None;
    }

    /// Seek target when `position_ms` has reached the end of an enabled region
    pub fn check(&self, position_ms: u64) -> Option<u64> {
        self.region.and_then(|r| r.wrap_target(position_ms))
    }

    /// Move both region edges to the nearest beats
    pub fn snap_region_to_beats(&mut self, analysis: &AudioAnalysis) -> bool {
        let Some(region) = self.region.as_mut() else {
            return false;
        };
        let start = analysis.snap_to_beat(region.start_ms);
        let end = analysis.snap_to_beat(region.end_ms);
        if end <= start {
            return false;
        }
        region.start_ms = start;
        region.end_ms = end;
        true
    }

    /// Loop the section between the markers around `position_ms`
    pub fn set_region_to_next_marker(&mut self, position_ms: u64, duration_ms: u64) -> bool {
        let start = self
            .markers
            .previous_before(position_ms + 1)
            .map_or(position_ms, |m| m.time_ms);
        let Some(end) = self.markers.next_after(position_ms).map(|m| m.time_ms) else {
            return false;
        };
        self.set_region(start, end, duration_ms)
    }

    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }

    pub fn bookmarks_mut(&mut self) -> &mut Bookmarks {
        &mut self.bookmarks
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut MarkerSet {
        &mut self.markers
    }

    /// Drop region, bookmarks and markers
    pub fn clear_all(&mut self) {
        self.region = None;
        self.bookmarks.clear();
        self.markers.clear();
    }
}
