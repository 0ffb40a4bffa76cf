//! Loop regions
//!
//! A region is either set directly in milliseconds or derived from the
//! tempo: one beat is `60000 / bpm` ms and one bar is four beats.

use serde::{Deserialize, Serialize};

/// Beats per bar used for bar-relative loops
pub const BEATS_PER_BAR: u32 = 4;

/// How a region was defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopKind {
    Time,
    Beats(u32),
    Bars(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start_ms: u64,
    pub end_ms: u64,
    pub enabled: bool,
    pub kind: LoopKind,
}

impl LoopRegion {
    /// Enabled time-based region. `None` unless `end_ms > start_ms`.
    pub fn new(start_ms: u64, end_ms: u64) -> Option<Self> {
        (end_ms > start_ms).then_some(Self {
            start_ms,
            end_ms,
            enabled: true,
            kind: LoopKind::Time,
        })
    }

    /// Region of `beats` beats starting at `start_ms`. `None` if the tempo is
    /// unknown or non-positive. Oversized lengths saturate at `u64::MAX`.
    pub fn from_beats(start_ms: u64, bpm: f32, beats: u32) -> Option<Self> {
        let length = beats_to_ms(bpm, beats)?;
        let mut region = Self::new(start_ms, start_ms.saturating_add(length))?;
        region.kind = LoopKind::Beats(beats);
        Some(region)
    }

    /// Region of `bars` bars (4 beats each) starting at `start_ms`
    pub fn from_bars(start_ms: u64, bpm: f32, bars: u32) -> Option<Self> {
        let mut region = Self::from_beats(start_ms, bpm, bars.saturating_mul(BEATS_PER_BAR))?;
        region.kind = LoopKind::Bars(bars);
        Some(region)
    }

    pub fn length_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn contains(&self, position_ms: u64) -> bool {
        (self.start_ms..self.end_ms).contains(&position_ms)
    }

    /// Where to seek when playback reaches `position_ms`, if anywhere
    pub fn wrap_target(&self, position_ms: u64) -> Option<u64> {
        (self.enabled && position_ms >= self.end_ms).then_some(self.start_ms)
    }

    /// Pull the end back to `duration_ms` when it overshoots
    pub fn clamp_to(&mut self, duration_ms: u64) {
        if duration_ms > self.start_ms && self.end_ms > duration_ms {
            self.end_ms = duration_ms;
        }
    }
}

/// Length of `beats` beats at `bpm`, rounded to the millisecond
pub fn beats_to_ms(bpm: f32, beats: u32) -> Option<u64> {
    if !(bpm.is_finite() && bpm > 0.0) {
        return None;
    }
    Some((60_000.0 / bpm as f64 * beats as f64).round() as u64)
}
