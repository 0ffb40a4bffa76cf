//! Audio analysis provider
//!
//! Tempo, key, loudness, silence, energy, scene and dialogue data for the current item come
//! from an external provider. Results arrive asynchronously as
//! [`crate::engine::input::EngineInput::AnalysisReady`].

use serde::{Deserialize, Serialize};

use crate::engine::input::InputSink;
use crate::media::MediaItem;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioAnalysis {
    /// Tempo; 0 when unknown
    pub bpm: f32,
    pub key: String,
    pub loudness_lufs: f32,
    pub peak_db: f32,
    /// Evenly spaced energy samples across the whole item
    pub energy_profile: Vec<f32>,
    /// Silent spans as (start_ms, end_ms)
    pub silence_regions: Vec<(u64, u64)>,
    pub beat_positions: Vec<u64>,
    /// Abrupt content changes, in ms
    #[serde(default)]
    pub scene_changes: Vec<u64>,
    /// Spoken spans as (start_ms, end_ms)
    #[serde(default)]
    pub dialogue_segments: Vec<(u64, u64)>,
}

impl AudioAnalysis {
    pub fn has_tempo(&self) -> bool {
        self.bpm > 0.0
    }

    /// Beat position closest to `position_ms`, or the position itself
    pub fn snap_to_beat(&self, position_ms: u64) -> u64 {
        self.beat_positions
            .iter()
            .copied()
            .min_by_key(|b| b.abs_diff(position_ms))
            .unwrap_or(position_ms)
    }

    /// Silent span containing `position_ms`
    pub fn silence_at(&self, position_ms: u64) -> Option<(u64, u64)> {
        self.silence_regions
            .iter()
            .copied()
            .find(|(start, end)| (*start..=*end).contains(&position_ms))
    }

    /// First silent span starting after `position_ms`
    pub fn next_silence(&self, position_ms: u64) -> Option<(u64, u64)> {
        self.silence_regions
            .iter()
            .copied()
            .filter(|(start, _)| *start > position_ms)
            .min_by_key(|(start, _)| *start)
    }

    /// First scene change after `position_ms`
    pub fn next_scene_change(&self, position_ms: u64) -> Option<u64> {
        self.scene_changes
            .iter()
            .copied()
            .filter(|t| *t > position_ms)
            .min()
    }

    pub fn is_dialogue(&self, position_ms: u64) -> bool {
        self.dialogue_segments
            .iter()
            .any(|(start, end)| (*start..=*end).contains(&position_ms))
    }
}

pub trait AnalysisProvider: Send {
    /// Start analysing `item`; the result is sent to `reply` tagged with `token`
    fn analyze(&mut self, item: &MediaItem, duration_ms: u64, token: u64, reply: InputSink);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_beat() {
        let analysis = AudioAnalysis {
            beat_positions: vec![0, 500, 1000, 1500],
            ..Default::default()
        };
        assert_eq!(analysis.snap_to_beat(740), 500);
        assert_eq!(analysis.snap_to_beat(760), 1000);
        assert_eq!(AudioAnalysis::default().snap_to_beat(321), 321);
    }

    #[test]
    fn test_silence_lookup() {
        let analysis = AudioAnalysis {
            silence_regions: vec![(0, 800), (60_000, 62_000)],
            ..Default::default()
        };
        assert_eq!(analysis.silence_at(400), Some((0, 800)));
        assert_eq!(analysis.silence_at(900), None);
        assert_eq!(analysis.next_silence(900), Some((60_000, 62_000)));
        assert_eq!(analysis.next_silence(61_000), None);
    }

    #[test]
    fn test_scene_and_dialogue_lookup() {
        let analysis = AudioAnalysis {
            scene_changes: vec![90_000, 15_000, 40_000],
            dialogue_segments: vec![(5_000, 9_000)],
            ..Default::default()
        };
        assert_eq!(analysis.next_scene_change(0), Some(15_000));
        assert_eq!(analysis.next_scene_change(15_000), Some(40_000));
        assert_eq!(analysis.next_scene_change(90_000), None);
        assert!(analysis.is_dialogue(5_000));
        assert!(analysis.is_dialogue(9_000));
        assert!(!analysis.is_dialogue(9_001));
    }
}
