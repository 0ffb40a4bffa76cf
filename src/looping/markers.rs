//! Jump markers
//!
//! Markers are derived from the analysis energy profile: a rising edge above
//! 1.3x the mean energy marks an intro in the first quarter, a drop in the
//! second and a chorus afterwards. Energy must fall below 0.7x the mean
//! before the next edge counts. Silent regions add silence markers and each
//! scene change adds a scene marker.

use serde::{Deserialize, Serialize};

use crate::device::analysis::AudioAnalysis;

const RISE_FACTOR: f32 = 1.3;
const FALL_FACTOR: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Intro,
    Verse,
    Chorus,
    Drop,
    Bridge,
    Outro,
    Silence,
    SceneChange,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpMarker {
    pub time_ms: u64,
    pub kind: MarkerKind,
    pub label: String,
}

/// Detect markers for an item of `duration_ms`
pub fn detect_markers(analysis: &AudioAnalysis, duration_ms: u64) -> Vec<JumpMarker> {
    let mut markers = Vec::new();
    let profile = &analysis.energy_profile;

    if !profile.is_empty() && duration_ms > 0 {
        let mean = profile.iter().sum::<f32>() / profile.len() as f32;
        let n = profile.len();
        let mut was_low = true;
        for (i, &energy) in profile.iter().enumerate() {
            if was_low && energy > mean * RISE_FACTOR {
                let kind = if i < n / 4 {
                    MarkerKind::Intro
                } else if i < n / 2 {
                    MarkerKind::Drop
                } else {
                    MarkerKind::Chorus
                };
                markers.push(JumpMarker {
                    time_ms: duration_ms * i as u64 / n as u64,
                    kind,
                    label: String::new(),
                });
                was_low = false;
            } else if !was_low && energy < mean * FALL_FACTOR {
                was_low = true;
            }
        }
    }

    for &(start, _) in &analysis.silence_regions {
        markers.push(JumpMarker {
            time_ms: start,
            kind: MarkerKind::Silence,
            label: String::new(),
        });
    }

    for &time_ms in &analysis.scene_changes {
        markers.push(JumpMarker {
            time_ms,
            kind: MarkerKind::SceneChange,
            label: String::new(),
        });
    }

    markers.sort_by_key(|m| m.time_ms);
    markers
}

/// Time-sorted marker list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkerSet {
    markers: Vec<JumpMarker>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[JumpMarker] {
        &self.markers
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Replace detected markers, keeping custom ones
    pub fn set_detected(&mut self, detected: Vec<JumpMarker>) {
        self.markers.retain(|m| m.kind == MarkerKind::Custom);
        self.markers.extend(detected);
        self.markers.sort_by_key(|m| m.time_ms);
    }

    pub fn add_custom(&mut self, time_ms: u64, label: impl Into<String>) {
        let idx = self.markers.partition_point(|m| m.time_ms <= time_ms);
        self.markers.insert(
            idx,
            JumpMarker {
                time_ms,
                kind: MarkerKind::Custom,
                label: label.into(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn next_after(&self, position_ms: u64) -> Option<&JumpMarker> {
        self.markers.iter().find(|m| m.time_ms > position_ms)
    }

    pub fn previous_before(&self, position_ms: u64) -> Option<&JumpMarker> {
        self.markers.iter().rev().find(|m| m.time_ms < position_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(profile: Vec<f32>) -> AudioAnalysis {
        AudioAnalysis {
            energy_profile: profile,
            ..Default::default()
        }
    }

    #[test]
    fn test_detect_rising_edges() {
        // mean = 0.8; rises at 1, 5 and 9 with dips in between
        let profile = vec![0.2, 2.0, 2.0, 0.2, 0.2, 2.0, 0.2, 0.2, 0.2, 2.0, 0.2, 0.2];
        let markers = detect_markers(&analysis(profile), 12_000);
        let found: Vec<_> = markers.iter().map(|m| (m.time_ms, m.kind)).collect();
        assert_eq!(
            found,
            vec![
                (1_000, MarkerKind::Intro),
                (5_000, MarkerKind::Drop),
                (9_000, MarkerKind::Chorus),
            ]
        );
    }

    #[test]
    fn test_no_edge_without_dip() {
        let profile = vec![0.1, 2.0, 1.5, 2.0, 0.1, 0.1, 0.1, 0.1];
        let markers = detect_markers(&analysis(profile), 8_000);
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_silence_markers() {
        let a = AudioAnalysis {
            silence_regions: vec![(60_000, 61_000)],
            ..Default::default()
        };
        let markers = detect_markers(&a, 120_000);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, MarkerKind::Silence);
    }

    #[test]
    fn test_scene_change_markers() {
        let a = AudioAnalysis {
            silence_regions: vec![(60_000, 61_000)],
            scene_changes: vec![90_000, 20_000],
            ..Default::default()
        };
        let kinds: Vec<_> = detect_markers(&a, 120_000)
            .iter()
            .map(|m| (m.time_ms, m.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (20_000, MarkerKind::SceneChange),
                (60_000, MarkerKind::Silence),
                (90_000, MarkerKind::SceneChange),
            ]
        );
    }

    #[test]
    fn test_marker_navigation_keeps_custom() {
        let mut set = MarkerSet::new();
        set.add_custom(4_000, "hook");
        set.set_detected(detect_markers(&analysis(vec![0.2, 2.0, 0.2, 0.2]), 8_000));
        assert_eq!(set.list().len(), 2);
        assert_eq!(set.next_after(0).unwrap().time_ms, 2_000);
        assert_eq!(set.next_after(2_000).unwrap().label, "hook");
        assert_eq!(set.previous_before(4_000).unwrap().kind, MarkerKind::Drop);

        set.set_detected(Vec::new());
        assert_eq!(set.list().len(), 1);
    }
}
