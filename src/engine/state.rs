//! Observable playback state

use serde::{Deserialize, Serialize};

use super::transport::PlaybackStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    /// Off -> All -> One -> Off
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// Snapshot of the main session published to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub is_playing: bool,
    pub is_prepared: bool,
    pub position_ms: u64,
    /// Zero while unknown
    pub duration_ms: u64,
    pub buffer_percent: u8,
    pub speed: f32,
    pub volume: f32,
    pub repeat_mode: RepeatMode,
    pub shuffle_enabled: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            is_playing: false,
            is_prepared: false,
            position_ms: 0,
            duration_ms: 0,
            buffer_percent: 0,
            speed: 1.0,
            volume: 1.0,
            repeat_mode: RepeatMode::Off,
            shuffle_enabled: false,
        }
    }
}

impl PlaybackState {
    /// Position as a fraction of the duration, 0 when the duration is unknown
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0) as f32
    }

    /// Forget everything tied to the loaded item. Volume, speed, repeat and
    /// shuffle carry over.
    pub fn reset_session(&mut self) {
        self.is_playing = false;
        self.is_prepared = false;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.buffer_percent = 0;
    }
}
