//! Transport State Machine
//!
//! Playback status of the main session:
//! - Idle: nothing loaded
//! - Preparing: an item is loading on a fresh output device
//! - Ready: the device reported prepared, not yet started
//! - Playing / Paused: the usual transport states
//! - Stopped: stopped by the user or at the end of the playlist
//! - Error: the device failed; only a new `play` leaves this state
//!
//! Every transition goes through a method that refuses illegal moves and
//! reports whether the status changed.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Preparing,
    Ready,
    Playing,
    Paused,
    Stopped,
    Error,
}

impl PlaybackStatus {
    /// States a device error can interrupt
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PlaybackStatus::Preparing
                | PlaybackStatus::Ready
                | PlaybackStatus::Playing
                | PlaybackStatus::Paused
        )
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Preparing => "preparing",
            PlaybackStatus::Ready => "ready",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Guards the main session status
#[derive(Debug, Clone, Default)]
pub struct Transport {
    status: PlaybackStatus,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.status == PlaybackStatus::Paused
    }

    fn move_to(&mut self, to: PlaybackStatus, allowed: bool) -> bool {
        if !allowed {
            debug!("[TRANSPORT] Ignoring {} -> {}", self.status, to);
            return false;
        }
        debug!("[TRANSPORT] {} -> {}", self.status, to);
        self.status = to;
        true
    }

    /// A new item starts loading. Legal from every state.
    pub fn begin_prepare(&mut self) -> bool {
        self.move_to(PlaybackStatus::Preparing, true)
    }

    /// Preparing -> Ready
    pub fn prepared(&mut self) -> bool {
        let allowed = self.status == PlaybackStatus::Preparing;
        self.move_to(PlaybackStatus::Ready, allowed)
    }

    /// Ready | Paused -> Playing
    pub fn start(&mut self) -> bool {
        let allowed = matches!(self.status, PlaybackStatus::Ready | PlaybackStatus::Paused);
        self.move_to(PlaybackStatus::Playing, allowed)
    }

    /// Playing -> Paused
    pub fn pause(&mut self) -> bool {
        let allowed = self.status == PlaybackStatus::Playing;
        self.move_to(PlaybackStatus::Paused, allowed)
    }

    /// Anything but Idle and Stopped -> Stopped
    pub fn stop(&mut self) -> bool {
        let allowed = !matches!(self.status, PlaybackStatus::Idle | PlaybackStatus::Stopped);
        self.move_to(PlaybackStatus::Stopped, allowed)
    }

    /// The device failed while a session was active
    pub fn fail(&mut self) -> bool {
        let allowed = self.status.is_active();
        self.move_to(PlaybackStatus::Error, allowed)
    }

    /// Back to Idle after the session is released
    pub fn reset(&mut self) {
        self.status = PlaybackStatus::Idle;
    }
}
