//! Audio Focus Arbiter
//!
//! Tracks whether the engine holds exclusive output and turns broker focus
//! changes into transport actions:
//! - Loss: pause and give focus up; never resumed automatically
//! - LossTransient: pause, and remember to resume if playback was running
//! - LossTransientCanDuck: keep playing at the duck gain
//! - Gain: restore full gain, resume only if a focus loss caused the pause
//!
//! A user pause or resume forgets any pending automatic resume.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::focus_broker::FocusChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FocusState {
    #[default]
    Unfocused,
    Requested,
    Focused,
    Ducked,
    LostTransient,
}

/// What the engine must do after a focus change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusAction {
    None,
    Pause,
    /// Pause and abandon focus
    PauseAndRelease,
    /// Scale output gain by this factor
    Duck(f32),
    /// Back to full gain, optionally resuming playback
    Restore { resume: bool },
}

#[derive(Debug, Clone)]
pub struct FocusArbiter {
    state: FocusState,
    paused_by_loss: bool,
    duck_gain: f32,
}

impl FocusArbiter {
    pub fn new(duck_gain: f32) -> Self {
        Self {
            state: FocusState::Unfocused,
            paused_by_loss: false,
            duck_gain: duck_gain.clamp(0.0, 1.0),
        }
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    /// Gain multiplier to apply on top of the user volume
    pub fn gain(&self) -> f32 {
        match self.state {
            FocusState::Ducked => self.duck_gain,
            _ => 1.0,
        }
    }

    pub fn paused_by_focus_loss(&self) -> bool {
        self.paused_by_loss
    }

    pub fn has_focus(&self) -> bool {
        matches!(self.state, FocusState::Focused | FocusState::Ducked)
    }

    pub fn begin_request(&mut self) {
        self.state = FocusState::Requested;
    }

    pub fn granted(&mut self) {
        self.state = FocusState::Focused;
        self.paused_by_loss = false;
    }

    pub fn denied(&mut self) {
        self.state = FocusState::Unfocused;
    }

    pub fn abandon(&mut self) {
        self.state = FocusState::Unfocused;
        self.paused_by_loss = false;
    }

    /// A user-initiated pause or resume cancels any automatic resume
    pub fn on_user_transport(&mut self) {
        self.paused_by_loss = false;
    }

    pub fn on_change(&mut self, change: FocusChange, is_playing: bool) -> FocusAction {
        debug!("[FOCUS] {:?} in {:?} (playing: {})", change, self.state, is_playing);
        match change {
            FocusChange::Loss => {
                self.abandon();
                FocusAction::PauseAndRelease
            }
            FocusChange::LossTransient => {
                self.state = FocusState::LostTransient;
                if is_playing {
                    self.paused_by_loss = true;
                    FocusAction::Pause
                } else {
                    FocusAction::None
                }
            }
            FocusChange::LossTransientCanDuck => {
                self.state = FocusState::Ducked;
                FocusAction::Duck(self.duck_gain)
            }
            FocusChange::Gain => {
                self.state = FocusState::Focused;
                let resume = std::mem::take(&mut self.paused_by_loss);
                FocusAction::Restore { resume }
            }
        }
    }
}
