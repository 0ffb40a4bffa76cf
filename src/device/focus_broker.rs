//! Platform audio focus broker

use serde::{Deserialize, Serialize};

use crate::engine::input::InputSink;

/// Focus change pushed by the broker after a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusChange {
    Gain,
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequestResult {
    Granted,
    Denied,
}

pub trait FocusBroker: Send {
    /// Request exclusive output. Later changes are delivered to `listener`
    /// as [`crate::engine::input::EngineInput::Focus`].
    fn request(&mut self, listener: InputSink) -> FocusRequestResult;

    fn abandon(&mut self);
}
