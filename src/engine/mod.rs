//! Playback Engine Module
//!
//! The single-writer core of the player:
//! - Transport state machine and the observable state snapshot
//! - Input funnel for asynchronous collaborator signals
//! - Observer events over a broadcast channel
//! - The engine itself and the tokio task that drives it

mod effects;
pub mod events;
pub mod input;
mod mixing;
pub mod player;
mod regions;
pub mod runtime;
pub mod state;
mod tick;
pub mod transport;

pub use events::{EngineEvent, EventHub};
pub use input::{EngineInput, InputSink};
pub use player::{PlaybackEngine, MAX_SPEED, MIN_SPEED};
pub use runtime::{EngineCommand, EngineHandle};
pub use state::{PlaybackState, RepeatMode};
pub use transport::{PlaybackStatus, Transport};
