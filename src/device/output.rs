//! Output device contract
//!
//! An output device decodes and renders one media source. `prepare` is
//! asynchronous: the device reports readiness, completion and failures later
//! as [`DeviceEvent`]s through the [`InputSink`] it was created with.

use serde::{Deserialize, Serialize};

use crate::engine::input::InputSink;
use crate::error::{MixdeckError, Result};
use crate::layers::LayerId;

/// Which session a device serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceTarget {
    Main,
    Layer(LayerId),
}

/// Asynchronous notification from a device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEventKind {
    Prepared { duration_ms: u64, session_id: u32 },
    Buffering { percent: u8 },
    Completed,
    Error { code: i32, message: String },
}

/// Device notification tagged with its origin
///
/// `token` identifies the device instance; events from a released device
/// carry a stale token and are dropped by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEvent {
    pub target: DeviceTarget,
    pub token: u64,
    pub kind: DeviceEventKind,
}

pub trait OutputDevice: Send {
    /// Point the device at a source locator
    fn load(&mut self, uri: &str) -> Result<()>;

    /// Begin asynchronous preparation; completion arrives as `Prepared`
    fn prepare(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn seek_to(&mut self, position_ms: u64) -> Result<()>;

    /// Per-channel linear gain. Layer pan can ask for up to 1.5; a device
    /// that cannot amplify caps it itself.
    fn set_volume(&mut self, left: f32, right: f32) -> Result<()>;

    fn set_speed(&mut self, _speed: f32) -> Result<()> {
        Err(MixdeckError::unsupported("playback speed"))
    }

    fn current_position(&self) -> u64;

    fn is_playing(&self) -> bool;

    /// Output session id once prepared
    fn session_id(&self) -> Option<u32>;

    /// Free the device; no events are delivered afterwards
    fn release(&mut self);
}

/// Creates output devices for the main session and for layers
pub trait DeviceFactory: Send {
    fn create(
        &mut self,
        target: DeviceTarget,
        token: u64,
        events: InputSink,
    ) -> Result<Box<dyn OutputDevice>>;
}
