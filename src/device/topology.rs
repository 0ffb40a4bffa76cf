//! Output topology source

use crate::engine::input::InputSink;
use crate::fx::output::OutputType;

pub trait OutputTopology: Send {
    fn current(&self) -> OutputType;

    /// Whether the active route is a car head unit
    fn is_car(&self) -> bool {
        false
    }

    /// Register for change notifications, delivered as
    /// [`crate::engine::input::EngineInput::OutputChanged`]
    fn watch(&mut self, listener: InputSink);
}
