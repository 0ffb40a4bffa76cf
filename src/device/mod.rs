//! Device Module
//!
//! Contracts for the collaborators the engine drives but does not implement:
//! - Output devices (decode + render) and their factory
//! - Effect control surfaces bound to an output session
//! - Audio focus broker, output topology, analysis provider
//! - Configuration store
//!
//! `sim` provides deterministic in-process implementations of all of them.

pub mod analysis;
pub mod focus_broker;
pub mod fx_control;
pub mod output;
pub mod sim;
pub mod store;
pub mod topology;

pub use analysis::{AnalysisProvider, AudioAnalysis};
pub use focus_broker::{FocusBroker, FocusChange, FocusRequestResult};
pub use fx_control::{FxControl, FxFactory};
pub use output::{DeviceEvent, DeviceEventKind, DeviceFactory, DeviceTarget, OutputDevice};
pub use store::{ConfigStore, MemoryConfigStore};
pub use topology::OutputTopology;

/// Everything the engine needs from the outside world
pub struct Collaborators {
    pub devices: Box<dyn DeviceFactory>,
    pub fx: Box<dyn FxFactory>,
    pub focus: Box<dyn FocusBroker>,
    pub topology: Box<dyn OutputTopology>,
    pub analysis: Box<dyn AnalysisProvider>,
    pub store: Box<dyn ConfigStore>,
}
