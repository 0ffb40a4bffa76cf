//! Automation Module
//!
//! Keyframe automation of effect parameters over playback time.

pub mod evaluator;
pub mod track;

pub use evaluator::{Automation, AutomationTarget};
pub use track::{AutomationPoint, AutomationTrack, Interpolation};
