//! FX Module
//!
//! Effect state, listening modes, output-type profiles and the controller
//! that pushes settings to the output session's effect surface.

pub mod controller;
pub mod output;
pub mod presets;
pub mod state;

pub use controller::FxController;
pub use output::{OutputProfile, OutputProfileResolver, OutputType};
pub use presets::{suggest_mode, ListeningMode, ListeningModeResolver, ModeSettings};
pub use state::{
    FxState, ReverbPreset, Strength, LOUDNESS_MAX_MB, LOUDNESS_MIN_MB, STRENGTH_SCALE,
};
