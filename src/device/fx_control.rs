//! Effect control surface of an output session
//!
//! The DSP itself is external. A surface is bound to one output session and
//! every setter may answer [`MixdeckError::Unsupported`](crate::error::MixdeckError::Unsupported).

use crate::error::Result;
use crate::fx::state::{ReverbPreset, Strength, DEFAULT_EQ_BAND_RANGE};

pub trait FxControl: Send {
    /// Number of equalizer bands the session exposes
    fn eq_band_count(&self) -> usize;

    /// Band level range in millibels
    fn eq_band_level_range(&self) -> (i16, i16) {
        DEFAULT_EQ_BAND_RANGE
    }

    fn set_eq_enabled(&mut self, enabled: bool) -> Result<()>;

    fn set_eq_band_level(&mut self, band: usize, level_mb: i16) -> Result<()>;

    fn set_bass_boost(&mut self, enabled: bool, strength: Strength) -> Result<()>;

    fn set_virtualizer(&mut self, enabled: bool, strength: Strength) -> Result<()>;

    fn set_loudness(&mut self, enabled: bool, gain_mb: i32) -> Result<()>;

    fn set_reverb(&mut self, enabled: bool, preset: ReverbPreset) -> Result<()>;

    /// Free the effect instances attached to the session
    fn release(&mut self);
}

/// Creates an effect surface for an output session
pub trait FxFactory: Send {
    fn bind(&mut self, session_id: u32) -> Result<Box<dyn FxControl>>;
}
