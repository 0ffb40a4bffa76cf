//! Effect parameter state and value ranges
//!
//! Strengths keep the integer 0–1000 scale used by output devices
//! (`STRENGTH_SCALE` = 100 %). Loudness gain is in millibels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Full-scale value for bass boost and virtualizer strength
pub const STRENGTH_SCALE: u16 = 1000;

/// Loudness enhancer gain bounds in millibels
pub const LOUDNESS_MIN_MB: i32 = -1000;
pub const LOUDNESS_MAX_MB: i32 = 2000;

/// Equalizer band level range used when the device does not report one
pub const DEFAULT_EQ_BAND_RANGE: (i16, i16) = (-1500, 1500);

/// Number of bands assumed before a device session is bound
pub const DEFAULT_EQ_BANDS: usize = 5;

/// Effect strength on the 0..=`STRENGTH_SCALE` scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Strength(u16);

impl Strength {
    pub const ZERO: Strength = Strength(0);
    pub const MAX: Strength = Strength(STRENGTH_SCALE);

    /// Build from a permille value, clamping into range
    pub fn new(permille: i32) -> Self {
        Strength(permille.clamp(0, STRENGTH_SCALE as i32) as u16)
    }

    /// Build from a fraction in [0, 1]
    pub fn from_fraction(fraction: f32) -> Self {
        if !fraction.is_finite() {
            return Strength::ZERO;
        }
        Strength::new((fraction * STRENGTH_SCALE as f32).round() as i32)
    }

    pub fn permille(self) -> u16 {
        self.0
    }

    pub fn fraction(self) -> f32 {
        self.0 as f32 / STRENGTH_SCALE as f32
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0 / 10)
    }
}

/// Clamp a loudness gain into the supported millibel range
pub fn clamp_loudness(gain_mb: i32) -> i32 {
    gain_mb.clamp(LOUDNESS_MIN_MB, LOUDNESS_MAX_MB)
}

/// Environmental reverb presets, indexed 0..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReverbPreset {
    #[default]
    None,
    SmallRoom,
    MediumRoom,
    LargeRoom,
    MediumHall,
    LargeHall,
    Plate,
}

impl ReverbPreset {
    pub const ALL: [ReverbPreset; 7] = [
        ReverbPreset::None,
        ReverbPreset::SmallRoom,
        ReverbPreset::MediumRoom,
        ReverbPreset::LargeRoom,
        ReverbPreset::MediumHall,
        ReverbPreset::LargeHall,
        ReverbPreset::Plate,
    ];

    /// Preset for an index, clamped into 0..=6
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, Self::ALL.len() as i32 - 1) as usize]
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ReverbPreset::None => "None",
            ReverbPreset::SmallRoom => "Small Room",
            ReverbPreset::MediumRoom => "Medium Room",
            ReverbPreset::LargeRoom => "Large Room",
            ReverbPreset::MediumHall => "Medium Hall",
            ReverbPreset::LargeHall => "Large Hall",
            ReverbPreset::Plate => "Plate",
        }
    }
}

/// Current effect settings of the main output session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxState {
    pub eq_enabled: bool,
    pub eq_band_levels: Vec<i16>,
    pub eq_band_range: (i16, i16),
    pub eq_preset: Option<String>,
    pub bass_boost_enabled: bool,
    pub bass_boost: Strength,
    pub virtualizer_enabled: bool,
    pub virtualizer: Strength,
    pub loudness_enabled: bool,
    pub loudness_gain_mb: i32,
    pub reverb_enabled: bool,
    pub reverb_preset: ReverbPreset,
}

impl Default for FxState {
    fn default() -> Self {
        Self {
            eq_enabled: false,
            eq_band_levels: vec![0; DEFAULT_EQ_BANDS],
            eq_band_range: DEFAULT_EQ_BAND_RANGE,
            eq_preset: None,
            bass_boost_enabled: false,
            bass_boost: Strength::ZERO,
            virtualizer_enabled: false,
            virtualizer: Strength::ZERO,
            loudness_enabled: false,
            loudness_gain_mb: 0,
            reverb_enabled: false,
            reverb_preset: ReverbPreset::None,
        }
    }
}

impl FxState {
    /// Clamp an EQ band level into the current band range
    pub fn clamp_band_level(&self, level: i32) -> i16 {
        let (lo, hi) = self.eq_band_range;
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        level.clamp(lo as i32, hi as i32) as i16
    }

    /// True when every effect is switched off
    pub fn all_disabled(&self) -> bool {
        !self.eq_enabled
            && !self.bass_boost_enabled
            && !self.virtualizer_enabled
            && !self.loudness_enabled
            && !self.reverb_enabled
    }
}
