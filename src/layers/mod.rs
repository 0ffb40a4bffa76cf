//! Layer Module
//!
//! Multi-layer mixing:
//! - Layer identity and limits
//! - Pan law and device gain computation
//! - The mixer owning each layer's output device

pub mod gain;
pub mod mixer;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use gain::pan_gains;
pub use mixer::{AudioLayer, LayerMixer, LayerSnapshot};

/// Maximum number of simultaneous layers
pub const MAX_LAYERS: usize = 8;

/// Unique layer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        LayerId(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
