//! Error handling for Mixdeck
//!
//! Engine commands never fail across the command boundary. Failures are
//! reported to observers as [`crate::engine::EngineEvent::Error`] and the
//! [`ErrorKind`] carried there is derived from [`MixdeckError::kind`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Mixdeck operations
pub type Result<T> = std::result::Result<T, MixdeckError>;

/// Main error type for Mixdeck operations
#[derive(Error, Debug)]
pub enum MixdeckError {
    // Media Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Playback error {code}: {message}")]
    Playback { code: i32, message: String },

    // Capability Errors
    #[error("Unsupported by output device: {feature}")]
    Unsupported { feature: String },

    // Mixer Errors
    #[error("Layer limit exceeded: at most {max} layers")]
    LayerLimitExceeded { max: usize },

    #[error("Layer not found: {id}")]
    LayerNotFound { id: String },

    // Focus Errors
    #[error("Audio focus request denied")]
    FocusDenied,

    /// Out-of-range input that was clamped. Never surfaced to observers.
    #[error("Value {value} out of range for {parameter}")]
    InvalidRange { parameter: String, value: f64 },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Engine has shut down")]
    EngineClosed,

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error category delivered to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    FileNotFound,
    Playback,
    Unsupported,
    LayerLimitExceeded,
    LayerNotFound,
    FocusDenied,
    InvalidRange,
    Config,
    EngineClosed,
    Io,
}

impl MixdeckError {
    /// Build a playback error from a device error code
    pub fn playback(code: i32, message: impl Into<String>) -> Self {
        MixdeckError::Playback {
            code,
            message: message.into(),
        }
    }

    /// Build an unsupported-capability error
    pub fn unsupported(feature: impl Into<String>) -> Self {
        MixdeckError::Unsupported {
            feature: feature.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MixdeckError::FileNotFound { .. } => "FILE_NOT_FOUND",
            MixdeckError::Playback { .. } => "PLAYBACK_ERROR",
            MixdeckError::Unsupported { .. } => "UNSUPPORTED",
            MixdeckError::LayerLimitExceeded { .. } => "LAYER_LIMIT_EXCEEDED",
            MixdeckError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            MixdeckError::FocusDenied => "FOCUS_DENIED",
            MixdeckError::InvalidRange { .. } => "INVALID_RANGE",
            MixdeckError::Config { .. } => "CONFIG_ERROR",
            MixdeckError::EngineClosed => "ENGINE_CLOSED",
            MixdeckError::Io(_) => "IO_ERROR",
            MixdeckError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Category used on the observer surface
    pub fn kind(&self) -> ErrorKind {
        match self {
            MixdeckError::FileNotFound { .. } => ErrorKind::FileNotFound,
            MixdeckError::Playback { .. } => ErrorKind::Playback,
            MixdeckError::Unsupported { .. } => ErrorKind::Unsupported,
            MixdeckError::LayerLimitExceeded { .. } => ErrorKind::LayerLimitExceeded,
            MixdeckError::LayerNotFound { .. } => ErrorKind::LayerNotFound,
            MixdeckError::FocusDenied => ErrorKind::FocusDenied,
            MixdeckError::InvalidRange { .. } => ErrorKind::InvalidRange,
            MixdeckError::Config { .. } => ErrorKind::Config,
            MixdeckError::EngineClosed => ErrorKind::EngineClosed,
            MixdeckError::Io(_) | MixdeckError::Serialization(_) => ErrorKind::Io,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the engine fully usable; the next command
    /// proceeds normally. A playback error leaves the main session in the
    /// error status until another item is played.
    pub fn is_recoverable(&self) -> bool {
        match self {
            MixdeckError::FileNotFound { .. } => true,
            MixdeckError::Unsupported { .. } => true,
            MixdeckError::LayerLimitExceeded { .. } => true,
            MixdeckError::LayerNotFound { .. } => true,
            MixdeckError::FocusDenied => true,
            MixdeckError::InvalidRange { .. } => true,
            _ => false,
        }
    }
}
