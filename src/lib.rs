//! Mixdeck - Unified Media Playback and Mixing Engine
//!
//! Mixdeck drives platform output devices through a single playback engine:
//! 1. Main session - playlist, transport, repeat/shuffle, focus handling
//! 2. Layers - up to eight extra sources mixed with volume, pan, mute and solo
//!
//! # Architecture
//!
//! The engine is a single-writer state owner. Collaborators (output devices,
//! effect surfaces, focus broker, output topology, analysis provider, config
//! store) are traits; their asynchronous signals enter through one input
//! funnel. Observers subscribe to a broadcast channel of engine events.
//! A periodic tick polls the position, enforces loop regions and routes
//! automation to volume and effects.

pub mod automation;
pub mod cli;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod focus;
pub mod fx;
pub mod layers;
pub mod looping;
pub mod media;

pub use config::{EngineConfig, PlayerModule};
pub use engine::{EngineEvent, EngineHandle, PlaybackEngine};
pub use error::{MixdeckError, Result};
