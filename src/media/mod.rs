//! Media Module
//!
//! Playable item descriptions and the playlist cursor.

pub mod item;
pub mod playlist;

pub use item::{MediaItem, MediaType};
pub use playlist::Playlist;
