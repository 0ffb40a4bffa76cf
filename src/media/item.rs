//! Media items
//!
//! A `MediaItem` is an immutable description of something playable. The
//! engine never decodes it; the `uri` is handed verbatim to the output device.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Kind of media behind a locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaType {
    #[default]
    Audio,
    Video,
    Stream,
}

/// A playable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    /// Source locator (file path or URL)
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub media_type: MediaType,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            media_type: MediaType::Audio,
        }
    }

    /// Item for a network stream; the URL doubles as the id
    pub fn stream(url: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            uri: url,
            title: title.into(),
            artist: artist.into(),
            album: String::new(),
            media_type: MediaType::Stream,
        }
    }

    /// Item for a local file. Title is the file stem; `.mp4`, `.mkv` and
    /// `.webm` are treated as video.
    pub fn from_file(path: &Path) -> Self {
        let uri = path.display().to_string();
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| uri.clone());
        let media_type = match path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("mp4") | Some("mkv") | Some("webm") => MediaType::Video,
            _ => MediaType::Audio,
        };
        Self {
            id: uri.clone(),
            uri,
            title,
            artist: String::new(),
            album: String::new(),
            media_type,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }
}
