//! Bookmarks
//!
//! Append-only list of named positions. Nothing removes bookmarks except an
//! explicit clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: Uuid,
    pub position_ms: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bookmarks {
    items: Vec<Bookmark>,
}

impl Bookmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bookmark; unnamed ones become "Bookmark N"
    pub fn add(&mut self, position_ms: u64, name: Option<String>) -> &Bookmark {
        let name = name.unwrap_or_else(|| format!("Bookmark {}", self.items.len() + 1));
        self.items.push(Bookmark {
            id: Uuid::new_v4(),
            position_ms,
            name,
            created_at: Utc::now(),
        });
        &self.items[self.items.len() - 1]
    }

    pub fn rename(&mut self, id: Uuid, name: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|b| b.id == id) {
            Some(bookmark) => {
                bookmark.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Bookmark> {
        self.items.iter().find(|b| b.id == id)
    }

    /// All bookmarks in creation order
    pub fn list(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Closest bookmark strictly after `position_ms`
    pub fn next_after(&self, position_ms: u64) -> Option<&Bookmark> {
        self.items
            .iter()
            .filter(|b| b.position_ms > position_ms)
            .min_by_key(|b| b.position_ms)
    }

    /// Closest bookmark strictly before `position_ms`
    pub fn previous_before(&self, position_ms: u64) -> Option<&Bookmark> {
        self.items
            .iter()
            .filter(|b| b.position_ms < position_ms)
            .max_by_key(|b| b.position_ms)
    }

    pub fn nearest(&self, position_ms: u64) -> Option<&Bookmark> {
        self.items
            .iter()
            .min_by_key(|b| b.position_ms.abs_diff(position_ms))
    }
}
