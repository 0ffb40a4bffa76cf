//! Playlist with a movable cursor
//!
//! The item list is only replaced wholesale (new playlist, shuffle,
//! unshuffle); navigation moves the cursor.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::MediaItem;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playlist {
    items: Vec<MediaItem>,
    current: Option<usize>,
    /// Order before shuffling, as indices into the unshuffled list
    #[serde(skip)]
    unshuffled: Option<(Vec<MediaItem>, Vec<usize>)>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a playlist positioned at `start` (clamped into range)
    pub fn from_items(items: Vec<MediaItem>, start: usize) -> Self {
        let current = if items.is_empty() {
            None
        } else {
            Some(start.min(items.len() - 1))
        };
        Self {
            items,
            current,
            unshuffled: None,
        }
    }

    /// Single-item playlist
    pub fn single(item: MediaItem) -> Self {
        Self::from_items(vec![item], 0)
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.current.and_then(|i| self.items.get(i))
    }

    pub fn is_last(&self) -> bool {
        matches!(self.current, Some(i) if i + 1 == self.items.len())
    }

    /// Move to the next item. At the end, wraps to 0 when `wrap` is set,
    /// otherwise the cursor stays put and `None` is returned.
    pub fn advance(&mut self, wrap: bool) -> Option<&MediaItem> {
        let idx = self.current?;
        if idx + 1 < self.items.len() {
            self.current = Some(idx + 1);
        } else if wrap {
            self.current = Some(0);
        } else {
            return None;
        }
        self.current()
    }

    /// Move to the previous item. At the start, wraps to the last item when
    /// `wrap` is set.
    pub fn retreat(&mut self, wrap: bool) -> Option<&MediaItem> {
        let idx = self.current?;
        if idx > 0 {
            self.current = Some(idx - 1);
        } else if wrap {
            self.current = Some(self.items.len() - 1);
        } else {
            return None;
        }
        self.current()
    }

    /// Randomize the order. The current item keeps its index.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.items.len() < 2 {
            return;
        }
        let playing = self.current.and_then(|c| self.original_index_at(c));
        let (base, mut order) = match self.unshuffled.take() {
            Some(saved) => saved,
            None => (self.items.clone(), (0..self.items.len()).collect()),
        };

        order.shuffle(rng);
        if let (Some(c), Some(p)) = (self.current, playing) {
            // Bring whatever was at the cursor back under it.
            if let Some(j) = order.iter().position(|&i| i == p) {
                order.swap(j, c);
            }
        }

        self.items = order.iter().map(|&i| base[i].clone()).collect();
        self.unshuffled = Some((base, order));
    }

    /// Restore the order from before shuffling; the cursor follows its item
    pub fn unshuffle(&mut self) {
        if let Some((base, order)) = self.unshuffled.take() {
            self.current = self.current.and_then(|c| order.get(c).copied());
            self.items = base;
        }
    }

    pub fn is_shuffled(&self) -> bool {
        self.unshuffled.is_some()
    }

    fn original_index_at(&self, idx: usize) -> Option<usize> {
        match &self.unshuffled {
            Some((_, order)) => order.get(idx).copied(),
            None => Some(idx),
        }
    }
}
