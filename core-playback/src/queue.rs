//! # Queue Manager
//!
//! Ordered (optionally shuffled) list of items with a `next_position`
//! cursor and a repeat/shuffle mode.
//!
//! The playback order holds indices into the display list, so the same item
//! may appear more than once. The cursor always designates the entry
//! `next_item()` will return; once navigation started the current entry sits
//! at `next_position - 1`. Shuffling builds one permutation when the queue is
//! created (or when shuffle is toggled) and never re-rolls it during
//! navigation.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{PlaybackError, Result};
use crate::item::PlayableItem;

/// Repeat behaviour of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Off,
    /// Re-offer the current item forever.
    One,
    /// Wrap around at both ends.
    All,
}

/// Repeat mode combined with shuffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerMode {
    pub repeat: RepeatMode,
    pub shuffle: bool,
}

impl PlayerMode {
    pub const NORMAL: PlayerMode = PlayerMode {
        repeat: RepeatMode::Off,
        shuffle: false,
    };

    pub fn new(repeat: RepeatMode, shuffle: bool) -> Self {
        Self { repeat, shuffle }
    }

    pub fn with_repeat(self, repeat: RepeatMode) -> Self {
        Self { repeat, ..self }
    }

    pub fn with_shuffle(self, shuffle: bool) -> Self {
        Self { shuffle, ..self }
    }
}

/// Queue of playable items.
#[derive(Debug, Clone)]
pub struct QueueManager {
    /// Display order.
    items: Vec<Arc<PlayableItem>>,
    /// Playback order, as indices into `items`.
    order: Vec<usize>,
    next_position: usize,
    /// Set by the first successful navigation.
    started: bool,
    mode: PlayerMode,
}

impl QueueManager {
    /// Build a queue whose first `next_item()` is `items[start_index]`.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidArgument`] when `items` is empty or
    /// `start_index` is out of range.
    pub fn new(items: Vec<Arc<PlayableItem>>, mode: PlayerMode, start_index: usize) -> Result<Self> {
        if items.is_empty() {
            return Err(PlaybackError::InvalidArgument(
                "queue needs at least one item".to_string(),
            ));
        }
        if start_index >= items.len() {
            return Err(PlaybackError::InvalidArgument(format!(
                "start index {} out of range for {} items",
                start_index,
                items.len()
            )));
        }

        let mut order: Vec<usize> = (0..items.len()).collect();
        if mode.shuffle {
            order.shuffle(&mut rand::thread_rng());
        }
        let next_position = order
            .iter()
            .position(|&index| index == start_index)
            .unwrap_or(0);

        debug!(
            count = items.len(),
            start_index,
            shuffle = mode.shuffle,
            "Queue created"
        );

        Ok(Self {
            items,
            order,
            next_position,
            started: false,
            mode,
        })
    }

    pub fn mode(&self) -> PlayerMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in display order.
    pub fn items(&self) -> &[Arc<PlayableItem>] {
        &self.items
    }

    /// Items in playback order.
    pub fn ordered_items(&self) -> Vec<Arc<PlayableItem>> {
        self.order.iter().map(|&index| self.items[index].clone()).collect()
    }

    pub fn next_position(&self) -> usize {
        self.next_position
    }

    /// Display index of the item most recently returned by navigation.
    pub fn current_index(&self) -> Option<usize> {
        if !self.started {
            return None;
        }
        self.next_position
            .checked_sub(1)
            .and_then(|position| self.order.get(position))
            .copied()
    }

    /// Item most recently returned by navigation.
    pub fn current_item(&self) -> Option<&Arc<PlayableItem>> {
        self.current_index().map(|index| &self.items[index])
    }

    /// Index of `item` in display order.
    pub fn position_of(&self, item: &PlayableItem) -> Option<usize> {
        self.items.iter().position(|candidate| candidate.as_ref() == item)
    }

    /// Every source URL referenced by the queue.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.items.iter().flat_map(|item| item.urls())
    }

    pub fn has_next(&self) -> bool {
        if self.order.is_empty() {
            return false;
        }
        !self.started
            || self.next_position < self.order.len()
            || self.mode.repeat != RepeatMode::Off
    }

    pub fn has_previous(&self) -> bool {
        self.started
            && !self.order.is_empty()
            && (self.next_position > 1 || self.mode.repeat != RepeatMode::Off)
    }

    /// Advance and return the next item per mode.
    pub fn next_item(&mut self) -> Option<Arc<PlayableItem>> {
        if self.order.is_empty() {
            return None;
        }

        if self.started && self.mode.repeat == RepeatMode::One {
            return self.current_item().cloned();
        }

        if self.next_position >= self.order.len() {
            if self.mode.repeat != RepeatMode::All {
                return None;
            }
            self.next_position = 0;
        }

        let item = self.items[self.order[self.next_position]].clone();
        self.next_position += 1;
        self.started = true;
        Some(item)
    }

    /// Item `next_item()` would return, without moving the cursor.
    pub fn upcoming_item(&self) -> Option<&Arc<PlayableItem>> {
        if self.order.is_empty() {
            return None;
        }
        if self.started && self.mode.repeat == RepeatMode::One {
            return self.current_item();
        }
        let position = match self.order.get(self.next_position) {
            Some(&index) => index,
            None if self.mode.repeat == RepeatMode::All => self.order[0],
            None => return None,
        };
        self.items.get(position)
    }

    /// Step back and return the previous item per mode. `None` before the
    /// first `next_item()`.
    pub fn previous_item(&mut self) -> Option<Arc<PlayableItem>> {
        if self.order.is_empty() || !self.started {
            return None;
        }

        if self.mode.repeat == RepeatMode::One {
            return self.current_item().cloned();
        }

        if self.next_position <= 1 {
            if self.mode.repeat != RepeatMode::All {
                return None;
            }
            self.next_position = self.order.len() + 1;
        }

        self.next_position -= 1;
        self.current_item().cloned()
    }

    /// Append items, keeping the cursor. In shuffle mode the new batch is
    /// shuffled and appended after the existing ordering.
    pub fn add(&mut self, items: Vec<Arc<PlayableItem>>) {
        if items.is_empty() {
            return;
        }
        let mut batch: Vec<usize> = (self.items.len()..self.items.len() + items.len()).collect();
        if self.mode.shuffle {
            batch.shuffle(&mut rand::thread_rng());
        }
        self.items.extend(items);
        self.order.extend(batch);
        debug!(count = self.items.len(), "Items added to queue");
    }

    /// Remove the item at `index` (display order). Out-of-range is a no-op.
    ///
    /// Removing an item behind the cursor shifts the cursor so the upcoming
    /// item stays the same.
    pub fn remove_at(&mut self, index: usize) -> Option<Arc<PlayableItem>> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);

        if let Some(position) = self.order.iter().position(|&entry| entry == index) {
            self.order.remove(position);
            if position < self.next_position {
                self.next_position -= 1;
            }
        }
        for entry in &mut self.order {
            if *entry > index {
                *entry -= 1;
            }
        }

        debug!(index, remaining = self.items.len(), "Item removed from queue");
        Some(removed)
    }

    /// Change the mode, re-permuting when shuffle is toggled.
    ///
    /// The current item stays current, or the pending first item stays
    /// pending when navigation has not started yet.
    pub fn set_mode(&mut self, mode: PlayerMode) {
        let shuffle_changed = mode.shuffle != self.mode.shuffle;
        self.mode = mode;
        if !shuffle_changed {
            return;
        }

        let anchor = if self.started {
            self.current_index()
        } else {
            self.order.get(self.next_position).copied()
        };
        if mode.shuffle {
            let mut rest: Vec<usize> = (0..self.items.len())
                .filter(|&index| Some(index) != anchor)
                .collect();
            rest.shuffle(&mut rand::thread_rng());
            self.order = anchor.into_iter().chain(rest).collect();
            self.next_position = usize::from(self.started && anchor.is_some());
        } else {
            self.order = (0..self.items.len()).collect();
            self.next_position = match anchor {
                Some(index) if self.started => index + 1,
                Some(index) => index,
                None => 0,
            };
        }
        debug!(shuffle = mode.shuffle, "Queue order rebuilt");
    }
}
