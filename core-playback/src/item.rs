//! # Playable Items
//!
//! An item has an immutable identity (id plus quality-ranked source URLs)
//! and display metadata that is filled lazily from what the engine discovers
//! in the stream.

use bridge_traits::MetadataItem;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PlaybackError, Result};

/// Source quality. Ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum AudioQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl AudioQuality {
    /// Next lower quality, if any.
    pub fn lower(&self) -> Option<AudioQuality> {
        match self {
            AudioQuality::Low => None,
            AudioQuality::Medium => Some(AudioQuality::Low),
            AudioQuality::High => Some(AudioQuality::Medium),
        }
    }

    /// Next higher quality, if any.
    pub fn higher(&self) -> Option<AudioQuality> {
        match self {
            AudioQuality::Low => Some(AudioQuality::Medium),
            AudioQuality::Medium => Some(AudioQuality::High),
            AudioQuality::High => None,
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioQuality::Low => "low",
            AudioQuality::Medium => "medium",
            AudioQuality::High => "high",
        };
        f.write_str(name)
    }
}

/// Display metadata of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    pub track_count: Option<u32>,
    pub year: Option<i32>,
    pub artwork_url: Option<String>,
}

/// An item the player can play.
///
/// Shared between the queue and the player as `Arc<PlayableItem>`; two items
/// are equal when their ids are equal.
pub struct PlayableItem {
    id: String,
    /// Sorted by quality, never empty.
    urls: Vec<(AudioQuality, String)>,
    metadata: RwLock<ItemMetadata>,
}

impl PlayableItem {
    /// Create an item from its sources.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidArgument`] when `urls` is empty.
    pub fn new(
        id: impl Into<String>,
        urls: impl IntoIterator<Item = (AudioQuality, String)>,
    ) -> Result<Self> {
        let id = id.into();
        let urls: BTreeMap<_, _> = urls.into_iter().collect();
        let urls: Vec<_> = urls.into_iter().collect();
        if urls.is_empty() {
            return Err(PlaybackError::InvalidArgument(format!(
                "item {} has no source URL",
                id
            )));
        }
        Ok(Self {
            id,
            urls,
            metadata: RwLock::new(ItemMetadata::default()),
        })
    }

    /// Single-source item.
    pub fn with_url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            urls: vec![(AudioQuality::default(), url.into())],
            metadata: RwLock::new(ItemMetadata::default()),
        }
    }

    /// Attach initial metadata (builder style).
    pub fn with_metadata(self, metadata: ItemMetadata) -> Self {
        *self.metadata.write() = metadata;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Every source URL of this item, lowest quality first.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(|(_, url)| url.as_str())
    }

    pub fn qualities(&self) -> impl Iterator<Item = AudioQuality> + '_ {
        self.urls.iter().map(|(quality, _)| *quality)
    }

    pub fn highest_quality_url(&self) -> (AudioQuality, &str) {
        let (quality, url) = &self.urls[self.urls.len() - 1];
        (*quality, url.as_str())
    }

    pub fn lowest_quality_url(&self) -> (AudioQuality, &str) {
        let (quality, url) = &self.urls[0];
        (*quality, url.as_str())
    }

    /// URL for `quality`, falling back to the closest available quality
    /// (preferring lower over higher on a tie).
    pub fn url_for(&self, quality: AudioQuality) -> (AudioQuality, &str) {
        let distance = |q: AudioQuality| (q as i32 - quality as i32).abs();
        let (chosen, url) = self
            .urls
            .iter()
            .min_by_key(|(q, _)| (distance(*q), *q))
            .unwrap_or(&self.urls[0]);
        (*chosen, url.as_str())
    }

    /// Whether `url` designates a local file.
    pub fn is_offline_url(url: &str) -> bool {
        url.starts_with("file://") || url.starts_with('/')
    }

    /// Whether the source for `quality` is local.
    pub fn is_offline(&self, quality: AudioQuality) -> bool {
        Self::is_offline_url(self.url_for(quality).1)
    }

    /// Snapshot of the display metadata.
    pub fn metadata(&self) -> ItemMetadata {
        self.metadata.read().clone()
    }

    pub fn title(&self) -> Option<String> {
        self.metadata.read().title.clone()
    }

    pub fn artist(&self) -> Option<String> {
        self.metadata.read().artist.clone()
    }

    pub fn album(&self) -> Option<String> {
        self.metadata.read().album.clone()
    }

    /// Fill empty metadata fields from metadata found in the stream.
    ///
    /// Fields that already hold a value are never overwritten. Returns
    /// `true` when at least one field changed.
    pub fn parse_metadata(&self, items: &[MetadataItem]) -> bool {
        let mut metadata = self.metadata.write();
        let mut changed = false;

        for item in items {
            let value = item.value.trim();
            if value.is_empty() {
                continue;
            }
            changed |= match item.key.as_str() {
                "title" => fill(&mut metadata.title, value.to_string()),
                "artist" => fill(&mut metadata.artist, value.to_string()),
                "albumName" | "album" => fill(&mut metadata.album, value.to_string()),
                "artwork" | "artworkUrl" => fill(&mut metadata.artwork_url, value.to_string()),
                "trackNumber" => parse_track_number(value)
                    .map(|(number, count)| {
                        let a = number.map_or(false, |n| fill(&mut metadata.track_number, n));
                        let b = count.map_or(false, |c| fill(&mut metadata.track_count, c));
                        a | b
                    })
                    .unwrap_or(false),
                "year" | "creationDate" => value
                    .get(..4)
                    .and_then(|y| y.parse::<i32>().ok())
                    .map_or(false, |year| fill(&mut metadata.year, year)),
                _ => false,
            };
        }

        changed
    }
}

fn fill<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

/// Parse "3" or "3/12".
fn parse_track_number(value: &str) -> Option<(Option<u32>, Option<u32>)> {
    let mut parts = value.splitn(2, '/');
    let number = parts.next().and_then(|n| n.trim().parse().ok());
    let count = parts.next().and_then(|c| c.trim().parse().ok());
    if number.is_none() && count.is_none() {
        None
    } else {
        Some((number, count))
    }
}

impl PartialEq for PlayableItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlayableItem {}

impl fmt::Debug for PlayableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayableItem")
            .field("id", &self.id)
            .field("qualities", &self.qualities().collect::<Vec<_>>())
            .finish()
    }
}
