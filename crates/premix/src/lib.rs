mod store;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use atmomix_tracks::TrackId;
use serde::{Deserialize, Serialize};

pub use store::PremixStore;

/// Identifier of a fixed premix slot in the UI (e.g. `"mix1"`).
///
/// Slots are bound to positions, not to content: saving into an occupied
/// slot overwrites whatever premix it held.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One track's captured state inside a snapshot.
///
/// Field names round-trip the persisted layout exactly, so `is_playing`
/// serializes as `isPlaying`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundSetting {
    pub id: TrackId,
    /// Slider position, 0-100.
    pub volume: u8,
    pub is_playing: bool,
}

/// Immutable snapshot of the whole mix: exactly one entry per known track,
/// in registry order, plus the capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct MixSnapshot {
    pub entries: Vec<SoundSetting>,
    /// Epoch milliseconds at capture time.
    pub captured_at: u64,
}

impl MixSnapshot {
    pub fn new(entries: Vec<SoundSetting>) -> Self {
        Self {
            entries,
            captured_at: now_ms(),
        }
    }
}

/// Maximum premix title length, in characters. Longer input is truncated.
pub const MAX_TITLE_LEN: usize = 20;

/// A saved premix as it lives in a slot and on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Premix {
    pub title: String,
    pub sounds: Vec<SoundSetting>,
    /// Epoch milliseconds at save time.
    pub timestamp: u64,
}

impl Premix {
    pub fn new(title: impl Into<String>, snapshot: MixSnapshot) -> Self {
        Self {
            title: title.into(),
            sounds: snapshot.entries,
            timestamp: snapshot.captured_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Epoch milliseconds, saturating at zero if the clock is before the epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
