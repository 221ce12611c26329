use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Stable identifier for an ambient sound track (e.g. `"sound1"`).
///
/// Ids are fixed at startup and never change for the lifetime of a session,
/// which makes them safe to persist inside premix snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Declarative definition of a track: id, display name, asset path.
#[derive(Debug, Clone, Copy)]
pub struct TrackDef {
    pub id: &'static str,
    pub name: &'static str,
    pub asset: &'static str,
}

/// The fixed roster of ambient sounds, in display order.
pub const DEFAULT_TRACKS: &[TrackDef] = &[
    TrackDef { id: "sound1", name: "Rain", asset: "sounds/Rain.mp3" },
    TrackDef { id: "sound2", name: "Thunder", asset: "sounds/Thunder.mp3" },
    TrackDef { id: "sound3", name: "Ocean", asset: "sounds/Ocean.mp3" },
    TrackDef { id: "sound4", name: "Waterfall", asset: "sounds/Waterfall.mp3" },
    TrackDef { id: "sound5", name: "Coffee Shop", asset: "sounds/CoffeeShop.mp3" },
    TrackDef { id: "sound6", name: "Fireplace", asset: "sounds/Fireplace.mp3" },
];

/// Volume a track starts at when nothing else is known.
pub const DEFAULT_VOLUME: u8 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub asset: PathBuf,
    /// Slider position, 0-100. The effective gain also depends on the
    /// global multiplier, which lives outside the registry.
    pub volume: u8,
    pub playing: bool,
}

impl Track {
    pub fn new(id: TrackId, name: impl Into<String>, asset: impl Into<PathBuf>) -> Self {
        Self {
            id,
            name: name.into(),
            asset: asset.into(),
            volume: DEFAULT_VOLUME,
            playing: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown track '{0}'")]
    UnknownTrack(TrackId),
}

/// The authoritative in-memory record of every track's volume and play flag.
///
/// Order is fixed at construction and is the order snapshots are captured in.
/// The registry never touches persistence or audio playback itself.
#[derive(Debug)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
}

impl TrackRegistry {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Build the registry from the fixed default roster, resolving asset
    /// paths against `assets_root`.
    pub fn with_default_tracks(assets_root: &Path) -> Self {
        let tracks = DEFAULT_TRACKS
            .iter()
            .map(|def| Track::new(TrackId::from(def.id), def.name, assets_root.join(def.asset)))
            .collect();
        Self::new(tracks)
    }

    /// All tracks in stable display order.
    pub fn list(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: &TrackId) -> Result<&Track, RegistryError> {
        self.tracks
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| RegistryError::UnknownTrack(id.clone()))
    }

    pub fn get_mut(&mut self, id: &TrackId) -> Result<&mut Track, RegistryError> {
        self.tracks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| RegistryError::UnknownTrack(id.clone()))
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.iter().any(|t| &t.id == id)
    }

    /// Set a track's slider position. Values over 100 are clamped.
    pub fn set_volume(&mut self, id: &TrackId, percent: u8) -> Result<(), RegistryError> {
        self.get_mut(id)?.volume = percent.min(100);
        Ok(())
    }

    pub fn set_playing(&mut self, id: &TrackId, playing: bool) -> Result<(), RegistryError> {
        self.get_mut(id)?.playing = playing;
        Ok(())
    }
}
