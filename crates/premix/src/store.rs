use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Premix, SlotId, StoreError};

/// Durable slot-to-premix mapping backed by one JSON blob.
///
/// The whole mapping is read and rewritten as a unit, so concurrent saves in
/// one session are last-write-wins at blob granularity. A missing or
/// malformed blob is treated as "no premixes saved" and never surfaced as an
/// error.
#[derive(Debug)]
pub struct PremixStore {
    path: PathBuf,
}

impl PremixStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default blob location under the user's config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("atmomix").join("premixes.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every saved premix. Absent or unreadable data degrades to an
    /// empty mapping.
    pub fn load_all(&self) -> BTreeMap<SlotId, Premix> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return BTreeMap::new(),
        };

        match serde_json::from_str(&contents) {
            Ok(premixes) => premixes,
            Err(e) => {
                log::warn!(
                    "malformed premix blob at {}, treating as empty: {e}",
                    self.path.display()
                );
                BTreeMap::new()
            }
        }
    }

    /// Save a premix into a slot, overwriting any previous occupant.
    pub fn save(&self, slot: &SlotId, premix: Premix) -> Result<(), StoreError> {
        let mut premixes = self.load_all();
        premixes.insert(slot.clone(), premix);
        self.write_blob(&premixes)
    }

    /// Remove a slot's premix. Deleting an empty slot is a no-op.
    pub fn delete(&self, slot: &SlotId) -> Result<(), StoreError> {
        let mut premixes = self.load_all();
        if premixes.remove(slot).is_some() {
            self.write_blob(&premixes)?;
        }
        Ok(())
    }

    pub fn exists(&self, slot: &SlotId) -> bool {
        self.load_all().contains_key(slot)
    }

    /// Rewrite the blob through a temp file so readers never observe a
    /// partial write.
    fn write_blob(&self, premixes: &BTreeMap<SlotId, Premix>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(premixes)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
