use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Host-side settings. Everything is optional; absence means "use the
/// built-in default". Loading never fails: unreadable or malformed files
/// degrade to the defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Override for the premix blob location.
    #[serde(default)]
    pub premix_path: Option<PathBuf>,

    /// Global volume slider position applied at startup, 0-100.
    #[serde(default)]
    pub global_volume: Option<u8>,
}

impl Config {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("atmomix").join("config.toml"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };

        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        if let Ok(contents) = toml::to_string_pretty(self) {
            let _ = fs::write(&path, contents);
        }
    }
}
