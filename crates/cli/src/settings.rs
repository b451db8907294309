use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use faceroll_core::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use faceroll_core::shared::constants::{DEFAULT_DATABASE_NAME, DEFAULT_MATCH_THRESHOLD};

pub const DEFAULT_SNAPSHOT_EVERY: usize = 15;

/// Persistent defaults for command-line options. Flags override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: Option<PathBuf>,
    pub device: Option<String>,
    pub model: Option<PathBuf>,
    pub match_threshold: f64,
    pub confidence: f64,
    pub snapshot: Option<PathBuf>,
    pub snapshot_every: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            device: None,
            model: None,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            confidence: DEFAULT_CONFIDENCE,
            snapshot: None,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceRoll").join("settings.json"))
    }

    /// Loads the user's settings; a missing or unreadable file yields defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring invalid settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Database location when neither flag nor settings name one.
    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("FaceRoll"))
            .unwrap_or_default()
            .join(DEFAULT_DATABASE_NAME)
    }
}
