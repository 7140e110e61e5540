use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for index building, matching and copying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum age of the cache file before an intelligent scan rebuilds it,
    /// in seconds. Defaults to ten days.
    pub stale_threshold_secs: u64,

    /// Keep only the first N space-delimited tokens of a search key.
    /// `None` keeps the whole key. Filenames sometimes carry free-text
    /// descriptions after the identifier; the right N depends on the
    /// identifier scheme in use, so there is no universal default.
    pub key_tokens: Option<usize>,

    /// Lowercase both sides before substring matching
    pub case_insensitive: bool,

    /// First number used for disambiguated target names, i.e.
    /// `name (2).tif` with the default of 2. `name (1).tif` is never
    /// produced unless this is lowered.
    pub collision_start: u32,

    /// Accept any extension starting with "tif" instead of exactly
    /// tif/tiff (both case-insensitive)
    pub loose_extensions: bool,

    /// Longest edge of generated previews, in pixels
    pub preview_max_edge: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stale_threshold_secs: 10 * 24 * 3600,
            key_tokens: None,
            case_insensitive: false,
            collision_start: 2,
            loose_extensions: false,
            preview_max_edge: 720,
        }
    }
}

impl Config {
    /// Staleness threshold as a `Duration`
    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_threshold_secs)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Check configuration invariants
    pub fn validate(&self) -> Result<()> {
        if self.collision_start < 1 {
            return Err(Error::Configuration(
                "collision_start must be at least 1".to_string(),
            ));
        }
        if self.preview_max_edge == 0 {
            return Err(Error::Configuration(
                "preview_max_edge must be positive".to_string(),
            ));
        }
        if self.key_tokens == Some(0) {
            return Err(Error::Configuration(
                "key_tokens must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

// -- Tests --
