use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};

/// Persistent mapping from absolute file path to the search key derived
/// from its base name.
///
/// The index is the only component that touches the cache store. Paths are
/// unique; search keys are not (several pages of one object share a key).
/// Entries are held in a `BTreeMap` so iteration order is deterministic.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathIndex {
    entries: BTreeMap<PathBuf, String>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries as `(path, search key)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &String)> {
        self.entries.iter()
    }

    pub fn key_for(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Load a previously saved index.
    ///
    /// An absent store is an empty index; an unreadable or malformed store
    /// is an error, and the caller falls back to a fresh scan where that
    /// is appropriate.
    pub fn load(store: &Path) -> Result<Self> {
        if !store.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(store).map_err(|e| Error::CacheUnreadable {
            path: store.to_path_buf(),
            source: e,
        })?;
        let entries = serde_json::from_str(&raw).map_err(|e| Error::CacheCorrupt {
            path: store.to_path_buf(),
            source: e,
        })?;
        Ok(Self { entries })
    }

    /// Persist the full index to the store.
    ///
    /// Writes to a sibling temp file first and renames it into place, so a
    /// reader of a completed save never observes a partial write.
    pub fn save(&self, store: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::Configuration(format!("cache serialization: {}", e)))?;

        let mut tmp = store.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, store)?;
        info!("Wrote {} entries to {}", self.entries.len(), store.display());
        Ok(())
    }

    /// True when the store's modification time is older than `threshold`
    /// relative to `now`. A missing store counts as stale.
    pub fn is_stale(store: &Path, threshold: Duration, now: SystemTime) -> Result<bool> {
        let metadata = match fs::metadata(store) {
            Ok(m) => m,
            Err(_) => return Ok(true),
        };
        let mtime = metadata.modified()?;
        let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
        Ok(age > threshold)
    }

    /// Recursively scan `root` for TIFF files and merge them into the index.
    ///
    /// Returns the number of files indexed. Unreadable entries below the
    /// root are logged and skipped; a missing root is an error.
    pub fn scan_tree(&mut self, root: &Path, config: &Config) -> Result<usize> {
        if !root.is_dir() {
            return Err(Error::DirNotFound(root.to_path_buf()));
        }

        info!("Scanning {}", root.display());
        let mut added = 0;
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !is_tiff(path, config.loose_extensions) {
                continue;
            }
            // Symlink-resolved absolute path is the identity of the entry
            let abs = match fs::canonicalize(path) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Cannot resolve {}: {}", path.display(), e);
                    continue;
                }
            };
            if let Some(key) = search_key(&abs, config.key_tokens) {
                self.entries.insert(abs, key);
                added += 1;
            }
        }
        info!("Indexed {} files under {}", added, root.display());
        Ok(added)
    }

    /// Scan several roots, accumulating into one index.
    ///
    /// A root that cannot be read is reported and skipped; it does not
    /// abort the scan of the remaining roots.
    pub fn scan_all(&mut self, roots: &[PathBuf], config: &Config) -> usize {
        let mut added = 0;
        for root in roots {
            match self.scan_tree(root, config) {
                Ok(n) => added += n,
                Err(e) => warn!("Skipping root {}: {}", root.display(), e),
            }
        }
        added
    }

    /// Drop entries whose file no longer exists on disk.
    ///
    /// Returns the number of entries removed. Does not look for new files.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| {
            let live = path.exists();
            if !live {
                info!("Gone from disk, dropping from index: {}", path.display());
            }
            live
        });
        before - self.entries.len()
    }

    /// Intelligent scan: rebuild only when the store has gone stale.
    ///
    /// When stale, dead entries are pruned, all roots are rescanned and the
    /// result is saved. When fresh, the index is left untouched. Returns
    /// whether a rescan happened.
    pub fn refresh(&mut self, roots: &[PathBuf], store: &Path, config: &Config) -> Result<bool> {
        if !Self::is_stale(store, config.stale_threshold(), SystemTime::now())? {
            info!("Cache still young, skipping rescan");
            return Ok(false);
        }
        self.prune();
        self.scan_all(roots, config);
        self.save(store)?;
        Ok(true)
    }
}

/// Derive the search key for a file: base name without extension,
/// underscores replaced with spaces, optionally truncated to the first
/// `key_tokens` space-delimited tokens.
pub fn search_key(path: &Path, key_tokens: Option<usize>) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let key = stem.replace('_', " ");
    match key_tokens {
        Some(k) => Some(
            key.split(' ')
                .filter(|t| !t.is_empty())
                .take(k)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        None => Some(key),
    }
}

/// Returns if the given path counts as a TIFF master.
///
/// Strict mode accepts exactly tif/tiff (case-insensitive); loose mode
/// accepts any extension starting with "tif".
pub fn is_tiff(path: &Path, loose: bool) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_lowercase();
            if loose {
                ext.starts_with("tif")
            } else {
                ext == "tif" || ext == "tiff"
            }
        }
        None => false,
    }
}

// -- Tests --
