//! Core functionality for locating TIFF masters by inventory identifier.
//!
//! This library provides the foundational components of tiffinder:
//! - Persistent path index built by recursive directory scan
//! - Substring matching of identifiers against filename-derived keys
//! - Collision-safe target naming with byte-level identity comparison
//! - Idempotent copy, preview and log-only materialization

// -- External Dependencies --

use log::{info, warn};
use std::path::{Path, PathBuf};

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::Config;
pub use error::{Error, Result};
pub use matcher::MatchResult;
pub use materialize::{Materializer, Outcome, Report};
pub use naming::{NamingDecision, NamingPolicy};
pub use records::Record;

// -- Public Modules --
pub mod config;
pub mod index;
pub mod matcher;
pub mod materialize;
pub mod naming;
pub mod preview;
pub mod records;
pub mod runlog;

use index::PathIndex;

/// Main entry point: a loaded index plus the configuration to query it
pub struct TifFinder {
    config: Config,
    cache_fn: PathBuf,
    index: PathIndex,
}

impl TifFinder {
    /// Open the cache at `cache_fn`, loading the index it holds.
    ///
    /// An absent cache starts empty; a corrupt one is an error so the
    /// caller can decide between aborting and rebuilding.
    pub fn open(cache_fn: &Path, config: Config) -> Result<Self> {
        config.validate()?;
        let index = PathIndex::load(cache_fn)?;
        if !index.is_empty() {
            info!("Cache exists, loaded {} entries", index.len());
        }
        Ok(Self {
            config,
            cache_fn: cache_fn.to_path_buf(),
            index,
        })
    }

    /// Like `open`, but an unusable cache store falls back to an empty
    /// index instead of failing, for callers about to rebuild anyway.
    pub fn open_or_rebuild(cache_fn: &Path, config: Config) -> Result<Self> {
        match Self::open(cache_fn, config.clone()) {
            Ok(finder) => Ok(finder),
            Err(e @ (Error::CacheCorrupt { .. } | Error::CacheUnreadable { .. })) => {
                warn!("{}; starting a fresh index", e);
                Ok(Self {
                    config,
                    cache_fn: cache_fn.to_path_buf(),
                    index: PathIndex::new(),
                })
            }
            Err(e) => Err(e),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }

    /// Scan the given roots and merge the results into the index,
    /// persisting the updated cache. Dead entries are kept (sloppy
    /// update); use `refresh` to prune them.
    pub fn scan(&mut self, roots: &[PathBuf]) -> Result<usize> {
        let added = self.index.scan_all(roots, &self.config);
        self.index.save(&self.cache_fn)?;
        Ok(added)
    }

    /// Staleness-gated rescan: prunes and rebuilds only when the cache
    /// file is older than the configured threshold. Returns whether a
    /// rescan happened.
    pub fn refresh(&mut self, roots: &[PathBuf]) -> Result<bool> {
        self.index.refresh(roots, &self.cache_fn, &self.config)
    }

    /// All indexed paths matching a single needle
    pub fn search(&self, needle: &str) -> Vec<PathBuf> {
        matcher::search(&self.index, needle, &self.config)
    }

    /// Match a batch of records, one result per record
    pub fn search_records(&self, records: &[Record]) -> Vec<MatchResult> {
        matcher::search_records(&self.index, records, &self.config)
    }

    /// Build a materializer writing into `dest_dir`
    pub fn materializer<'a>(&'a self, dest_dir: &Path) -> Result<Materializer<'a>> {
        Materializer::new(dest_dir, &self.config)
    }
}

// -- Tests --
