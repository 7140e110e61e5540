use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::matcher::MatchResult;
use crate::naming::{self, NamingDecision, NamingPolicy};
use crate::preview::write_preview;
use crate::runlog::RunLog;

/// Per-item result of a materialization run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// File written to this destination path
    Copied(PathBuf),

    /// An identical file was already present at the destination
    SkippedIdentical,

    /// The indexed source no longer exists on disk
    SkippedSourceMissing,

    /// Log-only run, nothing written
    Logged,

    /// Any other per-item failure; the batch continues
    Failed(String),
}

/// Ordered record of what happened to each source in one run
#[derive(Debug, Default)]
pub struct Report {
    items: Vec<(PathBuf, Outcome)>,
}

impl Report {
    fn record(&mut self, source: &Path, outcome: Outcome) {
        self.items.push((source.to_path_buf(), outcome));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PathBuf, Outcome)> {
        self.items.iter()
    }

    pub fn copied(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Copied(_)))
    }

    pub fn skipped_identical(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SkippedIdentical))
    }

    pub fn missing(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SkippedSourceMissing))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn summary(&self) -> String {
        format!(
            "{} copied, {} identical skipped, {} missing, {} failed",
            self.copied(),
            self.skipped_identical(),
            self.missing(),
            self.failed()
        )
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.items.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Copies, previews or logs a batch of matched files into one target
/// directory.
///
/// Construction validates the destination and opens the run log, so a bad
/// destination fails before any writes. One failing item never aborts the
/// batch; everything that can complete does, and the report carries the
/// aggregate outcome.
pub struct Materializer<'a> {
    dest_dir: PathBuf,
    config: &'a Config,
    log: RunLog,
}

impl<'a> Materializer<'a> {
    pub fn new(dest_dir: &Path, config: &'a Config) -> Result<Self> {
        if !dest_dir.is_dir() {
            return Err(Error::InvalidDestination(dest_dir.to_path_buf()));
        }
        let log = RunLog::create(dest_dir)?;
        Ok(Self {
            dest_dir: dest_dir.to_path_buf(),
            config,
            log,
        })
    }

    /// Copy every source under the given naming policy
    pub fn copy_all(&mut self, sources: &[PathBuf], policy: &NamingPolicy) -> Report {
        let mut report = Report::default();
        for source in sources {
            let outcome = self.copy_one(source, policy);
            report.record(source, outcome);
        }
        info!("Copy run done: {}", report.summary());
        report
    }

    /// Copy record matches under the hash-based naming scheme,
    /// `{object id}.{md5}.{ext}`. Falls back to the identifier when a
    /// record carries no object id.
    pub fn copy_records(&mut self, matches: &[MatchResult]) -> Report {
        let mut report = Report::default();
        for result in matches {
            let id = result
                .secondary_id
                .clone()
                .unwrap_or_else(|| result.identifier.clone());
            let policy = NamingPolicy::Composite(id.clone());
            for source in &result.paths {
                info!("{} -> {} -> {}", result.identifier, id, source.display());
                let outcome = self.copy_one(source, &policy);
                report.record(source, outcome);
            }
        }
        info!("Record copy run done: {}", report.summary());
        report
    }

    /// Write bounded jpg previews instead of copying the masters
    pub fn preview_all(&mut self, sources: &[PathBuf]) -> Report {
        let policy = NamingPolicy::ChangeExtension("jpg".to_string());
        let mut report = Report::default();
        for source in sources {
            let outcome = self.preview_one(source, &policy);
            report.record(source, outcome);
        }
        info!("Preview run done: {}", report.summary());
        report
    }

    /// Write the run log only; no image data leaves the sources
    pub fn log_only(&mut self, sources: &[PathBuf]) -> Report {
        let mut report = Report::default();
        for source in sources {
            if source.is_file() {
                self.log.entry(&source.display().to_string());
                report.record(source, Outcome::Logged);
            } else {
                self.log.entry(&format!("File not found: {}", source.display()));
                report.record(source, Outcome::SkippedSourceMissing);
            }
        }
        report
    }

    fn copy_one(&mut self, source: &Path, policy: &NamingPolicy) -> Outcome {
        if !source.is_file() {
            self.log.entry(&format!("File not found: {}", source.display()));
            return Outcome::SkippedSourceMissing;
        }
        match naming::resolve(source, &self.dest_dir, policy, self.config) {
            Ok(NamingDecision::Skip) => {
                self.log.entry(&format!(
                    "identical file exists already at target, no copy: {}",
                    source.display()
                ));
                Outcome::SkippedIdentical
            }
            Ok(NamingDecision::Use(target)) => {
                match copy_with_times(source, &target) {
                    Ok(()) => {
                        self.log
                            .entry(&format!("{} -> {}", source.display(), target.display()));
                        Outcome::Copied(target)
                    }
                    Err(e) => {
                        warn!("Copy failed for {}: {}", source.display(), e);
                        self.log
                            .entry(&format!("Copy failed: {}: {}", source.display(), e));
                        Outcome::Failed(e.to_string())
                    }
                }
            }
            Err(e) => {
                warn!("Cannot resolve target for {}: {}", source.display(), e);
                self.log
                    .entry(&format!("Failed: {}: {}", source.display(), e));
                Outcome::Failed(e.to_string())
            }
        }
    }

    fn preview_one(&mut self, source: &Path, policy: &NamingPolicy) -> Outcome {
        if !source.is_file() {
            self.log.entry(&format!("File not found: {}", source.display()));
            return Outcome::SkippedSourceMissing;
        }
        match naming::resolve(source, &self.dest_dir, policy, self.config) {
            // ChangeExtension never skips, but keep the arm total
            Ok(NamingDecision::Skip) => Outcome::SkippedIdentical,
            Ok(NamingDecision::Use(target)) => {
                match write_preview(source, &target, self.config.preview_max_edge) {
                    Ok(()) => {
                        self.log
                            .entry(&format!("{} -> {}", source.display(), target.display()));
                        Outcome::Copied(target)
                    }
                    Err(e) => {
                        warn!("Preview failed for {}: {}", source.display(), e);
                        self.log
                            .entry(&format!("Preview failed: {}: {}", source.display(), e));
                        Outcome::Failed(e.to_string())
                    }
                }
            }
            Err(e) => {
                self.log
                    .entry(&format!("Failed: {}: {}", source.display(), e));
                Outcome::Failed(e.to_string())
            }
        }
    }
}

/// Byte-preserving copy keeping the source's modification time
fn copy_with_times(source: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(source, target)?;
    let metadata = std::fs::metadata(source)?;
    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(target, mtime)?;
    Ok(())
}

// -- Tests --
