use chrono::Local;
use log::warn;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Name of the report log written into the target directory
pub const RUN_LOG_NAME: &str = "tiffinder.log";

/// Line-oriented report log, one file per run inside the target directory.
///
/// Created (truncating any previous run's log) when materialization starts;
/// append-only and single-writer for the rest of the run. This is a report
/// sink for the operator, separate from the `log` facade used for
/// diagnostics.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Create or truncate the run log in `dest_dir`
    pub fn create(dest_dir: &Path) -> Result<Self> {
        let path = dest_dir.join(RUN_LOG_NAME);
        let file = File::create(&path)?;
        Ok(Self { path, file })
    }

    /// Append one timestamped line.
    ///
    /// A failing log write is reported through the diagnostic logger but
    /// never aborts the batch that is being logged.
    pub fn entry(&mut self, message: &str) {
        let stamp = Local::now().format("%Y%m%d %I:%M:%S %p");
        if let Err(e) = writeln!(self.file, "{}: {}", stamp, message) {
            warn!("Cannot append to {}: {}", self.path.display(), e);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// -- Tests --
