use std::path::PathBuf;

use crate::config::Config;
use crate::index::PathIndex;
use crate::records::Record;

/// Paths matched for one queried identifier
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The needle that was looked up
    pub identifier: String,

    /// Correlated id from the source record, used by hash-based naming
    pub secondary_id: Option<String>,

    /// Matching index paths, in index iteration order
    pub paths: Vec<PathBuf>,
}

/// Return every indexed path whose search key contains `needle`.
///
/// Substring containment, not exact or tokenized match: identifiers are
/// free-form and often appear as the prefix of a longer descriptive
/// filename. False positives are the accepted cost of recall. An empty
/// needle matches every entry; callers guard against that if undesired.
pub fn search(index: &PathIndex, needle: &str, config: &Config) -> Vec<PathBuf> {
    if config.case_insensitive {
        let needle = needle.to_lowercase();
        index
            .iter()
            .filter(|(_, key)| key.to_lowercase().contains(&needle))
            .map(|(path, _)| path.clone())
            .collect()
    } else {
        index
            .iter()
            .filter(|(_, key)| key.contains(needle))
            .map(|(path, _)| path.clone())
            .collect()
    }
}

/// Look up a batch of records, one `MatchResult` per record, record order
/// preserved.
pub fn search_records(index: &PathIndex, records: &[Record], config: &Config) -> Vec<MatchResult> {
    records
        .iter()
        .map(|record| MatchResult {
            identifier: record.identifier.clone(),
            secondary_id: record.secondary_id.clone(),
            paths: search(index, &record.identifier, config),
        })
        .collect()
}

// -- Tests --
