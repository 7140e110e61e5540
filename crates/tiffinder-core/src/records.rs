use std::path::Path;

use crate::error::{Error, Result};

/// One identifier record from an inventory export or needle list.
///
/// The inventory export and spreadsheet formats of the upstream systems are
/// reduced to this shape; the engine never sees their wire formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Free-form identifier used as the search needle
    pub identifier: String,

    /// Correlated object id, when the source carries one
    pub secondary_id: Option<String>,
}

impl Record {
    pub fn needle(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secondary_id: None,
        }
    }
}

/// Read needles from the first column of a CSV file, order preserved,
/// blank cells skipped.
pub fn needles_from_csv(path: &Path) -> Result<Vec<Record>> {
    if !path.is_file() {
        return Err(Error::SpreadsheetMissing(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| malformed(path, e))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| malformed(path, e))?;
        if let Some(cell) = row.get(0) {
            let needle = cell.trim();
            if !needle.is_empty() {
                records.push(Record::needle(needle));
            }
        }
    }
    Ok(records)
}

/// Read `(identifier, object id)` records from a two-column CSV file.
///
/// Rows with a blank identifier are skipped; a blank second column yields
/// a record without secondary id.
pub fn records_from_csv(path: &Path) -> Result<Vec<Record>> {
    if !path.is_file() {
        return Err(Error::SpreadsheetMissing(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| malformed(path, e))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| malformed(path, e))?;
        let identifier = row.get(0).map(str::trim).unwrap_or_default();
        if identifier.is_empty() {
            continue;
        }
        let secondary_id = row
            .get(1)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        records.push(Record {
            identifier: identifier.to_string(),
            secondary_id,
        });
    }
    Ok(records)
}

fn malformed(path: &Path, e: csv::Error) -> Error {
    Error::ExportMalformed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

// -- Tests --
