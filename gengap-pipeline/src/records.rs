//! Input publication records
//!
//! The literature-fetch collaborator delivers a flat, deduplicated
//! record stream as JSON Lines. The pipeline treats each line as one
//! publication; malformed lines fail the whole read so a truncated
//! export is caught before any partial state is written.

use gengap_common::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One publication as delivered by the fetch collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct PublicationRecord {
    /// External source identifier (PMID, arXiv id, ...)
    pub source_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub year: i64,
    #[serde(default)]
    pub journal: Option<String>,
    /// Source corpus tag; may instead be supplied per ingest run
    #[serde(default)]
    pub dataset: Option<String>,
    /// Ordered author list, exactly as it appeared in the source
    #[serde(default)]
    pub authors: Vec<String>,
}

/// Read a JSONL record file. Blank lines are ignored.
pub fn read_records(path: &Path) -> Result<Vec<PublicationRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PublicationRecord = serde_json::from_str(&line).map_err(|e| {
            Error::InvalidInput(format!(
                "{}:{}: malformed record: {}",
                path.display(),
                line_no + 1,
                e
            ))
        })?;
        records.push(record);
    }

    Ok(records)
}
