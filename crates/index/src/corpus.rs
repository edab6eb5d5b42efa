//! Corpus loading: a JSON array or JSON-lines file of [`HistoricalIncident`]s.

use std::fs;
use std::path::Path;

use crate::{HistoricalIncident, IncidentIndex, IndexConfig, IndexError};

impl IncidentIndex {
    /// Build an index from a corpus file.
    ///
    /// A file whose first non-blank character is `[` is read as one JSON array;
    /// anything else is read as JSON lines, skipping blank lines.
    pub fn from_corpus_file<P: AsRef<Path>>(cfg: IndexConfig, path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| IndexError::Corpus(format!("failed to read {}: {e}", path.display())))?;
        let records = parse_corpus(&content)?;
        let index = Self::new(cfg)?;
        index.batch_insert(&records)?;
        log::info!(
            "loaded {} historical incidents from {}",
            records.len(),
            path.display()
        );
        Ok(index)
    }
}

pub(crate) fn parse_corpus(content: &str) -> Result<Vec<HistoricalIncident>, IndexError> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content)
            .map_err(|e| IndexError::Corpus(format!("invalid corpus JSON: {e}")));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(lineno, line)| {
            serde_json::from_str(line)
                .map_err(|e| IndexError::Corpus(format!("line {}: {e}", lineno + 1)))
        })
        .collect()
}
