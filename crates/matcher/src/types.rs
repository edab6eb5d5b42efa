use index::{IndexError, StoreRow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// What to do when the store answers with rows that cannot be decoded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    /// Log a warning and continue with an empty evidence set.
    #[default]
    Degrade,
    /// Surface a [`RetrievalError::MalformedRows`].
    Fail,
}

/// Retrieval tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Rows must score strictly above this cosine similarity.
    #[serde(default = "RetrievalConfig::default_floor")]
    pub floor: f64,
    /// Maximum number of evidence items returned.
    #[serde(default = "RetrievalConfig::default_cap")]
    pub cap: usize,
    #[serde(default)]
    pub malformed_rows: MalformedRowPolicy,
}

impl RetrievalConfig {
    pub(crate) fn default_floor() -> f64 {
        0.60
    }

    pub(crate) fn default_cap() -> usize {
        5
    }

    pub fn validate(&self) -> Result<(), RetrievalError> {
        validate_bounds(self.floor, self.cap)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            floor: Self::default_floor(),
            cap: Self::default_cap(),
            malformed_rows: MalformedRowPolicy::default(),
        }
    }
}

pub(crate) fn validate_bounds(floor: f64, cap: usize) -> Result<(), RetrievalError> {
    if !floor.is_finite() || !(0.0..1.0).contains(&floor) {
        return Err(RetrievalError::InvalidConfig(format!(
            "floor must be in [0.0, 1.0), got {floor}"
        )));
    }
    if cap == 0 {
        return Err(RetrievalError::InvalidConfig(
            "cap must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// A historical incident judged similar to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceItem {
    pub incident_id: String,
    pub short_desc: String,
    pub resolution: String,
    /// Cosine similarity in [0.0, 1.0].
    pub similarity: f64,
}

impl EvidenceItem {
    pub fn new(
        incident_id: impl Into<String>,
        short_desc: impl Into<String>,
        resolution: impl Into<String>,
        similarity: f64,
    ) -> Self {
        Self {
            incident_id: incident_id.into(),
            short_desc: short_desc.into(),
            resolution: resolution.into(),
            similarity,
        }
    }
}

impl From<StoreRow> for EvidenceItem {
    fn from(row: StoreRow) -> Self {
        Self {
            incident_id: row.incident_id,
            short_desc: row.short_desc,
            resolution: row.resolution,
            similarity: row.similarity,
        }
    }
}

/// Ranked evidence, best first. Serializes as a plain JSON array.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EvidenceSet(Vec<EvidenceItem>);

impl EvidenceSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a set from arbitrary items, ranking them descending by
    /// similarity with ascending identifier as the tie-break.
    pub fn from_items(mut items: Vec<EvidenceItem>) -> Self {
        rank(&mut items);
        Self(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvidenceItem> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[EvidenceItem] {
        &self.0
    }

    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.incident_id.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<EvidenceItem> {
        self.0
    }
}

impl<'a> IntoIterator for &'a EvidenceSet {
    type Item = &'a EvidenceItem;
    type IntoIter = std::slice::Iter<'a, EvidenceItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub(crate) fn rank(items: &mut [EvidenceItem]) {
    items.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.incident_id.cmp(&b.incident_id))
    });
}

/// Errors produced by the retrieval layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("invalid retrieval config: {0}")]
    InvalidConfig(String),
    /// The store could not be reached or answered with an error.
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),
    /// The store's rows could not be decoded (only under [`MalformedRowPolicy::Fail`]).
    #[error("malformed rows from vector store: {0}")]
    MalformedRows(String),
    #[error("vector store error: {0}")]
    Store(String),
}

impl From<IndexError> for RetrievalError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Unavailable(msg) => RetrievalError::StoreUnavailable(msg),
            IndexError::MalformedRows(msg) => RetrievalError::MalformedRows(msg),
            other => RetrievalError::Store(other.to_string()),
        }
    }
}
