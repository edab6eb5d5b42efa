use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use index::{StoreRow, VectorStore};
use semantic::EmbeddingVector;

use crate::metrics::metrics_recorder;
use crate::types::{
    rank, validate_bounds, EvidenceItem, EvidenceSet, MalformedRowPolicy, RetrievalConfig,
    RetrievalError,
};


/// Similarity retriever over a [`VectorStore`].
///
/// The store is asked to filter and rank, but its answer is not trusted: every
/// row is re-checked against the floor, deduplicated, re-ranked, and capped here.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    cfg: RetrievalConfig,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, cfg: RetrievalConfig) -> Result<Self, RetrievalError> {
        cfg.validate()?;
        Ok(Self { store, cfg })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Retrieve with the configured floor and cap.
    pub async fn retrieve_default(
        &self,
        vector: &EmbeddingVector,
    ) -> Result<EvidenceSet, RetrievalError> {
        self.retrieve(vector, self.cfg.floor, self.cfg.cap).await
    }

    /// One store query, then post-processing into an [`EvidenceSet`].
    ///
    /// An empty result is not an error. Malformed rows follow the configured
    /// [`MalformedRowPolicy`]; an unreachable store always fails.
    pub async fn retrieve(
        &self,
        vector: &EmbeddingVector,
        floor: f64,
        cap: usize,
    ) -> Result<EvidenceSet, RetrievalError> {
        validate_bounds(floor, cap)?;
        let start = Instant::now();

        let (evidence, degraded) = match self
            .store
            .similarity_search(vector.as_slice(), floor, cap)
            .await
            .map_err(RetrievalError::from)
        {
            Ok(rows) => (postprocess_rows(rows, floor, cap), false),
            Err(RetrievalError::MalformedRows(detail))
                if self.cfg.malformed_rows == MalformedRowPolicy::Degrade =>
            {
                tracing::warn!(
                    store = %self.store.describe(),
                    error = %detail,
                    "vector store returned malformed rows; continuing without evidence"
                );
                (EvidenceSet::empty(), true)
            }
            Err(err) => return Err(err),
        };

        let latency = start.elapsed();
        tracing::debug!(
            hits = evidence.len(),
            floor,
            cap,
            latency_ms = latency.as_millis() as u64,
            "retrieval complete"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_retrieval(latency, evidence.len(), degraded);
        }

        Ok(evidence)
    }
}

/// Drop non-finite scores, clamp to [0, 1], keep `> floor`, dedup by id
/// (best score wins), rank, truncate to `cap`.
pub(crate) fn postprocess_rows(rows: Vec<StoreRow>, floor: f64, cap: usize) -> EvidenceSet {
    let mut best: HashMap<String, EvidenceItem> = HashMap::with_capacity(rows.len());

    for row in rows {
        if !row.similarity.is_finite() {
            continue;
        }
        let mut item = EvidenceItem::from(row);
        item.similarity = item.similarity.clamp(0.0, 1.0);
        if item.similarity <= floor {
            continue;
        }
        match best.get(&item.incident_id) {
            Some(existing) if existing.similarity >= item.similarity => {}
            _ => {
                best.insert(item.incident_id.clone(), item);
            }
        }
    }

    let mut items: Vec<EvidenceItem> = best.into_values().collect();
    rank(&mut items);
    items.truncate(cap);
    EvidenceSet::from_items(items)
}
