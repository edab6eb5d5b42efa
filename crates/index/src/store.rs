use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{IncidentIndex, IndexError};

/// One row of a similarity search: an incident projection plus its score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreRow {
    pub incident_id: String,
    pub short_desc: String,
    pub resolution: String,
    /// Cosine similarity between the query vector and the incident's embedding.
    pub similarity: f64,
}

impl StoreRow {
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

/// The narrow interface the resolver uses to reach the historical corpus.
///
/// Implementations filter to `similarity > floor`, order best-first and stop
/// at `cap`; callers still re-check, because remote stores are not trusted to.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn similarity_search(
        &self,
        vector: &[f32],
        floor: f64,
        cap: usize,
    ) -> Result<Vec<StoreRow>, IndexError>;

    /// Short label for logs and readiness output.
    fn describe(&self) -> String;
}

#[async_trait]
impl VectorStore for IncidentIndex {
    async fn similarity_search(
        &self,
        vector: &[f32],
        floor: f64,
        cap: usize,
    ) -> Result<Vec<StoreRow>, IndexError> {
        // The scan is CPU-bound; keep it off the async workers so request
        // deadlines can still fire while it runs.
        let index = self.clone();
        let query = vector.to_vec();
        tokio::task::spawn_blocking(move || index.search(&query, floor, cap))
            .await
            .map_err(|e| IndexError::backend(format!("search task failed: {e}")))?
    }

    fn describe(&self) -> String {
        match self.len() {
            Ok(n) => format!("embedded index ({n} incidents)"),
            Err(_) => "embedded index".to_string(),
        }
    }
}
