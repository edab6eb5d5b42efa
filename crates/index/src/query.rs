use crate::{IncidentIndex, IndexError, StoreRow};
use std::cmp::Ordering;

/// Chunk size for auto-vectorized dot products.
const SIMD_CHUNK_SIZE: usize = 32;

/// Cosine similarity between two f32 vectors, in [-1, 1].
///
/// Mismatched lengths, empty inputs, and zero vectors score `0.0`.
/// The accumulation is chunked so the compiler can vectorize the inner loop.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;

    let mut a_chunks = a.chunks_exact(SIMD_CHUNK_SIZE);
    let mut b_chunks = b.chunks_exact(SIMD_CHUNK_SIZE);
    for (ca, cb) in a_chunks.by_ref().zip(b_chunks.by_ref()) {
        let (d, na, nb) = accumulate(ca, cb);
        dot += d;
        norm_a += na;
        norm_b += nb;
    }
    let (d, na, nb) = accumulate(a_chunks.remainder(), b_chunks.remainder());
    dot += d;
    norm_a += na;
    norm_b += nb;

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[inline]
fn accumulate(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    let mut dot = 0f32;
    let mut na = 0f32;
    let mut nb = 0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    (dot, na, nb)
}

/// Order rows best-first; equal scores fall back to ascending incident id so
/// repeated queries return byte-identical listings.
pub(crate) fn rank_rows(rows: &mut [StoreRow]) {
    rows.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.incident_id.cmp(&b.incident_id))
    });
}

impl IncidentIndex {
    /// Linear cosine scan: keep rows strictly above `floor`, best first, at most `cap`.
    pub fn search(&self, vector: &[f32], floor: f64, cap: usize) -> Result<Vec<StoreRow>, IndexError> {
        if vector.is_empty() {
            return Err(IndexError::InvalidQuery("query vector is empty".into()));
        }
        if cap == 0 {
            return Ok(Vec::new());
        }

        let mut scored = Vec::new();
        let mut skipped_dims = 0usize;
        {
            let vectors = self
                .vectors
                .read()
                .map_err(|_| IndexError::backend("poisoned lock"))?;
            for (incident_id, embedding) in vectors.iter() {
                if embedding.len() != vector.len() {
                    skipped_dims += 1;
                    continue;
                }
                let score = f64::from(cosine_similarity(vector, embedding));
                if score.is_finite() && score > floor {
                    scored.push((incident_id.clone(), score));
                }
            }
        }

        if skipped_dims > 0 {
            log::warn!(
                "skipped {skipped_dims} incidents whose embedding dimension differs from the query ({})",
                vector.len()
            );
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(cap);

        let mut rows = Vec::with_capacity(scored.len());
        for (incident_id, similarity) in scored {
            if let Some(record) = self.get(&incident_id)? {
                rows.push(StoreRow {
                    incident_id: record.incident_id,
                    short_desc: record.short_desc,
                    resolution: record.resolution,
                    similarity,
                });
            }
        }
        log::debug!("index search returned {} rows above {floor}", rows.len());
        Ok(rows)
    }
}
