use fxhash::hash64;

use crate::types::l2_normalize_in_place;
use crate::{EmbeddingConfig, EmbeddingVector};

const STUB_DIM: usize = 768;

/// Deterministic stub used when mode is `"fast"`.
/// Generates sinusoid values derived from a hash of the input text so identical
/// text always maps to the identical vector, with no network involved.
pub(crate) fn make_stub_embedding(text: &str, cfg: &EmbeddingConfig) -> EmbeddingVector {
    let dim = cfg.expected_dim.unwrap_or(STUB_DIM);
    let mut v = vec![0f32; dim];
    let h = hash64(text.as_bytes());
    for (idx, value) in v.iter_mut().enumerate() {
        *value = ((h >> (idx % 32)) as f32 * 0.0001).sin();
    }
    if cfg.normalize {
        l2_normalize_in_place(&mut v);
    }
    EmbeddingVector::new(v, cfg.model_name.clone(), cfg.normalize)
}
