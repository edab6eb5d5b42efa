use serde::{Deserialize, Serialize};

/// Fixed-dimensionality vector produced from incident text.
///
/// Only the embedding adapter and the vector store look inside; everything in
/// between passes it along untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingVector {
    values: Vec<f32>,
    model_name: String,
    normalized: bool,
}

impl EmbeddingVector {
    pub fn new(values: Vec<f32>, model_name: impl Into<String>, normalized: bool) -> Self {
        Self {
            values,
            model_name: model_name.into(),
            normalized,
        }
    }

    /// Raw components, as sent to the vector store.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Model that produced the vector.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }
}

/// In-place L2 normalization. Zero vectors are left untouched.
pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}
