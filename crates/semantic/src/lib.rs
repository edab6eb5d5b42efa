//! Embedding adapter for the incident resolver.
//!
//! This crate turns raw incident text into an [`EmbeddingVector`] by calling
//! an embedding service. It is a pass-through wrapper: one outbound call per
//! invocation, no caching and no retry. Retry policy, if any, belongs to the
//! caller.
//!
//! Two modes are supported:
//!
//! - **API mode** - POST the text to a remote endpoint (`openai`, `hf`, or a
//!   `custom` JSON shape). The model identifier travels with every request.
//! - **Fast mode** - Deterministic, hash-seeded stub vectors. Handy for local
//!   runs and tests that must not touch the network.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{Embedder, EmbeddingConfig, HttpEmbedder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = EmbeddingConfig {
//!         api_url: Some("http://localhost:8081/embed".into()),
//!         ..Default::default()
//!     };
//!     let embedder = HttpEmbedder::new(cfg).unwrap();
//!     let vector = embedder.embed("API gateway timeout").await.unwrap();
//!     println!("{} dims from {}", vector.dim(), vector.model_name());
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod api;
mod stub;

use async_trait::async_trait;

pub use crate::config::EmbeddingConfig;
pub use crate::error::SemanticError;
pub use crate::types::EmbeddingVector;

use crate::api::semanticize_via_api;
use crate::stub::make_stub_embedding;

/// Converts `text` into an [`EmbeddingVector`] using the supplied [`EmbeddingConfig`].
pub async fn semanticize(text: &str, cfg: &EmbeddingConfig) -> Result<EmbeddingVector, SemanticError> {
    match cfg.mode.as_str() {
        "fast" => Ok(make_stub_embedding(text, cfg)),
        "api" => semanticize_via_api(text, cfg).await,
        other => Err(SemanticError::InvalidConfig(format!(
            "unknown embedding mode '{other}'"
        ))),
    }
}

/// Seam between the pipeline and whichever embedding service is in use.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Produce one vector for `text`.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, SemanticError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// [`Embedder`] backed by an [`EmbeddingConfig`] (API or fast mode).
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    cfg: EmbeddingConfig,
}

impl HttpEmbedder {
    /// Validates the config up front so misconfiguration fails at startup,
    /// not on the first request.
    pub fn new(cfg: EmbeddingConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.cfg
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, SemanticError> {
        semanticize(text, &self.cfg).await
    }

    fn model_name(&self) -> &str {
        &self.cfg.model_name
    }
}
