//! Retrieval-augmented incident resolution.
//!
//! A free-text incident description goes through five stages:
//!
//! 1. **Validating** - blank text is rejected before any outbound call.
//! 2. **Embedding** - [`semantic::Embedder`] turns the text into a vector.
//! 3. **Retrieving** - [`matcher::Retriever`] finds historical incidents whose
//!    cosine similarity clears the floor (default 0.60), at most `cap` of them
//!    (default 5), best first.
//! 4. **Composing** - [`compose`] renders text and evidence into a fixed,
//!    versioned prompt.
//! 5. **Generating** - [`generation::Generator`] returns the completion unmodified.
//!
//! The result pairs the evidence with the generated text. No stage is retried;
//! a failure anywhere fails the request, and the whole run is bounded by a
//! per-request deadline.
//!
//! ```no_run
//! use resolver::ResolverConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ResolverConfig::from_file("resolver.yaml")?.build_pipeline()?;
//! let result = pipeline.resolve("API gateway timeout when payload delivery happened").await?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pipeline;
pub mod prompt;

pub use config::{ConfigLoadError, ResolverConfig};
pub use pipeline::{
    IncidentQuery, PipelineStage, ResolutionPipeline, ResolutionResult, DEFAULT_REQUEST_TIMEOUT,
};
pub use prompt::{compose, ResolutionPrompt, PROMPT_TEMPLATE_VERSION, SECTION_NAMES};

pub use generation::{GenerationConfig, GenerationError, Generator, HttpGenerator};
pub use index::{HistoricalIncident, IncidentIndex, IndexError, StoreRow, VectorStore};
pub use matcher::{
    EvidenceItem, EvidenceSet, MalformedRowPolicy, RetrievalConfig, RetrievalError, Retriever,
};
pub use semantic::{Embedder, EmbeddingConfig, EmbeddingVector, HttpEmbedder, SemanticError};

use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;
use thiserror::Error;

/// Errors that end a resolution request.
///
/// Only [`PipelineError::InvalidInput`] is caller-correctable; every other
/// variant is an internal failure whose detail belongs in logs.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Incident description is required.")]
    InvalidInput,
    #[error("embedding failed: {0}")]
    Embedding(#[from] SemanticError),
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("request deadline of {after:?} exceeded while {stage}")]
    Timeout { stage: PipelineStage, after: Duration },
}

impl PipelineError {
    /// Stage the error originated in.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::InvalidInput => PipelineStage::Validating,
            PipelineError::Embedding(_) => PipelineStage::Embedding,
            PipelineError::Retrieval(_) => PipelineStage::Retrieving,
            PipelineError::Generation(_) => PipelineStage::Generating,
            PipelineError::Timeout { stage, .. } => *stage,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, PipelineError::InvalidInput)
    }
}

/// Metrics observer for pipeline runs.
pub trait PipelineMetrics: Send + Sync {
    fn record_stage(&self, stage: PipelineStage, latency: Duration, success: bool);
    /// `outcome` carries the evidence count on success.
    fn record_request(&self, latency: Duration, outcome: Result<usize, &PipelineError>);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}
