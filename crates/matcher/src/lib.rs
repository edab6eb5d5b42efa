//! # Incident Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` is the similarity retriever. Given the embedding of a new
//! incident, it asks a [`VectorStore`](index::VectorStore) for historically
//! similar incidents and turns the answer into an [`EvidenceSet`]: every item
//! scores strictly above the floor, identifiers are unique, items are ordered
//! best first (ties broken by ascending identifier), and there are never more
//! than `cap` of them.
//!
//! ## Core Types
//!
//! - [`RetrievalConfig`]: `floor` (default 0.60), `cap` (default 5), and the
//!   [`MalformedRowPolicy`] applied when the store's rows cannot be decoded.
//! - [`EvidenceItem`] / [`EvidenceSet`]: the per-request evidence handed to the
//!   prompt composer and returned to the caller.
//! - [`Retriever`]: wraps a shared store handle and applies the policy.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use index::{IncidentIndex, IndexConfig};
//! use matcher::{RetrievalConfig, Retriever};
//! use semantic::EmbeddingVector;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let index = IncidentIndex::from_corpus_file(IndexConfig::new(), "incidents.jsonl")?;
//! let retriever = Retriever::new(Arc::new(index), RetrievalConfig::default())?;
//!
//! let query = EmbeddingVector::new(vec![0.1; 768], "snowflake-arctic-embed-m", true);
//! let evidence = retriever.retrieve(&query, 0.60, 5).await?;
//! for item in &evidence {
//!     println!("{} {:.2}", item.incident_id, item.similarity);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Install a [`RetrievalMetrics`] implementation via [`set_retrieval_metrics`]
//! to record per-call latency and hit counts.

pub mod engine;
pub mod metrics;
pub mod types;

pub use crate::engine::Retriever;
pub use crate::metrics::{set_retrieval_metrics, RetrievalMetrics};
pub use crate::types::{
    EvidenceItem, EvidenceSet, MalformedRowPolicy, RetrievalConfig, RetrievalError,
};
