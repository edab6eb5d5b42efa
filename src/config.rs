//! YAML configuration for the resolution pipeline.
//!
//! One file describes every stage. Sections that are omitted take their
//! defaults.
//!
//! ```yaml
//! version: "1.0"
//!
//! embedding:
//!   mode: "api"
//!   api_url: "http://localhost:8081/embed"
//!   model_name: "snowflake-arctic-embed-m"
//!   expected_dim: 768
//!
//! store:
//!   backend: "embedded"          # or "remote"
//!   corpus_path: "data/incidents.jsonl"
//!   compression: "zstd"
//!   # remote:
//!   #   url: "http://localhost:9000/search"
//!   #   timeout_secs: 30
//!
//! retrieval:
//!   floor: 0.60
//!   cap: 5
//!   malformed_rows: "degrade"   # or "fail"
//!
//! generation:
//!   mode: "api"
//!   api_provider: "openai"
//!   api_url: "http://localhost:8082/v1/chat/completions"
//!   model_name: "snowflake-arctic"
//!
//! pipeline:
//!   request_timeout_secs: 60
//! ```
//!
//! API keys may come from the environment instead of the file:
//! `RESOLVER_EMBEDDING_API_KEY`, `RESOLVER_GENERATION_API_KEY` and
//! `RESOLVER_STORE_API_KEY` each become a `Bearer` authorization header when
//! the file does not set one.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use generation::{GenerationConfig, HttpGenerator};
use index::{
    CompressionCodec, CompressionConfig, HttpVectorStore, IncidentIndex, IndexConfig, IndexError,
    RemoteStoreConfig, VectorStore,
};
use matcher::{RetrievalConfig, Retriever};
use semantic::{EmbeddingConfig, HttpEmbedder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::{ResolutionPipeline, DEFAULT_REQUEST_TIMEOUT};

pub const EMBEDDING_API_KEY_ENV: &str = "RESOLVER_EMBEDDING_API_KEY";
pub const GENERATION_API_KEY_ENV: &str = "RESOLVER_GENERATION_API_KEY";
pub const STORE_API_KEY_ENV: &str = "RESOLVER_STORE_API_KEY";

/// Errors that can occur when loading configuration or wiring the pipeline.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("vector store setup failed: {0}")]
    Store(#[from] IndexError),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub store: StoreYamlConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub pipeline: PipelineYamlConfig,
}

impl ResolverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse, fill credentials from the environment, and validate.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let mut config: ResolverConfig = serde_yaml::from_str(yaml)?;
        config.apply_env_credentials();
        config.validate()?;
        Ok(config)
    }

    /// Offline configuration: stub embedder and generator, empty embedded index.
    pub fn offline() -> Self {
        Self {
            embedding: EmbeddingConfig::fast(),
            generation: GenerationConfig::fast(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.embedding
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.store.validate()?;
        self.retrieval
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.generation
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.pipeline.validate()
    }

    /// Wire concrete adapters into a [`ResolutionPipeline`].
    pub fn build_pipeline(&self) -> Result<ResolutionPipeline, ConfigLoadError> {
        self.validate()?;

        let embedder = HttpEmbedder::new(self.embedding.clone())
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        let store = self.store.build()?;
        tracing::info!(store = %store.describe(), "vector store ready");
        let retriever = Retriever::new(store, self.retrieval.clone())
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        let generator = HttpGenerator::new(self.generation.clone())
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;

        Ok(
            ResolutionPipeline::new(Arc::new(embedder), retriever, Arc::new(generator))
                .with_request_timeout(self.pipeline.request_timeout()),
        )
    }

    fn apply_env_credentials(&mut self) {
        fill_bearer(&mut self.embedding.api_auth_header, EMBEDDING_API_KEY_ENV);
        fill_bearer(&mut self.generation.api_auth_header, GENERATION_API_KEY_ENV);
        if let Some(remote) = self.store.remote.as_mut() {
            fill_bearer(&mut remote.auth_header, STORE_API_KEY_ENV);
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            embedding: EmbeddingConfig::default(),
            store: StoreYamlConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            pipeline: PipelineYamlConfig::default(),
        }
    }
}

fn fill_bearer(header: &mut Option<String>, env_key: &str) {
    if header.is_some() {
        return;
    }
    if let Ok(key) = std::env::var(env_key) {
        let key = key.trim();
        if !key.is_empty() {
            *header = Some(format!("Bearer {key}"));
        }
    }
}

/// Vector store section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreYamlConfig {
    /// `"embedded"` (in-process index loaded from a corpus file) or `"remote"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// JSON array or JSON-lines corpus for the embedded index.
    #[serde(default)]
    pub corpus_path: Option<String>,

    /// `"zstd"` or `"none"`.
    #[serde(default = "default_compression")]
    pub compression: String,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,

    #[serde(default)]
    pub remote: Option<RemoteStoreConfig>,
}

fn default_backend() -> String {
    "embedded".to_string()
}

fn default_compression() -> String {
    "zstd".to_string()
}

fn default_compression_level() -> i32 {
    3
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            corpus_path: None,
            compression: default_compression(),
            compression_level: default_compression_level(),
            remote: None,
        }
    }
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.backend.as_str() {
            "embedded" => {}
            "remote" => match &self.remote {
                Some(remote) => remote
                    .validate()
                    .map_err(|e| ConfigLoadError::Validation(e.to_string()))?,
                None => {
                    return Err(ConfigLoadError::Validation(
                        "store.remote is required when store.backend is \"remote\"".into(),
                    ))
                }
            },
            other => {
                return Err(ConfigLoadError::Validation(format!(
                    "unknown store backend '{other}'"
                )))
            }
        }
        match self.compression.as_str() {
            "zstd" => {
                if !(1..=22).contains(&self.compression_level) {
                    return Err(ConfigLoadError::Validation(format!(
                        "compression_level must be in 1..=22, got {}",
                        self.compression_level
                    )));
                }
                Ok(())
            }
            "none" => Ok(()),
            other => Err(ConfigLoadError::Validation(format!(
                "unknown compression codec '{other}'"
            ))),
        }
    }

    fn index_config(&self) -> IndexConfig {
        let codec = match self.compression.as_str() {
            "none" => CompressionCodec::None,
            _ => CompressionCodec::Zstd,
        };
        IndexConfig::new().with_compression(CompressionConfig::new(codec, self.compression_level))
    }

    fn build(&self) -> Result<Arc<dyn VectorStore>, ConfigLoadError> {
        if self.backend == "remote" {
            let remote = self.remote.clone().ok_or_else(|| {
                ConfigLoadError::Validation("store.remote is required".into())
            })?;
            return Ok(Arc::new(HttpVectorStore::new(remote)?));
        }

        let index = match &self.corpus_path {
            Some(path) => IncidentIndex::from_corpus_file(self.index_config(), path)?,
            None => {
                tracing::warn!("no corpus_path configured; embedded index starts empty");
                IncidentIndex::new(self.index_config())?
            }
        };
        Ok(Arc::new(index))
    }
}

/// Orchestrator section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineYamlConfig {
    /// End-to-end deadline per request; `0` disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Default for PipelineYamlConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PipelineYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.request_timeout_secs > 3600 {
            return Err(ConfigLoadError::Validation(
                "request_timeout_secs must not exceed 3600".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}
