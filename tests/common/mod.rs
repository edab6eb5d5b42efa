//! Test doubles for the three outbound collaborators.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use resolver::{
    Embedder, EmbeddingVector, GenerationError, Generator, IndexError, ResolutionPipeline,
    RetrievalConfig, Retriever, SemanticError, StoreRow, VectorStore,
};

pub const GATEWAY_TEXT: &str = "API gateway timeout when payload delivery happened";

pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl FakeEmbedder {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay: None,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            delay: None,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, SemanticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SemanticError::Upstream("HTTP error 503: unavailable".into()));
        }
        let seed = text.len() as f32;
        Ok(EmbeddingVector::new(vec![1.0, seed, 0.0], "fake-embed", false))
    }

    fn model_name(&self) -> &str {
        "fake-embed"
    }
}

pub struct FakeStore {
    pub rows: Result<Vec<StoreRow>, IndexError>,
    pub calls: AtomicUsize,
}

impl FakeStore {
    pub fn with_rows(rows: Vec<StoreRow>) -> Arc<Self> {
        Arc::new(Self {
            rows: Ok(rows),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: IndexError) -> Arc<Self> {
        Arc::new(Self {
            rows: Err(err),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn similarity_search(
        &self,
        _vector: &[f32],
        _floor: f64,
        _cap: usize,
    ) -> Result<Vec<StoreRow>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.rows.clone()
    }

    fn describe(&self) -> String {
        "fake store".into()
    }
}

pub struct FakeGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub reply: Result<String, GenerationError>,
    pub delay: Option<Duration>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            reply: Ok(text.to_string()),
            delay: None,
        })
    }

    pub fn failing(err: GenerationError) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            reply: Err(err),
            delay: None,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            reply: Ok("late".into()),
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }

    fn model_name(&self) -> &str {
        "fake-llm"
    }
}

pub fn row(id: &str, short_desc: &str, resolution: &str, similarity: f64) -> StoreRow {
    StoreRow::new(id, short_desc, resolution, similarity)
}

pub fn pipeline(
    embedder: Arc<FakeEmbedder>,
    store: Arc<FakeStore>,
    generator: Arc<FakeGenerator>,
) -> ResolutionPipeline {
    pipeline_with(embedder, store, generator, RetrievalConfig::default())
}

pub fn pipeline_with(
    embedder: Arc<FakeEmbedder>,
    store: Arc<FakeStore>,
    generator: Arc<FakeGenerator>,
    retrieval: RetrievalConfig,
) -> ResolutionPipeline {
    let retriever = Retriever::new(store, retrieval).expect("valid retrieval config");
    ResolutionPipeline::new(embedder, retriever, generator)
}
