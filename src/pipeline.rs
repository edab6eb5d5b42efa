use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use generation::Generator;
use matcher::{EvidenceSet, Retriever};
use semantic::Embedder;
use serde::{Deserialize, Serialize};

use crate::prompt::compose;
use crate::{metrics_recorder, PipelineError};

/// Default end-to-end deadline for one request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Free-text description of a new incident. Never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentQuery(String);

impl IncidentQuery {
    /// Rejects empty or whitespace-only text. The text is otherwise kept verbatim.
    pub fn new(text: impl Into<String>) -> Result<Self, PipelineError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The response: evidence as plain data plus the raw generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub similar_incidents: EvidenceSet,
    pub ai_recommendation: String,
}

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PipelineStage {
    Validating = 0,
    Embedding = 1,
    Retrieving = 2,
    Composing = 3,
    Generating = 4,
    Done = 5,
    Failed = 6,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Validating => "validating",
            PipelineStage::Embedding => "embedding",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Composing => "composing",
            PipelineStage::Generating => "generating",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => PipelineStage::Validating,
            1 => PipelineStage::Embedding,
            2 => PipelineStage::Retrieving,
            3 => PipelineStage::Composing,
            4 => PipelineStage::Generating,
            5 => PipelineStage::Done,
            _ => PipelineStage::Failed,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage of one request, readable after its future is dropped.
struct StageTracker(AtomicU8);

impl StageTracker {
    fn new() -> Self {
        Self(AtomicU8::new(PipelineStage::Validating as u8))
    }

    fn enter(&self, stage: PipelineStage) {
        self.0.store(stage as u8, Ordering::Relaxed);
        tracing::debug!(stage = %stage, "entering stage");
    }

    fn current(&self) -> PipelineStage {
        PipelineStage::from_u8(self.0.load(Ordering::Relaxed))
    }
}

/// Embed, retrieve, compose, generate.
///
/// Holds only shared, read-only handles; any number of requests may run
/// through one pipeline concurrently.
pub struct ResolutionPipeline {
    embedder: Arc<dyn Embedder>,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    request_timeout: Option<Duration>,
}

impl ResolutionPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: Retriever,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            embedder,
            retriever,
            generator,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// `None` disables the deadline.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Validate `text`, then run the pipeline.
    pub async fn resolve(&self, text: &str) -> Result<ResolutionResult, PipelineError> {
        let query = match IncidentQuery::new(text) {
            Ok(query) => query,
            Err(err) => {
                tracing::info!("rejected blank incident description");
                record_request(Duration::ZERO, Err(&err));
                return Err(err);
            }
        };
        self.resolve_query(&query).await
    }

    /// Run an already-validated query under the request deadline.
    pub async fn resolve_query(
        &self,
        query: &IncidentQuery,
    ) -> Result<ResolutionResult, PipelineError> {
        let start = Instant::now();
        let tracker = StageTracker::new();

        let outcome = match self.request_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.run_stages(query, &tracker)).await {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::Timeout {
                        stage: tracker.current(),
                        after: limit,
                    }),
                }
            }
            None => self.run_stages(query, &tracker).await,
        };

        let elapsed = start.elapsed();
        match &outcome {
            Ok(result) => {
                tracker.enter(PipelineStage::Done);
                tracing::info!(
                    similar_incidents = result.similar_incidents.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "incident resolved"
                );
            }
            Err(err) => {
                let failed_in = err.stage();
                tracker.enter(PipelineStage::Failed);
                tracing::error!(
                    stage = %failed_in,
                    error = %err,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "incident resolution failed"
                );
            }
        }
        record_request(elapsed, outcome.as_ref().map(|r| r.similar_incidents.len()));
        outcome
    }

    async fn run_stages(
        &self,
        query: &IncidentQuery,
        tracker: &StageTracker,
    ) -> Result<ResolutionResult, PipelineError> {
        tracker.enter(PipelineStage::Embedding);
        let started = Instant::now();
        let vector = self.embedder.embed(query.as_str()).await;
        record_stage(PipelineStage::Embedding, started, vector.is_ok());
        let vector = vector?;
        tracing::info!(model = %self.embedder.model_name(), dim = vector.dim(), "embedded incident");

        tracker.enter(PipelineStage::Retrieving);
        let started = Instant::now();
        let evidence = self.retriever.retrieve_default(&vector).await;
        record_stage(PipelineStage::Retrieving, started, evidence.is_ok());
        let evidence = evidence?;
        tracing::info!(hits = evidence.len(), ids = ?evidence.ids(), "retrieved evidence");

        tracker.enter(PipelineStage::Composing);
        let started = Instant::now();
        let prompt = compose(query, &evidence);
        record_stage(PipelineStage::Composing, started, true);

        tracker.enter(PipelineStage::Generating);
        let started = Instant::now();
        let completion = self.generator.generate(prompt.as_str()).await;
        record_stage(PipelineStage::Generating, started, completion.is_ok());
        let ai_recommendation = completion?;
        tracing::info!(
            model = %self.generator.model_name(),
            chars = ai_recommendation.len(),
            "generated recommendation"
        );

        Ok(ResolutionResult {
            similar_incidents: evidence,
            ai_recommendation,
        })
    }
}

fn record_stage(stage: PipelineStage, started: Instant, success: bool) {
    if let Some(recorder) = metrics_recorder() {
        recorder.record_stage(stage, started.elapsed(), success);
    }
}

fn record_request(latency: Duration, outcome: Result<usize, &PipelineError>) {
    if let Some(recorder) = metrics_recorder() {
        recorder.record_request(latency, outcome);
    }
}
