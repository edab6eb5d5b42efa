mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::*;
use index::{IndexBackend, IndexConfig, InMemoryBackend};
use resolver::{
    GenerationError, HistoricalIncident, IncidentIndex, IndexError, MalformedRowPolicy,
    PipelineError, PipelineStage, ResolutionPipeline, RetrievalConfig, RetrievalError, Retriever,
};

/// Backend whose record reads stall the calling thread, standing in for a
/// scan over a very large corpus.
struct StallingBackend {
    inner: InMemoryBackend,
    stall: Duration,
}

impl IndexBackend for StallingBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        std::thread::sleep(self.stall);
        self.inner.get(key)
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        self.inner.batch_put(entries)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.inner.scan(visitor)
    }

    fn len(&self) -> Result<usize, IndexError> {
        self.inner.len()
    }
}

#[tokio::test]
async fn blank_input_never_reaches_the_embedder() {
    let embedder = FakeEmbedder::ok();
    let store = FakeStore::with_rows(vec![]);
    let generator = FakeGenerator::replying("x");
    let pipeline = pipeline(embedder.clone(), store.clone(), generator.clone());

    for text in ["", "   ", "\n\t  \r\n"] {
        let err = pipeline.resolve(text).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput));
        assert_eq!(err.to_string(), "Incident description is required.");
    }
    assert_eq!(embedder.calls(), 0);
    assert_eq!(store.calls(), 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn embedding_failure_stops_the_pipeline() {
    let embedder = FakeEmbedder::failing();
    let store = FakeStore::with_rows(vec![row("INC001", "Gateway 504", "Restarted LB", 0.82)]);
    let generator = FakeGenerator::replying("x");
    let pipeline = pipeline(embedder.clone(), store.clone(), generator.clone());

    let err = pipeline.resolve(GATEWAY_TEXT).await.unwrap_err();
    assert!(matches!(err, PipelineError::Embedding(_)));
    assert_eq!(err.stage(), PipelineStage::Embedding);
    assert_eq!(embedder.calls(), 1);
    assert_eq!(store.calls(), 0, "no retrieval after embedding failure");
    assert_eq!(generator.calls(), 0, "no generation after embedding failure");
}

#[tokio::test]
async fn unavailable_store_fails_before_generation() {
    let generator = FakeGenerator::replying("x");
    let pipeline = pipeline(
        FakeEmbedder::ok(),
        FakeStore::failing(IndexError::Unavailable("connection refused".into())),
        generator.clone(),
    );
    let err = pipeline.resolve(GATEWAY_TEXT).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Retrieval(RetrievalError::StoreUnavailable(_))
    ));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn malformed_rows_degrade_to_empty_evidence() {
    let generator = FakeGenerator::replying("degraded but useful");
    let pipeline = pipeline(
        FakeEmbedder::ok(),
        FakeStore::failing(IndexError::MalformedRows("MATCH_ARRAY is not JSON".into())),
        generator.clone(),
    );
    let result = pipeline.resolve(GATEWAY_TEXT).await.unwrap();
    assert!(result.similar_incidents.is_empty());
    assert_eq!(result.ai_recommendation, "degraded but useful");
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn malformed_rows_fail_under_strict_policy() {
    let pipeline = pipeline_with(
        FakeEmbedder::ok(),
        FakeStore::failing(IndexError::MalformedRows("bad".into())),
        FakeGenerator::replying("x"),
        RetrievalConfig {
            malformed_rows: MalformedRowPolicy::Fail,
            ..RetrievalConfig::default()
        },
    );
    let err = pipeline.resolve(GATEWAY_TEXT).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Retrieval(RetrievalError::MalformedRows(_))
    ));
}

#[tokio::test]
async fn generation_failure_returns_no_partial_result() {
    let pipeline = pipeline(
        FakeEmbedder::ok(),
        FakeStore::with_rows(vec![row("INC001", "Gateway 504", "Restarted LB", 0.82)]),
        FakeGenerator::failing(GenerationError::EmptyCompletion),
    );
    let err = pipeline.resolve(GATEWAY_TEXT).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Generation(GenerationError::EmptyCompletion)
    ));
    assert_eq!(err.stage(), PipelineStage::Generating);
}

#[tokio::test(start_paused = true)]
async fn slow_generation_hits_the_request_deadline() {
    let pipeline = pipeline(
        FakeEmbedder::ok(),
        FakeStore::with_rows(vec![]),
        FakeGenerator::slow(Duration::from_secs(120)),
    )
    .with_request_timeout(Some(Duration::from_secs(5)));

    let err = pipeline.resolve(GATEWAY_TEXT).await.unwrap_err();
    match err {
        PipelineError::Timeout { stage, after } => {
            assert_eq!(stage, PipelineStage::Generating);
            assert_eq!(after, Duration::from_secs(5));
        }
        other => panic!("expected timeout, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_embedding_times_out_in_embedding_stage() {
    let generator = FakeGenerator::replying("x");
    let pipeline = pipeline(
        FakeEmbedder::slow(Duration::from_secs(90)),
        FakeStore::with_rows(vec![]),
        generator.clone(),
    )
    .with_request_timeout(Some(Duration::from_secs(1)));

    let err = pipeline.resolve(GATEWAY_TEXT).await.unwrap_err();
    assert_eq!(err.stage(), PipelineStage::Embedding);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn deadline_fires_during_a_long_embedded_scan() {
    let text = "slow scan";
    let backend = StallingBackend {
        inner: InMemoryBackend::new(),
        stall: Duration::from_millis(1500),
    };
    let index = IncidentIndex::with_backend(IndexConfig::new(), Box::new(backend));
    // Same direction as the fake embedder's vector for `text`, so the row is read back.
    index
        .upsert(&HistoricalIncident::new(
            "INC001",
            "Gateway 504",
            "Restarted LB",
            vec![1.0, text.len() as f32, 0.0],
        ))
        .unwrap();

    let generator = FakeGenerator::replying("x");
    let retriever = Retriever::new(Arc::new(index), RetrievalConfig::default()).unwrap();
    let pipeline = ResolutionPipeline::new(FakeEmbedder::ok(), retriever, generator.clone())
        .with_request_timeout(Some(Duration::from_millis(100)));

    let started = Instant::now();
    let err = pipeline.resolve(text).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Timeout {
            stage: PipelineStage::Retrieving,
            ..
        }
    ));
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(generator.calls(), 0);
}
