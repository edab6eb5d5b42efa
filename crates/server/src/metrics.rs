//! Prometheus export of the pipeline and retrieval hooks.

use crate::error::{ServerError, ServerResult};
use matcher::RetrievalMetrics;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use resolver::{PipelineError, PipelineMetrics, PipelineStage};
use std::sync::Arc;
use std::time::Duration;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the process-wide recorder (once) and route both metrics hooks to it.
pub fn install() -> ServerResult<PrometheusHandle> {
    let handle = PROMETHEUS
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .map_err(|err| ServerError::Internal(format!("metrics recorder: {err}")))?
        .clone();

    let bridge = Arc::new(PrometheusBridge);
    resolver::set_pipeline_metrics(Some(bridge.clone()));
    matcher::set_retrieval_metrics(Some(bridge));
    Ok(handle)
}

struct PrometheusBridge;

impl PipelineMetrics for PrometheusBridge {
    fn record_stage(&self, stage: PipelineStage, latency: Duration, success: bool) {
        let result = if success { "ok" } else { "error" };
        metrics::histogram!(
            "resolver_stage_duration_seconds",
            "stage" => stage.as_str(),
            "result" => result
        )
        .record(latency.as_secs_f64());
    }

    fn record_request(&self, latency: Duration, outcome: Result<usize, &PipelineError>) {
        let result = match outcome {
            Ok(hits) => {
                metrics::histogram!("resolver_evidence_items").record(hits as f64);
                "ok"
            }
            Err(err) if err.is_invalid_input() => "invalid_input",
            Err(PipelineError::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        metrics::counter!("resolver_requests_total", "result" => result).increment(1);
        metrics::histogram!("resolver_request_duration_seconds", "result" => result)
            .record(latency.as_secs_f64());
    }
}

impl RetrievalMetrics for PrometheusBridge {
    fn record_retrieval(&self, latency: Duration, hit_count: usize, degraded: bool) {
        metrics::histogram!("resolver_retrieval_duration_seconds").record(latency.as_secs_f64());
        metrics::histogram!("resolver_retrieval_hits").record(hit_count as f64);
        if degraded {
            metrics::counter!("resolver_retrieval_degraded_total").increment(1);
        }
    }
}
