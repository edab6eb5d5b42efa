// Metrics hooks for the retriever.
//
// Install a global `RetrievalMetrics` implementation via [`set_retrieval_metrics`];
// every `Retriever::retrieve` call then reports its latency, hit count, and
// whether malformed rows were degraded to an empty set.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for retrieval calls.
pub trait RetrievalMetrics: Send + Sync {
    /// `hit_count` is the size of the evidence set handed back to the caller.
    fn record_retrieval(&self, latency: Duration, hit_count: usize, degraded: bool);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn RetrievalMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn RetrievalMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn RetrievalMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global retrieval metrics recorder.
pub fn set_retrieval_metrics(recorder: Option<Arc<dyn RetrievalMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
