use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use metrics_exporter_prometheus::PrometheusHandle;
use resolver::{ResolutionPipeline, ResolverConfig};
use std::path::Path;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,

    /// One pipeline serves every request; adapters are stateless between calls.
    pub pipeline: Arc<ResolutionPipeline>,

    /// Present when `metrics_enabled` is set.
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Build the pipeline from `pipeline_config_path` and wrap it.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = load_pipeline(Path::new(&config.pipeline_config_path))?;
        Self::with_pipeline(config, pipeline)
    }

    /// Wrap an already assembled pipeline.
    ///
    /// The pipeline deadline must be set and shorter than the transport
    /// timeout, so slow requests end as a pipeline timeout (500) rather
    /// than being cut off by the transport layer.
    pub fn with_pipeline(config: ServerConfig, pipeline: ResolutionPipeline) -> ServerResult<Self> {
        check_deadlines(&config, &pipeline)?;
        let metrics = if config.metrics_enabled {
            Some(crate::metrics::install()?)
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            metrics,
        })
    }
}

fn check_deadlines(config: &ServerConfig, pipeline: &ResolutionPipeline) -> ServerResult<()> {
    let transport = config.timeout();
    match pipeline.request_timeout() {
        Some(deadline) if deadline < transport => Ok(()),
        Some(deadline) => Err(ServerError::Config(format!(
            "pipeline request timeout ({}s) must be shorter than the server timeout ({}s)",
            deadline.as_secs(),
            transport.as_secs()
        ))),
        None => Err(ServerError::Config(
            "pipeline request timeout must be enabled when serving HTTP".into(),
        )),
    }
}

fn load_pipeline(path: &Path) -> ServerResult<ResolutionPipeline> {
    let resolver_config = if path.exists() {
        tracing::info!(path = %path.display(), "loading pipeline configuration");
        ResolverConfig::from_file(path)?
    } else {
        tracing::warn!(
            path = %path.display(),
            "pipeline configuration not found, using offline defaults"
        );
        ResolverConfig::offline()
    };
    Ok(resolver_config.build_pipeline()?)
}
