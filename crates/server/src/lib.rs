//! HTTP front end for the incident resolution pipeline.
//!
//! # Endpoints
//!
//! - `POST /api/resolve` - body `{"incidentText": "..."}`; answers
//!   `{"similarIncidents": [...], "aiRecommendation": "..."}`. A missing or
//!   blank description is a 400 `{"error": "Incident description is required."}`;
//!   any later failure is a 500 `{"error": "Internal server error"}`.
//! - `GET /` - service info
//! - `GET /health` - liveness
//! - `GET /ready` - readiness with the wired vector store
//! - `GET /metrics` - Prometheus text, when enabled
//!
//! Configuration comes from `server.{toml,yaml}` and `RESOLVER_SERVER__*`
//! variables (see [`ServerConfig`]); the pipeline itself is read from
//! `pipeline_config_path`.
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
