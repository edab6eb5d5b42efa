//! Resolution generator for the incident resolver.
//!
//! Sends a composed prompt to a completion service and hands back whatever
//! text it returns, unmodified. The five-section structure the prompt asks for
//! is never parsed or verified here.
//!
//! - **API mode** - POST to an `openai` chat-completions endpoint or a
//!   `custom` `{"model", "prompt"}` endpoint.
//! - **Fast mode** - a deterministic offline skeleton, for local runs.
//!
//! Completion services are free to be non-deterministic; identical prompts may
//! yield different text.

pub mod config;
pub mod error;

mod api;
mod stub;

use async_trait::async_trait;

pub use crate::config::GenerationConfig;
pub use crate::error::GenerationError;

use crate::api::complete_via_api;
use crate::stub::make_stub_completion;

/// Produce a completion for `prompt` using the supplied [`GenerationConfig`].
pub async fn complete(prompt: &str, cfg: &GenerationConfig) -> Result<String, GenerationError> {
    match cfg.mode.as_str() {
        "fast" => Ok(make_stub_completion(prompt)),
        "api" => complete_via_api(prompt, cfg).await,
        other => Err(GenerationError::InvalidConfig(format!(
            "unknown generation mode '{other}'"
        ))),
    }
}

/// Seam between the pipeline and whichever completion service is in use.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// [`Generator`] backed by a [`GenerationConfig`].
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    cfg: GenerationConfig,
}

impl HttpGenerator {
    pub fn new(cfg: GenerationConfig) -> Result<Self, GenerationError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.cfg
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        complete(prompt, &self.cfg).await
    }

    fn model_name(&self) -> &str {
        &self.cfg.model_name
    }
}
