use serde::{Deserialize, Serialize};

use crate::SemanticError;

/// Runtime configuration describing which embedding service to call and how to
/// post-process the vectors it returns.
///
/// # Example
/// ```no_run
/// use semantic::{semanticize, EmbeddingConfig};
///
/// let cfg = EmbeddingConfig {
///     mode: "api".into(),
///     api_url: Some("https://api.openai.com/v1/embeddings".into()),
///     api_auth_header: Some("Bearer sk-xxx".into()),
///     api_provider: Some("openai".into()),
///     model_name: "text-embedding-3-small".into(),
///     expected_dim: Some(1536),
///     ..Default::default()
/// };
///
/// let _ = semanticize("API gateway timeout", &cfg);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Mode selector: `"api"` (remote HTTP) or `"fast"` (deterministic stub).
    pub mode: String,
    /// Model identifier sent with every request and surfaced on every vector.
    pub model_name: String,
    /// Embedding endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Authorization header (e.g., `"Bearer sk-xxx"`).
    pub api_auth_header: Option<String>,
    /// Remote provider hint: `"hf"`, `"openai"`, or `"custom"` (default).
    pub api_provider: Option<String>,
    /// Per-call timeout in seconds.
    pub api_timeout_secs: Option<u64>,
    /// Expected dimensionality. Responses of any other length are rejected.
    pub expected_dim: Option<usize>,
    /// Normalize the resulting vector to unit length.
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            model_name: "snowflake-arctic-embed-m".into(),
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            api_timeout_secs: Some(30),
            expected_dim: Some(768),
            normalize: true,
        }
    }
}

impl EmbeddingConfig {
    /// Convenience constructor for the offline stub.
    pub fn fast() -> Self {
        Self {
            mode: "fast".into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SemanticError> {
        match self.mode.as_str() {
            "fast" => {}
            "api" => {
                if self.api_url.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(SemanticError::InvalidConfig(
                        "api_url is required for api mode".into(),
                    ));
                }
            }
            other => {
                return Err(SemanticError::InvalidConfig(format!(
                    "unknown embedding mode '{other}'"
                )))
            }
        }
        if self.model_name.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        if self.expected_dim == Some(0) {
            return Err(SemanticError::InvalidConfig(
                "expected_dim must be greater than zero".into(),
            ));
        }
        if self.api_timeout_secs == Some(0) {
            return Err(SemanticError::InvalidConfig(
                "api_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
