use thiserror::Error;

/// Errors surfaced by the resolution generator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),
    /// Transport failure or non-success HTTP status from the completion service.
    #[error("completion service request failed: {0}")]
    Upstream(String),
    #[error("completion service timed out after {0}s")]
    Timeout(u64),
    /// The service answered without usable text.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("completion service returned an empty completion")]
    EmptyCompletion,
}
