use thiserror::Error;

/// Errors surfaced by the embedding adapter.
///
/// Every variant is a flavour of "the embedding service could not give us a
/// usable vector"; callers that only care about that fact can treat them alike.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SemanticError {
    /// Configuration is inconsistent (e.g., `api` mode without an `api_url`).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
    /// Transport failure or non-success HTTP status from the embedding service.
    #[error("embedding service request failed: {0}")]
    Upstream(String),
    /// The embedding service did not answer within the configured timeout.
    #[error("embedding service timed out after {0}s")]
    Timeout(u64),
    /// The service answered, but the payload was not a usable vector.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
}

impl SemanticError {
    pub(crate) fn malformed<E: std::fmt::Display>(err: E) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_config() {
        let err = SemanticError::InvalidConfig("api_url is required".into());
        assert!(err.to_string().contains("invalid embedding config"));
        assert!(err.to_string().contains("api_url"));
    }

    #[test]
    fn error_timeout_reports_seconds() {
        let err = SemanticError::Timeout(30);
        assert_eq!(err.to_string(), "embedding service timed out after 30s");
    }

    #[test]
    fn error_malformed_helper() {
        let err = SemanticError::malformed("dimension 3, expected 768");
        assert!(matches!(err, SemanticError::MalformedResponse(ref msg) if msg.contains("768")));
    }
}
