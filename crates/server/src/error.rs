use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use resolver::{ConfigLoadError, PipelineError};
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

const INVALID_INPUT_MESSAGE: &str = "Incident description is required.";
const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Body missing, not JSON, or without a usable `incidentText`.
    #[error("Incident description is required.")]
    InvalidInput,

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// Wire shape of every error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidInput => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(err) if err.is_invalid_input() => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Pipeline(_) | ServerError::Config(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Caller-facing message. Stage detail never leaves the process.
    fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => INVALID_INPUT_MESSAGE,
            StatusCode::NOT_FOUND => "Not found",
            _ => INTERNAL_MESSAGE,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            match &self {
                ServerError::Pipeline(err) => tracing::error!(
                    stage = %err.stage(),
                    error = %err,
                    "resolution request failed"
                ),
                other => tracing::error!(error = %other, "request failed"),
            }
        }

        let body = Json(ErrorResponse {
            error: self.public_message().to_string(),
        });
        (status, body).into_response()
    }
}

impl From<ConfigLoadError> for ServerError {
    fn from(err: ConfigLoadError) -> Self {
        ServerError::Config(err.to_string())
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolver::{GenerationError, PipelineStage};
    use std::time::Duration;

    #[test]
    fn invalid_input_maps_to_400() {
        assert_eq!(ServerError::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        let wrapped = ServerError::from(PipelineError::InvalidInput);
        assert_eq!(wrapped.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(wrapped.public_message(), "Incident description is required.");
    }

    #[test]
    fn stage_failures_are_indistinguishable() {
        let errors = [
            ServerError::from(PipelineError::Generation(GenerationError::EmptyCompletion)),
            ServerError::from(PipelineError::Timeout {
                stage: PipelineStage::Retrieving,
                after: Duration::from_secs(60),
            }),
            ServerError::Internal("boom".into()),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.public_message(), "Internal server error");
        }
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(ServerError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServerError::NotFound.public_message(), "Not found");
    }
}
