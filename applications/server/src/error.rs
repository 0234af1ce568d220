/// Server error types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lit_pipeline::{EffectKind, PipelineError, PipelineFailure};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline failure whose cause lies with the request
    #[error("Invalid input: {0}")]
    InvalidInput(#[source] PipelineError),

    /// The external tool failed; carries its diagnostics and the effects
    /// already committed to the working file
    #[error("Processing failed: {error}")]
    Processing {
        #[source]
        error: PipelineError,
        committed: Vec<EffectKind>,
    },

    #[error("Processing cancelled")]
    Cancelled,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        if err.is_bad_input() {
            ServerError::InvalidInput(err)
        } else if err.is_tool_failure() {
            ServerError::Processing {
                error: err,
                committed: Vec::new(),
            }
        } else if matches!(err, PipelineError::Cancelled) {
            ServerError::Cancelled
        } else if matches!(err, PipelineError::InvalidConfig(_)) {
            ServerError::Config(err.to_string())
        } else {
            ServerError::Internal(err.to_string())
        }
    }
}

impl From<PipelineFailure> for ServerError {
    fn from(failure: PipelineFailure) -> Self {
        if !failure.committed.is_empty() {
            tracing::warn!(
                "Pipeline stopped after committing {:?}; working file keeps that prefix",
                failure.committed
            );
        }
        match ServerError::from(failure.error) {
            ServerError::Processing { error, .. } => ServerError::Processing {
                error,
                committed: failure.committed,
            },
            other => other,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ServerError::InvalidInput(ref e) => {
                (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
            }
            ServerError::Processing {
                ref error,
                ref committed,
            } => {
                tracing::error!("Processing error: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "processing failed",
                        "diagnostics": error.detail(),
                        "committed": committed,
                    }),
                )
            }
            ServerError::Cancelled => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "processing cancelled" }),
            ),
            ServerError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Configuration error" }),
                )
            }
            ServerError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
