use crate::models::ProcessOutcome;
use crate::services::swapper::SwapError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// JSON body of every failed request
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
}

impl ErrorBody {
    fn message(error: String) -> Self {
        Self {
            success: false,
            error,
            stdout: None,
            stderr: None,
            returncode: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Process failed: {message}")]
    ProcessFailed {
        message: String,
        outcome: ProcessOutcome,
    },

    #[error("Gateway Timeout: {0}")]
    GatewayTimeout(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),
}

impl From<SwapError> for AppError {
    fn from(err: SwapError) -> Self {
        let message = err.to_string();
        match err {
            SwapError::NoSourceFace | SwapError::NoTargetFace => AppError::BadRequest(message),
            SwapError::TimedOut { .. } => AppError::GatewayTimeout(message),
            SwapError::ProcessFailed(outcome) => AppError::ProcessFailed { message, outcome },
            SwapError::MissingOutput
            | SwapError::Spawn(_)
            | SwapError::Engine(_)
            | SwapError::Io(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::message(msg)),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::message(msg))
            }
            AppError::ProcessFailed { message, outcome } => {
                tracing::error!(
                    "FaceFusion failed with code {}: {}",
                    outcome.return_code,
                    message
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        success: false,
                        error: message,
                        stdout: Some(outcome.stdout),
                        stderr: Some(outcome.stderr),
                        returncode: Some(outcome.return_code),
                    },
                )
            }
            AppError::GatewayTimeout(msg) => {
                tracing::error!("Timeout: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, ErrorBody::message(msg))
            }
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, ErrorBody::message(msg))
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_swap_error_mapping() {
        let cases: Vec<(SwapError, StatusCode)> = vec![
            (SwapError::NoSourceFace, StatusCode::BAD_REQUEST),
            (SwapError::NoTargetFace, StatusCode::BAD_REQUEST),
            (
                SwapError::TimedOut {
                    timeout: Duration::from_secs(300),
                    outcome: ProcessOutcome::default(),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                SwapError::ProcessFailed(ProcessOutcome::default()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (SwapError::MissingOutput, StatusCode::INTERNAL_SERVER_ERROR),
            (
                SwapError::Engine(anyhow::anyhow!("onnxruntime exploded")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_process_failure_body() {
        let err = AppError::from(SwapError::ProcessFailed(ProcessOutcome {
            return_code: 2,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            timed_out: false,
        }));
        let AppError::ProcessFailed { message, outcome } = err else {
            panic!("expected ProcessFailed");
        };
        assert_eq!(message, "FaceFusion process failed: err");
        assert_eq!(outcome.return_code, 2);
    }
}
