use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use orchestrator::OrchestratorError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
    Orchestrator(OrchestratorError),
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            AppError::Orchestrator(err) => {
                let message = err.to_string();
                match err {
                    OrchestratorError::SessionNotFound(_)
                    | OrchestratorError::ParticipantNotFound(_) => {
                        (StatusCode::NOT_FOUND, "not_found", message)
                    }
                    OrchestratorError::NotEnoughParticipants { .. }
                    | OrchestratorError::DuplicateName(_)
                    | OrchestratorError::EmptyName
                    | OrchestratorError::ReservedName(_)
                    | OrchestratorError::InvalidConfig(_) => {
                        (StatusCode::BAD_REQUEST, "bad_request", message)
                    }
                    OrchestratorError::AlreadyStarted
                    | OrchestratorError::NotStarted
                    | OrchestratorError::RoundInProgress
                    | OrchestratorError::GameOver
                    | OrchestratorError::SessionFailed(_)
                    | OrchestratorError::Core(_) => {
                        (StatusCode::CONFLICT, "conflict", message)
                    }
                    other => {
                        tracing::error!(error = ?other, "Orchestrator error");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "orchestrator_error",
                            message,
                        )
                    }
                }
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<OrchestratorError> for AppError {
    fn from(err: OrchestratorError) -> Self {
        AppError::Orchestrator(err)
    }
}
