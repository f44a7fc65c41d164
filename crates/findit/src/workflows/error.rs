use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::claims::domain::ResponseStatus;
use super::claims::repository::RepositoryError;

/// Error raised by the claim workflow and the chat channel.
///
/// Every variant except `Repository` is raised before any mutation takes place.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError {
    pub(crate) fn item_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "item",
            id: id.to_string(),
        }
    }

    pub(crate) fn response_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "response",
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_transition(from: ResponseStatus, to: ResponseStatus) -> Self {
        Self::InvalidTransition(format!(
            "response cannot move from {} to {}",
            from.label(),
            to.label()
        ))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::InvalidTransition(_) => StatusCode::CONFLICT,
            WorkflowError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
