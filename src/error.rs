use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use tracing::error;

use crate::llm::LlmError;
use crate::portal::PortalError;
use crate::store::StoreError;
use crate::strava::StravaError;
use crate::validation::ValidationResult;

/// Everything a handler can fail with. Each variant picks its own status
/// code; the body is always `{"error": ..., "details"?: ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("{0}")]
  BadRequest(String),

  #[error("Unauthorized")]
  Unauthorized,

  #[error("{0}")]
  NotFound(String),

  #[error("Invalid schedule")]
  InvalidSchedule(ValidationResult),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Llm(#[from] LlmError),

  #[error(transparent)]
  Strava(#[from] StravaError),

  #[error(transparent)]
  Portal(#[from] PortalError),
}

impl AppError {
  fn status(&self) -> StatusCode {
    match self {
      AppError::BadRequest(_) | AppError::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthorized => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) | AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
      AppError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Llm(LlmError::MissingApiKey) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Llm(_) => StatusCode::BAD_GATEWAY,
      AppError::Strava(StravaError::NotAuthenticated) | AppError::Strava(StravaError::OAuth(_)) => {
        StatusCode::BAD_REQUEST
      }
      AppError::Strava(StravaError::MissingConfig(_)) | AppError::Strava(StravaError::Database(_)) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
      AppError::Strava(_) => StatusCode::BAD_GATEWAY,
      AppError::Portal(PortalError::MissingConfig(_)) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Portal(_) => StatusCode::BAD_GATEWAY,
    }
  }

  fn details(&self) -> Option<Value> {
    match self {
      AppError::InvalidSchedule(result) => Some(json!({
        "errors": result.errors,
        "warnings": result.warnings,
      })),
      _ => None,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> axum::response::Response {
    let status = self.status();
    if status.is_server_error() {
      error!(status = status.as_u16(), "{}", self);
    }

    let mut body = json!({ "error": self.to_string() });
    if let Some(details) = self.details() {
      body["details"] = details;
    }

    (status, Json(body)).into_response()
  }
}
