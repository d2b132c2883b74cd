//! Error taxonomy shared across the quiz core and the route layer.
//!
//! `ValidationUnavailable` is a transport/service failure and is deliberately
//! distinct from a negative verdict (`is_valid == false`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizError {
  #[error("annotation row {row} is malformed: {reason}")]
  MalformedRow { row: usize, reason: String },

  #[error("index {index} out of range (len {len})")]
  IndexOutOfRange { index: usize, len: usize },

  #[error("validation unavailable: {0}")]
  ValidationUnavailable(String),

  #[error("quiz generation failed: {0}")]
  GenerationFailed(String),

  #[error("unknown session: {0}")]
  UnknownSession(String),

  #[error("operation not allowed in phase {phase}: {operation}")]
  InvalidPhase { phase: &'static str, operation: &'static str },
}

impl QuizError {
  fn status(&self) -> StatusCode {
    match self {
      QuizError::MalformedRow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
      QuizError::IndexOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
      QuizError::ValidationUnavailable(_) => StatusCode::BAD_GATEWAY,
      QuizError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
      QuizError::UnknownSession(_) => StatusCode::NOT_FOUND,
      QuizError::InvalidPhase { .. } => StatusCode::CONFLICT,
    }
  }
}

impl IntoResponse for QuizError {
  fn into_response(self) -> Response {
    let body = Json(serde_json::json!({ "error": self.to_string() }));
    (self.status(), body).into_response()
  }
}
