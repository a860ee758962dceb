//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure reaches the client as a uniform structured payload,
//! `{"success": false, "error": "<short reason>"}` — no stack traces, no
//! internal detail beyond the reason string.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use palaver_live::{PollError, ToggleError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// Client and server disagree about reaction state.
  #[error("no active reaction to remove")]
  RemovalTargetMissing,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ApiError::Store(Box::new(e))
  }
}

impl From<PollError> for ApiError {
  fn from(e: PollError) -> Self {
    match e {
      PollError::InvalidRequest(msg) => ApiError::BadRequest(msg),
      PollError::NotMember { channel_id, .. } => {
        ApiError::Forbidden(format!("not a member of channel {channel_id}"))
      }
      PollError::Store(e) => ApiError::Store(e),
    }
  }
}

impl From<ToggleError> for ApiError {
  fn from(e: ToggleError) -> Self {
    match e {
      ToggleError::MessageNotFound(id) => {
        ApiError::NotFound(format!("message {id} not found"))
      }
      ToggleError::RemovalTargetMissing => ApiError::RemovalTargetMissing,
      ToggleError::Store(e) => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "unauthorized".to_owned())
      }
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::RemovalTargetMissing => {
        (StatusCode::CONFLICT, self.to_string())
      }
      ApiError::Store(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "success": false, "error": message }))).into_response()
  }
}
