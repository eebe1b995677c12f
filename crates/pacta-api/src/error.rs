//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ApiError {
  /// Classify a storage error. Domain errors buried in the backend's
  /// error chain map onto client statuses; everything else is a 500.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = source {
      if let Some(core) = e.downcast_ref::<pacta_core::Error>() {
        return Self::from_core(core);
      }
      source = e.source();
    }
    Self::Store(Box::new(err))
  }

  fn from_core(err: &pacta_core::Error) -> Self {
    use pacta_core::Error as Core;
    match err {
      Core::Validation(m) => Self::BadRequest(m.clone()),
      Core::ContractNotFound(id) => {
        Self::NotFound(format!("contract {id} not found"))
      }
      Core::ApprovalNotFound(id) => {
        Self::NotFound(format!("approval {id} not found"))
      }
      Core::FileNotFound(id) => Self::NotFound(format!("file {id} not found")),
      Core::ShareNotFound(id) => {
        Self::NotFound(format!("share {id} not found"))
      }
      Core::UserNotFound(name) => {
        Self::NotFound(format!("user {name} not found"))
      }
      Core::AlreadyDecided(id) => {
        Self::Conflict(format!("approval {id} is already decided"))
      }
      Core::Serialization(e) => Self::Store(Box::new(
        std::io::Error::other(e.to_string()),
      )),
    }
  }
}

impl From<pacta_core::Error> for ApiError {
  fn from(err: pacta_core::Error) -> Self {
    Self::from_core(&err)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
      ApiError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    if status.is_server_error() {
      tracing::error!(%status, "request failed: {message}");
    }
    (status, Json(json!({ "error": message }))).into_response()
  }
}
