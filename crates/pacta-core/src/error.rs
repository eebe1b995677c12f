//! Error types for `pacta-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or logically inconsistent input, rejected before any
  /// mutation takes place.
  #[error("validation error: {0}")]
  Validation(String),

  #[error("contract not found: {0}")]
  ContractNotFound(Uuid),

  #[error("approval not found: {0}")]
  ApprovalNotFound(i64),

  #[error("file not found: {0}")]
  FileNotFound(i64),

  #[error("share not found: {0}")]
  ShareNotFound(i64),

  #[error("user not found: {0:?}")]
  UserNotFound(String),

  #[error("approval {0} is already decided")]
  AlreadyDecided(i64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
