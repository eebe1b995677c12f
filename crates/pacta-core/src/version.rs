//! Contract versions.
//!
//! A contract gains version 1 at creation; further uploads append with
//! monotonically increasing numbers assigned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label given to the version created alongside the contract itself.
pub const INITIAL_VERSION_LABEL: &str = "Initial Version";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractVersion {
  pub version_id:     i64,
  pub contract_id:    Uuid,
  pub version_number: i64,
  pub label:          String,
  pub storage_path:   Option<String>,
  pub notes:          String,
  pub created_by:     Option<Uuid>,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContractVersion {
  pub label:        String,
  pub storage_path: Option<String>,
  pub notes:        String,
  pub created_by:   Option<Uuid>,
}
