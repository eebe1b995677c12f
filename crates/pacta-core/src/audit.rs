//! Audit trail.
//!
//! Every mutation and every sensitive read appends an event. Events are
//! written in the same transaction as the change they describe and are
//! never updated or deleted afterwards; deleting a contract nulls the
//! reference but keeps the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
  CreateContract,
  UpdateContract,
  DeleteContract,
  ChangeStatus,
  AddFile,
  RemoveFile,
  AddVersion,
  CreateApproval,
  Approve,
  Reject,
  CancelApproval,
  Share,
  Unshare,
  AddClause,
  AddDeviation,
  AddRisk,
  AddSignature,
  View,
  Download,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
  pub event_id:    i64,
  pub contract_id: Option<Uuid>,
  pub actor_id:    Option<Uuid>,
  pub action:      AuditAction,
  pub metadata:    serde_json::Value,
  pub ip_address:  Option<String>,
  pub user_agent:  Option<String>,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEvent {
  pub contract_id: Option<Uuid>,
  pub actor_id:    Option<Uuid>,
  pub action:      AuditAction,
  pub metadata:    serde_json::Value,
  pub ip_address:  Option<String>,
  pub user_agent:  Option<String>,
}

impl NewAuditEvent {
  /// Event for a contract-scoped action with no extra metadata.
  pub fn contract(
    contract_id: Uuid,
    actor_id: Option<Uuid>,
    action: AuditAction,
  ) -> Self {
    Self {
      contract_id: Some(contract_id),
      actor_id,
      action,
      metadata: serde_json::Value::Null,
      ip_address: None,
      user_agent: None,
    }
  }

  pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
    self.metadata = metadata;
    self
  }

  pub fn with_request_context(
    mut self,
    ip_address: Option<String>,
    user_agent: Option<String>,
  ) -> Self {
    self.ip_address = ip_address;
    self.user_agent = user_agent;
    self
  }
}
