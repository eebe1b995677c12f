//! Additional approvals.
//!
//! A contract owner or editor asks a named approver to sign off before
//! the contract moves on. Decisions are final; only pending requests may
//! be decided or cancelled. The transition rules live in
//! [`crate::workflow`].

use chrono::{DateTime, NaiveDate, Utc};
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
pub enum ApprovalStatus {
  Pending,
  Approved,
  Rejected,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalApproval {
  pub approval_id:      i64,
  pub contract_id:      Uuid,
  pub requested_by:     Uuid,
  pub approver_id:      Uuid,
  pub status:           ApprovalStatus,
  pub reason:           String,
  pub due_date:         Option<NaiveDate>,
  pub created_at:       DateTime<Utc>,
  /// Set exactly once, on Pending to Approved/Rejected.
  pub decided_at:       Option<DateTime<Utc>>,
  pub decision_comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewApproval {
  pub requested_by: Uuid,
  pub approver_id:  Uuid,
  pub reason:       String,
  pub due_date:     Option<NaiveDate>,
}

/// Filter for approval listings. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ApprovalQuery {
  pub contract_id:  Option<Uuid>,
  pub approver_id:  Option<Uuid>,
  pub requested_by: Option<Uuid>,
  pub status:       Option<ApprovalStatus>,
}

impl AdditionalApproval {
  pub fn is_pending(&self) -> bool {
    self.status == ApprovalStatus::Pending
  }
}
