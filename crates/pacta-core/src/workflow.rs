//! Workflow transitions.
//!
//! Status changes are deliberately unrestricted: any actor who passes
//! the access checks may set any target status, and the audit trail
//! carries the old status, the new one and an optional reason. Approval
//! decisions, by contrast, are strict: Pending is the only state a
//! decision or a cancellation may leave.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::{
  Error, Result,
  approval::{AdditionalApproval, ApprovalStatus},
  audit::{AuditAction, NewAuditEvent},
  contract::{Contract, ContractStatus},
};

/// A validated approval decision. Construct through [`Decision::approved`]
/// or [`Decision::rejected`]; rejection always carries a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  Approved { comment: Option<String> },
  Rejected { comment: String },
}

impl Decision {
  pub fn approved(comment: Option<String>) -> Self {
    Self::Approved { comment }
  }

  pub fn rejected(comment: &str) -> Result<Self> {
    if comment.trim().is_empty() {
      return Err(Error::Validation(
        "a rejection requires a comment".into(),
      ));
    }
    Ok(Self::Rejected { comment: comment.to_owned() })
  }

  pub fn audit_action(&self) -> AuditAction {
    match self {
      Self::Approved { .. } => AuditAction::Approve,
      Self::Rejected { .. } => AuditAction::Reject,
    }
  }
}

/// Apply a decision to a pending approval, setting the terminal status,
/// the decision timestamp and the comment exactly once.
pub fn apply_decision(
  approval: &mut AdditionalApproval,
  decision: Decision,
  now: DateTime<Utc>,
) -> Result<()> {
  if !approval.is_pending() {
    return Err(Error::AlreadyDecided(approval.approval_id));
  }
  match decision {
    Decision::Approved { comment } => {
      approval.status = ApprovalStatus::Approved;
      approval.decision_comment = comment;
    }
    Decision::Rejected { comment } => {
      approval.status = ApprovalStatus::Rejected;
      approval.decision_comment = Some(comment);
    }
  }
  approval.decided_at = Some(now);
  Ok(())
}

/// Withdraw a pending approval. Terminal, and distinct from the
/// decision path: no comment, no decision timestamp.
pub fn cancel(approval: &mut AdditionalApproval) -> Result<()> {
  if !approval.is_pending() {
    return Err(Error::AlreadyDecided(approval.approval_id));
  }
  approval.status = ApprovalStatus::Cancelled;
  Ok(())
}

/// Audit event for a status change, recording both sides of the
/// transition and the optional reason.
pub fn status_change_event(
  contract: &Contract,
  new_status: ContractStatus,
  reason: Option<&str>,
  actor_id: Option<uuid::Uuid>,
) -> NewAuditEvent {
  NewAuditEvent::contract(
    contract.contract_id,
    actor_id,
    AuditAction::ChangeStatus,
  )
  .with_metadata(json!({
    "from": contract.status,
    "to": new_status,
    "reason": reason,
  }))
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  fn pending() -> AdditionalApproval {
    AdditionalApproval {
      approval_id: 7,
      contract_id: Uuid::new_v4(),
      requested_by: Uuid::new_v4(),
      approver_id: Uuid::new_v4(),
      status: ApprovalStatus::Pending,
      reason: "board sign-off".into(),
      due_date: None,
      created_at: Utc::now(),
      decided_at: None,
      decision_comment: None,
    }
  }

  #[test]
  fn rejection_requires_comment() {
    assert!(Decision::rejected("").is_err());
    assert!(Decision::rejected("   ").is_err());
    assert!(Decision::rejected("missing indemnity cap").is_ok());
  }

  #[test]
  fn approval_sets_terminal_state_once() {
    let mut a = pending();
    apply_decision(&mut a, Decision::approved(None), Utc::now()).unwrap();
    assert_eq!(a.status, ApprovalStatus::Approved);
    assert!(a.decided_at.is_some());

    let err =
      apply_decision(&mut a, Decision::approved(None), Utc::now())
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyDecided(7)));
  }

  #[test]
  fn rejection_records_comment() {
    let mut a = pending();
    let d = Decision::rejected("term too long").unwrap();
    apply_decision(&mut a, d, Utc::now()).unwrap();
    assert_eq!(a.status, ApprovalStatus::Rejected);
    assert_eq!(a.decision_comment.as_deref(), Some("term too long"));
  }

  #[test]
  fn cancel_only_from_pending() {
    let mut a = pending();
    cancel(&mut a).unwrap();
    assert_eq!(a.status, ApprovalStatus::Cancelled);
    assert!(a.decided_at.is_none());
    assert!(cancel(&mut a).is_err());
  }
}
