//! Dashboard projection.
//!
//! Pure functions over rows the caller has already loaded. Visibility
//! goes through the same [`crate::access::can_view`] predicate as every
//! other read, so the dashboard can never leak a contract the detail
//! endpoint would refuse.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
  access::{AccessIndex, can_view},
  approval::AdditionalApproval,
  audit::AuditEvent,
  contract::{Contract, ContractStatus},
  record::RiskItem,
  user::User,
};

/// Entries per dashboard list.
pub const LIST_CAP: usize = 10;

pub fn visible_contracts<'a>(
  user: &User,
  contracts: &'a [Contract],
  index: &AccessIndex,
) -> Vec<&'a Contract> {
  contracts
    .iter()
    .filter(|c| can_view(user, c, index.snapshot(c.contract_id)))
    .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
  pub draft:      usize,
  pub pending:    usize,
  pub active:     usize,
  pub expired:    usize,
  pub terminated: usize,
  pub archived:   usize,
}

impl StatusCounts {
  fn bump(&mut self, status: ContractStatus) {
    match status {
      ContractStatus::Draft => self.draft += 1,
      ContractStatus::Pending => self.pending += 1,
      ContractStatus::Active => self.active += 1,
      ContractStatus::Expired => self.expired += 1,
      ContractStatus::Terminated => self.terminated += 1,
      ContractStatus::Archived => self.archived += 1,
    }
  }

  pub fn total(&self) -> usize {
    self.draft
      + self.pending
      + self.active
      + self.expired
      + self.terminated
      + self.archived
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
  pub status_counts:       StatusCounts,
  /// Contracts the user owns that still need work: drafts and pending.
  pub pending_action:      Vec<Contract>,
  /// Approvals waiting on this user's decision.
  pub awaiting_decision:   Vec<AdditionalApproval>,
  pub expiring_soon:       Vec<Contract>,
  /// Active auto-renewing contracts whose notice date falls inside the
  /// window.
  pub renewal_notices:     Vec<Contract>,
  pub recent_activity:     Vec<AuditEvent>,
  /// Sum of `value_amount` over visible Active contracts.
  pub active_value:        Decimal,
  pub open_severe_risks:   usize,
  pub created_this_month:  usize,
}

impl DashboardMetrics {
  #[allow(clippy::too_many_arguments)]
  pub fn compute(
    user: &User,
    contracts: &[Contract],
    index: &AccessIndex,
    approvals: &[AdditionalApproval],
    risks: &[RiskItem],
    recent_audit: &[AuditEvent],
    today: NaiveDate,
    expiry_window: i64,
  ) -> Self {
    let visible = visible_contracts(user, contracts, index);

    let mut status_counts = StatusCounts::default();
    let mut active_value = Decimal::ZERO;
    let mut created_this_month = 0;
    for c in &visible {
      status_counts.bump(c.status);
      if c.status == ContractStatus::Active
        && let Some(value) = c.value_amount
      {
        active_value += value;
      }
      let created = c.created_at.date_naive();
      if created.year() == today.year() && created.month() == today.month() {
        created_this_month += 1;
      }
    }

    let pending_action = visible
      .iter()
      .filter(|c| {
        c.owner_id == Some(user.user_id)
          && matches!(
            c.status,
            ContractStatus::Draft | ContractStatus::Pending
          )
      })
      .take(LIST_CAP)
      .map(|c| (*c).clone())
      .collect();

    let awaiting_decision = approvals
      .iter()
      .filter(|a| a.is_pending() && a.approver_id == user.user_id)
      .take(LIST_CAP)
      .cloned()
      .collect();

    let expiring_soon = visible
      .iter()
      .filter(|c| c.is_expiring_soon(today, expiry_window))
      .take(LIST_CAP)
      .map(|c| (*c).clone())
      .collect();

    let renewal_notices = visible
      .iter()
      .filter(|c| {
        c.status == ContractStatus::Active
          && c.auto_renewal
          && c.renewal_notice_date.is_some_and(|d| {
            let until = (d - today).num_days();
            (0..=expiry_window).contains(&until)
          })
      })
      .take(LIST_CAP)
      .map(|c| (*c).clone())
      .collect();

    let visible_ids: Vec<_> =
      visible.iter().map(|c| c.contract_id).collect();
    let recent_activity = recent_audit
      .iter()
      .filter(|e| {
        e.actor_id == Some(user.user_id)
          || e.contract_id.is_some_and(|id| visible_ids.contains(&id))
      })
      .take(LIST_CAP)
      .cloned()
      .collect();

    let open_severe_risks = risks
      .iter()
      .filter(|r| {
        r.is_open_and_severe() && visible_ids.contains(&r.contract_id)
      })
      .count();

    Self {
      status_counts,
      pending_action,
      awaiting_decision,
      expiring_soon,
      renewal_notices,
      recent_activity,
      active_value,
      open_severe_risks,
      created_this_month,
    }
  }
}
