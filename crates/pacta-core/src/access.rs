//! Access control.
//!
//! Pure predicates over a user, a contract, and that contract's access
//! snapshot (its shares and approval participants). Storage loads the
//! rows; nothing in here performs IO, so every rule is unit-testable
//! and the same policy backs both the API guards and the dashboard
//! visibility filter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  approval::AdditionalApproval,
  contract::{Contract, ContractStatus},
  share::{AccessLevel, ContractShare},
  user::User,
};

// ─── Roles ───────────────────────────────────────────────────────────────────

/// Directory groups that map onto roles, in descending precedence.
pub const ADMIN_GROUP: &str = "LEGAL_ADMIN";
pub const STANDARD_GROUP: &str = "LEGAL_USER";
pub const READONLY_GROUP: &str = "FINANCE_VIEWER";

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
pub enum Role {
  Administrator,
  Standard,
  ReadOnly,
  Basic,
}

/// Raw attributes delivered by the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAttrs {
  pub is_superuser: bool,
  pub role:         Option<Role>,
  pub groups:       Vec<String>,
  pub is_staff:     bool,
}

/// Resolve the effective role from layered sources: superusers are
/// administrators outright, an explicit assignment wins next, then
/// directory groups, then staff status. Everyone else is [`Role::Basic`].
pub fn resolve_role(attrs: &UserAttrs) -> Role {
  if attrs.is_superuser {
    return Role::Administrator;
  }
  if let Some(role) = attrs.role {
    return role;
  }
  if attrs.groups.iter().any(|g| g == ADMIN_GROUP) {
    return Role::Administrator;
  }
  if attrs.groups.iter().any(|g| g == STANDARD_GROUP) {
    return Role::Standard;
  }
  if attrs.groups.iter().any(|g| g == READONLY_GROUP) {
    return Role::ReadOnly;
  }
  if attrs.is_staff {
    return Role::Standard;
  }
  Role::Basic
}

// ─── Access snapshots ────────────────────────────────────────────────────────

/// Per-contract rows the predicates consult: shares plus the users on
/// either side of its approval requests.
#[derive(Debug, Clone, Default)]
pub struct AccessSnapshot {
  pub shares:        Vec<ContractShare>,
  pub approver_ids:  Vec<Uuid>,
  pub requester_ids: Vec<Uuid>,
}

impl AccessSnapshot {
  fn share_reaches(&self, user: &User, at_least: AccessLevel) -> bool {
    self.shares.iter().any(|s| {
      s.applies_to(user.user_id, user.department_id)
        && (at_least == AccessLevel::View
          || s.access_level == AccessLevel::Edit)
    })
  }

  fn is_participant(&self, user: &User) -> bool {
    self.approver_ids.contains(&user.user_id)
      || self.requester_ids.contains(&user.user_id)
  }
}

/// Snapshots for a whole contract set, built once per request from bulk
/// share and approval listings.
#[derive(Debug, Default)]
pub struct AccessIndex {
  by_contract: HashMap<Uuid, AccessSnapshot>,
  empty:       AccessSnapshot,
}

impl AccessIndex {
  pub fn build(
    shares: impl IntoIterator<Item = ContractShare>,
    approvals: impl IntoIterator<Item = AdditionalApproval>,
  ) -> Self {
    let mut by_contract: HashMap<Uuid, AccessSnapshot> = HashMap::new();
    for share in shares {
      by_contract
        .entry(share.contract_id)
        .or_default()
        .shares
        .push(share);
    }
    for approval in approvals {
      let snap = by_contract.entry(approval.contract_id).or_default();
      snap.approver_ids.push(approval.approver_id);
      snap.requester_ids.push(approval.requested_by);
    }
    Self {
      by_contract,
      empty: AccessSnapshot::default(),
    }
  }

  pub fn snapshot(&self, contract_id: Uuid) -> &AccessSnapshot {
    self.by_contract.get(&contract_id).unwrap_or(&self.empty)
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

fn is_owner_or_creator(user: &User, contract: &Contract) -> bool {
  contract.owner_id == Some(user.user_id)
    || contract.created_by == Some(user.user_id)
}

/// Visibility, checked path by path: administrators see everything;
/// owners, creators, share targets (direct or department) and the
/// contract's own business unit always see the contract; read-only
/// users additionally see anything non-confidential; standard users
/// additionally see contracts where they sit on either side of an
/// approval request.
pub fn can_view(
  user: &User,
  contract: &Contract,
  snap: &AccessSnapshot,
) -> bool {
  if user.role == Role::Administrator {
    return true;
  }
  if is_owner_or_creator(user, contract) {
    return true;
  }
  if snap.share_reaches(user, AccessLevel::View) {
    return true;
  }
  if user.department_id.is_some()
    && user.department_id == contract.department_id
  {
    return true;
  }
  if user.role == Role::ReadOnly && !contract.is_confidential {
    return true;
  }
  user.role == Role::Standard && snap.is_participant(user)
}

/// Edit access is role-independent for the owner and creator; otherwise
/// it takes an Edit-level share or the administrator role.
pub fn can_edit(
  user: &User,
  contract: &Contract,
  snap: &AccessSnapshot,
) -> bool {
  user.role == Role::Administrator
    || is_owner_or_creator(user, contract)
    || snap.share_reaches(user, AccessLevel::Edit)
}

/// Deletion is reserved for administrators, except that owners may
/// discard their own drafts.
pub fn can_delete(user: &User, contract: &Contract) -> bool {
  user.role == Role::Administrator
    || (contract.owner_id == Some(user.user_id)
      && contract.status == ContractStatus::Draft)
}

/// Sharing stays with administrators and the contract's owner or
/// creator; an Edit share does not carry re-share rights.
pub fn can_share(user: &User, contract: &Contract) -> bool {
  user.role == Role::Administrator || is_owner_or_creator(user, contract)
}

/// Status changes follow edit access: administrators, the owner or
/// creator, and Edit-share holders.
pub fn can_change_status(
  user: &User,
  contract: &Contract,
  snap: &AccessSnapshot,
) -> bool {
  can_edit(user, contract, snap)
}

pub fn can_manage_approvals(
  user: &User,
  contract: &Contract,
  snap: &AccessSnapshot,
) -> bool {
  can_edit(user, contract, snap)
}

/// Only the named approver (or an administrator) may decide, and only
/// while the request is still pending.
pub fn can_approve_request(
  user: &User,
  approval: &AdditionalApproval,
) -> bool {
  approval.is_pending()
    && (approval.approver_id == user.user_id
      || user.role == Role::Administrator)
}

/// Contract creation is a legal-team capability.
pub fn can_create(user: &User) -> bool {
  matches!(user.role, Role::Administrator | Role::Standard)
}

pub fn can_admin(user: &User) -> bool {
  user.role == Role::Administrator
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{contract::Category, share::ShareTarget};

  fn user(role: Role) -> User {
    User {
      user_id: Uuid::new_v4(),
      username: "alice".into(),
      display_name: "Alice".into(),
      department_id: Some(1),
      role,
      active: true,
      created_at: Utc::now(),
    }
  }

  fn contract(owner: Option<Uuid>) -> Contract {
    let id = Uuid::new_v4();
    Contract {
      contract_id: id,
      contract_number: Contract::number_for(id, Utc::now()),
      title: "MSA".into(),
      status: ContractStatus::Active,
      category: Category::Procurement,
      sub_category: String::new(),
      org_entity: String::new(),
      region_country: String::new(),
      department_id: None,
      counterparty_name: "Acme".into(),
      counterparty_address: String::new(),
      contract_type_id: None,
      value_amount: None,
      currency: "USD".into(),
      opportunity_id: String::new(),
      effective_date: None,
      end_date: None,
      renewal_notice_date: None,
      auto_renewal: false,
      owner_id: owner,
      created_by: owner,
      is_confidential: false,
      extra: serde_json::Value::Null,
      tag_ids: vec![],
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn share_for(
    contract_id: Uuid,
    target: ShareTarget,
    level: AccessLevel,
  ) -> ContractShare {
    ContractShare {
      share_id: 1,
      contract_id,
      target,
      access_level: level,
      shared_by: None,
      shared_at: Utc::now(),
    }
  }

  #[test]
  fn role_resolution_precedence() {
    let attrs = |is_superuser, role, groups: &[&str], is_staff| UserAttrs {
      is_superuser,
      role,
      groups: groups.iter().map(|g| g.to_string()).collect(),
      is_staff,
    };
    assert_eq!(
      resolve_role(&attrs(true, Some(Role::Basic), &[], false)),
      Role::Administrator
    );
    assert_eq!(
      resolve_role(&attrs(false, Some(Role::ReadOnly), &[], true)),
      Role::ReadOnly
    );
    assert_eq!(
      resolve_role(&attrs(false, None, &["LEGAL_ADMIN"], false)),
      Role::Administrator
    );
    assert_eq!(
      resolve_role(&attrs(false, None, &["FINANCE_VIEWER"], false)),
      Role::ReadOnly
    );
    assert_eq!(resolve_role(&attrs(false, None, &[], true)), Role::Standard);
    assert_eq!(resolve_role(&attrs(false, None, &[], false)), Role::Basic);
  }

  #[test]
  fn admin_sees_everything() {
    let admin = user(Role::Administrator);
    let mut c = contract(None);
    c.is_confidential = true;
    assert!(can_view(&admin, &c, &AccessSnapshot::default()));
    assert!(can_edit(&admin, &c, &AccessSnapshot::default()));
    assert!(can_delete(&admin, &c));
  }

  #[test]
  fn stranger_sees_nothing() {
    let u = user(Role::Basic);
    let c = contract(Some(Uuid::new_v4()));
    assert!(!can_view(&u, &c, &AccessSnapshot::default()));
  }

  #[test]
  fn owner_views_and_edits_but_deletes_only_drafts() {
    let u = user(Role::Standard);
    let mut c = contract(Some(u.user_id));
    let snap = AccessSnapshot::default();
    assert!(can_view(&u, &c, &snap));
    assert!(can_edit(&u, &c, &snap));
    assert!(can_change_status(&u, &c, &snap));
    assert!(!can_delete(&u, &c));
    c.status = ContractStatus::Draft;
    assert!(can_delete(&u, &c));
  }

  #[test]
  fn status_changes_are_role_independent_for_owners() {
    let u = user(Role::Basic);
    let c = contract(Some(u.user_id));
    let snap = AccessSnapshot::default();
    assert!(can_change_status(&u, &c, &snap));
    assert!(can_edit(&u, &c, &snap));
  }

  #[test]
  fn view_share_grants_view_not_edit() {
    let u = user(Role::Standard);
    let c = contract(Some(Uuid::new_v4()));
    let snap = AccessSnapshot {
      shares: vec![share_for(
        c.contract_id,
        ShareTarget::User { user_id: u.user_id },
        AccessLevel::View,
      )],
      ..Default::default()
    };
    assert!(can_view(&u, &c, &snap));
    assert!(!can_edit(&u, &c, &snap));
  }

  #[test]
  fn edit_share_grants_edit() {
    let u = user(Role::Standard);
    let c = contract(Some(Uuid::new_v4()));
    let snap = AccessSnapshot {
      shares: vec![share_for(
        c.contract_id,
        ShareTarget::User { user_id: u.user_id },
        AccessLevel::Edit,
      )],
      ..Default::default()
    };
    assert!(can_edit(&u, &c, &snap));
    assert!(can_change_status(&u, &c, &snap));
    assert!(!can_share(&u, &c));
  }

  #[test]
  fn business_unit_grants_view_even_when_confidential() {
    let u = user(Role::Basic);
    let mut c = contract(Some(Uuid::new_v4()));
    c.department_id = Some(1);
    assert!(can_view(&u, &c, &AccessSnapshot::default()));
    c.is_confidential = true;
    assert!(can_view(&u, &c, &AccessSnapshot::default()));
  }

  #[test]
  fn department_share_reaches_confidential() {
    let u = user(Role::Standard);
    let mut c = contract(Some(Uuid::new_v4()));
    let snap = AccessSnapshot {
      shares: vec![share_for(
        c.contract_id,
        ShareTarget::Department { department_id: 1 },
        AccessLevel::View,
      )],
      ..Default::default()
    };
    assert!(can_view(&u, &c, &snap));
    c.is_confidential = true;
    assert!(can_view(&u, &c, &snap));
  }

  #[test]
  fn user_share_still_reaches_confidential() {
    let u = user(Role::Standard);
    let mut c = contract(Some(Uuid::new_v4()));
    c.is_confidential = true;
    let snap = AccessSnapshot {
      shares: vec![share_for(
        c.contract_id,
        ShareTarget::User { user_id: u.user_id },
        AccessLevel::View,
      )],
      ..Default::default()
    };
    assert!(can_view(&u, &c, &snap));
  }

  #[test]
  fn readonly_views_non_confidential_only() {
    let u = user(Role::ReadOnly);
    let mut c = contract(Some(Uuid::new_v4()));
    let snap = AccessSnapshot::default();
    assert!(can_view(&u, &c, &snap));
    assert!(!can_edit(&u, &c, &snap));
    assert!(!can_create(&u));
    c.is_confidential = true;
    assert!(!can_view(&u, &c, &snap));
  }

  #[test]
  fn approver_can_view_and_decide_pending_only() {
    let u = user(Role::Standard);
    let c = contract(Some(Uuid::new_v4()));
    let snap = AccessSnapshot {
      approver_ids: vec![u.user_id],
      ..Default::default()
    };
    assert!(can_view(&u, &c, &snap));

    let mut approval = AdditionalApproval {
      approval_id: 1,
      contract_id: c.contract_id,
      requested_by: Uuid::new_v4(),
      approver_id: u.user_id,
      status: crate::approval::ApprovalStatus::Pending,
      reason: String::new(),
      due_date: None,
      created_at: Utc::now(),
      decided_at: None,
      decision_comment: None,
    };
    assert!(can_approve_request(&u, &approval));
    assert!(!can_approve_request(&user(Role::Standard), &approval));
    approval.status = crate::approval::ApprovalStatus::Approved;
    assert!(!can_approve_request(&u, &approval));
  }

  #[test]
  fn participant_view_requires_the_standard_role() {
    let u = user(Role::Basic);
    let c = contract(Some(Uuid::new_v4()));
    let snap = AccessSnapshot {
      approver_ids: vec![u.user_id],
      ..Default::default()
    };
    assert!(!can_view(&u, &c, &snap));

    let approval = AdditionalApproval {
      approval_id: 1,
      contract_id: c.contract_id,
      requested_by: Uuid::new_v4(),
      approver_id: u.user_id,
      status: crate::approval::ApprovalStatus::Pending,
      reason: String::new(),
      due_date: None,
      created_at: Utc::now(),
      decided_at: None,
      decision_comment: None,
    };
    assert!(can_approve_request(&u, &approval));
  }

  #[test]
  fn owners_keep_edit_regardless_of_role_or_status() {
    let readonly = user(Role::ReadOnly);
    let c = contract(Some(readonly.user_id));
    assert!(can_edit(&readonly, &c, &AccessSnapshot::default()));

    let u = user(Role::Standard);
    let mut archived = contract(Some(u.user_id));
    archived.status = ContractStatus::Archived;
    assert!(can_edit(&u, &archived, &AccessSnapshot::default()));
  }

  #[test]
  fn sharing_stays_with_owner_and_admin() {
    let owner = user(Role::Basic);
    let c = contract(Some(owner.user_id));
    assert!(can_share(&owner, &c));
    assert!(can_share(&user(Role::Administrator), &c));
    assert!(!can_share(&user(Role::Standard), &c));
  }

  #[test]
  fn creation_requires_a_legal_role() {
    assert!(can_create(&user(Role::Administrator)));
    assert!(can_create(&user(Role::Standard)));
    assert!(!can_create(&user(Role::ReadOnly)));
    assert!(!can_create(&user(Role::Basic)));
  }

  #[test]
  fn index_groups_rows_by_contract() {
    let c1 = Uuid::new_v4();
    let c2 = Uuid::new_v4();
    let u = Uuid::new_v4();
    let index = AccessIndex::build(
      vec![share_for(
        c1,
        ShareTarget::User { user_id: u },
        AccessLevel::View,
      )],
      vec![],
    );
    assert_eq!(index.snapshot(c1).shares.len(), 1);
    assert!(index.snapshot(c2).shares.is_empty());
  }
}
