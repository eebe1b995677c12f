//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, Utc};
use pacta_core::{
  access::{Role, UserAttrs},
  approval::{ApprovalQuery, ApprovalStatus, NewApproval},
  audit::{AuditAction, NewAuditEvent},
  contract::{
    Category, ContractQuery, ContractStatus, ContractTab, ContractUpdate,
    NewContract,
  },
  file::NewContractFile,
  record::{NewRiskItem, RiskLevel, RiskStatus},
  share::{AccessLevel, NewShare, ShareTarget},
  store::ContractStore,
  user::{NewUser, User},
  version::{INITIAL_VERSION_LABEL, NewContractVersion},
  workflow::Decision,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_contract(title: &str, status: ContractStatus) -> NewContract {
  NewContract {
    title: title.into(),
    status,
    category: Category::Other,
    sub_category: String::new(),
    org_entity: String::new(),
    region_country: String::new(),
    department_id: None,
    counterparty_name: "Acme Corp".into(),
    counterparty_address: String::new(),
    contract_type_id: None,
    value_amount: None,
    currency: "INR".into(),
    opportunity_id: String::new(),
    effective_date: None,
    end_date: None,
    auto_renewal: false,
    renewal_notice_date: None,
    owner_id: None,
    created_by: None,
    is_confidential: false,
    extra: serde_json::Value::Null,
    tag_ids: vec![],
  }
}

fn pdf(name: &str, primary: bool) -> NewContractFile {
  NewContractFile {
    original_filename: name.into(),
    size_bytes:        1024,
    media_type:        "application/pdf".into(),
    is_primary:        primary,
    description:       String::new(),
    uploaded_by:       None,
  }
}

async fn add_user(s: &SqliteStore, username: &str) -> User {
  s.upsert_user(NewUser {
    username:      username.into(),
    display_name:  username.into(),
    department_id: None,
    attrs:         UserAttrs::default(),
    active:        true,
  })
  .await
  .unwrap()
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_user_is_idempotent_by_username() {
  let s = store().await;

  let first = add_user(&s, "alice").await;
  assert_eq!(first.role, Role::Basic);

  let second = s
    .upsert_user(NewUser {
      username:      "alice".into(),
      display_name:  "Alice L".into(),
      department_id: None,
      attrs:         UserAttrs { is_superuser: true, ..Default::default() },
      active:        true,
    })
    .await
    .unwrap();

  assert_eq!(second.user_id, first.user_id);
  assert_eq!(second.display_name, "Alice L");
  assert_eq!(second.role, Role::Administrator);
  assert_eq!(s.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn get_user_by_username_missing_returns_none() {
  let s = store().await;
  assert!(
    s.get_user_by_username("nobody".into())
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Contract creation ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_contract_assigns_number_and_initial_version() {
  let s = store().await;
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Draft), None, None)
    .await
    .unwrap();

  let expected_prefix = format!("CNT-{}-", Utc::now().format("%Y%m"));
  assert!(c.contract_number.starts_with(&expected_prefix));
  assert_eq!(c.contract_number.len(), expected_prefix.len() + 8);

  let versions = s.list_versions(c.contract_id).await.unwrap();
  assert_eq!(versions.len(), 1);
  assert_eq!(versions[0].version_number, 1);
  assert_eq!(versions[0].label, INITIAL_VERSION_LABEL);

  let events = s.list_audit(c.contract_id).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].action, AuditAction::CreateContract);
  assert_eq!(events[0].metadata["contract_number"], c.contract_number);
}

#[tokio::test]
async fn create_contract_rejects_empty_title() {
  let s = store().await;
  let result = s
    .create_contract(new_contract("   ", ContractStatus::Draft), None, None)
    .await;
  assert!(result.is_err());
}

#[tokio::test]
async fn create_contract_stores_primary_file() {
  let s = store().await;
  let c = s
    .create_contract(
      new_contract("NDA", ContractStatus::Draft),
      Some(pdf("nda.pdf", false)),
      None,
    )
    .await
    .unwrap();

  let files = s.list_files(c.contract_id).await.unwrap();
  assert_eq!(files.len(), 1);
  // The creation file is always primary, whatever the input said.
  assert!(files[0].is_primary);
  assert_eq!(
    files[0].storage_path,
    format!(
      "contracts/{}/files/{}-nda.pdf",
      c.contract_id, files[0].file_id
    )
  );
}

#[tokio::test]
async fn same_filename_uploads_get_distinct_storage_paths() {
  let s = store().await;
  let c = s
    .create_contract(new_contract("NDA", ContractStatus::Draft), None, None)
    .await
    .unwrap();

  let a = s.add_file(c.contract_id, pdf("nda.pdf", false)).await.unwrap();
  let b = s.add_file(c.contract_id, pdf("nda.pdf", false)).await.unwrap();
  assert_ne!(a.storage_path, b.storage_path);
}

#[tokio::test]
async fn create_contract_round_trips_tags() {
  let s = store().await;
  let t1 = s
    .add_tag("critical".into(), String::new(), "#ff0000".into())
    .await
    .unwrap();
  let t2 = s
    .add_tag("renewal".into(), String::new(), String::new())
    .await
    .unwrap();

  let mut input = new_contract("Tagged", ContractStatus::Draft);
  input.tag_ids = vec![t1.tag_id, t2.tag_id];
  let c = s.create_contract(input, None, None).await.unwrap();

  let fetched = s.get_contract(c.contract_id).await.unwrap().unwrap();
  let mut tags = fetched.tag_ids.clone();
  tags.sort();
  assert_eq!(tags, vec![t1.tag_id, t2.tag_id]);
}

// ─── Updates and status ──────────────────────────────────────────────────────

#[tokio::test]
async fn update_contract_preserves_number_and_audits() {
  let s = store().await;
  let c = s
    .create_contract(new_contract("Before", ContractStatus::Draft), None, None)
    .await
    .unwrap();

  let updated = s
    .update_contract(
      c.contract_id,
      ContractUpdate {
        title:                "After".into(),
        status:               c.status,
        category:             Category::Sales,
        sub_category:         String::new(),
        org_entity:           String::new(),
        region_country:       String::new(),
        department_id:        None,
        counterparty_name:    "Acme Corp".into(),
        counterparty_address: String::new(),
        contract_type_id:     None,
        value_amount:         None,
        currency:             "INR".into(),
        opportunity_id:       String::new(),
        effective_date:       None,
        end_date:             None,
        auto_renewal:         false,
        renewal_notice_date:  None,
        owner_id:             None,
        is_confidential:      false,
        tag_ids:              vec![],
      },
      None,
    )
    .await
    .unwrap();

  assert_eq!(updated.title, "After");
  assert_eq!(updated.contract_number, c.contract_number);

  let events = s.list_audit(c.contract_id).await.unwrap();
  assert_eq!(events[0].action, AuditAction::UpdateContract);
}

#[tokio::test]
async fn change_status_records_both_sides() {
  let s = store().await;
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Pending), None, None)
    .await
    .unwrap();

  let updated = s
    .change_status(
      c.contract_id,
      ContractStatus::Active,
      Some("countersigned".into()),
      None,
    )
    .await
    .unwrap();
  assert_eq!(updated.status, ContractStatus::Active);

  let events = s.list_audit(c.contract_id).await.unwrap();
  assert_eq!(events[0].action, AuditAction::ChangeStatus);
  assert_eq!(events[0].metadata["from"], "pending");
  assert_eq!(events[0].metadata["to"], "active");
  assert_eq!(events[0].metadata["reason"], "countersigned");
}

#[tokio::test]
async fn change_status_missing_contract_errors() {
  let s = store().await;
  let result = s
    .change_status(Uuid::new_v4(), ContractStatus::Active, None, None)
    .await;
  assert!(result.is_err());
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_cascades_children_and_keeps_audit() {
  let s = store().await;
  let c = s
    .create_contract(
      new_contract("Doomed", ContractStatus::Draft),
      Some(pdf("scan.pdf", true)),
      None,
    )
    .await
    .unwrap();
  let file_id = s.list_files(c.contract_id).await.unwrap()[0].file_id;

  s.delete_contract(c.contract_id, None).await.unwrap();

  assert!(s.get_contract(c.contract_id).await.unwrap().is_none());
  assert!(s.get_file(file_id).await.unwrap().is_none());
  assert!(s.list_versions(c.contract_id).await.unwrap().is_empty());

  // The trail survives with the contract reference nulled; the delete
  // event itself carries the number.
  let recent = s.recent_audit(10).await.unwrap();
  assert_eq!(recent[0].action, AuditAction::DeleteContract);
  assert_eq!(recent[0].contract_id, None);
  assert_eq!(recent[0].metadata["contract_number"], c.contract_number);
  assert!(
    recent
      .iter()
      .any(|e| e.action == AuditAction::CreateContract
        && e.contract_id.is_none())
  );
}

// ─── Files ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_primary_file_demotes_previous() {
  let s = store().await;
  let c = s
    .create_contract(
      new_contract("MSA", ContractStatus::Draft),
      Some(pdf("v1.pdf", true)),
      None,
    )
    .await
    .unwrap();

  s.add_file(c.contract_id, pdf("v2.pdf", true)).await.unwrap();

  let files = s.list_files(c.contract_id).await.unwrap();
  assert_eq!(files.len(), 2);
  let primaries: Vec<_> =
    files.iter().filter(|f| f.is_primary).collect();
  assert_eq!(primaries.len(), 1);
  assert_eq!(primaries[0].original_filename, "v2.pdf");
}

#[tokio::test]
async fn add_file_rejects_disallowed_extension() {
  let s = store().await;
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Draft), None, None)
    .await
    .unwrap();

  let mut bad = pdf("malware.exe", false);
  bad.media_type = "application/octet-stream".into();
  assert!(s.add_file(c.contract_id, bad).await.is_err());
}

#[tokio::test]
async fn remove_file_audits_on_the_contract() {
  let s = store().await;
  let c = s
    .create_contract(
      new_contract("MSA", ContractStatus::Draft),
      Some(pdf("scan.pdf", true)),
      None,
    )
    .await
    .unwrap();
  let file_id = s.list_files(c.contract_id).await.unwrap()[0].file_id;

  s.remove_file(file_id, None).await.unwrap();

  assert!(s.list_files(c.contract_id).await.unwrap().is_empty());
  let events = s.list_audit(c.contract_id).await.unwrap();
  assert_eq!(events[0].action, AuditAction::RemoveFile);
  assert_eq!(events[0].metadata["filename"], "scan.pdf");
}

// ─── Versions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn versions_number_monotonically() {
  let s = store().await;
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Draft), None, None)
    .await
    .unwrap();

  for label in ["Redline", "Final"] {
    s.add_version(c.contract_id, NewContractVersion {
      label:        label.into(),
      storage_path: None,
      notes:        String::new(),
      created_by:   None,
    })
    .await
    .unwrap();
  }

  let versions = s.list_versions(c.contract_id).await.unwrap();
  let numbers: Vec<_> =
    versions.iter().map(|v| v.version_number).collect();
  assert_eq!(numbers, vec![1, 2, 3]);
  assert_eq!(versions[2].label, "Final");
}

// ─── Shares ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn share_targets_round_trip() {
  let s = store().await;
  let alice = add_user(&s, "alice").await;
  let legal = s.add_department("Legal".into()).await.unwrap();
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Active), None, None)
    .await
    .unwrap();

  s.add_share(c.contract_id, NewShare {
    target:       ShareTarget::User { user_id: alice.user_id },
    access_level: AccessLevel::Edit,
    shared_by:    None,
  })
  .await
  .unwrap();
  s.add_share(c.contract_id, NewShare {
    target:       ShareTarget::Department {
      department_id: legal.department_id,
    },
    access_level: AccessLevel::View,
    shared_by:    None,
  })
  .await
  .unwrap();

  let shares = s.list_shares(c.contract_id).await.unwrap();
  assert_eq!(shares.len(), 2);
  assert_eq!(shares[0].target, ShareTarget::User { user_id: alice.user_id });
  assert_eq!(shares[0].access_level, AccessLevel::Edit);
  assert_eq!(shares[1].target, ShareTarget::Department {
    department_id: legal.department_id,
  });
}

#[tokio::test]
async fn remove_share_then_gone_from_listing() {
  let s = store().await;
  let alice = add_user(&s, "alice").await;
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Active), None, None)
    .await
    .unwrap();
  let share = s
    .add_share(c.contract_id, NewShare {
      target:       ShareTarget::User { user_id: alice.user_id },
      access_level: AccessLevel::View,
      shared_by:    None,
    })
    .await
    .unwrap();

  s.remove_share(share.share_id, None).await.unwrap();

  assert!(s.list_shares(c.contract_id).await.unwrap().is_empty());
  let events = s.list_audit(c.contract_id).await.unwrap();
  assert_eq!(events[0].action, AuditAction::Unshare);
}

// ─── Approvals ───────────────────────────────────────────────────────────────

async fn pending_approval(s: &SqliteStore) -> (Uuid, i64) {
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Pending), None, None)
    .await
    .unwrap();
  let approval = s
    .create_approval(c.contract_id, NewApproval {
      requested_by: Uuid::new_v4(),
      approver_id:  Uuid::new_v4(),
      reason:       "finance sign-off".into(),
      due_date:     NaiveDate::from_ymd_opt(2026, 12, 1),
    })
    .await
    .unwrap();
  assert_eq!(approval.status, ApprovalStatus::Pending);
  (c.contract_id, approval.approval_id)
}

#[tokio::test]
async fn approve_sets_terminal_state() {
  let s = store().await;
  let (contract_id, approval_id) = pending_approval(&s).await;

  let decided = s
    .decide_approval(approval_id, Decision::approved(None), None)
    .await
    .unwrap();
  assert_eq!(decided.status, ApprovalStatus::Approved);
  assert!(decided.decided_at.is_some());

  let events = s.list_audit(contract_id).await.unwrap();
  assert_eq!(events[0].action, AuditAction::Approve);
}

#[tokio::test]
async fn reject_records_comment() {
  let s = store().await;
  let (_, approval_id) = pending_approval(&s).await;

  let decision = Decision::rejected("indemnity cap missing").unwrap();
  let decided = s.decide_approval(approval_id, decision, None).await.unwrap();
  assert_eq!(decided.status, ApprovalStatus::Rejected);
  assert_eq!(
    decided.decision_comment.as_deref(),
    Some("indemnity cap missing")
  );
}

#[tokio::test]
async fn second_decision_errors_and_leaves_state() {
  let s = store().await;
  let (_, approval_id) = pending_approval(&s).await;

  s.decide_approval(approval_id, Decision::approved(None), None)
    .await
    .unwrap();
  let again = s
    .decide_approval(approval_id, Decision::approved(None), None)
    .await;
  assert!(again.is_err());

  let fetched = s.get_approval(approval_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn cancel_only_from_pending() {
  let s = store().await;
  let (_, approval_id) = pending_approval(&s).await;

  let cancelled = s.cancel_approval(approval_id, None).await.unwrap();
  assert_eq!(cancelled.status, ApprovalStatus::Cancelled);
  assert!(cancelled.decided_at.is_none());

  assert!(s.cancel_approval(approval_id, None).await.is_err());
}

#[tokio::test]
async fn list_approvals_filters_by_approver_and_status() {
  let s = store().await;
  let approver = Uuid::new_v4();
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Pending), None, None)
    .await
    .unwrap();
  for _ in 0..2 {
    s.create_approval(c.contract_id, NewApproval {
      requested_by: Uuid::new_v4(),
      approver_id:  approver,
      reason:       String::new(),
      due_date:     None,
    })
    .await
    .unwrap();
  }
  let other = s
    .create_approval(c.contract_id, NewApproval {
      requested_by: Uuid::new_v4(),
      approver_id:  Uuid::new_v4(),
      reason:       String::new(),
      due_date:     None,
    })
    .await
    .unwrap();
  s.cancel_approval(other.approval_id, None).await.unwrap();

  let mine = s
    .list_approvals(&ApprovalQuery {
      approver_id: Some(approver),
      status: Some(ApprovalStatus::Pending),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(mine.len(), 2);
  assert!(mine.iter().all(|a| a.approver_id == approver));
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tabs_partition_by_status_and_pending_approvals() {
  let s = store().await;
  let draft = s
    .create_contract(new_contract("Draft", ContractStatus::Draft), None, None)
    .await
    .unwrap();
  let active = s
    .create_contract(
      new_contract("Active", ContractStatus::Active),
      None,
      None,
    )
    .await
    .unwrap();
  let reviewed = s
    .create_contract(
      new_contract("In review", ContractStatus::Active),
      None,
      None,
    )
    .await
    .unwrap();
  s.create_approval(reviewed.contract_id, NewApproval {
    requested_by: Uuid::new_v4(),
    approver_id:  Uuid::new_v4(),
    reason:       String::new(),
    due_date:     None,
  })
  .await
  .unwrap();

  let tab = |tab| ContractQuery { tab: Some(tab), ..Default::default() };

  let drafts = s.list_contracts(&tab(ContractTab::Draft)).await.unwrap();
  assert_eq!(drafts.len(), 1);
  assert_eq!(drafts[0].contract_id, draft.contract_id);

  // A contract with an undecided approval shows on the pending tab even
  // though its stored status is Active.
  let pending = s.list_contracts(&tab(ContractTab::Pending)).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].contract_id, reviewed.contract_id);

  let repo =
    s.list_contracts(&tab(ContractTab::Repository)).await.unwrap();
  assert_eq!(repo.len(), 2);
  assert!(repo.iter().any(|c| c.contract_id == active.contract_id));
}

#[tokio::test]
async fn search_matches_title_number_and_counterparty() {
  let s = store().await;
  let mut a = new_contract("Cloud hosting", ContractStatus::Active);
  a.counterparty_name = "Nimbus Ltd".into();
  let a = s.create_contract(a, None, None).await.unwrap();
  s.create_contract(new_contract("Catering", ContractStatus::Active), None, None)
    .await
    .unwrap();

  let by_title = s
    .list_contracts(&ContractQuery {
      search: Some("HOSTING".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_title.len(), 1);
  assert_eq!(by_title[0].contract_id, a.contract_id);

  let by_counterparty = s
    .list_contracts(&ContractQuery {
      search: Some("nimbus".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_counterparty.len(), 1);

  let by_number = s
    .list_contracts(&ContractQuery {
      search: Some(a.contract_number.clone()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_number.len(), 1);
}

#[tokio::test]
async fn list_filters_by_end_date_range() {
  let s = store().await;
  let mut june = new_contract("June", ContractStatus::Active);
  june.end_date = NaiveDate::from_ymd_opt(2026, 6, 30);
  s.create_contract(june, None, None).await.unwrap();
  let mut december = new_contract("December", ContractStatus::Active);
  december.end_date = NaiveDate::from_ymd_opt(2026, 12, 31);
  s.create_contract(december, None, None).await.unwrap();

  let second_half = s
    .list_contracts(&ContractQuery {
      end_after: NaiveDate::from_ymd_opt(2026, 7, 1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(second_half.len(), 1);
  assert_eq!(second_half[0].title, "December");
}

// ─── Risks and audit ─────────────────────────────────────────────────────────

#[tokio::test]
async fn open_risks_span_contracts() {
  let s = store().await;
  let a = s
    .create_contract(new_contract("A", ContractStatus::Active), None, None)
    .await
    .unwrap();
  let b = s
    .create_contract(new_contract("B", ContractStatus::Active), None, None)
    .await
    .unwrap();
  for id in [a.contract_id, b.contract_id] {
    s.add_risk(
      id,
      NewRiskItem {
        description: "unlimited liability".into(),
        severity:    RiskLevel::Critical,
        mitigation:  String::new(),
      },
      None,
    )
    .await
    .unwrap();
  }

  let open = s.list_open_risks().await.unwrap();
  assert_eq!(open.len(), 2);
  assert!(open.iter().all(|r| r.status == RiskStatus::Open));
}

#[tokio::test]
async fn view_event_keeps_request_context() {
  let s = store().await;
  let c = s
    .create_contract(new_contract("MSA", ContractStatus::Active), None, None)
    .await
    .unwrap();

  let event = s
    .append_audit(
      NewAuditEvent::contract(c.contract_id, None, AuditAction::View)
        .with_request_context(
          Some("203.0.113.9".into()),
          Some("integration-test".into()),
        ),
    )
    .await
    .unwrap();

  assert_eq!(event.action, AuditAction::View);
  assert_eq!(event.ip_address.as_deref(), Some("203.0.113.9"));

  let events = s.list_audit(c.contract_id).await.unwrap();
  assert_eq!(events[0].event_id, event.event_id);
  assert_eq!(events[0].user_agent.as_deref(), Some("integration-test"));
}

#[tokio::test]
async fn recent_audit_is_newest_first_and_capped() {
  let s = store().await;
  for i in 0..5 {
    s.create_contract(
      new_contract(&format!("C{i}"), ContractStatus::Draft),
      None,
      None,
    )
    .await
    .unwrap();
  }

  let recent = s.recent_audit(3).await.unwrap();
  assert_eq!(recent.len(), 3);
  assert!(recent[0].event_id > recent[1].event_id);
  assert_eq!(recent[0].metadata["title"], "C4");
}
