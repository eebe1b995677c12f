//! The `ContractStore` trait.
//!
//! Implemented by storage backends (e.g. `pacta-store-sqlite`). The API
//! layer depends on this abstraction, not on any concrete backend.
//!
//! Every mutating method writes its audit event in the same transaction
//! as the change itself, so the trail can never run ahead of or behind
//! the data. Mutations that name an `actor_id` attribute that actor on
//! the event; read-side events (View, Download) are appended explicitly
//! through [`ContractStore::append_audit`] with full request context.

use std::future::Future;

use uuid::Uuid;

use crate::{
  approval::{AdditionalApproval, ApprovalQuery, NewApproval},
  audit::{AuditEvent, NewAuditEvent},
  contract::{Contract, ContractQuery, ContractStatus, ContractUpdate, NewContract},
  file::{ContractFile, NewContractFile},
  record::{
    Clause, Deviation, NewClause, NewDeviation, NewRiskItem,
    NewSignatureRecord, RiskItem, SignatureRecord,
  },
  refdata::{ContractType, Department, NewPlaybookEntry, PlaybookEntry, Tag},
  share::{ContractShare, NewShare},
  user::{NewUser, User},
  version::{ContractVersion, NewContractVersion},
  workflow::Decision,
};

/// Abstraction over a Pacta storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with `axum`).
pub trait ContractStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert or refresh a user by username, resolving the role from the
  /// raw identity attributes.
  fn upsert_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Reference data ────────────────────────────────────────────────────

  fn add_department(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Department, Self::Error>> + Send + '_;

  fn list_departments(
    &self,
  ) -> impl Future<Output = Result<Vec<Department>, Self::Error>> + Send + '_;

  fn delete_department(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn add_contract_type(
    &self,
    name: String,
    description: String,
  ) -> impl Future<Output = Result<ContractType, Self::Error>> + Send + '_;

  fn list_contract_types(
    &self,
  ) -> impl Future<Output = Result<Vec<ContractType>, Self::Error>> + Send + '_;

  fn delete_contract_type(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn add_tag(
    &self,
    name: String,
    description: String,
    color: String,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  fn list_tags(
    &self,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  fn delete_tag(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn add_playbook_entry(
    &self,
    input: NewPlaybookEntry,
  ) -> impl Future<Output = Result<PlaybookEntry, Self::Error>> + Send + '_;

  fn list_playbook_entries(
    &self,
  ) -> impl Future<Output = Result<Vec<PlaybookEntry>, Self::Error>> + Send + '_;

  fn delete_playbook_entry(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Contracts ─────────────────────────────────────────────────────────

  /// Persist a new contract: assigns the UUID and the contract number,
  /// creates version 1, stores the optional primary file record, and
  /// appends the CreateContract audit event, all in one transaction.
  fn create_contract(
    &self,
    input: NewContract,
    primary_file: Option<NewContractFile>,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Contract, Self::Error>> + Send + '_;

  fn get_contract(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contract>, Self::Error>> + Send + '_;

  fn list_contracts<'a>(
    &'a self,
    query: &'a ContractQuery,
  ) -> impl Future<Output = Result<Vec<Contract>, Self::Error>> + Send + 'a;

  /// Replace the editable fields. The contract number and creation
  /// metadata are untouched; audits UpdateContract.
  fn update_contract(
    &self,
    id: Uuid,
    update: ContractUpdate,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Contract, Self::Error>> + Send + '_;

  /// Set the status, auditing ChangeStatus with both sides of the
  /// transition and the optional reason.
  fn change_status(
    &self,
    id: Uuid,
    status: ContractStatus,
    reason: Option<String>,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Contract, Self::Error>> + Send + '_;

  /// Delete the contract and its children. Audit events survive with
  /// their contract reference nulled; a DeleteContract event carrying
  /// the number in its metadata is appended last.
  fn delete_contract(
    &self,
    id: Uuid,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Files ─────────────────────────────────────────────────────────────

  /// Store a file record. Marking it primary demotes the previous
  /// primary in the same transaction; audits AddFile.
  fn add_file(
    &self,
    contract_id: Uuid,
    input: NewContractFile,
  ) -> impl Future<Output = Result<ContractFile, Self::Error>> + Send + '_;

  fn get_file(
    &self,
    file_id: i64,
  ) -> impl Future<Output = Result<Option<ContractFile>, Self::Error>> + Send + '_;

  fn list_files(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ContractFile>, Self::Error>> + Send + '_;

  fn remove_file(
    &self,
    file_id: i64,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Versions ──────────────────────────────────────────────────────────

  /// Append a version, numbered one past the contract's current last.
  fn add_version(
    &self,
    contract_id: Uuid,
    input: NewContractVersion,
  ) -> impl Future<Output = Result<ContractVersion, Self::Error>> + Send + '_;

  fn list_versions(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ContractVersion>, Self::Error>> + Send + '_;

  // ── Shares ────────────────────────────────────────────────────────────

  fn add_share(
    &self,
    contract_id: Uuid,
    input: NewShare,
  ) -> impl Future<Output = Result<ContractShare, Self::Error>> + Send + '_;

  fn list_shares(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ContractShare>, Self::Error>> + Send + '_;

  /// Every share in the store; feeds the access index for listings.
  fn list_all_shares(
    &self,
  ) -> impl Future<Output = Result<Vec<ContractShare>, Self::Error>> + Send + '_;

  fn remove_share(
    &self,
    share_id: i64,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Approvals ─────────────────────────────────────────────────────────

  fn create_approval(
    &self,
    contract_id: Uuid,
    input: NewApproval,
  ) -> impl Future<Output = Result<AdditionalApproval, Self::Error>> + Send + '_;

  fn get_approval(
    &self,
    approval_id: i64,
  ) -> impl Future<Output = Result<Option<AdditionalApproval>, Self::Error>> + Send + '_;

  fn list_approvals<'a>(
    &'a self,
    query: &'a ApprovalQuery,
  ) -> impl Future<Output = Result<Vec<AdditionalApproval>, Self::Error>> + Send + 'a;

  /// Apply a decision to a pending approval. Errors if the approval is
  /// already decided; audits Approve or Reject.
  fn decide_approval(
    &self,
    approval_id: i64,
    decision: Decision,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<AdditionalApproval, Self::Error>> + Send + '_;

  /// Withdraw a pending approval; audits CancelApproval.
  fn cancel_approval(
    &self,
    approval_id: i64,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<AdditionalApproval, Self::Error>> + Send + '_;

  // ── Child records ─────────────────────────────────────────────────────

  fn add_clause(
    &self,
    contract_id: Uuid,
    input: NewClause,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Clause, Self::Error>> + Send + '_;

  fn list_clauses(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Clause>, Self::Error>> + Send + '_;

  fn add_deviation(
    &self,
    contract_id: Uuid,
    input: NewDeviation,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Deviation, Self::Error>> + Send + '_;

  fn list_deviations(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Deviation>, Self::Error>> + Send + '_;

  fn add_risk(
    &self,
    contract_id: Uuid,
    input: NewRiskItem,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<RiskItem, Self::Error>> + Send + '_;

  fn list_risks(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RiskItem>, Self::Error>> + Send + '_;

  /// Open risk items across all contracts; feeds the dashboard.
  fn list_open_risks(
    &self,
  ) -> impl Future<Output = Result<Vec<RiskItem>, Self::Error>> + Send + '_;

  fn add_signature(
    &self,
    contract_id: Uuid,
    input: NewSignatureRecord,
    actor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<SignatureRecord, Self::Error>> + Send + '_;

  fn list_signatures(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SignatureRecord>, Self::Error>> + Send + '_;

  // ── Audit ─────────────────────────────────────────────────────────────

  /// Append a standalone event (View, Download) with request context.
  fn append_audit(
    &self,
    event: NewAuditEvent,
  ) -> impl Future<Output = Result<AuditEvent, Self::Error>> + Send + '_;

  /// Events for one contract, newest first.
  fn list_audit(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AuditEvent>, Self::Error>> + Send + '_;

  /// The newest events across all contracts, newest first.
  fn recent_audit(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AuditEvent>, Self::Error>> + Send + '_;
}
