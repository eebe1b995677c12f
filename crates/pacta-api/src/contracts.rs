//! Handlers for `/contracts` endpoints.
//!
//! Every read goes through [`pacta_core::access::can_view`] and every
//! write through the matching predicate, with the contract's shares and
//! approval participants loaded fresh per request. Detail views append
//! a View audit event, downloads a Download event; all other auditing
//! happens inside the store.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::NaiveDate;
use pacta_core::{
  access::{
    self, AccessIndex, AccessSnapshot, can_delete, can_edit, can_view,
  },
  approval::{AdditionalApproval, ApprovalQuery},
  audit::{AuditAction, AuditEvent, NewAuditEvent},
  contract::{
    Category, Contract, ContractQuery, ContractStatus, ContractTab,
    ContractUpdate,
  },
  file::{ContractFile, NewContractFile},
  record::{
    Clause, Deviation, NewClause, NewDeviation, NewRiskItem,
    NewSignatureRecord, RiskItem, SignatureRecord,
  },
  share::{AccessLevel, ContractShare, NewShare, ShareTarget},
  store::ContractStore,
  version::{ContractVersion, NewContractVersion},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{Actor, RequestContext},
  error::ApiError,
  files,
};

// ─── Shared helpers ──────────────────────────────────────────────────────────

pub(crate) async fn load_contract<S>(
  store: &S,
  id: Uuid,
) -> Result<Contract, ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_contract(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("contract {id} not found")))
}

/// The contract's shares and approval participants, loaded for the
/// access predicates.
pub(crate) async fn snapshot_for<S>(
  store: &S,
  contract_id: Uuid,
) -> Result<AccessSnapshot, ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let shares = store
    .list_shares(contract_id)
    .await
    .map_err(ApiError::from_store)?;
  let approvals = store
    .list_approvals(&ApprovalQuery {
      contract_id: Some(contract_id),
      ..Default::default()
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(AccessSnapshot {
    shares,
    approver_ids: approvals.iter().map(|a| a.approver_id).collect(),
    requester_ids: approvals.iter().map(|a| a.requested_by).collect(),
  })
}

/// Load a contract and check `can_view`, hiding existence from callers
/// without access.
async fn viewable<S>(
  store: &S,
  actor: &Actor,
  id: Uuid,
) -> Result<(Contract, AccessSnapshot), ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let contract = load_contract(store, id).await?;
  let snap = snapshot_for(store, id).await?;
  if !can_view(&actor.0, &contract, &snap) {
    return Err(ApiError::NotFound(format!("contract {id} not found")));
  }
  Ok((contract, snap))
}

async fn editable<S>(
  store: &S,
  actor: &Actor,
  id: Uuid,
) -> Result<(Contract, AccessSnapshot), ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (contract, snap) = viewable(store, actor, id).await?;
  if !can_edit(&actor.0, &contract, &snap) {
    return Err(ApiError::Forbidden(format!(
      "no edit access to contract {id}"
    )));
  }
  Ok((contract, snap))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub tab:           Option<ContractTab>,
  pub search:        Option<String>,
  pub status:        Option<ContractStatus>,
  pub category:      Option<Category>,
  pub department_id: Option<i64>,
  pub owner_id:      Option<Uuid>,
  pub tag_id:        Option<i64>,
  pub end_after:     Option<NaiveDate>,
  pub end_before:    Option<NaiveDate>,
}

/// `GET /contracts` — tab plus filters, then visibility-filtered for
/// the caller.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Contract>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = ContractQuery {
    tab:           params.tab,
    search:        params.search,
    status:        params.status,
    category:      params.category,
    department_id: params.department_id,
    owner_id:      params.owner_id,
    tag_id:        params.tag_id,
    end_after:     params.end_after,
    end_before:    params.end_before,
  };
  let contracts = state
    .store
    .list_contracts(&query)
    .await
    .map_err(ApiError::from_store)?;

  let shares = state
    .store
    .list_all_shares()
    .await
    .map_err(ApiError::from_store)?;
  let approvals = state
    .store
    .list_approvals(&ApprovalQuery::default())
    .await
    .map_err(ApiError::from_store)?;
  let index = AccessIndex::build(shares, approvals);

  let visible = contracts
    .into_iter()
    .filter(|c| can_view(&actor.0, c, index.snapshot(c.contract_id)))
    .collect();
  Ok(Json(visible))
}

// ─── Detail ──────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
pub struct ContractDetail {
  pub contract:   Contract,
  pub files:      Vec<ContractFile>,
  pub versions:   Vec<ContractVersion>,
  pub shares:     Vec<ContractShare>,
  pub approvals:  Vec<AdditionalApproval>,
  pub clauses:    Vec<Clause>,
  pub deviations: Vec<Deviation>,
  pub risks:      Vec<RiskItem>,
  pub signatures: Vec<SignatureRecord>,
}

/// `GET /contracts/:id` — the contract with all of its child records.
/// Appends a View event with the caller's request context.
pub async fn detail<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  context: RequestContext,
  Path(id): Path<Uuid>,
) -> Result<Json<ContractDetail>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (contract, snap) = viewable(&*state.store, &actor, id).await?;
  let store = &*state.store;

  let detail = ContractDetail {
    files: store.list_files(id).await.map_err(ApiError::from_store)?,
    versions: store.list_versions(id).await.map_err(ApiError::from_store)?,
    approvals: store
      .list_approvals(&ApprovalQuery {
        contract_id: Some(id),
        ..Default::default()
      })
      .await
      .map_err(ApiError::from_store)?,
    clauses: store.list_clauses(id).await.map_err(ApiError::from_store)?,
    deviations: store
      .list_deviations(id)
      .await
      .map_err(ApiError::from_store)?,
    risks: store.list_risks(id).await.map_err(ApiError::from_store)?,
    signatures: store
      .list_signatures(id)
      .await
      .map_err(ApiError::from_store)?,
    shares: snap.shares,
    contract,
  };

  store
    .append_audit(
      NewAuditEvent::contract(id, Some(actor.0.user_id), AuditAction::View)
        .with_request_context(context.ip_address, context.user_agent),
    )
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(detail))
}

// ─── Update / delete / status ────────────────────────────────────────────────

/// `PUT /contracts/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<ContractUpdate>,
) -> Result<Json<Contract>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  editable(&*state.store, &actor, id).await?;
  let updated = state
    .store
    .update_contract(id, body, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(updated))
}

/// `DELETE /contracts/:id` — administrators, or the owner of a draft.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (contract, _) = viewable(&*state.store, &actor, id).await?;
  if !can_delete(&actor.0, &contract) {
    return Err(ApiError::Forbidden(format!(
      "no delete access to contract {id}"
    )));
  }

  let file_paths: Vec<String> = state
    .store
    .list_files(id)
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|f| f.storage_path)
    .collect();

  state
    .store
    .delete_contract(id, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  for path in &file_paths {
    files::remove_blob(&state.config.files_root, path).await;
  }
  tracing::info!(contract_id = %id, "contract deleted");
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: ContractStatus,
  pub reason: Option<String>,
}

/// `POST /contracts/:id/status`
pub async fn change_status<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Contract>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (contract, snap) = viewable(&*state.store, &actor, id).await?;
  if !access::can_change_status(&actor.0, &contract, &snap) {
    return Err(ApiError::Forbidden(format!(
      "no status access to contract {id}"
    )));
  }
  let updated = state
    .store
    .change_status(id, body.status, body.reason, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(updated))
}

// ─── Shares ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ShareBody {
  pub target:       ShareTarget,
  pub access_level: AccessLevel,
}

/// `POST /contracts/:id/shares`
pub async fn add_share<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<ShareBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (contract, _) = viewable(&*state.store, &actor, id).await?;
  if !access::can_share(&actor.0, &contract) {
    return Err(ApiError::Forbidden(format!(
      "no share access to contract {id}"
    )));
  }
  let share = state
    .store
    .add_share(id, NewShare {
      target:       body.target,
      access_level: body.access_level,
      shared_by:    Some(actor.0.user_id),
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(share)))
}

/// `DELETE /contracts/:id/shares/:share_id`
pub async fn remove_share<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path((id, share_id)): Path<(Uuid, i64)>,
) -> Result<StatusCode, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (contract, _) = viewable(&*state.store, &actor, id).await?;
  if !access::can_share(&actor.0, &contract) {
    return Err(ApiError::Forbidden(format!(
      "no share access to contract {id}"
    )));
  }
  state
    .store
    .remove_share(share_id, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Files ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub filename:    String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub primary:     bool,
}

/// `POST /contracts/:id/files?filename=<name>` — raw document bytes in
/// the body, content type from the header.
pub async fn upload_file<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Query(params): Query<UploadParams>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  editable(&*state.store, &actor, id).await?;

  let media_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("application/octet-stream")
    .to_owned();

  let file = state
    .store
    .add_file(id, NewContractFile {
      original_filename: params.filename,
      size_bytes:        body.len() as i64,
      media_type,
      is_primary:        params.primary,
      description:       params.description,
      uploaded_by:       Some(actor.0.user_id),
    })
    .await
    .map_err(ApiError::from_store)?;

  files::save_blob(&state.config.files_root, &file.storage_path, &body)
    .await?;
  Ok((StatusCode::CREATED, Json(file)))
}

/// `GET /contracts/:id/files/:file_id` — streams the document and
/// appends a Download event.
pub async fn download_file<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  context: RequestContext,
  Path((id, file_id)): Path<(Uuid, i64)>,
) -> Result<Response, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  viewable(&*state.store, &actor, id).await?;
  let file = state
    .store
    .get_file(file_id)
    .await
    .map_err(ApiError::from_store)?
    .filter(|f| f.contract_id == id)
    .ok_or_else(|| ApiError::NotFound(format!("file {file_id} not found")))?;

  let bytes = files::read_blob(&state.config.files_root, &file.storage_path)
    .await?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "stored document for file {file_id} is missing"
      ))
    })?;

  state
    .store
    .append_audit(
      NewAuditEvent::contract(
        id,
        Some(actor.0.user_id),
        AuditAction::Download,
      )
      .with_metadata(serde_json::json!({
        "filename": file.original_filename,
      }))
      .with_request_context(context.ip_address, context.user_agent),
    )
    .await
    .map_err(ApiError::from_store)?;

  let disposition =
    format!("attachment; filename=\"{}\"", file.original_filename);
  Ok(
    (
      [
        (header::CONTENT_TYPE, file.media_type),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      bytes,
    )
      .into_response(),
  )
}

/// `DELETE /contracts/:id/files/:file_id`
pub async fn remove_file<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path((id, file_id)): Path<(Uuid, i64)>,
) -> Result<StatusCode, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  editable(&*state.store, &actor, id).await?;
  let file = state
    .store
    .get_file(file_id)
    .await
    .map_err(ApiError::from_store)?
    .filter(|f| f.contract_id == id)
    .ok_or_else(|| ApiError::NotFound(format!("file {file_id} not found")))?;

  state
    .store
    .remove_file(file_id, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  files::remove_blob(&state.config.files_root, &file.storage_path).await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Versions ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VersionBody {
  pub label: String,
  #[serde(default)]
  pub notes: String,
}

/// `POST /contracts/:id/versions`
pub async fn add_version<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<VersionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  editable(&*state.store, &actor, id).await?;
  let version = state
    .store
    .add_version(id, NewContractVersion {
      label:        body.label,
      storage_path: None,
      notes:        body.notes,
      created_by:   Some(actor.0.user_id),
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(version)))
}

/// `GET /contracts/:id/versions`
pub async fn list_versions<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ContractVersion>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  viewable(&*state.store, &actor, id).await?;
  let versions = state
    .store
    .list_versions(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(versions))
}

/// `GET /contracts/:id/files`
pub async fn list_files<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ContractFile>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  viewable(&*state.store, &actor, id).await?;
  let files = state
    .store
    .list_files(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(files))
}

// ─── Child records ───────────────────────────────────────────────────────────

/// `POST /contracts/:id/clauses`
pub async fn add_clause<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<NewClause>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  editable(&*state.store, &actor, id).await?;
  let clause = state
    .store
    .add_clause(id, body, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(clause)))
}

/// `POST /contracts/:id/deviations`
pub async fn add_deviation<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<NewDeviation>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  editable(&*state.store, &actor, id).await?;
  let deviation = state
    .store
    .add_deviation(id, body, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(deviation)))
}

/// `POST /contracts/:id/risks`
pub async fn add_risk<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<NewRiskItem>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  editable(&*state.store, &actor, id).await?;
  let risk = state
    .store
    .add_risk(id, body, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(risk)))
}

/// `POST /contracts/:id/signatures`
pub async fn add_signature<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<NewSignatureRecord>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  editable(&*state.store, &actor, id).await?;
  let signature = state
    .store
    .add_signature(id, body, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(signature)))
}

/// `GET /contracts/:id/clauses`
pub async fn list_clauses<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Clause>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  viewable(&*state.store, &actor, id).await?;
  let rows = state
    .store
    .list_clauses(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `GET /contracts/:id/deviations`
pub async fn list_deviations<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Deviation>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  viewable(&*state.store, &actor, id).await?;
  let rows = state
    .store
    .list_deviations(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `GET /contracts/:id/risks`
pub async fn list_risks<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<RiskItem>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  viewable(&*state.store, &actor, id).await?;
  let rows =
    state.store.list_risks(id).await.map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `GET /contracts/:id/signatures`
pub async fn list_signatures<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<SignatureRecord>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  viewable(&*state.store, &actor, id).await?;
  let rows = state
    .store
    .list_signatures(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

// ─── Shares listing ──────────────────────────────────────────────────────────

/// `GET /contracts/:id/shares`
pub async fn list_shares<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ContractShare>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (_, snap) = viewable(&*state.store, &actor, id).await?;
  Ok(Json(snap.shares))
}

// ─── Audit ───────────────────────────────────────────────────────────────────

/// `GET /contracts/:id/audit` — newest first.
pub async fn audit_trail<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditEvent>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  viewable(&*state.store, &actor, id).await?;
  let events = state
    .store
    .list_audit(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(events))
}
