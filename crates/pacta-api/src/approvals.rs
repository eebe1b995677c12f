//! Handlers for approval workflow endpoints.
//!
//! Requests hang off a contract (`/contracts/:id/approvals`); standalone
//! `/approvals` routes cover the caller's queue. Only the named approver
//! or an administrator may decide, and only while the request is still
//! pending.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use pacta_core::{
  access::{self, Role},
  approval::{AdditionalApproval, ApprovalQuery, ApprovalStatus, NewApproval},
  store::ContractStore,
  workflow::Decision,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Actor, contracts, error::ApiError};

async fn load_approval<S>(
  store: &S,
  approval_id: i64,
) -> Result<AdditionalApproval, ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_approval(approval_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("approval {approval_id} not found"))
    })
}

/// Participants and administrators see an approval; everyone else gets
/// the same 404 as a missing row.
fn visible_to(actor: &Actor, approval: &AdditionalApproval) -> bool {
  actor.0.role == Role::Administrator
    || approval.approver_id == actor.0.user_id
    || approval.requested_by == actor.0.user_id
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApprovalListParams {
  /// Requests awaiting the caller's decision.
  #[serde(default)]
  pub mine:      bool,
  /// Requests the caller raised.
  #[serde(default)]
  pub requested: bool,
  pub status:    Option<ApprovalStatus>,
}

/// `GET /approvals` — the caller's queue. Administrators without flags
/// see everything; everyone else defaults to their own pending work.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Query(params): Query<ApprovalListParams>,
) -> Result<Json<Vec<AdditionalApproval>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut query = ApprovalQuery { status: params.status, ..Default::default() };
  if params.mine {
    query.approver_id = Some(actor.0.user_id);
  }
  if params.requested {
    query.requested_by = Some(actor.0.user_id);
  }
  if !params.mine && !params.requested && actor.0.role != Role::Administrator
  {
    query.approver_id = Some(actor.0.user_id);
  }

  let approvals = state
    .store
    .list_approvals(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(approvals))
}

/// `GET /contracts/:id/approvals`
pub async fn list_for_contract<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<AdditionalApproval>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let contract = contracts::load_contract(&*state.store, id).await?;
  let snap = contracts::snapshot_for(&*state.store, id).await?;
  if !access::can_view(&actor.0, &contract, &snap) {
    return Err(ApiError::NotFound(format!("contract {id} not found")));
  }

  let approvals = state
    .store
    .list_approvals(&ApprovalQuery {
      contract_id: Some(id),
      ..Default::default()
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(approvals))
}

/// `GET /approvals/:id`
pub async fn detail<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(approval_id): Path<i64>,
) -> Result<Json<AdditionalApproval>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let approval = load_approval(&*state.store, approval_id).await?;
  if !visible_to(&actor, &approval) {
    return Err(ApiError::NotFound(format!(
      "approval {approval_id} not found"
    )));
  }
  Ok(Json(approval))
}

// ─── Requesting ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RequestBody {
  pub approver_id: Uuid,
  pub reason:      String,
  pub due_date:    Option<NaiveDate>,
}

/// `POST /contracts/:id/approvals`
pub async fn request<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<RequestBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let contract = contracts::load_contract(&*state.store, id).await?;
  let snap = contracts::snapshot_for(&*state.store, id).await?;
  if !access::can_view(&actor.0, &contract, &snap) {
    return Err(ApiError::NotFound(format!("contract {id} not found")));
  }
  if !access::can_manage_approvals(&actor.0, &contract, &snap) {
    return Err(ApiError::Forbidden(format!(
      "no approval access to contract {id}"
    )));
  }

  let approval = state
    .store
    .create_approval(id, NewApproval {
      requested_by: actor.0.user_id,
      approver_id:  body.approver_id,
      reason:       body.reason,
      due_date:     body.due_date,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(approval)))
}

// ─── Deciding ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
  Approved,
  Rejected,
}

#[derive(Debug, Deserialize)]
pub struct DecideBody {
  pub decision: DecisionKind,
  pub comment:  Option<String>,
}

/// `POST /approvals/:id/decide` — a rejection must carry a comment.
pub async fn decide<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(approval_id): Path<i64>,
  Json(body): Json<DecideBody>,
) -> Result<Json<AdditionalApproval>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let approval = load_approval(&*state.store, approval_id).await?;
  if !visible_to(&actor, &approval) {
    return Err(ApiError::NotFound(format!(
      "approval {approval_id} not found"
    )));
  }
  if !access::can_approve_request(&actor.0, &approval) {
    return Err(ApiError::Forbidden(format!(
      "approval {approval_id} is not yours to decide"
    )));
  }

  let decision = match body.decision {
    DecisionKind::Approved => Decision::approved(body.comment),
    DecisionKind::Rejected => {
      Decision::rejected(body.comment.as_deref().unwrap_or_default())?
    }
  };

  let decided = state
    .store
    .decide_approval(approval_id, decision, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(decided))
}

/// `POST /approvals/:id/cancel` — the requester (or an administrator)
/// withdraws a pending request.
pub async fn cancel<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(approval_id): Path<i64>,
) -> Result<Json<AdditionalApproval>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let approval = load_approval(&*state.store, approval_id).await?;
  if !visible_to(&actor, &approval) {
    return Err(ApiError::NotFound(format!(
      "approval {approval_id} not found"
    )));
  }
  if approval.requested_by != actor.0.user_id
    && actor.0.role != Role::Administrator
  {
    return Err(ApiError::Forbidden(format!(
      "approval {approval_id} was requested by someone else"
    )));
  }

  let cancelled = state
    .store
    .cancel_approval(approval_id, Some(actor.0.user_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(cancelled))
}
