//! The dashboard endpoint.
//!
//! Loads the raw rows and hands them to
//! [`pacta_core::dashboard::DashboardMetrics`], which does all the
//! counting and windowing over contracts the caller can see.

use axum::{Json, extract::State};
use chrono::Utc;
use pacta_core::{
  access::AccessIndex,
  approval::ApprovalQuery,
  contract::{ContractQuery, EXPIRY_WINDOW_DAYS},
  dashboard::DashboardMetrics,
  store::ContractStore,
};

use crate::{AppState, auth::Actor, error::ApiError};

/// Recent audit rows fed into the activity list.
const RECENT_EVENTS: usize = 50;

/// `GET /dashboard`
pub async fn metrics<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
) -> Result<Json<DashboardMetrics>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let store = &*state.store;
  let contracts = store
    .list_contracts(&ContractQuery::default())
    .await
    .map_err(ApiError::from_store)?;
  let shares = store.list_all_shares().await.map_err(ApiError::from_store)?;
  let approvals = store
    .list_approvals(&ApprovalQuery::default())
    .await
    .map_err(ApiError::from_store)?;
  let risks = store.list_open_risks().await.map_err(ApiError::from_store)?;
  let recent = store
    .recent_audit(RECENT_EVENTS)
    .await
    .map_err(ApiError::from_store)?;

  let index = AccessIndex::build(shares, approvals.clone());
  let metrics = DashboardMetrics::compute(
    &actor.0,
    &contracts,
    &index,
    &approvals,
    &risks,
    &recent,
    Utc::now().date_naive(),
    EXPIRY_WINDOW_DAYS,
  );
  Ok(Json(metrics))
}
