//! Reference data and user administration.
//!
//! Listings are open to any authenticated caller so the wizard can fill
//! its dropdowns; every mutation requires the Administrator role.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use pacta_core::{
  access::{UserAttrs, can_admin},
  refdata::{ContractType, Department, NewPlaybookEntry, PlaybookEntry, Tag},
  store::ContractStore,
  user::{NewUser, User},
};
use serde::Deserialize;

use crate::{AppState, auth::Actor, error::ApiError};

fn require_admin(actor: &Actor) -> Result<(), ApiError> {
  if !can_admin(&actor.0) {
    return Err(ApiError::Forbidden(
      "administrator role required".into(),
    ));
  }
  Ok(())
}

// ─── Departments ─────────────────────────────────────────────────────────────

pub async fn list_departments<S>(
  State(state): State<AppState<S>>,
  _actor: Actor,
) -> Result<Json<Vec<Department>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = state
    .store
    .list_departments()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

pub async fn add_department<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  let row = state
    .store
    .add_department(body.name)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(row)))
}

pub async fn delete_department<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  state
    .store
    .delete_department(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Contract types ──────────────────────────────────────────────────────────

pub async fn list_contract_types<S>(
  State(state): State<AppState<S>>,
  _actor: Actor,
) -> Result<Json<Vec<ContractType>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = state
    .store
    .list_contract_types()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct ContractTypeBody {
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

pub async fn add_contract_type<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Json(body): Json<ContractTypeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  let row = state
    .store
    .add_contract_type(body.name, body.description)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(row)))
}

pub async fn delete_contract_type<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  state
    .store
    .delete_contract_type(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub async fn list_tags<S>(
  State(state): State<AppState<S>>,
  _actor: Actor,
) -> Result<Json<Vec<Tag>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = state.store.list_tags().await.map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct TagBody {
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub color:       String,
}

pub async fn add_tag<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Json(body): Json<TagBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  let row = state
    .store
    .add_tag(body.name, body.description, body.color)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(row)))
}

pub async fn delete_tag<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  state
    .store
    .delete_tag(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Playbook ────────────────────────────────────────────────────────────────

pub async fn list_playbook<S>(
  State(state): State<AppState<S>>,
  _actor: Actor,
) -> Result<Json<Vec<PlaybookEntry>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = state
    .store
    .list_playbook_entries()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

pub async fn add_playbook_entry<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Json(body): Json<NewPlaybookEntry>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  let row = state
    .store
    .add_playbook_entry(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(row)))
}

pub async fn delete_playbook_entry<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  state
    .store
    .delete_playbook_entry(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub async fn list_users<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  let rows = state.store.list_users().await.map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct UpsertUserBody {
  pub username:      String,
  #[serde(default)]
  pub display_name:  String,
  pub department_id: Option<i64>,
  #[serde(default)]
  pub attrs:         UserAttrs,
  #[serde(default = "default_active")]
  pub active:        bool,
}

fn default_active() -> bool {
  true
}

/// `PUT /admin/users` — directory sync entry point. Inserts or
/// refreshes by username; the store resolves the role from the raw
/// attributes.
pub async fn upsert_user<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Json(body): Json<UpsertUserBody>,
) -> Result<Json<User>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_admin(&actor)?;
  let user = state
    .store
    .upsert_user(NewUser {
      username:      body.username,
      display_name:  body.display_name,
      department_id: body.department_id,
      attrs:         body.attrs,
      active:        body.active,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(user))
}
