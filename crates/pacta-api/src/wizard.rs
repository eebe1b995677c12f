//! Handlers for the contract creation wizard.
//!
//! Drafts live in memory, one per user, and survive across requests
//! until commit or reset. Uploaded bytes stay buffered in the draft;
//! nothing touches the database or the blob root until the commit
//! succeeds, and the session is cleared only then.

use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use bytes::Bytes;
use pacta_core::{
  access,
  contract::Contract,
  file::NewContractFile,
  store::ContractStore,
  wizard::{BufferedUpload, CreationMethod, StepInput, WizardDraft, WizardStep},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::Actor, error::ApiError, files};

/// Snapshot of a draft, returned by every wizard endpoint.
#[derive(Debug, Serialize)]
pub struct WizardState {
  pub method:       Option<CreationMethod>,
  pub has_upload:   bool,
  pub current_step: Option<WizardStep>,
  pub is_complete:  bool,
}

impl WizardState {
  fn of(draft: &WizardDraft) -> Self {
    Self {
      method:       draft.method,
      has_upload:   draft.upload.is_some(),
      current_step: draft.first_incomplete(),
      is_complete:  draft.is_complete(),
    }
  }
}

fn with_draft<S: ContractStore, R>(
  state: &AppState<S>,
  actor: &Actor,
  f: impl FnOnce(&mut WizardDraft) -> R,
) -> R {
  let mut sessions = state.wizards.lock().unwrap_or_else(|e| e.into_inner());
  f(sessions.entry(actor.0.user_id).or_default())
}

/// `GET /wizard`
pub async fn state<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
) -> Result<Json<WizardState>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if !access::can_create(&actor.0) {
    return Err(ApiError::Forbidden(
      "contract creation requires a legal role".into(),
    ));
  }
  Ok(Json(with_draft(&state, &actor, |d| WizardState::of(d))))
}

/// `POST /wizard/step` — validate and merge one step's input.
pub async fn step<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Json(input): Json<StepInput>,
) -> Result<Json<WizardState>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if !access::can_create(&actor.0) {
    return Err(ApiError::Forbidden(
      "contract creation requires a legal role".into(),
    ));
  }
  with_draft(&state, &actor, |d| {
    d.apply(input)?;
    Ok(Json(WizardState::of(d)))
  })
}

#[derive(Debug, Deserialize)]
pub struct BackParams {
  pub from: WizardStep,
}

/// `POST /wizard/back?from=<step>` — the previous reachable step.
pub async fn back<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Query(params): Query<BackParams>,
) -> Result<Json<Option<WizardStep>>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Ok(Json(with_draft(&state, &actor, |d| {
    d.prev_before(params.from)
  })))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub filename: String,
}

/// `POST /wizard/upload?filename=<name>` — raw document bytes, buffered
/// until commit.
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Query(params): Query<UploadParams>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<WizardState>, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if !access::can_create(&actor.0) {
    return Err(ApiError::Forbidden(
      "contract creation requires a legal role".into(),
    ));
  }
  let media_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("application/octet-stream")
    .to_owned();

  with_draft(&state, &actor, |d| {
    d.attach_upload(BufferedUpload {
      filename: params.filename,
      media_type,
      bytes: body.to_vec(),
    })?;
    Ok(Json(WizardState::of(d)))
  })
}

#[derive(Debug, Deserialize)]
pub struct CommitBody {
  /// Park the contract as a draft instead of submitting it; incomplete
  /// steps are filled with defaults.
  #[serde(default)]
  pub as_draft: bool,
}

/// `POST /wizard/commit` — create the contract from the draft. The
/// session survives a rejected submission so nothing typed is lost, but
/// is cleared the moment the contract row exists: a retry after that
/// point would create a duplicate.
pub async fn commit<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
  Json(body): Json<CommitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if !access::can_create(&actor.0) {
    return Err(ApiError::Forbidden(
      "contract creation requires a legal role".into(),
    ));
  }

  let draft = with_draft(&state, &actor, |d| d.clone());
  let submission = draft.into_submission(actor.0.user_id, body.as_draft)?;

  let primary_file = submission.upload.as_ref().map(|u| NewContractFile {
    original_filename: u.filename.clone(),
    size_bytes:        u.bytes.len() as i64,
    media_type:        u.media_type.clone(),
    is_primary:        true,
    description:       String::new(),
    uploaded_by:       Some(actor.0.user_id),
  });

  let contract: Contract = state
    .store
    .create_contract(
      submission.contract,
      primary_file,
      Some(actor.0.user_id),
    )
    .await
    .map_err(ApiError::from_store)?;

  {
    let mut sessions =
      state.wizards.lock().unwrap_or_else(|e| e.into_inner());
    sessions.remove(&actor.0.user_id);
  }

  if let Some(upload) = submission.upload {
    let stored = state
      .store
      .list_files(contract.contract_id)
      .await
      .map_err(ApiError::from_store)?;
    if let Some(file) = stored.iter().find(|f| f.is_primary) {
      if let Err(e) = files::save_blob(
        &state.config.files_root,
        &file.storage_path,
        &upload.bytes,
      )
      .await
      {
        tracing::warn!(
          contract_id = %contract.contract_id,
          path = %file.storage_path,
          error = %e,
          "contract created but blob write failed"
        );
        return Err(e.into());
      }
    }
  }

  tracing::info!(
    contract_id = %contract.contract_id,
    number = %contract.contract_number,
    "wizard committed"
  );
  Ok((StatusCode::CREATED, Json(contract)))
}

/// `DELETE /wizard` — discard the draft.
pub async fn reset<S>(
  State(state): State<AppState<S>>,
  actor: Actor,
) -> Result<StatusCode, ApiError>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut sessions = state.wizards.lock().unwrap_or_else(|e| e.into_inner());
  sessions.remove(&actor.0.user_id);
  Ok(StatusCode::NO_CONTENT)
}
