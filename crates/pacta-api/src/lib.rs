//! HTTP layer for Pacta.
//!
//! Exposes an axum [`Router`] over any [`ContractStore`]. Identity
//! arrives pre-authenticated in the `X-Remote-User` header (set by the
//! fronting proxy); authorization is enforced per handler through the
//! predicates in `pacta_core::access`.

pub mod admin;
pub mod approvals;
pub mod auth;
pub mod contracts;
pub mod dashboard;
pub mod error;
pub mod files;
pub mod wizard;

pub use error::ApiError;

use std::{
  collections::HashMap,
  path::PathBuf,
  sync::{Arc, Mutex},
};

use axum::{
  Router,
  routing::{delete, get, post},
};
use pacta_core::{store::ContractStore, wizard::WizardDraft};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub db_path:    PathBuf,
  /// Directory uploaded documents are written beneath.
  pub files_root: PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. Wizard drafts are
/// held in memory, keyed by user.
#[derive(Clone)]
pub struct AppState<S: ContractStore> {
  pub store:   Arc<S>,
  pub config:  Arc<ServerConfig>,
  pub wizards: Arc<Mutex<HashMap<Uuid, WizardDraft>>>,
}

impl<S: ContractStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:   Arc::new(store),
      config:  Arc::new(config),
      wizards: Arc::new(Mutex::new(HashMap::new())),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/api/dashboard", get(dashboard::metrics::<S>))
    .route("/api/contracts", get(contracts::list::<S>))
    .route(
      "/api/contracts/{id}",
      get(contracts::detail::<S>)
        .put(contracts::update::<S>)
        .delete(contracts::delete::<S>),
    )
    .route("/api/contracts/{id}/status", post(contracts::change_status::<S>))
    .route(
      "/api/contracts/{id}/shares",
      get(contracts::list_shares::<S>).post(contracts::add_share::<S>),
    )
    .route(
      "/api/contracts/{id}/shares/{share_id}",
      delete(contracts::remove_share::<S>),
    )
    .route(
      "/api/contracts/{id}/files",
      get(contracts::list_files::<S>).post(contracts::upload_file::<S>),
    )
    .route(
      "/api/contracts/{id}/files/{file_id}",
      get(contracts::download_file::<S>).delete(contracts::remove_file::<S>),
    )
    .route(
      "/api/contracts/{id}/versions",
      get(contracts::list_versions::<S>).post(contracts::add_version::<S>),
    )
    .route(
      "/api/contracts/{id}/clauses",
      get(contracts::list_clauses::<S>).post(contracts::add_clause::<S>),
    )
    .route(
      "/api/contracts/{id}/deviations",
      get(contracts::list_deviations::<S>)
        .post(contracts::add_deviation::<S>),
    )
    .route(
      "/api/contracts/{id}/risks",
      get(contracts::list_risks::<S>).post(contracts::add_risk::<S>),
    )
    .route(
      "/api/contracts/{id}/signatures",
      get(contracts::list_signatures::<S>)
        .post(contracts::add_signature::<S>),
    )
    .route("/api/contracts/{id}/audit", get(contracts::audit_trail::<S>))
    .route(
      "/api/contracts/{id}/approvals",
      get(approvals::list_for_contract::<S>).post(approvals::request::<S>),
    )
    .route("/api/approvals", get(approvals::list::<S>))
    .route("/api/approvals/{id}", get(approvals::detail::<S>))
    .route("/api/approvals/{id}/decide", post(approvals::decide::<S>))
    .route("/api/approvals/{id}/cancel", post(approvals::cancel::<S>))
    .route(
      "/api/wizard",
      get(wizard::state::<S>).delete(wizard::reset::<S>),
    )
    .route("/api/wizard/step", post(wizard::step::<S>))
    .route("/api/wizard/back", post(wizard::back::<S>))
    .route("/api/wizard/upload", post(wizard::upload::<S>))
    .route("/api/wizard/commit", post(wizard::commit::<S>))
    .route(
      "/api/departments",
      get(admin::list_departments::<S>).post(admin::add_department::<S>),
    )
    .route("/api/departments/{id}", delete(admin::delete_department::<S>))
    .route(
      "/api/contract-types",
      get(admin::list_contract_types::<S>)
        .post(admin::add_contract_type::<S>),
    )
    .route(
      "/api/contract-types/{id}",
      delete(admin::delete_contract_type::<S>),
    )
    .route("/api/tags", get(admin::list_tags::<S>).post(admin::add_tag::<S>))
    .route("/api/tags/{id}", delete(admin::delete_tag::<S>))
    .route(
      "/api/playbook",
      get(admin::list_playbook::<S>).post(admin::add_playbook_entry::<S>),
    )
    .route("/api/playbook/{id}", delete(admin::delete_playbook_entry::<S>))
    .route(
      "/api/users",
      get(admin::list_users::<S>).put(admin::upsert_user::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use pacta_core::{
    access::{Role, UserAttrs},
    store::ContractStore,
    user::NewUser,
  };
  use pacta_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;
  use crate::auth::REMOTE_USER_HEADER;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    let files_root =
      std::env::temp_dir().join(format!("pacta-api-test-{}", Uuid::new_v4()));
    AppState::new(store, ServerConfig {
      host: "127.0.0.1".to_string(),
      port: 8080,
      db_path: PathBuf::from(":memory:"),
      files_root,
    })
  }

  async fn seed_user(
    state: &AppState<SqliteStore>,
    username: &str,
    role: Role,
  ) -> Uuid {
    state
      .store
      .upsert_user(NewUser {
        username:      username.to_string(),
        display_name:  username.to_string(),
        department_id: None,
        attrs:         UserAttrs { role: Some(role), ..Default::default() },
        active:        true,
      })
      .await
      .expect("seed user")
      .user_id
  }

  async fn oneshot_json(
    state: AppState<SqliteStore>,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
      builder = builder.header(REMOTE_USER_HEADER, user);
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let req = builder.body(body).expect("request");
    router(state).oneshot(req).await.expect("response")
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
  }

  /// Drive the wizard to a committed contract and return its id.
  async fn create_via_wizard(
    state: &AppState<SqliteStore>,
    user: &str,
    title: &str,
  ) -> Uuid {
    let steps = [
      json!({ "step": "method", "method": "template" }),
      json!({ "step": "name", "title": title }),
      json!({ "step": "basic", "category": "service" }),
      json!({ "step": "party", "counterparty_name": "Acme Corp" }),
      json!({ "step": "dates", "effective_date": "2026-01-01" }),
      json!({ "step": "value", "currency": "INR" }),
      json!({ "step": "owner_tags", "tag_ids": [] }),
    ];
    for step in steps {
      let resp = oneshot_json(
        state.clone(),
        "POST",
        "/api/wizard/step",
        Some(user),
        Some(step),
      )
      .await;
      assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/wizard/commit",
      Some(user),
      Some(json!({ "as_draft": false })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let contract = body_json(resp).await;
    contract["contract_id"]
      .as_str()
      .and_then(|s| s.parse().ok())
      .expect("contract id")
  }

  // ── Authentication ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_remote_user_header_returns_401() {
    let state = make_state().await;
    let resp =
      oneshot_json(state, "GET", "/api/contracts", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn unknown_remote_user_returns_401() {
    let state = make_state().await;
    let resp =
      oneshot_json(state, "GET", "/api/contracts", Some("ghost"), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn inactive_user_returns_401() {
    let state = make_state().await;
    state
      .store
      .upsert_user(NewUser {
        username:      "parted".to_string(),
        display_name:  "Parted Ways".to_string(),
        department_id: None,
        attrs:         UserAttrs::default(),
        active:        false,
      })
      .await
      .expect("seed user");
    let resp =
      oneshot_json(state, "GET", "/api/contracts", Some("parted"), None)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Wizard ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn wizard_template_flow_creates_a_numbered_contract() {
    let state = make_state().await;
    seed_user(&state, "jane", Role::Standard).await;

    let id = create_via_wizard(&state, "jane", "Hosting Agreement").await;

    let resp = oneshot_json(
      state.clone(),
      "GET",
      &format!("/api/contracts/{id}"),
      Some("jane"),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let detail = body_json(resp).await;
    assert_eq!(detail["contract"]["title"], "Hosting Agreement");
    assert!(
      detail["contract"]["contract_number"]
        .as_str()
        .expect("number")
        .starts_with("CNT-"),
    );
    assert_eq!(detail["versions"].as_array().expect("versions").len(), 1);
  }

  #[tokio::test]
  async fn wizard_session_survives_a_failed_commit() {
    let state = make_state().await;
    seed_user(&state, "jane", Role::Standard).await;

    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/wizard/step",
      Some("jane"),
      Some(json!({ "step": "method", "method": "template" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Incomplete, so a real submission is rejected.
    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/wizard/commit",
      Some("jane"),
      Some(json!({ "as_draft": false })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp =
      oneshot_json(state, "GET", "/api/wizard", Some("jane"), None).await;
    let wizard = body_json(resp).await;
    assert_eq!(wizard["method"], "template");
  }

  #[tokio::test]
  async fn read_only_users_cannot_enter_the_wizard() {
    let state = make_state().await;
    seed_user(&state, "viewer", Role::ReadOnly).await;
    let resp = oneshot_json(
      state,
      "POST",
      "/api/wizard/step",
      Some("viewer"),
      Some(json!({ "step": "method", "method": "template" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn basic_users_cannot_enter_the_wizard() {
    let state = make_state().await;
    seed_user(&state, "muggle", Role::Basic).await;
    let resp = oneshot_json(
      state,
      "POST",
      "/api/wizard/step",
      Some("muggle"),
      Some(json!({ "step": "method", "method": "template" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn commit_clears_the_session_even_if_the_blob_write_fails() {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    // A regular file where the blob root should be makes every blob
    // write fail while the database still accepts the contract.
    let files_root =
      std::env::temp_dir().join(format!("pacta-api-test-{}", Uuid::new_v4()));
    std::fs::write(&files_root, b"not a directory").expect("blocker file");
    let state = AppState::new(store, ServerConfig {
      host: "127.0.0.1".to_string(),
      port: 8080,
      db_path: PathBuf::from(":memory:"),
      files_root,
    });
    seed_user(&state, "jane", Role::Standard).await;

    let steps = [
      json!({ "step": "method", "method": "upload" }),
      json!({ "step": "name", "title": "Scanned NDA" }),
      json!({ "step": "basic", "category": "service" }),
      json!({ "step": "party", "counterparty_name": "Acme Corp" }),
      json!({ "step": "dates", "effective_date": "2026-01-01" }),
      json!({ "step": "value", "currency": "INR" }),
      json!({ "step": "owner_tags", "tag_ids": [] }),
    ];
    for step in steps {
      let resp = oneshot_json(
        state.clone(),
        "POST",
        "/api/wizard/step",
        Some("jane"),
        Some(step),
      )
      .await;
      assert_eq!(resp.status(), StatusCode::OK);
    }
    let req = Request::builder()
      .method("POST")
      .uri("/api/wizard/upload?filename=nda.pdf")
      .header(REMOTE_USER_HEADER, "jane")
      .header(header::CONTENT_TYPE, "application/pdf")
      .body(Body::from(&b"%PDF-1.4"[..]))
      .expect("request");
    let resp = router(state.clone()).oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/wizard/commit",
      Some("jane"),
      Some(json!({ "as_draft": false })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The row exists and the session is gone, so a retry cannot
    // duplicate the contract.
    let resp = oneshot_json(
      state.clone(),
      "GET",
      "/api/contracts",
      Some("jane"),
      None,
    )
    .await;
    let listed = body_json(resp).await;
    assert_eq!(listed.as_array().expect("contracts").len(), 1);

    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/wizard/commit",
      Some("jane"),
      Some(json!({ "as_draft": false })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp =
      oneshot_json(state, "GET", "/api/contracts", Some("jane"), None).await;
    let listed = body_json(resp).await;
    assert_eq!(listed.as_array().expect("contracts").len(), 1);
  }

  // ── Contracts ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn detail_appends_a_view_event() {
    let state = make_state().await;
    seed_user(&state, "jane", Role::Standard).await;
    let id = create_via_wizard(&state, "jane", "Audited").await;

    let resp = oneshot_json(
      state.clone(),
      "GET",
      &format!("/api/contracts/{id}"),
      Some("jane"),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_json(
      state,
      "GET",
      &format!("/api/contracts/{id}/audit"),
      Some("jane"),
      None,
    )
    .await;
    let events = body_json(resp).await;
    let actions: Vec<&str> = events
      .as_array()
      .expect("events")
      .iter()
      .filter_map(|e| e["action"].as_str())
      .collect();
    assert!(actions.contains(&"view"), "actions: {actions:?}");
    assert!(actions.contains(&"create_contract"), "actions: {actions:?}");
  }

  #[tokio::test]
  async fn upload_then_download_round_trips_the_bytes() {
    let state = make_state().await;
    seed_user(&state, "jane", Role::Standard).await;
    let id = create_via_wizard(&state, "jane", "With File").await;

    let req = Request::builder()
      .method("POST")
      .uri(format!("/api/contracts/{id}/files?filename=msa.pdf"))
      .header(REMOTE_USER_HEADER, "jane")
      .header(header::CONTENT_TYPE, "application/pdf")
      .body(Body::from(&b"%PDF-1.7 fake"[..]))
      .expect("request");
    let resp =
      router(state.clone()).oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let file = body_json(resp).await;
    let file_id = file["file_id"].as_i64().expect("file id");

    let resp = oneshot_json(
      state,
      "GET",
      &format!("/api/contracts/{id}/files/{file_id}"),
      Some("jane"),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
      .headers()
      .get(header::CONTENT_DISPOSITION)
      .and_then(|v| v.to_str().ok())
      .expect("disposition");
    assert!(disposition.contains("msa.pdf"), "disposition: {disposition}");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .expect("body");
    assert_eq!(&bytes[..], b"%PDF-1.7 fake");
  }

  #[tokio::test]
  async fn confidential_contracts_hide_from_unrelated_basic_users() {
    let state = make_state().await;
    seed_user(&state, "jane", Role::Standard).await;
    seed_user(&state, "sam", Role::Basic).await;

    let steps = [
      json!({ "step": "method", "method": "template" }),
      json!({ "step": "name", "title": "Secret Deal" }),
      json!({
        "step": "basic",
        "category": "nda",
        "is_confidential": true,
      }),
      json!({ "step": "party", "counterparty_name": "Quiet Ltd" }),
      json!({ "step": "dates", "effective_date": "2026-01-01" }),
      json!({ "step": "value", "currency": "INR" }),
      json!({ "step": "owner_tags", "tag_ids": [] }),
    ];
    for step in steps {
      oneshot_json(
        state.clone(),
        "POST",
        "/api/wizard/step",
        Some("jane"),
        Some(step),
      )
      .await;
    }
    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/wizard/commit",
      Some("jane"),
      Some(json!({ "as_draft": false })),
    )
    .await;
    let contract = body_json(resp).await;
    let id = contract["contract_id"].as_str().expect("id").to_string();

    let resp = oneshot_json(
      state.clone(),
      "GET",
      &format!("/api/contracts/{id}"),
      Some("sam"),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp =
      oneshot_json(state, "GET", "/api/contracts", Some("sam"), None).await;
    let listing = body_json(resp).await;
    assert_eq!(listing.as_array().expect("listing").len(), 0);
  }

  // ── Approvals ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn only_the_named_approver_may_decide() {
    let state = make_state().await;
    seed_user(&state, "jane", Role::Standard).await;
    let approver = seed_user(&state, "ravi", Role::Standard).await;
    seed_user(&state, "mallory", Role::Standard).await;
    let id = create_via_wizard(&state, "jane", "Needs Signoff").await;

    let resp = oneshot_json(
      state.clone(),
      "POST",
      &format!("/api/contracts/{id}/approvals"),
      Some("jane"),
      Some(json!({ "approver_id": approver, "reason": "legal review" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let approval = body_json(resp).await;
    let approval_id = approval["approval_id"].as_i64().expect("approval id");

    let resp = oneshot_json(
      state.clone(),
      "POST",
      &format!("/api/approvals/{approval_id}/decide"),
      Some("mallory"),
      Some(json!({ "decision": "approved" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = oneshot_json(
      state,
      "POST",
      &format!("/api/approvals/{approval_id}/decide"),
      Some("ravi"),
      Some(json!({ "decision": "approved", "comment": "fine by legal" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let decided = body_json(resp).await;
    assert_eq!(decided["status"], "approved");
  }

  // ── Administration ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn refdata_mutations_require_the_administrator_role() {
    let state = make_state().await;
    seed_user(&state, "jane", Role::Standard).await;
    seed_user(&state, "root", Role::Administrator).await;

    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/departments",
      Some("jane"),
      Some(json!({ "name": "Legal" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/departments",
      Some("root"),
      Some(json!({ "name": "Legal" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Listings stay open so the wizard can fill its dropdowns.
    let resp =
      oneshot_json(state, "GET", "/api/departments", Some("jane"), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rows = body_json(resp).await;
    assert_eq!(rows.as_array().expect("rows").len(), 1);
  }

  #[tokio::test]
  async fn dashboard_reports_status_counts() {
    let state = make_state().await;
    seed_user(&state, "jane", Role::Standard).await;
    create_via_wizard(&state, "jane", "One").await;
    create_via_wizard(&state, "jane", "Two").await;

    let resp =
      oneshot_json(state, "GET", "/api/dashboard", Some("jane"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let metrics = body_json(resp).await;
    assert_eq!(metrics["status_counts"]["pending"], 2);
  }
}
