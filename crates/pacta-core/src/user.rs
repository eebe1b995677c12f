//! Users known to the service.
//!
//! Authentication is delegated to a fronting identity provider. Raw
//! identity attributes arrive as [`UserAttrs`]; the role is resolved
//! once at upsert (see [`crate::access::resolve_role`]) and stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{Role, UserAttrs};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub username:      String,
  pub display_name:  String,
  pub department_id: Option<i64>,
  pub role:          Role,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
}

/// Upsert input; the store resolves `attrs` into a stored [`Role`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub display_name:  String,
  pub department_id: Option<i64>,
  pub attrs:         UserAttrs,
  pub active:        bool,
}
