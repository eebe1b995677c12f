//! Contract shares.
//!
//! A share grants view or edit access to either a single user or an
//! entire department. The target is exactly one of the two, which the
//! [`ShareTarget`] enum enforces at the type level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShareTarget {
  User { user_id: Uuid },
  Department { department_id: i64 },
}

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
pub enum AccessLevel {
  View,
  Edit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractShare {
  pub share_id:     i64,
  pub contract_id:  Uuid,
  pub target:       ShareTarget,
  pub access_level: AccessLevel,
  pub shared_by:    Option<Uuid>,
  pub shared_at:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShare {
  pub target:       ShareTarget,
  pub access_level: AccessLevel,
  pub shared_by:    Option<Uuid>,
}

impl ContractShare {
  /// Whether this share reaches `user_id`, given the user's department.
  pub fn applies_to(&self, user_id: Uuid, department_id: Option<i64>) -> bool {
    match self.target {
      ShareTarget::User { user_id: target } => target == user_id,
      ShareTarget::Department { department_id: target } => {
        department_id == Some(target)
      }
    }
  }
}
