//! Administrator-managed reference data: departments, contract types,
//! tags, and playbook entries. These have independent lifecycles and are
//! referenced, never owned, by contracts.

use serde::{Deserialize, Serialize};

use crate::record::RiskLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
  pub department_id: i64,
  pub name:          String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractType {
  pub contract_type_id: i64,
  pub name:             String,
  pub description:      String,
  pub active:           bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id:      i64,
  pub name:        String,
  pub description: String,
  pub color:       String,
  pub active:      bool,
}

/// A pre-approved clause template. Deviations are judged against these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookEntry {
  pub entry_id:         i64,
  pub label:            String,
  pub category:         String,
  pub recommended_text: String,
  pub risk:             RiskLevel,
  pub guidance_notes:   String,
  pub active:           bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlaybookEntry {
  pub label:            String,
  pub category:         String,
  pub recommended_text: String,
  pub risk:             RiskLevel,
  pub guidance_notes:   String,
}
