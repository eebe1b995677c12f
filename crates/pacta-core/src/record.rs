//! Review artifacts attached to a contract: extracted clauses, playbook
//! deviations, risk items, and signature records. All of these are
//! exclusively owned by their contract and deleted along with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
  Low,
  Medium,
  High,
  Critical,
}

// ─── Clauses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clause {
  pub clause_id:         i64,
  pub contract_id:       Uuid,
  pub label:             String,
  pub text:              String,
  pub risk:              RiskLevel,
  pub from_playbook:     bool,
  pub playbook_entry_id: Option<i64>,
  pub created_at:        DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClause {
  pub label:             String,
  pub text:              String,
  pub risk:              RiskLevel,
  pub from_playbook:     bool,
  pub playbook_entry_id: Option<i64>,
}

// ─── Deviations ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deviation {
  pub deviation_id: i64,
  pub contract_id:  Uuid,
  pub clause_id:    Option<i64>,
  pub description:  String,
  pub risk:         RiskLevel,
  pub justification: String,
  pub approved:     bool,
  pub approved_by:  Option<Uuid>,
  pub approved_at:  Option<DateTime<Utc>>,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeviation {
  pub clause_id:     Option<i64>,
  pub description:   String,
  pub risk:          RiskLevel,
  pub justification: String,
}

// ─── Risk items ──────────────────────────────────────────────────────────────

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
pub enum RiskStatus {
  Open,
  Mitigated,
  Accepted,
  Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskItem {
  pub risk_id:     i64,
  pub contract_id: Uuid,
  pub description: String,
  pub severity:    RiskLevel,
  pub mitigation:  String,
  pub status:      RiskStatus,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRiskItem {
  pub description: String,
  pub severity:    RiskLevel,
  pub mitigation:  String,
}

impl RiskItem {
  /// Open risks at high or critical severity drive the dashboard count.
  pub fn is_open_and_severe(&self) -> bool {
    self.status == RiskStatus::Open && self.severity >= RiskLevel::High
  }
}

// ─── Signature records ───────────────────────────────────────────────────────

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
pub enum SignatureParty {
  Customer,
  Vendor,
  Internal,
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
pub enum SignType {
  Aadhaar,
  Wet,
  ESign,
  Dsc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
  pub signature_id:        i64,
  pub contract_id:         Uuid,
  pub party:               SignatureParty,
  pub signatory_name:      String,
  pub signatory_email:     String,
  pub signatory_phone:     String,
  pub designation:         String,
  pub sign_type:           SignType,
  pub signed_at:           Option<DateTime<Utc>>,
  pub signature_reference: String,
  pub created_at:          DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSignatureRecord {
  pub party:               SignatureParty,
  pub signatory_name:      String,
  pub signatory_email:     String,
  pub signatory_phone:     String,
  pub designation:         String,
  pub sign_type:           SignType,
  pub signed_at:           Option<DateTime<Utc>>,
  pub signature_reference: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn risk_ordering_drives_severe_check() {
    let mut risk = RiskItem {
      risk_id: 1,
      contract_id: Uuid::new_v4(),
      description: "unlimited liability".into(),
      severity: RiskLevel::High,
      mitigation: String::new(),
      status: RiskStatus::Open,
      created_at: Utc::now(),
    };
    assert!(risk.is_open_and_severe());
    risk.severity = RiskLevel::Critical;
    assert!(risk.is_open_and_severe());
    risk.severity = RiskLevel::Medium;
    assert!(!risk.is_open_and_severe());
    risk.severity = RiskLevel::High;
    risk.status = RiskStatus::Mitigated;
    assert!(!risk.is_open_and_severe());
  }

  #[test]
  fn risk_level_text_round_trips() {
    assert_eq!(RiskLevel::Critical.to_string(), "CRITICAL");
    assert_eq!("E_SIGN".parse::<SignType>().unwrap(), SignType::ESign);
  }
}
