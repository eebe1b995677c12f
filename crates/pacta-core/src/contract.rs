//! Contract — the primary legal-agreement record tracked by the system.
//!
//! A contract's number is assigned by the store on first persist and is
//! never reassigned. Expiry is derived from dates at read time, never
//! stored.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Default window, in days, inside which an active contract counts as
/// "expiring soon".
pub const EXPIRY_WINDOW_DAYS: i64 = 30;

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Lifecycle status of a contract. Transitions are not strictly enforced;
/// every change is recorded as an audit event.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
  Draft,
  Pending,
  Active,
  Expired,
  Terminated,
  Archived,
}

impl ContractStatus {
  pub const ALL: [ContractStatus; 6] = [
    Self::Draft,
    Self::Pending,
    Self::Active,
    Self::Expired,
    Self::Terminated,
    Self::Archived,
  ];
}

/// Business category of a contract.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Sales,
  Procurement,
  Hr,
  Legal,
  Finance,
  Partnership,
  Nda,
  Service,
  Other,
}

impl Default for Category {
  fn default() -> Self { Self::Other }
}

// ─── Contract ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
  pub contract_id:          Uuid,
  /// `CNT-<YYYYMM>-<first 8 chars of the UUID, uppercased>`; unique,
  /// assigned once on creation.
  pub contract_number:      String,
  pub title:                String,
  pub status:               ContractStatus,
  pub category:             Category,
  pub sub_category:         String,
  pub org_entity:           String,
  pub region_country:       String,
  /// The business unit / team this contract belongs to.
  pub department_id:        Option<i64>,
  pub counterparty_name:    String,
  pub counterparty_address: String,
  pub contract_type_id:     Option<i64>,
  pub value_amount:         Option<Decimal>,
  pub currency:             String,
  /// CRM opportunity reference, free text.
  pub opportunity_id:       String,
  pub effective_date:       Option<NaiveDate>,
  pub end_date:             Option<NaiveDate>,
  pub auto_renewal:         bool,
  pub renewal_notice_date:  Option<NaiveDate>,
  pub owner_id:             Option<Uuid>,
  pub created_by:           Option<Uuid>,
  pub is_confidential:      bool,
  /// Free-form metadata merged in by callers.
  pub extra:                serde_json::Value,
  pub tag_ids:              Vec<i64>,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

impl Contract {
  /// The human contract number assigned on first persist.
  pub fn number_for(id: Uuid, at: DateTime<Utc>) -> String {
    let id_str = id.hyphenated().to_string();
    format!("CNT-{}-{}", at.format("%Y%m"), id_str[..8].to_uppercase())
  }

  /// True when the end date is in the past, regardless of stored status.
  pub fn is_expired(&self, today: NaiveDate) -> bool {
    self.end_date.is_some_and(|end| end < today)
  }

  /// True when the contract is Active and ends within `window_days`
  /// (exclusive of today, inclusive of the window boundary).
  pub fn is_expiring_soon(&self, today: NaiveDate, window_days: i64) -> bool {
    if self.status != ContractStatus::Active {
      return false;
    }
    match self.end_date {
      Some(end) => {
        let days = (end - today).num_days();
        0 < days && days <= window_days
      }
      None => false,
    }
  }

  /// True when an auto-renewing active contract's renewal notice falls
  /// within `window_days` from `today`.
  pub fn renewal_notice_due(&self, today: NaiveDate, window_days: i64) -> bool {
    if self.status != ContractStatus::Active || !self.auto_renewal {
      return false;
    }
    match self.renewal_notice_date {
      Some(notice) => {
        let days = (notice - today).num_days();
        0 <= days && days <= window_days
      }
      None => false,
    }
  }
}

// ─── Date-range validation ───────────────────────────────────────────────────

/// Shared validation for a contract's date triple. Used by the wizard's
/// dates step and by create/update inputs.
pub fn validate_dates(
  effective: Option<NaiveDate>,
  end: Option<NaiveDate>,
  renewal_notice: Option<NaiveDate>,
) -> Result<()> {
  if let (Some(eff), Some(end)) = (effective, end)
    && end < eff
  {
    return Err(Error::Validation(
      "end date must not be before effective date".into(),
    ));
  }
  if let (Some(notice), Some(end)) = (renewal_notice, end)
    && notice > end
  {
    return Err(Error::Validation(
      "renewal notice date must not be after end date".into(),
    ));
  }
  Ok(())
}

// ─── NewContract ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::ContractStore::create_contract`]. The store
/// assigns the UUID, contract number, and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContract {
  pub title:                String,
  pub status:               ContractStatus,
  pub category:             Category,
  pub sub_category:         String,
  pub org_entity:           String,
  pub region_country:       String,
  pub department_id:        Option<i64>,
  pub counterparty_name:    String,
  pub counterparty_address: String,
  pub contract_type_id:     Option<i64>,
  pub value_amount:         Option<Decimal>,
  pub currency:             String,
  pub opportunity_id:       String,
  pub effective_date:       Option<NaiveDate>,
  pub end_date:             Option<NaiveDate>,
  pub auto_renewal:         bool,
  pub renewal_notice_date:  Option<NaiveDate>,
  pub owner_id:             Option<Uuid>,
  pub created_by:           Option<Uuid>,
  pub is_confidential:      bool,
  #[serde(default)]
  pub extra:                serde_json::Value,
  #[serde(default)]
  pub tag_ids:              Vec<i64>,
}

impl NewContract {
  /// Surface logically inconsistent input before any mutation.
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Validation("title must not be empty".into()));
    }
    validate_dates(self.effective_date, self.end_date, self.renewal_notice_date)
  }
}

/// Editable fields of an existing contract. The contract number and
/// creation metadata are never part of an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractUpdate {
  pub title:                String,
  pub status:               ContractStatus,
  pub category:             Category,
  pub sub_category:         String,
  pub org_entity:           String,
  pub region_country:       String,
  pub department_id:        Option<i64>,
  pub counterparty_name:    String,
  pub counterparty_address: String,
  pub contract_type_id:     Option<i64>,
  pub value_amount:         Option<Decimal>,
  pub currency:             String,
  pub opportunity_id:       String,
  pub effective_date:       Option<NaiveDate>,
  pub end_date:             Option<NaiveDate>,
  pub auto_renewal:         bool,
  pub renewal_notice_date:  Option<NaiveDate>,
  pub owner_id:             Option<Uuid>,
  pub is_confidential:      bool,
  #[serde(default)]
  pub tag_ids:              Vec<i64>,
}

impl ContractUpdate {
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Validation("title must not be empty".into()));
    }
    validate_dates(self.effective_date, self.end_date, self.renewal_notice_date)
  }
}

/// Listing tabs. `Draft` is the Draft status, `Pending` is the Pending
/// status or any contract with a pending approval, `Repository` is
/// everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractTab {
  Draft,
  Pending,
  Repository,
}

/// Filter for contract listings. `None`/empty fields match everything;
/// `search` matches title, number and counterparty, case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ContractQuery {
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

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn number_format() {
    let id = Uuid::parse_str("9f86d081-8842-4c61-9cfb-2f0f2a5d8a33").unwrap();
    let at = "2024-03-15T10:00:00Z".parse().unwrap();
    assert_eq!(Contract::number_for(id, at), "CNT-202403-9F86D081");
  }

  #[test]
  fn dates_reject_end_before_effective() {
    let err = validate_dates(Some(date(2024, 6, 1)), Some(date(2024, 1, 1)), None);
    assert!(err.is_err());
  }

  #[test]
  fn dates_reject_notice_after_end() {
    let err =
      validate_dates(None, Some(date(2024, 6, 1)), Some(date(2024, 7, 1)));
    assert!(err.is_err());
  }

  #[test]
  fn dates_accept_open_ended() {
    assert!(validate_dates(Some(date(2024, 1, 1)), None, None).is_ok());
  }

  fn contract_with_dates(
    status: ContractStatus,
    end: Option<NaiveDate>,
  ) -> Contract {
    Contract {
      contract_id:          Uuid::new_v4(),
      contract_number:      "CNT-202401-ABCDEF01".into(),
      title:                "T".into(),
      status,
      category:             Category::Other,
      sub_category:         String::new(),
      org_entity:           String::new(),
      region_country:       String::new(),
      department_id:        None,
      counterparty_name:    String::new(),
      counterparty_address: String::new(),
      contract_type_id:     None,
      value_amount:         None,
      currency:             "INR".into(),
      opportunity_id:       String::new(),
      effective_date:       None,
      end_date:             end,
      auto_renewal:         false,
      renewal_notice_date:  None,
      owner_id:             None,
      created_by:           None,
      is_confidential:      false,
      extra:                serde_json::Value::Null,
      tag_ids:              vec![],
      created_at:           Utc::now(),
      updated_at:           Utc::now(),
    }
  }

  #[test]
  fn expiring_soon_only_when_active_and_inside_window() {
    let today = date(2024, 6, 1);
    let c =
      contract_with_dates(ContractStatus::Active, Some(date(2024, 6, 20)));
    assert!(c.is_expiring_soon(today, EXPIRY_WINDOW_DAYS));

    let draft =
      contract_with_dates(ContractStatus::Draft, Some(date(2024, 6, 20)));
    assert!(!draft.is_expiring_soon(today, EXPIRY_WINDOW_DAYS));

    let far =
      contract_with_dates(ContractStatus::Active, Some(date(2024, 8, 1)));
    assert!(!far.is_expiring_soon(today, EXPIRY_WINDOW_DAYS));

    // Ends today: not "expiring soon", the window is exclusive of today.
    let ends_today =
      contract_with_dates(ContractStatus::Active, Some(today));
    assert!(!ends_today.is_expiring_soon(today, EXPIRY_WINDOW_DAYS));
  }

  #[test]
  fn expired_ignores_status() {
    let today = date(2024, 6, 1);
    let c =
      contract_with_dates(ContractStatus::Active, Some(date(2024, 5, 1)));
    assert!(c.is_expired(today));
    let d = contract_with_dates(ContractStatus::Draft, Some(date(2024, 5, 1)));
    assert!(d.is_expired(today));
  }

  #[test]
  fn status_round_trips_through_strum() {
    for status in ContractStatus::ALL {
      let text = status.to_string();
      let back: ContractStatus = text.parse().unwrap();
      assert_eq!(back, status);
    }
    assert_eq!(ContractStatus::Draft.to_string(), "DRAFT");
  }
}
