//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates ISO 8601 (`YYYY-MM-DD`),
//! UUIDs hyphenated lowercase, monetary values `rust_decimal` strings,
//! status enums their SCREAMING_SNAKE_CASE text form, and free-form
//! metadata compact JSON.

use chrono::{DateTime, NaiveDate, Utc};
use pacta_core::{
  approval::AdditionalApproval,
  audit::AuditEvent,
  contract::Contract,
  file::ContractFile,
  record::{Clause, Deviation, RiskItem, SignatureRecord},
  share::{ContractShare, ShareTarget},
  user::User,
  version::ContractVersion,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse()
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn encode_decimal(d: Decimal) -> String { d.to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> {
  s.parse()
    .map_err(|e| Error::Decode(format!("decimal {s:?}: {e}")))
}

/// Parse a TEXT column back into a `strum`-derived enum.
pub fn decode_enum<T>(s: &str) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  s.parse()
    .map_err(|e| Error::Decode(format!("enum value {s:?}: {e}")))
}

pub fn encode_json(v: &serde_json::Value) -> Result<String> {
  Ok(serde_json::to_string(v)?)
}

pub fn decode_json(s: &str) -> Result<serde_json::Value> {
  Ok(serde_json::from_str(s)?)
}

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

/// `GROUP_CONCAT(tag_id)` output — comma-separated, NULL when no tags.
pub fn decode_id_list(s: Option<String>) -> Result<Vec<i64>> {
  match s {
    None => Ok(Vec::new()),
    Some(s) => s
      .split(',')
      .map(|part| {
        part
          .parse()
          .map_err(|e| Error::Decode(format!("tag id {part:?}: {e}")))
      })
      .collect(),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `contracts` row (tags joined in via
/// GROUP_CONCAT).
pub struct RawContract {
  pub contract_id:          String,
  pub contract_number:      String,
  pub title:                String,
  pub status:               String,
  pub category:             String,
  pub sub_category:         String,
  pub org_entity:           String,
  pub region_country:       String,
  pub department_id:        Option<i64>,
  pub counterparty_name:    String,
  pub counterparty_address: String,
  pub contract_type_id:     Option<i64>,
  pub value_amount:         Option<String>,
  pub currency:             String,
  pub opportunity_id:       String,
  pub effective_date:       Option<String>,
  pub end_date:             Option<String>,
  pub renewal_notice_date:  Option<String>,
  pub auto_renewal:         bool,
  pub owner_id:             Option<String>,
  pub created_by:           Option<String>,
  pub is_confidential:      bool,
  pub extra:                String,
  pub created_at:           String,
  pub updated_at:           String,
  pub tag_ids:              Option<String>,
}

impl RawContract {
  /// Column list matching the field order above; `{c}` is the table
  /// alias.
  pub fn columns(c: &str) -> String {
    format!(
      "{c}.contract_id, {c}.contract_number, {c}.title, {c}.status,
       {c}.category, {c}.sub_category, {c}.org_entity, {c}.region_country,
       {c}.department_id, {c}.counterparty_name, {c}.counterparty_address,
       {c}.contract_type_id, {c}.value_amount, {c}.currency,
       {c}.opportunity_id, {c}.effective_date, {c}.end_date,
       {c}.renewal_notice_date, {c}.auto_renewal, {c}.owner_id,
       {c}.created_by, {c}.is_confidential, {c}.extra, {c}.created_at,
       {c}.updated_at,
       (SELECT GROUP_CONCAT(ct.tag_id) FROM contract_tags ct
         WHERE ct.contract_id = {c}.contract_id) AS tag_ids"
    )
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contract_id:          row.get(0)?,
      contract_number:      row.get(1)?,
      title:                row.get(2)?,
      status:               row.get(3)?,
      category:             row.get(4)?,
      sub_category:         row.get(5)?,
      org_entity:           row.get(6)?,
      region_country:       row.get(7)?,
      department_id:        row.get(8)?,
      counterparty_name:    row.get(9)?,
      counterparty_address: row.get(10)?,
      contract_type_id:     row.get(11)?,
      value_amount:         row.get(12)?,
      currency:             row.get(13)?,
      opportunity_id:       row.get(14)?,
      effective_date:       row.get(15)?,
      end_date:             row.get(16)?,
      renewal_notice_date:  row.get(17)?,
      auto_renewal:         row.get(18)?,
      owner_id:             row.get(19)?,
      created_by:           row.get(20)?,
      is_confidential:      row.get(21)?,
      extra:                row.get(22)?,
      created_at:           row.get(23)?,
      updated_at:           row.get(24)?,
      tag_ids:              row.get(25)?,
    })
  }

  pub fn into_contract(self) -> Result<Contract> {
    Ok(Contract {
      contract_id:          decode_uuid(&self.contract_id)?,
      contract_number:      self.contract_number,
      title:                self.title,
      status:               decode_enum(&self.status)?,
      category:             decode_enum(&self.category)?,
      sub_category:         self.sub_category,
      org_entity:           self.org_entity,
      region_country:       self.region_country,
      department_id:        self.department_id,
      counterparty_name:    self.counterparty_name,
      counterparty_address: self.counterparty_address,
      contract_type_id:     self.contract_type_id,
      value_amount:         self
        .value_amount
        .as_deref()
        .map(decode_decimal)
        .transpose()?,
      currency:             self.currency,
      opportunity_id:       self.opportunity_id,
      effective_date:       decode_opt_date(self.effective_date)?,
      end_date:             decode_opt_date(self.end_date)?,
      renewal_notice_date:  decode_opt_date(self.renewal_notice_date)?,
      auto_renewal:         self.auto_renewal,
      owner_id:             decode_opt_uuid(self.owner_id)?,
      created_by:           decode_opt_uuid(self.created_by)?,
      is_confidential:      self.is_confidential,
      extra:                decode_json(&self.extra)?,
      tag_ids:              decode_id_list(self.tag_ids)?,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub display_name:  String,
  pub department_id: Option<i64>,
  pub role:          String,
  pub active:        bool,
  pub created_at:    String,
}

impl RawUser {
  pub const COLUMNS: &'static str =
    "user_id, username, display_name, department_id, role, active, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      display_name:  row.get(2)?,
      department_id: row.get(3)?,
      role:          row.get(4)?,
      active:        row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      username:      self.username,
      display_name:  self.display_name,
      department_id: self.department_id,
      role:          decode_enum(&self.role)?,
      active:        self.active,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawFile {
  pub file_id:           i64,
  pub contract_id:       String,
  pub original_filename: String,
  pub storage_path:      String,
  pub size_bytes:        i64,
  pub media_type:        String,
  pub is_primary:        bool,
  pub description:       String,
  pub uploaded_by:       Option<String>,
  pub uploaded_at:       String,
}

impl RawFile {
  pub const COLUMNS: &'static str =
    "file_id, contract_id, original_filename, storage_path, size_bytes,
     media_type, is_primary, description, uploaded_by, uploaded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      file_id:           row.get(0)?,
      contract_id:       row.get(1)?,
      original_filename: row.get(2)?,
      storage_path:      row.get(3)?,
      size_bytes:        row.get(4)?,
      media_type:        row.get(5)?,
      is_primary:        row.get(6)?,
      description:       row.get(7)?,
      uploaded_by:       row.get(8)?,
      uploaded_at:       row.get(9)?,
    })
  }

  pub fn into_file(self) -> Result<ContractFile> {
    Ok(ContractFile {
      file_id:           self.file_id,
      contract_id:       decode_uuid(&self.contract_id)?,
      original_filename: self.original_filename,
      storage_path:      self.storage_path,
      size_bytes:        self.size_bytes,
      media_type:        self.media_type,
      is_primary:        self.is_primary,
      description:       self.description,
      uploaded_by:       decode_opt_uuid(self.uploaded_by)?,
      uploaded_at:       decode_dt(&self.uploaded_at)?,
    })
  }
}

pub struct RawVersion {
  pub version_id:     i64,
  pub contract_id:    String,
  pub version_number: i64,
  pub label:          String,
  pub storage_path:   Option<String>,
  pub notes:          String,
  pub created_by:     Option<String>,
  pub created_at:     String,
}

impl RawVersion {
  pub const COLUMNS: &'static str =
    "version_id, contract_id, version_number, label, storage_path, notes,
     created_by, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:     row.get(0)?,
      contract_id:    row.get(1)?,
      version_number: row.get(2)?,
      label:          row.get(3)?,
      storage_path:   row.get(4)?,
      notes:          row.get(5)?,
      created_by:     row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  pub fn into_version(self) -> Result<ContractVersion> {
    Ok(ContractVersion {
      version_id:     self.version_id,
      contract_id:    decode_uuid(&self.contract_id)?,
      version_number: self.version_number,
      label:          self.label,
      storage_path:   self.storage_path,
      notes:          self.notes,
      created_by:     decode_opt_uuid(self.created_by)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawShare {
  pub share_id:             i64,
  pub contract_id:          String,
  pub target_user_id:       Option<String>,
  pub target_department_id: Option<i64>,
  pub access_level:         String,
  pub shared_by:            Option<String>,
  pub shared_at:            String,
}

impl RawShare {
  pub const COLUMNS: &'static str =
    "share_id, contract_id, target_user_id, target_department_id,
     access_level, shared_by, shared_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      share_id:             row.get(0)?,
      contract_id:          row.get(1)?,
      target_user_id:       row.get(2)?,
      target_department_id: row.get(3)?,
      access_level:         row.get(4)?,
      shared_by:            row.get(5)?,
      shared_at:            row.get(6)?,
    })
  }

  pub fn into_share(self) -> Result<ContractShare> {
    let target = match (self.target_user_id, self.target_department_id) {
      (Some(user), None) => ShareTarget::User { user_id: decode_uuid(&user)? },
      (None, Some(department_id)) => ShareTarget::Department { department_id },
      _ => {
        return Err(Error::Decode(format!(
          "share {} has no single target",
          self.share_id
        )));
      }
    };
    Ok(ContractShare {
      share_id: self.share_id,
      contract_id: decode_uuid(&self.contract_id)?,
      target,
      access_level: decode_enum(&self.access_level)?,
      shared_by: decode_opt_uuid(self.shared_by)?,
      shared_at: decode_dt(&self.shared_at)?,
    })
  }
}

pub struct RawApproval {
  pub approval_id:      i64,
  pub contract_id:      String,
  pub requested_by:     String,
  pub approver_id:      String,
  pub status:           String,
  pub reason:           String,
  pub due_date:         Option<String>,
  pub created_at:       String,
  pub decided_at:       Option<String>,
  pub decision_comment: Option<String>,
}

impl RawApproval {
  pub const COLUMNS: &'static str =
    "approval_id, contract_id, requested_by, approver_id, status, reason,
     due_date, created_at, decided_at, decision_comment";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      approval_id:      row.get(0)?,
      contract_id:      row.get(1)?,
      requested_by:     row.get(2)?,
      approver_id:      row.get(3)?,
      status:           row.get(4)?,
      reason:           row.get(5)?,
      due_date:         row.get(6)?,
      created_at:       row.get(7)?,
      decided_at:       row.get(8)?,
      decision_comment: row.get(9)?,
    })
  }

  pub fn into_approval(self) -> Result<AdditionalApproval> {
    Ok(AdditionalApproval {
      approval_id:      self.approval_id,
      contract_id:      decode_uuid(&self.contract_id)?,
      requested_by:     decode_uuid(&self.requested_by)?,
      approver_id:      decode_uuid(&self.approver_id)?,
      status:           decode_enum(&self.status)?,
      reason:           self.reason,
      due_date:         decode_opt_date(self.due_date)?,
      created_at:       decode_dt(&self.created_at)?,
      decided_at:       decode_opt_dt(self.decided_at)?,
      decision_comment: self.decision_comment,
    })
  }
}

pub struct RawClause {
  pub clause_id:         i64,
  pub contract_id:       String,
  pub label:             String,
  pub clause_text:       String,
  pub risk:              String,
  pub from_playbook:     bool,
  pub playbook_entry_id: Option<i64>,
  pub created_at:        String,
}

impl RawClause {
  pub const COLUMNS: &'static str =
    "clause_id, contract_id, label, clause_text, risk, from_playbook,
     playbook_entry_id, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      clause_id:         row.get(0)?,
      contract_id:       row.get(1)?,
      label:             row.get(2)?,
      clause_text:       row.get(3)?,
      risk:              row.get(4)?,
      from_playbook:     row.get(5)?,
      playbook_entry_id: row.get(6)?,
      created_at:        row.get(7)?,
    })
  }

  pub fn into_clause(self) -> Result<Clause> {
    Ok(Clause {
      clause_id:         self.clause_id,
      contract_id:       decode_uuid(&self.contract_id)?,
      label:             self.label,
      text:              self.clause_text,
      risk:              decode_enum(&self.risk)?,
      from_playbook:     self.from_playbook,
      playbook_entry_id: self.playbook_entry_id,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawDeviation {
  pub deviation_id:  i64,
  pub contract_id:   String,
  pub clause_id:     Option<i64>,
  pub description:   String,
  pub risk:          String,
  pub justification: String,
  pub approved:      bool,
  pub approved_by:   Option<String>,
  pub approved_at:   Option<String>,
  pub created_at:    String,
}

impl RawDeviation {
  pub const COLUMNS: &'static str =
    "deviation_id, contract_id, clause_id, description, risk, justification,
     approved, approved_by, approved_at, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      deviation_id:  row.get(0)?,
      contract_id:   row.get(1)?,
      clause_id:     row.get(2)?,
      description:   row.get(3)?,
      risk:          row.get(4)?,
      justification: row.get(5)?,
      approved:      row.get(6)?,
      approved_by:   row.get(7)?,
      approved_at:   row.get(8)?,
      created_at:    row.get(9)?,
    })
  }

  pub fn into_deviation(self) -> Result<Deviation> {
    Ok(Deviation {
      deviation_id:  self.deviation_id,
      contract_id:   decode_uuid(&self.contract_id)?,
      clause_id:     self.clause_id,
      description:   self.description,
      risk:          decode_enum(&self.risk)?,
      justification: self.justification,
      approved:      self.approved,
      approved_by:   decode_opt_uuid(self.approved_by)?,
      approved_at:   decode_opt_dt(self.approved_at)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawRisk {
  pub risk_id:     i64,
  pub contract_id: String,
  pub description: String,
  pub severity:    String,
  pub mitigation:  String,
  pub status:      String,
  pub created_at:  String,
}

impl RawRisk {
  pub const COLUMNS: &'static str =
    "risk_id, contract_id, description, severity, mitigation, status,
     created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      risk_id:     row.get(0)?,
      contract_id: row.get(1)?,
      description: row.get(2)?,
      severity:    row.get(3)?,
      mitigation:  row.get(4)?,
      status:      row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_risk(self) -> Result<RiskItem> {
    Ok(RiskItem {
      risk_id:     self.risk_id,
      contract_id: decode_uuid(&self.contract_id)?,
      description: self.description,
      severity:    decode_enum(&self.severity)?,
      mitigation:  self.mitigation,
      status:      decode_enum(&self.status)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSignature {
  pub signature_id:        i64,
  pub contract_id:         String,
  pub party:               String,
  pub signatory_name:      String,
  pub signatory_email:     String,
  pub signatory_phone:     String,
  pub designation:         String,
  pub sign_type:           String,
  pub signed_at:           Option<String>,
  pub signature_reference: String,
  pub created_at:          String,
}

impl RawSignature {
  pub const COLUMNS: &'static str =
    "signature_id, contract_id, party, signatory_name, signatory_email,
     signatory_phone, designation, sign_type, signed_at,
     signature_reference, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      signature_id:        row.get(0)?,
      contract_id:         row.get(1)?,
      party:               row.get(2)?,
      signatory_name:      row.get(3)?,
      signatory_email:     row.get(4)?,
      signatory_phone:     row.get(5)?,
      designation:         row.get(6)?,
      sign_type:           row.get(7)?,
      signed_at:           row.get(8)?,
      signature_reference: row.get(9)?,
      created_at:          row.get(10)?,
    })
  }

  pub fn into_signature(self) -> Result<SignatureRecord> {
    Ok(SignatureRecord {
      signature_id:        self.signature_id,
      contract_id:         decode_uuid(&self.contract_id)?,
      party:               decode_enum(&self.party)?,
      signatory_name:      self.signatory_name,
      signatory_email:     self.signatory_email,
      signatory_phone:     self.signatory_phone,
      designation:         self.designation,
      sign_type:           decode_enum(&self.sign_type)?,
      signed_at:           decode_opt_dt(self.signed_at)?,
      signature_reference: self.signature_reference,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAuditEvent {
  pub event_id:    i64,
  pub contract_id: Option<String>,
  pub actor_id:    Option<String>,
  pub action:      String,
  pub metadata:    String,
  pub ip_address:  Option<String>,
  pub user_agent:  Option<String>,
  pub created_at:  String,
}

impl RawAuditEvent {
  pub const COLUMNS: &'static str =
    "event_id, contract_id, actor_id, action, metadata, ip_address,
     user_agent, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      contract_id: row.get(1)?,
      actor_id:    row.get(2)?,
      action:      row.get(3)?,
      metadata:    row.get(4)?,
      ip_address:  row.get(5)?,
      user_agent:  row.get(6)?,
      created_at:  row.get(7)?,
    })
  }

  pub fn into_event(self) -> Result<AuditEvent> {
    Ok(AuditEvent {
      event_id:    self.event_id,
      contract_id: decode_opt_uuid(self.contract_id)?,
      actor_id:    decode_opt_uuid(self.actor_id)?,
      action:      decode_enum(&self.action)?,
      metadata:    decode_json(&self.metadata)?,
      ip_address:  self.ip_address,
      user_agent:  self.user_agent,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
