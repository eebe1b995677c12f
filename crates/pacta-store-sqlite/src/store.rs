//! [`SqliteStore`] — the SQLite implementation of [`ContractStore`].
//!
//! Writes that touch more than one table (a mutation plus its audit
//! event, tag sets, primary-file demotion) run inside an explicit
//! transaction within one connection call, so partial state never
//! becomes visible. The synchronous helpers below take a plain
//! [`rusqlite::Connection`] and are shared between those transactions.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use pacta_core::{
  access::resolve_role,
  approval::{AdditionalApproval, ApprovalQuery, ApprovalStatus, NewApproval},
  audit::{AuditAction, AuditEvent, NewAuditEvent},
  contract::{
    Contract, ContractQuery, ContractStatus, ContractTab, ContractUpdate,
    NewContract,
  },
  file::{ContractFile, NewContractFile, storage_path_for},
  record::{
    Clause, Deviation, NewClause, NewDeviation, NewRiskItem,
    NewSignatureRecord, RiskItem, SignatureRecord,
  },
  refdata::{ContractType, Department, NewPlaybookEntry, PlaybookEntry, Tag},
  share::{ContractShare, NewShare, ShareTarget},
  store::ContractStore,
  user::{NewUser, User},
  version::{ContractVersion, INITIAL_VERSION_LABEL, NewContractVersion},
  workflow::{self, Decision},
};

use crate::{
  Error, Result,
  encode::{
    RawApproval, RawAuditEvent, RawClause, RawContract, RawDeviation,
    RawFile, RawRisk, RawShare, RawSignature, RawUser, RawVersion,
    encode_date, encode_decimal, encode_dt, encode_json, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pacta contract store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Synchronous helpers ─────────────────────────────────────────────────────

fn insert_audit(
  conn: &rusqlite::Connection,
  event: &NewAuditEvent,
) -> Result<()> {
  conn.execute(
    "INSERT INTO audit_events
       (contract_id, actor_id, action, metadata, ip_address, user_agent,
        created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      event.contract_id.map(encode_uuid),
      event.actor_id.map(encode_uuid),
      event.action.to_string(),
      encode_json(&event.metadata)?,
      event.ip_address,
      event.user_agent,
      encode_dt(Utc::now()),
    ],
  )?;
  Ok(())
}

fn fetch_contract(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Option<Contract>> {
  let sql = format!(
    "SELECT {} FROM contracts c WHERE c.contract_id = ?1",
    RawContract::columns("c")
  );
  let raw = conn
    .query_row(&sql, rusqlite::params![encode_uuid(id)], |row| {
      RawContract::from_row(row)
    })
    .optional()?;
  raw.map(RawContract::into_contract).transpose()
}

fn require_contract(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Contract> {
  fetch_contract(conn, id)?
    .ok_or_else(|| pacta_core::Error::ContractNotFound(id).into())
}

fn set_tags(
  conn: &rusqlite::Connection,
  contract_id: Uuid,
  tag_ids: &[i64],
) -> Result<()> {
  let id_str = encode_uuid(contract_id);
  conn.execute(
    "DELETE FROM contract_tags WHERE contract_id = ?1",
    rusqlite::params![id_str],
  )?;
  for tag_id in tag_ids {
    conn.execute(
      "INSERT OR IGNORE INTO contract_tags (contract_id, tag_id)
       VALUES (?1, ?2)",
      rusqlite::params![id_str, tag_id],
    )?;
  }
  Ok(())
}

/// Insert a file row, demoting any previous primary first.
fn insert_file_row(
  conn: &rusqlite::Connection,
  contract_id: Uuid,
  input: &NewContractFile,
) -> Result<ContractFile> {
  input.validate().map_err(pacta_core::Error::from)?;
  let id_str = encode_uuid(contract_id);
  if input.is_primary {
    conn.execute(
      "UPDATE contract_files SET is_primary = 0 WHERE contract_id = ?1",
      rusqlite::params![id_str],
    )?;
  }
  let uploaded_at = Utc::now();
  // The storage path embeds the row id, so insert first and patch the
  // path in once the id is known.
  conn.execute(
    "INSERT INTO contract_files
       (contract_id, original_filename, storage_path, size_bytes,
        media_type, is_primary, description, uploaded_by, uploaded_at)
     VALUES (?1, ?2, '', ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      id_str,
      input.original_filename,
      input.size_bytes,
      input.media_type,
      input.is_primary,
      input.description,
      input.uploaded_by.map(encode_uuid),
      encode_dt(uploaded_at),
    ],
  )?;
  let file_id = conn.last_insert_rowid();
  let storage_path =
    storage_path_for(contract_id, file_id, &input.original_filename);
  conn.execute(
    "UPDATE contract_files SET storage_path = ?1 WHERE file_id = ?2",
    rusqlite::params![storage_path, file_id],
  )?;
  Ok(ContractFile {
    file_id,
    contract_id,
    original_filename: input.original_filename.clone(),
    storage_path,
    size_bytes: input.size_bytes,
    media_type: input.media_type.clone(),
    is_primary: input.is_primary,
    description: input.description.clone(),
    uploaded_by: input.uploaded_by,
    uploaded_at,
  })
}

/// Append a version numbered one past the contract's current last.
fn insert_version_row(
  conn: &rusqlite::Connection,
  contract_id: Uuid,
  input: &NewContractVersion,
) -> Result<ContractVersion> {
  let id_str = encode_uuid(contract_id);
  let version_number: i64 = conn.query_row(
    "SELECT COALESCE(MAX(version_number), 0) + 1 FROM contract_versions
     WHERE contract_id = ?1",
    rusqlite::params![id_str],
    |row| row.get(0),
  )?;
  let created_at = Utc::now();
  conn.execute(
    "INSERT INTO contract_versions
       (contract_id, version_number, label, storage_path, notes,
        created_by, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      id_str,
      version_number,
      input.label,
      input.storage_path,
      input.notes,
      input.created_by.map(encode_uuid),
      encode_dt(created_at),
    ],
  )?;
  Ok(ContractVersion {
    version_id: conn.last_insert_rowid(),
    contract_id,
    version_number,
    label: input.label.clone(),
    storage_path: input.storage_path.clone(),
    notes: input.notes.clone(),
    created_by: input.created_by,
    created_at,
  })
}

fn fetch_approval(
  conn: &rusqlite::Connection,
  approval_id: i64,
) -> Result<Option<AdditionalApproval>> {
  let sql = format!(
    "SELECT {} FROM approvals WHERE approval_id = ?1",
    RawApproval::COLUMNS
  );
  let raw = conn
    .query_row(&sql, rusqlite::params![approval_id], |row| {
      RawApproval::from_row(row)
    })
    .optional()?;
  raw.map(RawApproval::into_approval).transpose()
}

fn store_decided_approval(
  conn: &rusqlite::Connection,
  approval: &AdditionalApproval,
) -> Result<()> {
  conn.execute(
    "UPDATE approvals
     SET status = ?2, decided_at = ?3, decision_comment = ?4
     WHERE approval_id = ?1",
    rusqlite::params![
      approval.approval_id,
      approval.status.to_string(),
      approval.decided_at.map(encode_dt),
      approval.decision_comment,
    ],
  )?;
  Ok(())
}

fn fetch_user_by_username(
  conn: &rusqlite::Connection,
  username: &str,
) -> Result<Option<User>> {
  let sql =
    format!("SELECT {} FROM users WHERE username = ?1", RawUser::COLUMNS);
  let raw = conn
    .query_row(&sql, rusqlite::params![username], |row| {
      RawUser::from_row(row)
    })
    .optional()?;
  raw.map(RawUser::into_user).transpose()
}

// ─── ContractStore impl ──────────────────────────────────────────────────────

impl ContractStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, input: NewUser) -> Result<User> {
    let role = resolve_role(&input.attrs);
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          conn.execute(
            "INSERT INTO users
               (user_id, username, display_name, department_id, role,
                active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (username) DO UPDATE SET
               display_name  = excluded.display_name,
               department_id = excluded.department_id,
               role          = excluded.role,
               active        = excluded.active",
            rusqlite::params![
              encode_uuid(Uuid::new_v4()),
              input.username,
              input.display_name,
              input.department_id,
              role.to_string(),
              input.active,
              encode_dt(Utc::now()),
            ],
          )?;
          fetch_user_by_username(conn, &input.username)?.ok_or_else(|| {
            Error::from(pacta_core::Error::UserNotFound(
              input.username.clone(),
            ))
          })
        })())
      })
      .await?
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM users WHERE user_id = ?1",
          RawUser::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], |row| {
              RawUser::from_row(row)
            })
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_username(
    &self,
    username: String,
  ) -> Result<Option<User>> {
    self
      .conn
      .call(move |conn| Ok(fetch_user_by_username(conn, &username)))
      .await?
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {} FROM users ORDER BY username",
          RawUser::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| RawUser::from_row(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawUser::into_user).collect()
  }

  // ── Reference data ────────────────────────────────────────────────────────

  async fn add_department(&self, name: String) -> Result<Department> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO departments (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        Ok(Department { department_id: conn.last_insert_rowid(), name })
      })
      .await
      .map_err(Into::into)
  }

  async fn list_departments(&self) -> Result<Vec<Department>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT department_id, name FROM departments ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Department { department_id: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Into::into)
  }

  async fn delete_department(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM departments WHERE department_id = ?1",
          rusqlite::params![id],
        )?;
        Ok(())
      })
      .await
      .map_err(Into::into)
  }

  async fn add_contract_type(
    &self,
    name: String,
    description: String,
  ) -> Result<ContractType> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contract_types (name, description) VALUES (?1, ?2)",
          rusqlite::params![name, description],
        )?;
        Ok(ContractType {
          contract_type_id: conn.last_insert_rowid(),
          name,
          description,
          active: true,
        })
      })
      .await
      .map_err(Into::into)
  }

  async fn list_contract_types(&self) -> Result<Vec<ContractType>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT contract_type_id, name, description, active
           FROM contract_types ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(ContractType {
              contract_type_id: row.get(0)?,
              name:             row.get(1)?,
              description:      row.get(2)?,
              active:           row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Into::into)
  }

  async fn delete_contract_type(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM contract_types WHERE contract_type_id = ?1",
          rusqlite::params![id],
        )?;
        Ok(())
      })
      .await
      .map_err(Into::into)
  }

  async fn add_tag(
    &self,
    name: String,
    description: String,
    color: String,
  ) -> Result<Tag> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tags (name, description, color) VALUES (?1, ?2, ?3)",
          rusqlite::params![name, description, color],
        )?;
        Ok(Tag {
          tag_id: conn.last_insert_rowid(),
          name,
          description,
          color,
          active: true,
        })
      })
      .await
      .map_err(Into::into)
  }

  async fn list_tags(&self) -> Result<Vec<Tag>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT tag_id, name, description, color, active
           FROM tags ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Tag {
              tag_id:      row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
              color:       row.get(3)?,
              active:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Into::into)
  }

  async fn delete_tag(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM tags WHERE tag_id = ?1",
          rusqlite::params![id],
        )?;
        Ok(())
      })
      .await
      .map_err(Into::into)
  }

  async fn add_playbook_entry(
    &self,
    input: NewPlaybookEntry,
  ) -> Result<PlaybookEntry> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO playbook_entries
             (label, category, recommended_text, risk, guidance_notes)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            input.label,
            input.category,
            input.recommended_text,
            input.risk.to_string(),
            input.guidance_notes,
          ],
        )?;
        Ok(PlaybookEntry {
          entry_id:         conn.last_insert_rowid(),
          label:            input.label,
          category:         input.category,
          recommended_text: input.recommended_text,
          risk:             input.risk,
          guidance_notes:   input.guidance_notes,
          active:           true,
        })
      })
      .await
      .map_err(Into::into)
  }

  async fn list_playbook_entries(&self) -> Result<Vec<PlaybookEntry>> {
    let rows: Vec<(i64, String, String, String, String, String, bool)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, label, category, recommended_text, risk,
                  guidance_notes, active
           FROM playbook_entries ORDER BY label",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              row.get(0)?,
              row.get(1)?,
              row.get(2)?,
              row.get(3)?,
              row.get(4)?,
              row.get(5)?,
              row.get(6)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    rows
      .into_iter()
      .map(
        |(entry_id, label, category, recommended_text, risk, notes, active)| {
          Ok(PlaybookEntry {
            entry_id,
            label,
            category,
            recommended_text,
            risk: crate::encode::decode_enum(&risk)?,
            guidance_notes: notes,
            active,
          })
        },
      )
      .collect()
  }

  async fn delete_playbook_entry(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM playbook_entries WHERE entry_id = ?1",
          rusqlite::params![id],
        )?;
        Ok(())
      })
      .await
      .map_err(Into::into)
  }

  // ── Contracts ─────────────────────────────────────────────────────────────

  async fn create_contract(
    &self,
    input: NewContract,
    primary_file: Option<NewContractFile>,
    actor_id: Option<Uuid>,
  ) -> Result<Contract> {
    input.validate().map_err(pacta_core::Error::from)?;

    let contract_id = Uuid::new_v4();
    let now = Utc::now();
    let contract = Contract {
      contract_id,
      contract_number: Contract::number_for(contract_id, now),
      title: input.title,
      status: input.status,
      category: input.category,
      sub_category: input.sub_category,
      org_entity: input.org_entity,
      region_country: input.region_country,
      department_id: input.department_id,
      counterparty_name: input.counterparty_name,
      counterparty_address: input.counterparty_address,
      contract_type_id: input.contract_type_id,
      value_amount: input.value_amount,
      currency: input.currency,
      opportunity_id: input.opportunity_id,
      effective_date: input.effective_date,
      end_date: input.end_date,
      renewal_notice_date: input.renewal_notice_date,
      auto_renewal: input.auto_renewal,
      owner_id: input.owner_id,
      created_by: input.created_by,
      is_confidential: input.is_confidential,
      extra: input.extra,
      tag_ids: input.tag_ids,
      created_at: now,
      updated_at: now,
    };

    let stored = contract.clone();
    self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<()> {
          let tx = conn.transaction()?;
          tx.execute(
            "INSERT INTO contracts
               (contract_id, contract_number, title, status, category,
                sub_category, org_entity, region_country, department_id,
                counterparty_name, counterparty_address, contract_type_id,
                value_amount, currency, opportunity_id, effective_date,
                end_date, renewal_notice_date, auto_renewal, owner_id,
                created_by, is_confidential, extra, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22,
                     ?23, ?24, ?25)",
            rusqlite::params![
              encode_uuid(stored.contract_id),
              stored.contract_number,
              stored.title,
              stored.status.to_string(),
              stored.category.to_string(),
              stored.sub_category,
              stored.org_entity,
              stored.region_country,
              stored.department_id,
              stored.counterparty_name,
              stored.counterparty_address,
              stored.contract_type_id,
              stored.value_amount.map(encode_decimal),
              stored.currency,
              stored.opportunity_id,
              stored.effective_date.map(encode_date),
              stored.end_date.map(encode_date),
              stored.renewal_notice_date.map(encode_date),
              stored.auto_renewal,
              stored.owner_id.map(encode_uuid),
              stored.created_by.map(encode_uuid),
              stored.is_confidential,
              encode_json(&stored.extra)?,
              encode_dt(stored.created_at),
              encode_dt(stored.updated_at),
            ],
          )?;
          set_tags(&tx, stored.contract_id, &stored.tag_ids)?;

          insert_version_row(&tx, stored.contract_id, &NewContractVersion {
            label:        INITIAL_VERSION_LABEL.to_owned(),
            storage_path: None,
            notes:        String::new(),
            created_by:   actor_id,
          })?;

          if let Some(file) = &primary_file {
            let mut file = file.clone();
            file.is_primary = true;
            insert_file_row(&tx, stored.contract_id, &file)?;
          }

          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              stored.contract_id,
              actor_id,
              AuditAction::CreateContract,
            )
            .with_metadata(serde_json::json!({
              "contract_number": stored.contract_number,
              "title": stored.title,
            })),
          )?;

          tx.commit()?;
          Ok(())
        })())
      })
      .await??;

    Ok(contract)
  }

  async fn get_contract(&self, id: Uuid) -> Result<Option<Contract>> {
    self
      .conn
      .call(move |conn| Ok(fetch_contract(conn, id)))
      .await?
  }

  async fn list_contracts(
    &self,
    query: &ContractQuery,
  ) -> Result<Vec<Contract>> {
    let query = query.clone();
    let raws: Vec<RawContract> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let mut bind = |value: Box<dyn rusqlite::ToSql>| {
          params.push(value);
          params.len()
        };

        match query.tab {
          Some(ContractTab::Draft) => {
            conds.push("c.status = 'DRAFT'".into());
          }
          Some(ContractTab::Pending) => {
            conds.push(
              "(c.status = 'PENDING' OR EXISTS (
                  SELECT 1 FROM approvals a
                  WHERE a.contract_id = c.contract_id
                    AND a.status = 'PENDING'))"
                .into(),
            );
          }
          Some(ContractTab::Repository) => {
            conds.push("c.status NOT IN ('DRAFT', 'PENDING')".into());
          }
          None => {}
        }
        if let Some(search) = &query.search {
          let n = bind(Box::new(format!("%{}%", search.to_lowercase())));
          conds.push(format!(
            "(LOWER(c.title) LIKE ?{n}
              OR LOWER(c.contract_number) LIKE ?{n}
              OR LOWER(c.counterparty_name) LIKE ?{n})"
          ));
        }
        if let Some(status) = query.status {
          let n = bind(Box::new(status.to_string()));
          conds.push(format!("c.status = ?{n}"));
        }
        if let Some(category) = query.category {
          let n = bind(Box::new(category.to_string()));
          conds.push(format!("c.category = ?{n}"));
        }
        if let Some(department_id) = query.department_id {
          let n = bind(Box::new(department_id));
          conds.push(format!("c.department_id = ?{n}"));
        }
        if let Some(owner_id) = query.owner_id {
          let n = bind(Box::new(encode_uuid(owner_id)));
          conds.push(format!("c.owner_id = ?{n}"));
        }
        if let Some(tag_id) = query.tag_id {
          let n = bind(Box::new(tag_id));
          conds.push(format!(
            "EXISTS (SELECT 1 FROM contract_tags ct
              WHERE ct.contract_id = c.contract_id AND ct.tag_id = ?{n})"
          ));
        }
        if let Some(end_after) = query.end_after {
          let n = bind(Box::new(encode_date(end_after)));
          conds.push(format!("c.end_date >= ?{n}"));
        }
        if let Some(end_before) = query.end_before {
          let n = bind(Box::new(encode_date(end_before)));
          conds.push(format!("c.end_date <= ?{n}"));
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };
        let sql = format!(
          "SELECT {} FROM contracts c {where_clause}
           ORDER BY c.created_at DESC",
          RawContract::columns("c")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            RawContract::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContract::into_contract).collect()
  }

  async fn update_contract(
    &self,
    id: Uuid,
    update: ContractUpdate,
    actor_id: Option<Uuid>,
  ) -> Result<Contract> {
    update.validate().map_err(pacta_core::Error::from)?;
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          let existing = require_contract(&tx, id)?;
          let now = Utc::now();

          tx.execute(
            "UPDATE contracts SET
               title = ?2, status = ?3, category = ?4, sub_category = ?5,
               org_entity = ?6, region_country = ?7, department_id = ?8,
               counterparty_name = ?9, counterparty_address = ?10,
               contract_type_id = ?11, value_amount = ?12, currency = ?13,
               opportunity_id = ?14, effective_date = ?15, end_date = ?16,
               renewal_notice_date = ?17, auto_renewal = ?18,
               owner_id = ?19, is_confidential = ?20, updated_at = ?21
             WHERE contract_id = ?1",
            rusqlite::params![
              encode_uuid(id),
              update.title,
              update.status.to_string(),
              update.category.to_string(),
              update.sub_category,
              update.org_entity,
              update.region_country,
              update.department_id,
              update.counterparty_name,
              update.counterparty_address,
              update.contract_type_id,
              update.value_amount.map(encode_decimal),
              update.currency,
              update.opportunity_id,
              update.effective_date.map(encode_date),
              update.end_date.map(encode_date),
              update.renewal_notice_date.map(encode_date),
              update.auto_renewal,
              update.owner_id.map(encode_uuid),
              update.is_confidential,
              encode_dt(now),
            ],
          )?;
          set_tags(&tx, id, &update.tag_ids)?;

          insert_audit(
            &tx,
            &NewAuditEvent::contract(id, actor_id, AuditAction::UpdateContract),
          )?;
          if update.status != existing.status {
            insert_audit(
              &tx,
              &workflow::status_change_event(
                &existing,
                update.status,
                None,
                actor_id,
              ),
            )?;
          }

          let updated = require_contract(&tx, id)?;
          tx.commit()?;
          Ok(updated)
        })())
      })
      .await?
  }

  async fn change_status(
    &self,
    id: Uuid,
    status: ContractStatus,
    reason: Option<String>,
    actor_id: Option<Uuid>,
  ) -> Result<Contract> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          let existing = require_contract(&tx, id)?;

          tx.execute(
            "UPDATE contracts SET status = ?2, updated_at = ?3
             WHERE contract_id = ?1",
            rusqlite::params![
              encode_uuid(id),
              status.to_string(),
              encode_dt(Utc::now()),
            ],
          )?;
          insert_audit(
            &tx,
            &workflow::status_change_event(
              &existing,
              status,
              reason.as_deref(),
              actor_id,
            ),
          )?;

          let updated = require_contract(&tx, id)?;
          tx.commit()?;
          Ok(updated)
        })())
      })
      .await?
  }

  async fn delete_contract(
    &self,
    id: Uuid,
    actor_id: Option<Uuid>,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          let existing = require_contract(&tx, id)?;

          // Children cascade; audit rows keep their history with the
          // contract reference nulled by the FK action.
          tx.execute(
            "DELETE FROM contracts WHERE contract_id = ?1",
            rusqlite::params![encode_uuid(id)],
          )?;
          insert_audit(&tx, &NewAuditEvent {
            contract_id: None,
            actor_id,
            action: AuditAction::DeleteContract,
            metadata: serde_json::json!({
              "contract_number": existing.contract_number,
              "title": existing.title,
            }),
            ip_address: None,
            user_agent: None,
          })?;

          tx.commit()?;
          Ok(())
        })())
      })
      .await?
  }

  // ── Files ─────────────────────────────────────────────────────────────────

  async fn add_file(
    &self,
    contract_id: Uuid,
    input: NewContractFile,
  ) -> Result<ContractFile> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          require_contract(&tx, contract_id)?;
          let file = insert_file_row(&tx, contract_id, &input)?;
          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              contract_id,
              input.uploaded_by,
              AuditAction::AddFile,
            )
            .with_metadata(serde_json::json!({
              "filename": file.original_filename,
              "is_primary": file.is_primary,
            })),
          )?;
          tx.commit()?;
          Ok(file)
        })())
      })
      .await?
  }

  async fn get_file(&self, file_id: i64) -> Result<Option<ContractFile>> {
    let raw: Option<RawFile> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM contract_files WHERE file_id = ?1",
          RawFile::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![file_id], |row| {
              RawFile::from_row(row)
            })
            .optional()?,
        )
      })
      .await?;
    raw.map(RawFile::into_file).transpose()
  }

  async fn list_files(&self, contract_id: Uuid) -> Result<Vec<ContractFile>> {
    let id_str = encode_uuid(contract_id);
    let raws: Vec<RawFile> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM contract_files WHERE contract_id = ?1
           ORDER BY is_primary DESC, uploaded_at DESC",
          RawFile::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| RawFile::from_row(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawFile::into_file).collect()
  }

  async fn remove_file(
    &self,
    file_id: i64,
    actor_id: Option<Uuid>,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          let sql = format!(
            "SELECT {} FROM contract_files WHERE file_id = ?1",
            RawFile::COLUMNS
          );
          let file = tx
            .query_row(&sql, rusqlite::params![file_id], |row| {
              RawFile::from_row(row)
            })
            .optional()?
            .ok_or(pacta_core::Error::FileNotFound(file_id))?
            .into_file()?;

          tx.execute(
            "DELETE FROM contract_files WHERE file_id = ?1",
            rusqlite::params![file_id],
          )?;
          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              file.contract_id,
              actor_id,
              AuditAction::RemoveFile,
            )
            .with_metadata(serde_json::json!({
              "filename": file.original_filename,
            })),
          )?;
          tx.commit()?;
          Ok(())
        })())
      })
      .await?
  }

  // ── Versions ──────────────────────────────────────────────────────────────

  async fn add_version(
    &self,
    contract_id: Uuid,
    input: NewContractVersion,
  ) -> Result<ContractVersion> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          require_contract(&tx, contract_id)?;
          let version = insert_version_row(&tx, contract_id, &input)?;
          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              contract_id,
              input.created_by,
              AuditAction::AddVersion,
            )
            .with_metadata(serde_json::json!({
              "version_number": version.version_number,
              "label": version.label,
            })),
          )?;
          tx.commit()?;
          Ok(version)
        })())
      })
      .await?
  }

  async fn list_versions(
    &self,
    contract_id: Uuid,
  ) -> Result<Vec<ContractVersion>> {
    let id_str = encode_uuid(contract_id);
    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM contract_versions WHERE contract_id = ?1
           ORDER BY version_number",
          RawVersion::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            RawVersion::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawVersion::into_version).collect()
  }

  // ── Shares ────────────────────────────────────────────────────────────────

  async fn add_share(
    &self,
    contract_id: Uuid,
    input: NewShare,
  ) -> Result<ContractShare> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          require_contract(&tx, contract_id)?;

          let (target_user, target_department) = match input.target {
            ShareTarget::User { user_id } => (Some(encode_uuid(user_id)), None),
            ShareTarget::Department { department_id } => {
              (None, Some(department_id))
            }
          };
          let shared_at = Utc::now();
          tx.execute(
            "INSERT INTO contract_shares
               (contract_id, target_user_id, target_department_id,
                access_level, shared_by, shared_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
              encode_uuid(contract_id),
              target_user,
              target_department,
              input.access_level.to_string(),
              input.shared_by.map(encode_uuid),
              encode_dt(shared_at),
            ],
          )?;
          let share = ContractShare {
            share_id: tx.last_insert_rowid(),
            contract_id,
            target: input.target,
            access_level: input.access_level,
            shared_by: input.shared_by,
            shared_at,
          };

          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              contract_id,
              input.shared_by,
              AuditAction::Share,
            )
            .with_metadata(serde_json::json!({
              "target": share.target,
              "access_level": share.access_level,
            })),
          )?;
          tx.commit()?;
          Ok(share)
        })())
      })
      .await?
  }

  async fn list_shares(
    &self,
    contract_id: Uuid,
  ) -> Result<Vec<ContractShare>> {
    let id_str = encode_uuid(contract_id);
    let raws: Vec<RawShare> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM contract_shares WHERE contract_id = ?1
           ORDER BY shared_at",
          RawShare::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| RawShare::from_row(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawShare::into_share).collect()
  }

  async fn list_all_shares(&self) -> Result<Vec<ContractShare>> {
    let raws: Vec<RawShare> = self
      .conn
      .call(|conn| {
        let sql =
          format!("SELECT {} FROM contract_shares", RawShare::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| RawShare::from_row(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawShare::into_share).collect()
  }

  async fn remove_share(
    &self,
    share_id: i64,
    actor_id: Option<Uuid>,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          let sql = format!(
            "SELECT {} FROM contract_shares WHERE share_id = ?1",
            RawShare::COLUMNS
          );
          let share = tx
            .query_row(&sql, rusqlite::params![share_id], |row| {
              RawShare::from_row(row)
            })
            .optional()?
            .ok_or(pacta_core::Error::ShareNotFound(share_id))?
            .into_share()?;

          tx.execute(
            "DELETE FROM contract_shares WHERE share_id = ?1",
            rusqlite::params![share_id],
          )?;
          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              share.contract_id,
              actor_id,
              AuditAction::Unshare,
            )
            .with_metadata(serde_json::json!({ "target": share.target })),
          )?;
          tx.commit()?;
          Ok(())
        })())
      })
      .await?
  }

  // ── Approvals ─────────────────────────────────────────────────────────────

  async fn create_approval(
    &self,
    contract_id: Uuid,
    input: NewApproval,
  ) -> Result<AdditionalApproval> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          require_contract(&tx, contract_id)?;

          let created_at = Utc::now();
          tx.execute(
            "INSERT INTO approvals
               (contract_id, requested_by, approver_id, status, reason,
                due_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
              encode_uuid(contract_id),
              encode_uuid(input.requested_by),
              encode_uuid(input.approver_id),
              ApprovalStatus::Pending.to_string(),
              input.reason,
              input.due_date.map(encode_date),
              encode_dt(created_at),
            ],
          )?;
          let approval = AdditionalApproval {
            approval_id: tx.last_insert_rowid(),
            contract_id,
            requested_by: input.requested_by,
            approver_id: input.approver_id,
            status: ApprovalStatus::Pending,
            reason: input.reason,
            due_date: input.due_date,
            created_at,
            decided_at: None,
            decision_comment: None,
          };

          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              contract_id,
              Some(approval.requested_by),
              AuditAction::CreateApproval,
            )
            .with_metadata(serde_json::json!({
              "approver_id": approval.approver_id,
              "reason": approval.reason,
            })),
          )?;
          tx.commit()?;
          Ok(approval)
        })())
      })
      .await?
  }

  async fn get_approval(
    &self,
    approval_id: i64,
  ) -> Result<Option<AdditionalApproval>> {
    self
      .conn
      .call(move |conn| Ok(fetch_approval(conn, approval_id)))
      .await?
  }

  async fn list_approvals(
    &self,
    query: &ApprovalQuery,
  ) -> Result<Vec<AdditionalApproval>> {
    let query = query.clone();
    let raws: Vec<RawApproval> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let mut bind = |value: Box<dyn rusqlite::ToSql>| {
          params.push(value);
          params.len()
        };

        if let Some(contract_id) = query.contract_id {
          let n = bind(Box::new(encode_uuid(contract_id)));
          conds.push(format!("contract_id = ?{n}"));
        }
        if let Some(approver_id) = query.approver_id {
          let n = bind(Box::new(encode_uuid(approver_id)));
          conds.push(format!("approver_id = ?{n}"));
        }
        if let Some(requested_by) = query.requested_by {
          let n = bind(Box::new(encode_uuid(requested_by)));
          conds.push(format!("requested_by = ?{n}"));
        }
        if let Some(status) = query.status {
          let n = bind(Box::new(status.to_string()));
          conds.push(format!("status = ?{n}"));
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };
        let sql = format!(
          "SELECT {} FROM approvals {where_clause}
           ORDER BY created_at DESC",
          RawApproval::COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            RawApproval::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawApproval::into_approval).collect()
  }

  async fn decide_approval(
    &self,
    approval_id: i64,
    decision: Decision,
    actor_id: Option<Uuid>,
  ) -> Result<AdditionalApproval> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          let mut approval = fetch_approval(&tx, approval_id)?
            .ok_or(pacta_core::Error::ApprovalNotFound(approval_id))?;

          let action = decision.audit_action();
          workflow::apply_decision(&mut approval, decision, Utc::now())
            .map_err(pacta_core::Error::from)?;
          store_decided_approval(&tx, &approval)?;

          insert_audit(
            &tx,
            &NewAuditEvent::contract(approval.contract_id, actor_id, action)
              .with_metadata(serde_json::json!({
                "approval_id": approval.approval_id,
                "comment": approval.decision_comment,
              })),
          )?;
          tx.commit()?;
          Ok(approval)
        })())
      })
      .await?
  }

  async fn cancel_approval(
    &self,
    approval_id: i64,
    actor_id: Option<Uuid>,
  ) -> Result<AdditionalApproval> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          let mut approval = fetch_approval(&tx, approval_id)?
            .ok_or(pacta_core::Error::ApprovalNotFound(approval_id))?;

          workflow::cancel(&mut approval)
            .map_err(pacta_core::Error::from)?;
          tx.execute(
            "UPDATE approvals SET status = ?2 WHERE approval_id = ?1",
            rusqlite::params![approval_id, approval.status.to_string()],
          )?;

          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              approval.contract_id,
              actor_id,
              AuditAction::CancelApproval,
            )
            .with_metadata(
              serde_json::json!({ "approval_id": approval.approval_id }),
            ),
          )?;
          tx.commit()?;
          Ok(approval)
        })())
      })
      .await?
  }

  // ── Child records ─────────────────────────────────────────────────────────

  async fn add_clause(
    &self,
    contract_id: Uuid,
    input: NewClause,
    actor_id: Option<Uuid>,
  ) -> Result<Clause> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          require_contract(&tx, contract_id)?;

          let created_at = Utc::now();
          tx.execute(
            "INSERT INTO clauses
               (contract_id, label, clause_text, risk, from_playbook,
                playbook_entry_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
              encode_uuid(contract_id),
              input.label,
              input.text,
              input.risk.to_string(),
              input.from_playbook,
              input.playbook_entry_id,
              encode_dt(created_at),
            ],
          )?;
          let clause = Clause {
            clause_id: tx.last_insert_rowid(),
            contract_id,
            label: input.label,
            text: input.text,
            risk: input.risk,
            from_playbook: input.from_playbook,
            playbook_entry_id: input.playbook_entry_id,
            created_at,
          };

          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              contract_id,
              actor_id,
              AuditAction::AddClause,
            )
            .with_metadata(serde_json::json!({ "label": clause.label })),
          )?;
          tx.commit()?;
          Ok(clause)
        })())
      })
      .await?
  }

  async fn list_clauses(&self, contract_id: Uuid) -> Result<Vec<Clause>> {
    let id_str = encode_uuid(contract_id);
    let raws: Vec<RawClause> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM clauses WHERE contract_id = ?1
           ORDER BY clause_id",
          RawClause::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            RawClause::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawClause::into_clause).collect()
  }

  async fn add_deviation(
    &self,
    contract_id: Uuid,
    input: NewDeviation,
    actor_id: Option<Uuid>,
  ) -> Result<Deviation> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          require_contract(&tx, contract_id)?;

          let created_at = Utc::now();
          tx.execute(
            "INSERT INTO deviations
               (contract_id, clause_id, description, risk, justification,
                created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
              encode_uuid(contract_id),
              input.clause_id,
              input.description,
              input.risk.to_string(),
              input.justification,
              encode_dt(created_at),
            ],
          )?;
          let deviation = Deviation {
            deviation_id: tx.last_insert_rowid(),
            contract_id,
            clause_id: input.clause_id,
            description: input.description,
            risk: input.risk,
            justification: input.justification,
            approved: false,
            approved_by: None,
            approved_at: None,
            created_at,
          };

          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              contract_id,
              actor_id,
              AuditAction::AddDeviation,
            )
            .with_metadata(serde_json::json!({ "risk": deviation.risk })),
          )?;
          tx.commit()?;
          Ok(deviation)
        })())
      })
      .await?
  }

  async fn list_deviations(
    &self,
    contract_id: Uuid,
  ) -> Result<Vec<Deviation>> {
    let id_str = encode_uuid(contract_id);
    let raws: Vec<RawDeviation> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM deviations WHERE contract_id = ?1
           ORDER BY deviation_id",
          RawDeviation::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            RawDeviation::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawDeviation::into_deviation).collect()
  }

  async fn add_risk(
    &self,
    contract_id: Uuid,
    input: NewRiskItem,
    actor_id: Option<Uuid>,
  ) -> Result<RiskItem> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          require_contract(&tx, contract_id)?;

          let created_at = Utc::now();
          tx.execute(
            "INSERT INTO risks
               (contract_id, description, severity, mitigation, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
              encode_uuid(contract_id),
              input.description,
              input.severity.to_string(),
              input.mitigation,
              encode_dt(created_at),
            ],
          )?;
          let risk = RiskItem {
            risk_id: tx.last_insert_rowid(),
            contract_id,
            description: input.description,
            severity: input.severity,
            mitigation: input.mitigation,
            status: pacta_core::record::RiskStatus::Open,
            created_at,
          };

          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              contract_id,
              actor_id,
              AuditAction::AddRisk,
            )
            .with_metadata(serde_json::json!({ "severity": risk.severity })),
          )?;
          tx.commit()?;
          Ok(risk)
        })())
      })
      .await?
  }

  async fn list_risks(&self, contract_id: Uuid) -> Result<Vec<RiskItem>> {
    let id_str = encode_uuid(contract_id);
    let raws: Vec<RawRisk> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM risks WHERE contract_id = ?1 ORDER BY risk_id",
          RawRisk::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| RawRisk::from_row(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRisk::into_risk).collect()
  }

  async fn list_open_risks(&self) -> Result<Vec<RiskItem>> {
    let raws: Vec<RawRisk> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {} FROM risks WHERE status = 'OPEN'",
          RawRisk::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| RawRisk::from_row(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRisk::into_risk).collect()
  }

  async fn add_signature(
    &self,
    contract_id: Uuid,
    input: NewSignatureRecord,
    actor_id: Option<Uuid>,
  ) -> Result<SignatureRecord> {
    self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx = conn.transaction()?;
          require_contract(&tx, contract_id)?;

          let created_at = Utc::now();
          tx.execute(
            "INSERT INTO signatures
               (contract_id, party, signatory_name, signatory_email,
                signatory_phone, designation, sign_type, signed_at,
                signature_reference, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
              encode_uuid(contract_id),
              input.party.to_string(),
              input.signatory_name,
              input.signatory_email,
              input.signatory_phone,
              input.designation,
              input.sign_type.to_string(),
              input.signed_at.map(encode_dt),
              input.signature_reference,
              encode_dt(created_at),
            ],
          )?;
          let signature = SignatureRecord {
            signature_id: tx.last_insert_rowid(),
            contract_id,
            party: input.party,
            signatory_name: input.signatory_name,
            signatory_email: input.signatory_email,
            signatory_phone: input.signatory_phone,
            designation: input.designation,
            sign_type: input.sign_type,
            signed_at: input.signed_at,
            signature_reference: input.signature_reference,
            created_at,
          };

          insert_audit(
            &tx,
            &NewAuditEvent::contract(
              contract_id,
              actor_id,
              AuditAction::AddSignature,
            )
            .with_metadata(serde_json::json!({
              "party": signature.party,
              "sign_type": signature.sign_type,
            })),
          )?;
          tx.commit()?;
          Ok(signature)
        })())
      })
      .await?
  }

  async fn list_signatures(
    &self,
    contract_id: Uuid,
  ) -> Result<Vec<SignatureRecord>> {
    let id_str = encode_uuid(contract_id);
    let raws: Vec<RawSignature> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM signatures WHERE contract_id = ?1
           ORDER BY signature_id",
          RawSignature::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            RawSignature::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSignature::into_signature).collect()
  }

  // ── Audit ─────────────────────────────────────────────────────────────────

  async fn append_audit(&self, event: NewAuditEvent) -> Result<AuditEvent> {
    let raw: RawAuditEvent = self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<RawAuditEvent> {
          insert_audit(conn, &event)?;
          let sql = format!(
            "SELECT {} FROM audit_events WHERE event_id = ?1",
            RawAuditEvent::COLUMNS
          );
          Ok(conn.query_row(
            &sql,
            rusqlite::params![conn.last_insert_rowid()],
            |row| RawAuditEvent::from_row(row),
          )?)
        })())
      })
      .await??;
    raw.into_event()
  }

  async fn list_audit(&self, contract_id: Uuid) -> Result<Vec<AuditEvent>> {
    let id_str = encode_uuid(contract_id);
    let raws: Vec<RawAuditEvent> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM audit_events WHERE contract_id = ?1
           ORDER BY event_id DESC",
          RawAuditEvent::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            RawAuditEvent::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAuditEvent::into_event).collect()
  }

  async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEvent>> {
    let limit = limit as i64;
    let raws: Vec<RawAuditEvent> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM audit_events ORDER BY event_id DESC LIMIT ?1",
          RawAuditEvent::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            RawAuditEvent::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAuditEvent::into_event).collect()
  }
}
