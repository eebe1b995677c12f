//! SQL schema for the Pacta SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS departments (
    department_id INTEGER PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS contract_types (
    contract_type_id INTEGER PRIMARY KEY,
    name             TEXT NOT NULL UNIQUE,
    description      TEXT NOT NULL DEFAULT '',
    active           INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id      INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    color       TEXT NOT NULL DEFAULT '',
    active      INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS playbook_entries (
    entry_id         INTEGER PRIMARY KEY,
    label            TEXT NOT NULL,
    category         TEXT NOT NULL DEFAULT '',
    recommended_text TEXT NOT NULL DEFAULT '',
    risk             TEXT NOT NULL,    -- RiskLevel as TEXT
    guidance_notes   TEXT NOT NULL DEFAULT '',
    active           INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    department_id INTEGER REFERENCES departments(department_id),
    role          TEXT NOT NULL,       -- resolved once at upsert
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contracts (
    contract_id          TEXT PRIMARY KEY,
    contract_number      TEXT NOT NULL UNIQUE,   -- assigned once, never reused
    title                TEXT NOT NULL,
    status               TEXT NOT NULL,
    category             TEXT NOT NULL,
    sub_category         TEXT NOT NULL DEFAULT '',
    org_entity           TEXT NOT NULL DEFAULT '',
    region_country       TEXT NOT NULL DEFAULT '',
    department_id        INTEGER REFERENCES departments(department_id),
    counterparty_name    TEXT NOT NULL DEFAULT '',
    counterparty_address TEXT NOT NULL DEFAULT '',
    contract_type_id     INTEGER REFERENCES contract_types(contract_type_id),
    value_amount         TEXT,                   -- Decimal as TEXT
    currency             TEXT NOT NULL DEFAULT '',
    opportunity_id       TEXT NOT NULL DEFAULT '',
    effective_date       TEXT,                   -- ISO 8601 date
    end_date             TEXT,
    renewal_notice_date  TEXT,
    auto_renewal         INTEGER NOT NULL DEFAULT 0,
    owner_id             TEXT REFERENCES users(user_id),
    created_by           TEXT REFERENCES users(user_id),
    is_confidential      INTEGER NOT NULL DEFAULT 0,
    extra                TEXT NOT NULL DEFAULT 'null',  -- JSON
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contract_tags (
    contract_id TEXT    NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    tag_id      INTEGER NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    PRIMARY KEY (contract_id, tag_id)
);

CREATE TABLE IF NOT EXISTS contract_files (
    file_id           INTEGER PRIMARY KEY,
    contract_id       TEXT NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    original_filename TEXT NOT NULL,
    storage_path      TEXT NOT NULL,
    size_bytes        INTEGER NOT NULL,
    media_type        TEXT NOT NULL DEFAULT '',
    is_primary        INTEGER NOT NULL DEFAULT 0,
    description       TEXT NOT NULL DEFAULT '',
    uploaded_by       TEXT,
    uploaded_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contract_versions (
    version_id     INTEGER PRIMARY KEY,
    contract_id    TEXT NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL,
    label          TEXT NOT NULL DEFAULT '',
    storage_path   TEXT,
    notes          TEXT NOT NULL DEFAULT '',
    created_by     TEXT,
    created_at     TEXT NOT NULL,
    UNIQUE (contract_id, version_number)
);

-- Exactly one of target_user_id / target_department_id is set.
CREATE TABLE IF NOT EXISTS contract_shares (
    share_id             INTEGER PRIMARY KEY,
    contract_id          TEXT NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    target_user_id       TEXT REFERENCES users(user_id),
    target_department_id INTEGER REFERENCES departments(department_id),
    access_level         TEXT NOT NULL,
    shared_by            TEXT,
    shared_at            TEXT NOT NULL,
    CHECK ((target_user_id IS NULL) != (target_department_id IS NULL))
);

CREATE TABLE IF NOT EXISTS approvals (
    approval_id      INTEGER PRIMARY KEY,
    contract_id      TEXT NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    requested_by     TEXT NOT NULL,
    approver_id      TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'PENDING',
    reason           TEXT NOT NULL DEFAULT '',
    due_date         TEXT,
    created_at       TEXT NOT NULL,
    decided_at       TEXT,
    decision_comment TEXT
);

CREATE TABLE IF NOT EXISTS clauses (
    clause_id         INTEGER PRIMARY KEY,
    contract_id       TEXT NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    label             TEXT NOT NULL,
    clause_text       TEXT NOT NULL,
    risk              TEXT NOT NULL,
    from_playbook     INTEGER NOT NULL DEFAULT 0,
    playbook_entry_id INTEGER REFERENCES playbook_entries(entry_id),
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deviations (
    deviation_id  INTEGER PRIMARY KEY,
    contract_id   TEXT NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    clause_id     INTEGER REFERENCES clauses(clause_id),
    description   TEXT NOT NULL,
    risk          TEXT NOT NULL,
    justification TEXT NOT NULL DEFAULT '',
    approved      INTEGER NOT NULL DEFAULT 0,
    approved_by   TEXT,
    approved_at   TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS risks (
    risk_id     INTEGER PRIMARY KEY,
    contract_id TEXT NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    description TEXT NOT NULL,
    severity    TEXT NOT NULL,
    mitigation  TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'OPEN',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS signatures (
    signature_id        INTEGER PRIMARY KEY,
    contract_id         TEXT NOT NULL REFERENCES contracts(contract_id) ON DELETE CASCADE,
    party               TEXT NOT NULL,
    signatory_name      TEXT NOT NULL DEFAULT '',
    signatory_email     TEXT NOT NULL DEFAULT '',
    signatory_phone     TEXT NOT NULL DEFAULT '',
    designation         TEXT NOT NULL DEFAULT '',
    sign_type           TEXT NOT NULL,
    signed_at           TEXT,
    signature_reference TEXT NOT NULL DEFAULT '',
    created_at          TEXT NOT NULL
);

-- Append-only. Contract deletion nulls the reference, never the row.
CREATE TABLE IF NOT EXISTS audit_events (
    event_id    INTEGER PRIMARY KEY,
    contract_id TEXT REFERENCES contracts(contract_id) ON DELETE SET NULL,
    actor_id    TEXT,
    action      TEXT NOT NULL,
    metadata    TEXT NOT NULL DEFAULT 'null',  -- JSON
    ip_address  TEXT,
    user_agent  TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS contracts_status_idx   ON contracts(status);
CREATE INDEX IF NOT EXISTS contracts_owner_idx    ON contracts(owner_id);
CREATE INDEX IF NOT EXISTS contracts_end_idx      ON contracts(end_date);
CREATE INDEX IF NOT EXISTS files_contract_idx     ON contract_files(contract_id);
CREATE INDEX IF NOT EXISTS shares_contract_idx    ON contract_shares(contract_id);
CREATE INDEX IF NOT EXISTS approvals_contract_idx ON approvals(contract_id);
CREATE INDEX IF NOT EXISTS approvals_approver_idx ON approvals(approver_id, status);
CREATE INDEX IF NOT EXISTS audit_contract_idx     ON audit_events(contract_id);
CREATE INDEX IF NOT EXISTS audit_created_idx      ON audit_events(created_at);

PRAGMA user_version = 1;
";
