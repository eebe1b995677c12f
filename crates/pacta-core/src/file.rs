//! Files attached to contracts.
//!
//! Binary content lives in blob storage, addressed by a deterministic
//! relative path; the database keeps metadata only. At most one file per
//! contract is primary — promoting a new primary demotes the old one in
//! the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Upload size cap, matching the original product limit.
pub const MAX_FILE_BYTES: i64 = 20 * 1024 * 1024;

/// File extensions accepted for contract documents.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
  "pdf", "doc", "docx", "xlsx", "xls", "ppt", "pptx", "txt", "jpg", "jpeg",
  "png",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractFile {
  pub file_id:           i64,
  pub contract_id:       Uuid,
  pub original_filename: String,
  /// Relative path under the blob root; see [`storage_path_for`].
  pub storage_path:      String,
  pub size_bytes:        i64,
  pub media_type:        String,
  pub is_primary:        bool,
  pub description:       String,
  pub uploaded_by:       Option<Uuid>,
  pub uploaded_at:       DateTime<Utc>,
}

/// Input to [`crate::store::ContractStore::add_file`]. The storage path
/// is derived by the store from the contract, the row id, and the
/// filename.
#[derive(Debug, Clone)]
pub struct NewContractFile {
  pub original_filename: String,
  pub size_bytes:        i64,
  pub media_type:        String,
  pub is_primary:        bool,
  pub description:       String,
  pub uploaded_by:       Option<Uuid>,
}

impl NewContractFile {
  pub fn validate(&self) -> Result<()> {
    validate_upload(&self.original_filename, self.size_bytes)
  }
}

/// Blob path convention:
/// `contracts/<contract-uuid>/files/<file-id>-<filename>`. The row id
/// prefix keeps same-named uploads to one contract at distinct paths.
pub fn storage_path_for(
  contract_id: Uuid,
  file_id: i64,
  filename: &str,
) -> String {
  format!("contracts/{contract_id}/files/{file_id}-{filename}")
}

/// Reject oversized uploads and unsupported document types.
pub fn validate_upload(filename: &str, size_bytes: i64) -> Result<()> {
  if size_bytes > MAX_FILE_BYTES {
    return Err(Error::Validation("file size must be under 20MB".into()));
  }
  let ext = filename.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
  match ext {
    Some(e) if ALLOWED_EXTENSIONS.contains(&e.as_str()) => Ok(()),
    _ => Err(Error::Validation(format!(
      "unsupported file type: {filename:?}"
    ))),
  }
}
