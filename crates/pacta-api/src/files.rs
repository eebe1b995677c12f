//! Uploaded-document storage on the local filesystem.
//!
//! Documents live beneath the configured `files_root`, at the relative
//! `contracts/<uuid>/files/<name>` path the store records. The database
//! row is the source of truth; a missing blob surfaces as 404 on
//! download rather than an inconsistency error.

use std::path::{Path, PathBuf};

pub async fn save_blob(
  root: &Path,
  relative: &str,
  bytes: &[u8],
) -> std::io::Result<PathBuf> {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }
  tokio::fs::write(&path, bytes).await?;
  Ok(path)
}

pub async fn read_blob(
  root: &Path,
  relative: &str,
) -> std::io::Result<Option<Vec<u8>>> {
  match tokio::fs::read(root.join(relative)).await {
    Ok(bytes) => Ok(Some(bytes)),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e),
  }
}

/// Best-effort removal; the caller has already deleted the row.
pub async fn remove_blob(root: &Path, relative: &str) {
  if let Err(e) = tokio::fs::remove_file(root.join(relative)).await
    && e.kind() != std::io::ErrorKind::NotFound
  {
    tracing::warn!("failed to remove blob {relative}: {e}");
  }
}
