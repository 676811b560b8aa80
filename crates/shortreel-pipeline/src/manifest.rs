//! Run-manifest persistence.
//!
//! One manifest file per run date, written to `manifest_<date>.json` in the
//! store root after every stage. Manifests are never deleted automatically;
//! a rerun of the same date overwrites the previous record.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use shortreel_types::{Result, RunManifest};

fn manifest_path(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(format!("manifest_{date}.json"))
}

/// Persist the manifest for its run date. Returns the path written.
pub async fn save_manifest(root: &Path, manifest: &RunManifest) -> Result<PathBuf> {
    tokio::fs::create_dir_all(root).await?;
    let path = manifest_path(root, manifest.date);
    let json = serde_json::to_string_pretty(manifest)?;
    tokio::fs::write(&path, json).await?;
    tracing::debug!(path = %path.display(), "Manifest saved");
    Ok(path)
}

/// Load the manifest for `date`, or `Ok(None)` when no run has been
/// recorded for that date.
pub async fn load_manifest(root: &Path, date: NaiveDate) -> Result<Option<RunManifest>> {
    let path = manifest_path(root, date);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(None);
    }
    let json = tokio::fs::read_to_string(&path).await?;
    let manifest: RunManifest = serde_json::from_str(&json)?;
    Ok(Some(manifest))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
