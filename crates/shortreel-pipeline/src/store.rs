//! Filesystem-backed artifact store.
//!
//! One partition directory per [`ArtifactKind`]; each artifact is a pretty
//! JSON file named `<date>_<topic_id>.json`. Writes overwrite silently
//! (last-write-wins), reads are idempotent, and a rerun never invalidates
//! artifacts written by earlier runs.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use shortreel_types::{Artifact, ArtifactKind, PipelineError, Result, Topic};

/// Shared on-disk store the orchestrator threads all stage inputs and
/// outputs through.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root; the per-date manifest lives directly under it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn artifact_path(&self, kind: ArtifactKind, date: NaiveDate, topic_id: &str) -> PathBuf {
        self.partition(kind).join(format!("{date}_{topic_id}.json"))
    }

    /// Persist one artifact, overwriting any previous file for the same
    /// (kind, date, topic). Returns the path written.
    pub async fn put(
        &self,
        date: NaiveDate,
        topic_id: &str,
        artifact: &Artifact,
    ) -> Result<PathBuf> {
        let dir = self.partition(artifact.kind());
        tokio::fs::create_dir_all(&dir).await?;
        let path = self.artifact_path(artifact.kind(), date, topic_id);
        let json = serde_json::to_string_pretty(artifact)?;
        tokio::fs::write(&path, json).await?;
        tracing::debug!(path = %path.display(), "Artifact saved");
        Ok(path)
    }

    /// Load one artifact, or [`PipelineError::ArtifactNotFound`] if no file
    /// exists for the (kind, date, topic).
    pub async fn get(
        &self,
        kind: ArtifactKind,
        date: NaiveDate,
        topic_id: &str,
    ) -> Result<Artifact> {
        let path = self.artifact_path(kind, date, topic_id);
        if !tokio::fs::try_exists(&path).await? {
            return Err(PipelineError::ArtifactNotFound {
                kind,
                topic_id: topic_id.to_string(),
            });
        }
        let json = tokio::fs::read_to_string(&path).await?;
        let artifact: Artifact = serde_json::from_str(&json)?;
        Ok(artifact)
    }

    pub async fn exists(&self, kind: ArtifactKind, date: NaiveDate, topic_id: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.artifact_path(kind, date, topic_id)).await?)
    }

    /// Topic ids that have an artifact of `kind` for `date`, in id order.
    /// A missing partition directory simply yields an empty set.
    pub async fn topic_ids(&self, kind: ArtifactKind, date: NaiveDate) -> Result<Vec<String>> {
        let dir = self.partition(kind);
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let prefix = format!("{date}_");
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".json"))
            {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Reload the Topic records persisted for `date`, in id order. Used by
    /// skip-to runs to rebuild the working set without re-collecting.
    pub async fn topics(&self, date: NaiveDate) -> Result<Vec<Topic>> {
        let mut topics = Vec::new();
        for id in self.topic_ids(ArtifactKind::Topic, date).await? {
            if let Artifact::Topic(topic) = self.get(ArtifactKind::Topic, date, &id).await? {
                topics.push(topic);
            }
        }
        Ok(topics)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
