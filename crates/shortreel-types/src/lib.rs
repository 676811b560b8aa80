//! Shared types, errors, stage table, and run manifest for the shortreel pipeline.
//!
//! This crate provides the foundational types used across all other shortreel crates:
//! - `PipelineError`: unified error taxonomy
//! - `StageKind`: the fixed, ordered table of the six pipeline stages
//! - `Artifact` / `ArtifactKind` / `ArtifactSet`: stage inputs and outputs
//! - `RunManifest`: per-run record of configuration and per-topic outcomes

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Unified error type for all shortreel subsystems.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    // === Pre-run errors ===
    #[error("Invalid configuration: {field}: {message}")]
    InvalidConfiguration {
        field: &'static str,
        message: String,
    },

    #[error("Unknown stage '{name}' (expected one of: {})", StageKind::names().join(", "))]
    UnknownStage { name: String },

    // === Mid-run errors ===
    #[error("Run aborted at {stage}: every topic failed, no inputs remain for the next stage")]
    RunAborted { stage: StageKind },

    // === Collaborator errors ===
    #[error("Collaborator '{name}' error: {message}")]
    Collaborator { name: &'static str, message: String },

    // === Store errors ===
    #[error("Artifact not found: {kind} for topic '{topic_id}'")]
    ArtifactNotFound { kind: ArtifactKind, topic_id: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Returns `true` if the error is detected before any stage executes
    /// and therefore leaves no partial state behind.
    pub fn is_pre_run(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidConfiguration { .. } | PipelineError::UnknownStage { .. }
        )
    }
}

/// A convenience alias for `Result<T, PipelineError>`.
pub type Result<T> = std::result::Result<T, PipelineError>;

// ---------------------------------------------------------------------------
// StageKind: the fixed ordered table of pipeline stages
// ---------------------------------------------------------------------------

/// One of the six fixed pipeline stages, in pipeline order.
///
/// Declaration order is execution order: every stage a later stage depends on
/// is strictly earlier in [`StageKind::ALL`]. There is no dynamic reordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Collection,
    Crawling,
    Summarization,
    ImageGeneration,
    SpeechGeneration,
    VideoAssembly,
}

impl StageKind {
    /// All stages in pipeline order.
    pub const ALL: [StageKind; 6] = [
        StageKind::Collection,
        StageKind::Crawling,
        StageKind::Summarization,
        StageKind::ImageGeneration,
        StageKind::SpeechGeneration,
        StageKind::VideoAssembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Collection => "collection",
            StageKind::Crawling => "crawling",
            StageKind::Summarization => "summarization",
            StageKind::ImageGeneration => "image_generation",
            StageKind::SpeechGeneration => "speech_generation",
            StageKind::VideoAssembly => "video_assembly",
        }
    }

    /// The recognized stage identifiers, for error messages and CLI help.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }

    /// Zero-based position in the pipeline order.
    pub fn position(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).expect("stage in ALL")
    }

    /// The stage immediately before this one, `None` for collection.
    pub fn prev(&self) -> Option<StageKind> {
        match self.position() {
            0 => None,
            p => Some(Self::ALL[p - 1]),
        }
    }

    /// The ordered subsequence of stages from `self` (inclusive) to the end.
    pub fn stages_from(self) -> &'static [StageKind] {
        &Self::ALL[self.position()..]
    }

    /// The artifact kind this stage produces.
    pub fn output_kind(&self) -> ArtifactKind {
        match self {
            StageKind::Collection => ArtifactKind::Topic,
            StageKind::Crawling => ArtifactKind::Articles,
            StageKind::Summarization => ArtifactKind::Summary,
            StageKind::ImageGeneration => ArtifactKind::Images,
            StageKind::SpeechGeneration => ArtifactKind::Audio,
            StageKind::VideoAssembly => ArtifactKind::Video,
        }
    }

    /// The artifact kinds this stage consumes.
    pub fn input_kinds(&self) -> &'static [ArtifactKind] {
        match self {
            StageKind::Collection => &[],
            StageKind::Crawling => &[ArtifactKind::Topic],
            StageKind::Summarization => &[ArtifactKind::Articles],
            StageKind::ImageGeneration => &[ArtifactKind::Summary],
            StageKind::SpeechGeneration => &[ArtifactKind::Summary],
            StageKind::VideoAssembly => &[ArtifactKind::Images, ArtifactKind::Audio],
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| PipelineError::UnknownStage { name: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Artifacts: the data model threaded between stages
// ---------------------------------------------------------------------------

/// A single news issue selected for a run. Created by collection, read-only
/// afterward; the unit of per-item success/failure tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    /// Number of distinct sources reporting the issue.
    pub source_count: usize,
}

/// A crawled article. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub topic_id: String,
    pub url: String,
    pub text: String,
    pub crawled_at: DateTime<Utc>,
}

/// A condensed rendering of a topic's articles, split into narration parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub topic_id: String,
    /// Part-wise narration lines, in order. Image panels map one part each.
    pub parts: Vec<String>,
    /// The condensed whole, used where a single string is needed.
    pub text: String,
    /// Length hint for downstream speech/video pacing.
    pub target_duration_secs: u32,
}

/// Generated still images for a topic, in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub topic_id: String,
    pub images: Vec<PathBuf>,
}

/// Synthesized narration for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    pub topic_id: String,
    pub audio: PathBuf,
    pub duration_secs: f64,
}

/// The terminal artifact: one assembled short-form video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAsset {
    pub topic_id: String,
    pub video: PathBuf,
}

/// Discriminant for [`Artifact`], used as store partition key and for
/// declaring stage inputs/outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Topic,
    Articles,
    Summary,
    Images,
    Audio,
    Video,
}

impl ArtifactKind {
    /// Store partition directory for this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Topic => "topics",
            ArtifactKind::Articles => "articles",
            ArtifactKind::Summary => "summaries",
            ArtifactKind::Images => "images",
            ArtifactKind::Audio => "tts",
            ArtifactKind::Video => "videos",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactKind::Topic => "topic",
            ArtifactKind::Articles => "articles",
            ArtifactKind::Summary => "summary",
            ArtifactKind::Images => "images",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Video => "video",
        };
        f.write_str(s)
    }
}

/// Any stage output, self-describing for on-disk persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Artifact {
    Topic(Topic),
    Articles(Vec<Article>),
    Summary(Summary),
    Images(ImageAsset),
    Audio(AudioAsset),
    Video(VideoAsset),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Topic(_) => ArtifactKind::Topic,
            Artifact::Articles(_) => ArtifactKind::Articles,
            Artifact::Summary(_) => ArtifactKind::Summary,
            Artifact::Images(_) => ArtifactKind::Images,
            Artifact::Audio(_) => ArtifactKind::Audio,
            Artifact::Video(_) => ArtifactKind::Video,
        }
    }
}

/// The mapping of artifact kinds a stage consumes, assembled by the
/// orchestrator from the store before each invocation.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    entries: BTreeMap<ArtifactKind, Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, artifact: Artifact) {
        self.entries.insert(artifact.kind(), artifact);
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.entries.get(&kind)
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn articles(&self) -> Option<&[Article]> {
        match self.entries.get(&ArtifactKind::Articles) {
            Some(Artifact::Articles(a)) => Some(a),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self.entries.get(&ArtifactKind::Summary) {
            Some(Artifact::Summary(s)) => Some(s),
            _ => None,
        }
    }

    pub fn images(&self) -> Option<&ImageAsset> {
        match self.entries.get(&ArtifactKind::Images) {
            Some(Artifact::Images(i)) => Some(i),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioAsset> {
        match self.entries.get(&ArtifactKind::Audio) {
            Some(Artifact::Audio(a)) => Some(a),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// StageFailure: per-topic failure, recorded rather than raised
// ---------------------------------------------------------------------------

/// Why a stage failed for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The stage's external call exceeded the configured bound.
    Timeout,
    /// The stage produced nothing usable (e.g. zero crawled articles).
    NoContent,
    /// A required input artifact was absent from the store.
    MissingInput(ArtifactKind),
    /// The store rejected a read or write for this topic.
    Store(String),
    /// The external collaborator reported an error.
    Collaborator(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timed out"),
            FailureReason::NoContent => write!(f, "no content available"),
            FailureReason::MissingInput(kind) => write!(f, "missing input artifact: {kind}"),
            FailureReason::Store(msg) => write!(f, "store error: {msg}"),
            FailureReason::Collaborator(msg) => write!(f, "collaborator error: {msg}"),
        }
    }
}

/// One topic's failure at one stage. Recorded in the [`RunManifest`];
/// never propagates past the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub topic_id: String,
    pub stage: StageKind,
    pub reason: FailureReason,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "topic '{}' failed at {}: {}", self.topic_id, self.stage, self.reason)
    }
}

// ---------------------------------------------------------------------------
// RunManifest: the persisted per-run record
// ---------------------------------------------------------------------------

/// Outcome of one stage for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    Failure { reason: FailureReason },
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success)
    }
}

/// Per-topic entry in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub title: String,
    pub stages: BTreeMap<StageKind, StageOutcome>,
}

/// The persisted per-run record of configuration and per-topic/per-stage
/// outcomes. Created at run start, mutated only by the orchestrator's
/// aggregator, persisted after every stage; never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: uuid::Uuid,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub max_topics: usize,
    pub per_topic_docs: usize,
    pub top_text: Option<String>,
    pub start_stage: StageKind,
    pub topics: BTreeMap<String, TopicRecord>,
    /// Set when the run terminated because every topic failed at a stage.
    pub aborted_at: Option<StageKind>,
}

impl RunManifest {
    pub fn new(
        date: NaiveDate,
        max_topics: usize,
        per_topic_docs: usize,
        top_text: Option<String>,
        start_stage: StageKind,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            date,
            created_at: Utc::now(),
            max_topics,
            per_topic_docs,
            top_text,
            start_stage,
            topics: BTreeMap::new(),
            aborted_at: None,
        }
    }

    /// Record one topic's outcome at one stage. The single serialization
    /// point for per-topic results: all stage tasks funnel through here.
    pub fn record(
        &mut self,
        topic_id: impl Into<String>,
        title: impl Into<String>,
        stage: StageKind,
        outcome: StageOutcome,
    ) {
        let entry = self
            .topics
            .entry(topic_id.into())
            .or_insert_with(|| TopicRecord {
                title: title.into(),
                stages: BTreeMap::new(),
            });
        entry.stages.insert(stage, outcome);
    }

    /// Topic ids that succeeded at `stage`, in id order.
    pub fn survivors(&self, stage: StageKind) -> Vec<String> {
        self.topics
            .iter()
            .filter(|(_, rec)| {
                rec.stages.get(&stage).map(StageOutcome::is_success).unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// All recorded failures, in (topic, stage) order.
    pub fn failures(&self) -> Vec<StageFailure> {
        let mut out = Vec::new();
        for (id, rec) in &self.topics {
            for (stage, outcome) in &rec.stages {
                if let StageOutcome::Failure { reason } = outcome {
                    out.push(StageFailure {
                        topic_id: id.clone(),
                        stage: *stage,
                        reason: reason.clone(),
                    });
                }
            }
        }
        out
    }

    pub fn mark_aborted(&mut self, stage: StageKind) {
        self.aborted_at = Some(stage);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // --- PipelineError ---

    #[test]
    fn error_display_invalid_configuration() {
        let err = PipelineError::InvalidConfiguration {
            field: "max_topics",
            message: "must be a positive integer".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration: max_topics: must be a positive integer"
        );
    }

    #[test]
    fn error_display_unknown_stage_lists_recognized_names() {
        let err = PipelineError::UnknownStage { name: "render".into() };
        let msg = err.to_string();
        assert!(msg.contains("Unknown stage 'render'"));
        assert!(msg.contains("collection"));
        assert!(msg.contains("video_assembly"));
    }

    #[test]
    fn error_display_run_aborted() {
        let err = PipelineError::RunAborted {
            stage: StageKind::Summarization,
        };
        assert!(err.to_string().contains("aborted at summarization"));
    }

    #[test]
    fn error_display_artifact_not_found() {
        let err = PipelineError::ArtifactNotFound {
            kind: ArtifactKind::Summary,
            topic_id: "t01".into(),
        };
        assert_eq!(err.to_string(), "Artifact not found: summary for topic 't01'");
    }

    #[test]
    fn pre_run_predicate() {
        assert!(PipelineError::InvalidConfiguration {
            field: "date",
            message: "x".into()
        }
        .is_pre_run());
        assert!(PipelineError::UnknownStage { name: "x".into() }.is_pre_run());
        assert!(!PipelineError::RunAborted { stage: StageKind::Crawling }.is_pre_run());
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    // --- StageKind ---

    #[test]
    fn stage_order_is_fixed() {
        let names: Vec<&str> = StageKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "collection",
                "crawling",
                "summarization",
                "image_generation",
                "speech_generation",
                "video_assembly",
            ]
        );
    }

    #[test]
    fn stage_from_str_round_trips() {
        for kind in StageKind::ALL {
            assert_eq!(StageKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn stage_from_str_rejects_unknown() {
        let err = StageKind::from_str("publish").unwrap_err();
        match err {
            PipelineError::UnknownStage { name } => assert_eq!(name, "publish"),
            other => panic!("expected UnknownStage, got: {other:?}"),
        }
    }

    #[test]
    fn prev_walks_backwards() {
        assert_eq!(StageKind::Collection.prev(), None);
        assert_eq!(StageKind::Crawling.prev(), Some(StageKind::Collection));
        assert_eq!(
            StageKind::VideoAssembly.prev(),
            Some(StageKind::SpeechGeneration)
        );
    }

    #[test]
    fn stages_from_collection_is_everything() {
        assert_eq!(StageKind::Collection.stages_from(), &StageKind::ALL);
    }

    #[test]
    fn stages_from_mid_pipeline() {
        let tail = StageKind::ImageGeneration.stages_from();
        assert_eq!(
            tail,
            &[
                StageKind::ImageGeneration,
                StageKind::SpeechGeneration,
                StageKind::VideoAssembly,
            ]
        );
    }

    #[test]
    fn stage_ord_matches_pipeline_order() {
        assert!(StageKind::Collection < StageKind::Crawling);
        assert!(StageKind::SpeechGeneration < StageKind::VideoAssembly);
    }

    #[test]
    fn every_input_comes_from_an_earlier_stage() {
        for stage in StageKind::ALL {
            for input in stage.input_kinds() {
                let producer = StageKind::ALL
                    .iter()
                    .find(|s| s.output_kind() == *input)
                    .copied()
                    .unwrap();
                assert!(
                    producer < stage,
                    "{stage} consumes {input} produced by {producer}"
                );
            }
        }
    }

    #[test]
    fn stage_serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_string(&StageKind::ImageGeneration).unwrap(),
            "\"image_generation\""
        );
        let back: StageKind = serde_json::from_str("\"speech_generation\"").unwrap();
        assert_eq!(back, StageKind::SpeechGeneration);
    }

    // --- Artifacts ---

    fn sample_topic(id: &str) -> Topic {
        Topic {
            id: id.into(),
            title: "Example issue".into(),
            date: NaiveDate::from_ymd_opt(2025, 2, 6).unwrap(),
            source_count: 3,
        }
    }

    #[test]
    fn artifact_kind_matches_payload() {
        let a = Artifact::Topic(sample_topic("t01"));
        assert_eq!(a.kind(), ArtifactKind::Topic);
        let a = Artifact::Audio(AudioAsset {
            topic_id: "t01".into(),
            audio: PathBuf::from("tts/x.mp3"),
            duration_secs: 12.5,
        });
        assert_eq!(a.kind(), ArtifactKind::Audio);
    }

    #[test]
    fn artifact_serialization_is_tagged() {
        let a = Artifact::Topic(sample_topic("t01"));
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["kind"], "topic");
        assert_eq!(json["payload"]["id"], "t01");

        let back: Artifact = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn partition_dirs_are_distinct() {
        let dirs: std::collections::HashSet<&str> = [
            ArtifactKind::Topic,
            ArtifactKind::Articles,
            ArtifactKind::Summary,
            ArtifactKind::Images,
            ArtifactKind::Audio,
            ArtifactKind::Video,
        ]
        .iter()
        .map(|k| k.dir_name())
        .collect();
        assert_eq!(dirs.len(), 6);
        assert!(dirs.contains("tts"));
        assert!(dirs.contains("videos"));
    }

    #[test]
    fn artifact_set_typed_accessors() {
        let mut set = ArtifactSet::new();
        assert!(set.summary().is_none());

        set.insert(Artifact::Summary(Summary {
            topic_id: "t01".into(),
            parts: vec!["part one".into()],
            text: "part one".into(),
            target_duration_secs: 30,
        }));
        set.insert(Artifact::Articles(vec![]));

        assert!(set.contains(ArtifactKind::Summary));
        assert_eq!(set.summary().unwrap().topic_id, "t01");
        assert_eq!(set.articles().unwrap().len(), 0);
        assert!(set.images().is_none());
    }

    #[test]
    fn artifact_set_insert_overwrites_same_kind() {
        let mut set = ArtifactSet::new();
        set.insert(Artifact::Topic(sample_topic("t01")));
        set.insert(Artifact::Topic(sample_topic("t02")));
        match set.get(ArtifactKind::Topic) {
            Some(Artifact::Topic(t)) => assert_eq!(t.id, "t02"),
            other => panic!("expected topic, got {other:?}"),
        }
    }

    // --- FailureReason / StageFailure ---

    #[test]
    fn failure_reason_display() {
        assert_eq!(FailureReason::Timeout.to_string(), "timed out");
        assert_eq!(FailureReason::NoContent.to_string(), "no content available");
        assert_eq!(
            FailureReason::MissingInput(ArtifactKind::Audio).to_string(),
            "missing input artifact: audio"
        );
    }

    #[test]
    fn failure_reason_serialization() {
        let json = serde_json::to_value(&FailureReason::Timeout).unwrap();
        assert_eq!(json["kind"], "timeout");

        let json =
            serde_json::to_value(&FailureReason::Collaborator("503 from api".into())).unwrap();
        assert_eq!(json["kind"], "collaborator");
        assert_eq!(json["detail"], "503 from api");
    }

    #[test]
    fn stage_failure_display() {
        let f = StageFailure {
            topic_id: "t02".into(),
            stage: StageKind::Crawling,
            reason: FailureReason::NoContent,
        };
        assert_eq!(
            f.to_string(),
            "topic 't02' failed at crawling: no content available"
        );
    }

    // --- RunManifest ---

    fn sample_manifest() -> RunManifest {
        RunManifest::new(
            NaiveDate::from_ymd_opt(2025, 2, 6).unwrap(),
            3,
            1,
            None,
            StageKind::Collection,
        )
    }

    #[test]
    fn record_and_survivors() {
        let mut m = sample_manifest();
        m.record("t01", "one", StageKind::Crawling, StageOutcome::Success);
        m.record(
            "t02",
            "two",
            StageKind::Crawling,
            StageOutcome::Failure {
                reason: FailureReason::NoContent,
            },
        );
        m.record("t03", "three", StageKind::Crawling, StageOutcome::Success);

        assert_eq!(m.survivors(StageKind::Crawling), vec!["t01", "t03"]);
        assert!(m.survivors(StageKind::Summarization).is_empty());
    }

    #[test]
    fn later_record_overwrites_earlier_for_same_stage() {
        let mut m = sample_manifest();
        m.record(
            "t01",
            "one",
            StageKind::Summarization,
            StageOutcome::Failure {
                reason: FailureReason::Timeout,
            },
        );
        m.record("t01", "one", StageKind::Summarization, StageOutcome::Success);
        assert_eq!(m.survivors(StageKind::Summarization), vec!["t01"]);
    }

    #[test]
    fn failures_lists_all_recorded_failures() {
        let mut m = sample_manifest();
        m.record("t01", "one", StageKind::Crawling, StageOutcome::Success);
        m.record(
            "t02",
            "two",
            StageKind::Crawling,
            StageOutcome::Failure {
                reason: FailureReason::Timeout,
            },
        );
        let failures = m.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].topic_id, "t02");
        assert_eq!(failures[0].reason, FailureReason::Timeout);
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let mut m = sample_manifest();
        m.record("t01", "one", StageKind::Collection, StageOutcome::Success);
        m.record(
            "t01",
            "one",
            StageKind::Crawling,
            StageOutcome::Failure {
                reason: FailureReason::Collaborator("fetch failed".into()),
            },
        );
        m.mark_aborted(StageKind::Crawling);

        let json = serde_json::to_string_pretty(&m).unwrap();
        let back: RunManifest = serde_json::from_str(&json).unwrap();

        assert_eq!(back.run_id, m.run_id);
        assert_eq!(back.aborted_at, Some(StageKind::Crawling));
        let rec = &back.topics["t01"];
        assert_eq!(rec.title, "one");
        assert!(rec.stages[&StageKind::Collection].is_success());
        assert!(!rec.stages[&StageKind::Crawling].is_success());
    }
}
