//! Run configuration: optional caller parameters resolved into a validated
//! [`RunConfig`] before anything executes.

use std::time::Duration;

use chrono::{NaiveDate, Utc};

use shortreel_types::{PipelineError, Result, StageKind};

pub const DEFAULT_MAX_TOPICS: usize = 5;
pub const DEFAULT_PER_TOPIC_DOCS: usize = 1;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 180;

/// Caller-supplied parameters, all optional. Resolved once by
/// [`RunParams::resolve`]; nothing downstream sees an unvalidated value.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub date: Option<NaiveDate>,
    pub max_topics: Option<usize>,
    pub per_topic_docs: Option<usize>,
    pub top_text: Option<String>,
    pub skip_to: Option<String>,
    pub concurrency: Option<usize>,
    pub stage_timeout_secs: Option<u64>,
}

/// The validated configuration a run executes under. Immutable once built.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Run key: all artifacts and the manifest are scoped to this date.
    pub date: NaiveDate,
    pub max_topics: usize,
    pub per_topic_docs: usize,
    /// Optional caption/lead-in threaded to speech and video stages.
    pub top_text: Option<String>,
    /// First stage to execute. Collection means a fresh run.
    pub start_stage: StageKind,
    /// Upper bound on concurrent per-topic tasks within a stage.
    pub concurrency: usize,
    /// Upper bound on one topic's time inside a single stage.
    pub stage_timeout: Duration,
}

impl RunParams {
    /// Validate and fill in defaults. Any violation is reported as
    /// [`PipelineError::InvalidConfiguration`] naming the offending field;
    /// an unrecognized `skip_to` is [`PipelineError::UnknownStage`].
    pub fn resolve(self) -> Result<RunConfig> {
        let invalid = |field: &'static str, message: &str| PipelineError::InvalidConfiguration {
            field,
            message: message.to_string(),
        };

        let today = Utc::now().date_naive();
        let date = self.date.unwrap_or(today);
        if date > today {
            return Err(invalid("date", "run date must not be in the future"));
        }

        let max_topics = self.max_topics.unwrap_or(DEFAULT_MAX_TOPICS);
        if max_topics == 0 {
            return Err(invalid("max_topics", "must be at least 1"));
        }

        let per_topic_docs = self.per_topic_docs.unwrap_or(DEFAULT_PER_TOPIC_DOCS);
        if per_topic_docs == 0 {
            return Err(invalid("per_topic_docs", "must be at least 1"));
        }

        let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }

        let timeout_secs = self.stage_timeout_secs.unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(invalid("stage_timeout_secs", "must be at least 1"));
        }

        let start_stage = match self.skip_to {
            Some(name) => name.parse::<StageKind>()?,
            None => StageKind::Collection,
        };

        let top_text = self
            .top_text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(RunConfig {
            date,
            max_topics,
            per_topic_docs,
            top_text,
            start_stage,
            concurrency,
            stage_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in() {
        let config = RunParams::default().resolve().unwrap();
        assert_eq!(config.date, Utc::now().date_naive());
        assert_eq!(config.max_topics, 5);
        assert_eq!(config.per_topic_docs, 1);
        assert_eq!(config.top_text, None);
        assert_eq!(config.start_stage, StageKind::Collection);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.stage_timeout, Duration::from_secs(180));
    }

    #[test]
    fn zero_max_topics_rejected() {
        let err = RunParams {
            max_topics: Some(0),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        match err {
            PipelineError::InvalidConfiguration { field, .. } => {
                assert_eq!(field, "max_topics")
            }
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn future_date_rejected() {
        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
        let err = RunParams {
            date: Some(tomorrow),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidConfiguration { field: "date", .. }
        ));
    }

    #[test]
    fn unknown_skip_to_rejected() {
        let err = RunParams {
            skip_to: Some("rendering".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        match err {
            PipelineError::UnknownStage { name } => assert_eq!(name, "rendering"),
            other => panic!("expected UnknownStage, got {other:?}"),
        }
    }

    #[test]
    fn skip_to_sets_start_stage() {
        let config = RunParams {
            skip_to: Some("speech_generation".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.start_stage, StageKind::SpeechGeneration);
    }

    #[test]
    fn blank_top_text_becomes_none() {
        let config = RunParams {
            top_text: Some("   ".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.top_text, None);

        let config = RunParams {
            top_text: Some("  Morning Brief ".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.top_text.as_deref(), Some("Morning Brief"));
    }
}
