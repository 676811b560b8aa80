//! The pipeline run engine.
//!
//! Drives a [`RunConfig`] through the fixed stage order: resolve the working
//! set (fresh collection or skip-to from stored artifacts), then for each
//! stage fan per-topic tasks out over a bounded [`Semaphore`], funnel every
//! result through the single manifest writer, persist the manifest, and
//! advance. The run aborts only when every remaining topic fails at the same
//! stage; individual failures are recorded and dropped from the working set.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use shortreel_news::IssueSource;
use shortreel_types::{
    Artifact, ArtifactKind, ArtifactSet, FailureReason, PipelineError, Result, RunManifest,
    StageFailure, StageKind, StageOutcome, Topic,
};

use crate::config::RunConfig;
use crate::manifest::save_manifest;
use crate::stage::{Stage, StageRegistry};
use crate::store::ArtifactStore;

/// What a finished (non-aborted) run produced.
#[derive(Debug)]
pub struct RunReport {
    pub manifest: RunManifest,
    /// Topic ids that made it through video assembly, in id order.
    pub completed: Vec<String>,
    /// Every per-topic failure recorded during the run.
    pub failures: Vec<StageFailure>,
}

/// The orchestrator. Owns the store, the topic collector, and the stage
/// registry; one instance can serve many runs.
pub struct PipelineRunner {
    store: Arc<ArtifactStore>,
    issues: Arc<dyn IssueSource>,
    registry: Arc<StageRegistry>,
}

impl PipelineRunner {
    pub fn new(store: ArtifactStore, issues: Arc<dyn IssueSource>, registry: StageRegistry) -> Self {
        Self {
            store: Arc::new(store),
            issues,
            registry: Arc::new(registry),
        }
    }

    /// Execute one run to completion.
    ///
    /// Returns `Ok` with a [`RunReport`] on full or partial success, or
    /// [`PipelineError::RunAborted`] when a stage leaves no survivors. The
    /// manifest is persisted after every stage and again before an abort,
    /// so the on-disk record is complete either way.
    pub async fn run(&self, config: &RunConfig) -> Result<RunReport> {
        let mut manifest = RunManifest::new(
            config.date,
            config.max_topics,
            config.per_topic_docs,
            config.top_text.clone(),
            config.start_stage,
        );

        let mut working = if config.start_stage == StageKind::Collection {
            self.collect_topics(config, &mut manifest).await?
        } else {
            self.resolve_working_set(config).await?
        };

        if working.is_empty() {
            return self.abort(manifest, config.start_stage).await;
        }
        save_manifest(self.store.root(), &manifest).await?;

        for stage_kind in config.start_stage.stages_from() {
            if *stage_kind == StageKind::Collection {
                continue;
            }

            self.run_stage(*stage_kind, &working, config, &mut manifest)
                .await?;
            save_manifest(self.store.root(), &manifest).await?;

            let survivors = manifest.survivors(*stage_kind);
            working.retain(|t| survivors.contains(&t.id));
            if working.is_empty() {
                return self.abort(manifest, *stage_kind).await;
            }
        }

        let completed = manifest.survivors(StageKind::VideoAssembly);
        let failures = manifest.failures();
        tracing::info!(
            date = %config.date,
            completed = completed.len(),
            failures = failures.len(),
            "Run finished"
        );
        Ok(RunReport {
            manifest,
            completed,
            failures,
        })
    }

    /// Fresh run: discover topics, persist each as a Topic artifact, and
    /// record collection outcomes. Collector errors abort the run.
    async fn collect_topics(
        &self,
        config: &RunConfig,
        manifest: &mut RunManifest,
    ) -> Result<Vec<Topic>> {
        let topics = match self.issues.top_issues(config.date, config.max_topics).await {
            Ok(topics) => topics,
            Err(e) => {
                tracing::error!(error = %e, "Topic collection failed");
                return Ok(Vec::new());
            }
        };

        let mut working = Vec::with_capacity(topics.len());
        for topic in topics {
            let outcome = match self
                .store
                .put(config.date, &topic.id, &Artifact::Topic(topic.clone()))
                .await
            {
                Ok(_) => StageOutcome::Success,
                Err(e) => StageOutcome::Failure {
                    reason: FailureReason::Store(e.to_string()),
                },
            };
            let survived = outcome.is_success();
            manifest.record(&topic.id, &topic.title, StageKind::Collection, outcome);
            if survived {
                working.push(topic);
            }
        }
        tracing::info!(date = %config.date, topics = working.len(), "Topics collected");
        Ok(working)
    }

    /// Skip-to run: the working set is every persisted topic whose input
    /// artifacts for the start stage already exist in the store.
    async fn resolve_working_set(&self, config: &RunConfig) -> Result<Vec<Topic>> {
        let mut working = Vec::new();
        for topic in self.store.topics(config.date).await? {
            let mut ready = true;
            for kind in config.start_stage.input_kinds() {
                // The Topic record itself is the loaded artifact.
                if *kind == ArtifactKind::Topic {
                    continue;
                }
                if !self.store.exists(*kind, config.date, &topic.id).await? {
                    ready = false;
                    break;
                }
            }
            if ready {
                working.push(topic);
            }
        }
        tracing::info!(
            date = %config.date,
            stage = %config.start_stage,
            topics = working.len(),
            "Working set resolved from store"
        );
        Ok(working)
    }

    /// Run one stage across the working set with bounded concurrency.
    /// Every task's outcome funnels back through this single writer before
    /// the manifest is touched.
    async fn run_stage(
        &self,
        kind: StageKind,
        working: &[Topic],
        config: &RunConfig,
        manifest: &mut RunManifest,
    ) -> Result<()> {
        let stage = self.registry.get(kind).ok_or_else(|| {
            PipelineError::Other(format!("no stage registered for '{kind}'"))
        })?;

        tracing::info!(stage = %kind, topics = working.len(), "Stage started");
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        let mut tasks: JoinSet<(Topic, StageOutcome)> = JoinSet::new();

        for topic in working.iter().cloned() {
            let stage = Arc::clone(&stage);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let config = config.clone();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_topic(stage, store, &config, &topic).await,
                    Err(_) => StageOutcome::Failure {
                        reason: FailureReason::Store("concurrency limiter closed".into()),
                    },
                };
                (topic, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (topic, outcome) = joined
                .map_err(|e| PipelineError::Other(format!("stage task failed to join: {e}")))?;
            match &outcome {
                StageOutcome::Success => {
                    tracing::info!(stage = %kind, topic = %topic.id, "Topic succeeded")
                }
                StageOutcome::Failure { reason } => {
                    tracing::warn!(stage = %kind, topic = %topic.id, reason = %reason, "Topic failed")
                }
            }
            manifest.record(&topic.id, &topic.title, kind, outcome);
        }
        Ok(())
    }

    async fn abort(&self, mut manifest: RunManifest, stage: StageKind) -> Result<RunReport> {
        tracing::error!(stage = %stage, "Run aborted: no topics remain");
        manifest.mark_aborted(stage);
        save_manifest(self.store.root(), &manifest).await?;
        Err(PipelineError::RunAborted { stage })
    }
}

/// Execute one stage for one topic: load inputs from the store, run under
/// the configured timeout, persist the output artifact. Every failure path
/// becomes a recorded outcome; nothing escapes as an error.
async fn run_topic(
    stage: Arc<dyn Stage>,
    store: Arc<ArtifactStore>,
    config: &RunConfig,
    topic: &Topic,
) -> StageOutcome {
    let fail = |reason: FailureReason| StageOutcome::Failure { reason };

    let mut inputs = ArtifactSet::new();
    for kind in stage.kind().input_kinds() {
        if *kind == ArtifactKind::Topic {
            inputs.insert(Artifact::Topic(topic.clone()));
            continue;
        }
        match store.get(*kind, config.date, &topic.id).await {
            Ok(artifact) => inputs.insert(artifact),
            Err(PipelineError::ArtifactNotFound { .. }) => {
                return fail(FailureReason::MissingInput(*kind));
            }
            Err(e) => return fail(FailureReason::Store(e.to_string())),
        }
    }

    let result = tokio::time::timeout(config.stage_timeout, stage.run(config, topic, &inputs)).await;
    match result {
        Err(_elapsed) => fail(FailureReason::Timeout),
        Ok(Err(reason)) => fail(reason),
        Ok(Ok(artifact)) => match store.put(config.date, &topic.id, &artifact).await {
            Ok(_) => StageOutcome::Success,
            Err(e) => fail(FailureReason::Store(e.to_string())),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
