//! The per-topic stage seam and the registry the engine resolves stages from.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use shortreel_types::{Artifact, ArtifactSet, FailureReason, StageKind, Topic};

use crate::config::RunConfig;

/// Outcome of one stage invocation for one topic. A `FailureReason` here is
/// data, not a fatal error: the engine records it in the manifest and moves
/// on to the next topic.
pub type StageResult = std::result::Result<Artifact, FailureReason>;

/// One per-topic pipeline stage.
///
/// The engine assembles `inputs` from the store according to
/// [`StageKind::input_kinds`] before each call and persists the returned
/// artifact afterward; implementations never touch the store directly.
/// Collection is not a `Stage`: it discovers topics rather than transforming
/// one, so the engine drives the issue-source collaborator itself.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, config: &RunConfig, topic: &Topic, inputs: &ArtifactSet) -> StageResult;
}

/// Registry mapping the five per-topic stage kinds to their implementations.
#[derive(Default)]
pub struct StageRegistry {
    stages: HashMap<StageKind, Arc<dyn Stage>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage under its own kind, replacing any previous entry.
    pub fn register(&mut self, stage: Arc<dyn Stage>) {
        self.stages.insert(stage.kind(), stage);
    }

    pub fn get(&self, kind: StageKind) -> Option<Arc<dyn Stage>> {
        self.stages.get(&kind).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopStage(StageKind);

    #[async_trait]
    impl Stage for NoopStage {
        fn kind(&self) -> StageKind {
            self.0
        }

        async fn run(&self, _: &RunConfig, topic: &Topic, _: &ArtifactSet) -> StageResult {
            Ok(Artifact::Topic(topic.clone()))
        }
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = StageRegistry::new();
        registry.register(Arc::new(NoopStage(StageKind::Crawling)));

        assert!(registry.get(StageKind::Crawling).is_some());
        assert!(registry.get(StageKind::Summarization).is_none());
    }

    #[test]
    fn register_replaces_same_kind() {
        let mut registry = StageRegistry::new();
        registry.register(Arc::new(NoopStage(StageKind::Crawling)));
        registry.register(Arc::new(NoopStage(StageKind::Crawling)));
        assert!(registry.get(StageKind::Crawling).is_some());
    }
}
