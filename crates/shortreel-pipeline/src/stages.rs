//! The five per-topic stage adapters.
//!
//! Each adapter owns one collaborator trait object and translates between
//! the engine's artifact-level contract and the collaborator's domain call.
//! Collaborator errors become [`FailureReason::Collaborator`] here; nothing
//! a single topic does can abort the batch.

use std::sync::Arc;

use async_trait::async_trait;

use shortreel_media::{ImageGenerator, SpeechSynthesizer, Summarizer, VideoAssembler};
use shortreel_news::ArticleCrawler;
use shortreel_types::{
    Artifact, ArtifactKind, ArtifactSet, FailureReason, PipelineError, StageKind, Topic,
};

use crate::config::RunConfig;
use crate::stage::{Stage, StageRegistry, StageResult};

fn collaborator_failure(err: PipelineError) -> FailureReason {
    FailureReason::Collaborator(err.to_string())
}

/// Build a registry with the five per-topic stages wired to the given
/// collaborators.
pub fn default_registry(
    crawler: Arc<dyn ArticleCrawler>,
    summarizer: Arc<dyn Summarizer>,
    images: Arc<dyn ImageGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    assembler: Arc<dyn VideoAssembler>,
) -> StageRegistry {
    let mut registry = StageRegistry::new();
    registry.register(Arc::new(CrawlStage { crawler }));
    registry.register(Arc::new(SummarizeStage { summarizer }));
    registry.register(Arc::new(ImageStage { images }));
    registry.register(Arc::new(SpeechStage { speech }));
    registry.register(Arc::new(VideoStage { assembler }));
    registry
}

// ---------------------------------------------------------------------------
// Crawling
// ---------------------------------------------------------------------------

pub struct CrawlStage {
    pub crawler: Arc<dyn ArticleCrawler>,
}

#[async_trait]
impl Stage for CrawlStage {
    fn kind(&self) -> StageKind {
        StageKind::Crawling
    }

    async fn run(&self, config: &RunConfig, topic: &Topic, _inputs: &ArtifactSet) -> StageResult {
        let articles = self
            .crawler
            .crawl(topic, config.per_topic_docs)
            .await
            .map_err(collaborator_failure)?;
        // Zero articles is a valid collaborator outcome, but nothing
        // downstream can work with it.
        if articles.is_empty() {
            return Err(FailureReason::NoContent);
        }
        Ok(Artifact::Articles(articles))
    }
}

// ---------------------------------------------------------------------------
// Summarization
// ---------------------------------------------------------------------------

pub struct SummarizeStage {
    pub summarizer: Arc<dyn Summarizer>,
}

#[async_trait]
impl Stage for SummarizeStage {
    fn kind(&self) -> StageKind {
        StageKind::Summarization
    }

    async fn run(&self, _config: &RunConfig, topic: &Topic, inputs: &ArtifactSet) -> StageResult {
        let articles = inputs
            .articles()
            .ok_or(FailureReason::MissingInput(ArtifactKind::Articles))?;
        let summary = self
            .summarizer
            .summarize(topic, articles)
            .await
            .map_err(collaborator_failure)?;
        if summary.parts.is_empty() {
            return Err(FailureReason::NoContent);
        }
        Ok(Artifact::Summary(summary))
    }
}

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

pub struct ImageStage {
    pub images: Arc<dyn ImageGenerator>,
}

#[async_trait]
impl Stage for ImageStage {
    fn kind(&self) -> StageKind {
        StageKind::ImageGeneration
    }

    async fn run(&self, _config: &RunConfig, topic: &Topic, inputs: &ArtifactSet) -> StageResult {
        let summary = inputs
            .summary()
            .ok_or(FailureReason::MissingInput(ArtifactKind::Summary))?;
        let asset = self
            .images
            .generate(topic, summary)
            .await
            .map_err(collaborator_failure)?;
        if asset.images.is_empty() {
            return Err(FailureReason::NoContent);
        }
        Ok(Artifact::Images(asset))
    }
}

// ---------------------------------------------------------------------------
// Speech generation
// ---------------------------------------------------------------------------

pub struct SpeechStage {
    pub speech: Arc<dyn SpeechSynthesizer>,
}

#[async_trait]
impl Stage for SpeechStage {
    fn kind(&self) -> StageKind {
        StageKind::SpeechGeneration
    }

    async fn run(&self, config: &RunConfig, topic: &Topic, inputs: &ArtifactSet) -> StageResult {
        let summary = inputs
            .summary()
            .ok_or(FailureReason::MissingInput(ArtifactKind::Summary))?;
        let asset = self
            .speech
            .synthesize(topic, summary, config.top_text.as_deref())
            .await
            .map_err(collaborator_failure)?;
        Ok(Artifact::Audio(asset))
    }
}

// ---------------------------------------------------------------------------
// Video assembly
// ---------------------------------------------------------------------------

pub struct VideoStage {
    pub assembler: Arc<dyn VideoAssembler>,
}

#[async_trait]
impl Stage for VideoStage {
    fn kind(&self) -> StageKind {
        StageKind::VideoAssembly
    }

    async fn run(&self, config: &RunConfig, topic: &Topic, inputs: &ArtifactSet) -> StageResult {
        let images = inputs
            .images()
            .ok_or(FailureReason::MissingInput(ArtifactKind::Images))?;
        let audio = inputs
            .audio()
            .ok_or(FailureReason::MissingInput(ArtifactKind::Audio))?;
        let asset = self
            .assembler
            .assemble(topic, images, audio, config.top_text.as_deref())
            .await
            .map_err(collaborator_failure)?;
        Ok(Artifact::Video(asset))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
