//! Pipeline orchestrator for the shortreel news-to-video system.
//!
//! Drives the six fixed stages (collection, crawling, summarization, image
//! generation, speech generation, video assembly) over a per-day batch of
//! topics. Stage outputs are threaded through a filesystem [`ArtifactStore`];
//! a [`RunManifest`](shortreel_types::RunManifest) records per-topic outcomes
//! and is persisted after every stage. A run can start mid-pipeline via
//! skip-to, deriving its working set from the artifacts already on disk.

pub mod config;
pub mod engine;
pub mod manifest;
pub mod stage;
pub mod stages;
pub mod store;

pub use config::{RunConfig, RunParams};
pub use engine::{PipelineRunner, RunReport};
pub use manifest::{load_manifest, save_manifest};
pub use stage::{Stage, StageRegistry, StageResult};
pub use stages::{default_registry, CrawlStage, ImageStage, SpeechStage, SummarizeStage, VideoStage};
pub use store::ArtifactStore;
