//! Media collaborators: summarization, image generation, speech synthesis,
//! and video assembly.
//!
//! Each collaborator is an async trait with one HTTP- or subprocess-backed
//! implementation. Binary outputs (images, audio, video) are written into a
//! directory owned by the collaborator; the artifacts persisted by the
//! pipeline only reference those files by path.

pub mod image;
pub mod speech;
pub mod summarize;
pub mod video;

pub use image::{ImageGenerator, PanelImageGenerator};
pub use speech::{HttpSpeechSynthesizer, SpeechSynthesizer};
pub use summarize::{ChatSummarizer, Summarizer};
pub use video::{probe_duration, FfmpegAssembler, VideoAssembler};
