//! Video-assembly collaborator: images + narration → vertical short video.
//!
//! Rendering is delegated to an ffmpeg subprocess with a bounded timeout;
//! each image is shown for an equal share of the narration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use shortreel_types::{AudioAsset, ImageAsset, PipelineError, Result, Topic, VideoAsset};

/// Assembles the final video for a topic.
#[async_trait]
pub trait VideoAssembler: Send + Sync {
    async fn assemble(
        &self,
        topic: &Topic,
        images: &ImageAsset,
        audio: &AudioAsset,
        top_text: Option<&str>,
    ) -> Result<VideoAsset>;
}

// ---------------------------------------------------------------------------
// FfmpegAssembler
// ---------------------------------------------------------------------------

const VIDEO_WIDTH: u32 = 720;
const VIDEO_HEIGHT: u32 = 1280;
const VIDEO_FPS: u32 = 24;

/// Guard for audio files ffprobe cannot read; keeps the slideshow sane.
const MIN_SEGMENT_SECS: f64 = 1.0;

pub struct FfmpegAssembler {
    ffmpeg: String,
    out_dir: PathBuf,
    timeout: Duration,
}

impl FfmpegAssembler {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            out_dir: out_dir.into(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn err(message: impl Into<String>) -> PipelineError {
        PipelineError::Collaborator {
            name: "ffmpeg",
            message: message.into(),
        }
    }
}

/// Escape a string for use inside an ffmpeg drawtext filter value.
fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            ':' => out.push_str("\\:"),
            '%' => out.push_str("\\%"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the full ffmpeg argument list for a slideshow of `images` over
/// `audio`, optionally with a centered overlay caption near the top.
fn build_ffmpeg_args(
    images: &[PathBuf],
    audio: &Path,
    per_image_secs: f64,
    top_text: Option<&str>,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into()];

    for image in images {
        args.push("-loop".into());
        args.push("1".into());
        args.push("-t".into());
        args.push(format!("{per_image_secs:.3}"));
        args.push("-i".into());
        args.push(image.to_string_lossy().into_owned());
    }
    args.push("-i".into());
    args.push(audio.to_string_lossy().into_owned());

    let mut filter = String::new();
    for i in 0..images.len() {
        filter.push_str(&format!(
            "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1[v{i}];",
            w = VIDEO_WIDTH,
            h = VIDEO_HEIGHT,
        ));
    }
    for i in 0..images.len() {
        filter.push_str(&format!("[v{i}]"));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=0[vcat]", images.len()));

    let out_label = if let Some(text) = top_text {
        filter.push_str(&format!(
            ";[vcat]drawtext=text='{}':fontcolor=white:fontsize=56:\
             box=1:boxcolor=black@0.5:boxborderw=12:x=(w-text_w)/2:y=64[vout]",
            escape_drawtext(text)
        ));
        "[vout]"
    } else {
        "[vcat]"
    };

    args.push("-filter_complex".into());
    args.push(filter);
    args.push("-map".into());
    args.push(out_label.into());
    args.push("-map".into());
    args.push(format!("{}:a", images.len()));
    args.push("-r".into());
    args.push(VIDEO_FPS.to_string());
    args.push("-pix_fmt".into());
    args.push("yuv420p".into());
    args.push("-shortest".into());
    args.push(output.to_string_lossy().into_owned());
    args
}

#[async_trait]
impl VideoAssembler for FfmpegAssembler {
    async fn assemble(
        &self,
        topic: &Topic,
        images: &ImageAsset,
        audio: &AudioAsset,
        top_text: Option<&str>,
    ) -> Result<VideoAsset> {
        if images.images.is_empty() {
            return Err(Self::err("no images to assemble".to_string()));
        }

        tokio::fs::create_dir_all(&self.out_dir).await?;
        let output = self.out_dir.join(format!("{}_{}.mp4", topic.date, topic.id));

        let per_image_secs =
            (audio.duration_secs / images.images.len() as f64).max(MIN_SEGMENT_SECS);
        let args = build_ffmpeg_args(
            &images.images,
            &audio.audio,
            per_image_secs,
            top_text,
            &output,
        );

        tracing::debug!(topic = %topic.id, "Running: {} {}", self.ffmpeg, args.join(" "));

        let mut child = tokio::process::Command::new(&self.ffmpeg)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| Self::err(format!("failed to spawn ffmpeg: {e}")))?;

        let mut stderr = child.stderr.take();

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if !status.success() {
                    let mut buf = Vec::new();
                    if let Some(ref mut err) = stderr {
                        use tokio::io::AsyncReadExt;
                        let _ = err.read_to_end(&mut buf).await;
                    }
                    let tail: String = String::from_utf8_lossy(&buf)
                        .lines()
                        .rev()
                        .take(5)
                        .collect::<Vec<_>>()
                        .join(" | ");
                    return Err(Self::err(format!(
                        "ffmpeg exited with {}: {tail}",
                        status.code().unwrap_or(-1)
                    )));
                }
            }
            _ = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                return Err(Self::err(format!(
                    "ffmpeg timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        }

        tracing::info!(topic = %topic.id, path = %output.display(), "Assembled video");
        Ok(VideoAsset {
            topic_id: topic.id.clone(),
            video: output,
        })
    }
}

// ---------------------------------------------------------------------------
// probe_duration: shared ffprobe helper
// ---------------------------------------------------------------------------

/// Read a media file's duration in seconds via ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let err = |m: String| PipelineError::Collaborator {
        name: "ffprobe",
        message: m,
    };

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| err(format!("failed to spawn ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(err(format!(
            "ffprobe exited with {}",
            output.status.code().unwrap_or(-1)
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    text.trim()
        .parse::<f64>()
        .map_err(|e| err(format!("unparseable duration '{}': {e}", text.trim())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
