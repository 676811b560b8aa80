//! Image-generation collaborator: one illustration per summary part.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use shortreel_types::{ImageAsset, PipelineError, Result, Summary, Topic};

/// Produces the ordered still images for a topic's video.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, topic: &Topic, summary: &Summary) -> Result<ImageAsset>;
}

// ---------------------------------------------------------------------------
// PanelImageGenerator
// ---------------------------------------------------------------------------

const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "standard";

/// Images-API client generating one cartoon-style panel per narration part.
pub struct PanelImageGenerator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    out_dir: PathBuf,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u8,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: String,
}

impl PanelImageGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            out_dir: out_dir.into(),
        }
    }

    fn err(message: impl Into<String>) -> PipelineError {
        PipelineError::Collaborator {
            name: "image_generator",
            message: message.into(),
        }
    }

    async fn generate_panel(&self, prompt: String) -> Result<Vec<u8>> {
        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            quality: IMAGE_QUALITY,
            response_format: "b64_json",
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::err(format!("HTTP {status}: {text}")));
        }

        let parsed: ImageResponse = resp.json().await.map_err(|e| Self::err(e.to_string()))?;
        let datum = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Self::err("empty data in response".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(datum.b64_json.as_bytes())
            .map_err(|e| Self::err(format!("invalid base64 image payload: {e}")))
    }
}

/// Prompt for one panel: a clean single-scene illustration of one narration
/// part, with the usual anti-artifact constraints for news imagery.
fn panel_prompt(part: &str) -> String {
    format!(
        "A single 1024x1024 cartoon-style news illustration. Clean simple \
         background, consistent lighting, crisp details, smooth line art, \
         natural faces and hands, no watermarks, no written text of any kind. \
         Depict the concrete meaning of this scene: {}",
        sanitize_for_prompt(part)
    )
}

/// Strip quote characters that tend to confuse image prompts.
fn sanitize_for_prompt(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[async_trait]
impl ImageGenerator for PanelImageGenerator {
    async fn generate(&self, topic: &Topic, summary: &Summary) -> Result<ImageAsset> {
        if summary.parts.is_empty() {
            return Err(Self::err("summary has no parts to illustrate".to_string()));
        }

        tokio::fs::create_dir_all(&self.out_dir).await?;

        let mut images = Vec::with_capacity(summary.parts.len());
        for (idx, part) in summary.parts.iter().enumerate() {
            let bytes = self.generate_panel(panel_prompt(part)).await?;
            let path = self
                .out_dir
                .join(format!("{}_{}_{:02}.png", topic.date, topic.id, idx + 1));
            tokio::fs::write(&path, &bytes).await?;
            tracing::debug!(topic = %topic.id, path = %path.display(), "Panel image written");
            images.push(path);
        }

        tracing::info!(topic = %topic.id, count = images.len(), "Generated images");
        Ok(ImageAsset {
            topic_id: topic.id.clone(),
            images,
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
    fn prompt_contains_scene_and_constraints() {
        let p = panel_prompt("A minister announces the new budget.");
        assert!(p.contains("A minister announces the new budget."));
        assert!(p.contains("no written text"));
    }

    #[test]
    fn sanitize_strips_quotes() {
        assert_eq!(
            sanitize_for_prompt(" \"quoted\" and \u{2018}curly\u{2019} "),
            "quoted and curly"
        );
    }

    #[test]
    fn image_request_shape() {
        let req = ImageRequest {
            model: "img-model",
            prompt: "scene".into(),
            n: 1,
            size: IMAGE_SIZE,
            quality: IMAGE_QUALITY,
            response_format: "b64_json",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["size"], "1024x1024");
        assert_eq!(json["quality"], "standard");
        assert_eq!(json["response_format"], "b64_json");
    }

    #[test]
    fn image_response_parses() {
        let json = r#"{"data": [{"b64_json": "aGVsbG8="}]}"#;
        let parsed: ImageResponse = serde_json::from_str(json).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(parsed.data[0].b64_json.as_bytes())
            .unwrap();
        assert_eq!(bytes, b"hello");
    }
}
