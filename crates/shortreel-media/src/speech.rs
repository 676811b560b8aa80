//! Speech-synthesis collaborator: summary → narration MP3.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};

use shortreel_types::{AudioAsset, PipelineError, Result, Summary, Topic};

/// Synthesizes a topic's narration audio. `top_text`, when present, is
/// spoken as a lead-in before the summary.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        topic: &Topic,
        summary: &Summary,
        top_text: Option<&str>,
    ) -> Result<AudioAsset>;
}

// ---------------------------------------------------------------------------
// HttpSpeechSynthesizer
// ---------------------------------------------------------------------------

/// Fallback narration pace used when ffprobe is unavailable.
const FALLBACK_WORDS_PER_SEC: f64 = 2.5;

pub struct HttpSpeechSynthesizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    voice_name: String,
    language_code: String,
    speaking_rate: f64,
    out_dir: PathBuf,
    part_prefix: Regex,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
    speaking_rate: f64,
    pitch: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        voice_name: impl Into<String>,
        language_code: impl Into<String>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            voice_name: voice_name.into(),
            language_code: language_code.into(),
            speaking_rate: 1.0,
            out_dir: out_dir.into(),
            part_prefix: Regex::new(r"(?im)^\s*(?:part|파트)\s*\d+\s*:\s*").expect("static regex"),
        }
    }

    fn err(message: impl Into<String>) -> PipelineError {
        PipelineError::Collaborator {
            name: "speech_synthesizer",
            message: message.into(),
        }
    }

    /// The spoken script: optional lead-in plus the summary parts with any
    /// "Part N:" labels removed.
    fn narration_text(&self, summary: &Summary, top_text: Option<&str>) -> String {
        let mut lines = Vec::new();
        if let Some(lead) = top_text {
            if !lead.trim().is_empty() {
                lines.push(lead.trim().to_string());
            }
        }
        for part in &summary.parts {
            let cleaned = self.part_prefix.replace_all(part, "").trim().to_string();
            if !cleaned.is_empty() {
                lines.push(cleaned);
            }
        }
        lines.join(" ")
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(
        &self,
        topic: &Topic,
        summary: &Summary,
        top_text: Option<&str>,
    ) -> Result<AudioAsset> {
        let text = self.narration_text(summary, top_text);
        if text.is_empty() {
            return Err(Self::err("nothing to narrate".to_string()));
        }

        let request = SynthesizeRequest {
            input: SynthesisInput { text: &text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                name: &self.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: self.speaking_rate,
                pitch: 0.0,
            },
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
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::err(format!("HTTP {status}: {body}")));
        }

        let parsed: SynthesizeResponse = resp.json().await.map_err(|e| Self::err(e.to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| Self::err(format!("invalid base64 audio payload: {e}")))?;

        tokio::fs::create_dir_all(&self.out_dir).await?;
        let path = self.out_dir.join(format!("{}_{}.mp3", topic.date, topic.id));
        tokio::fs::write(&path, &bytes).await?;

        let duration_secs = match crate::video::probe_duration(&path).await {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!(error = %e, "ffprobe unavailable, estimating duration");
                text.split_whitespace().count() as f64 / FALLBACK_WORDS_PER_SEC
            }
        };

        tracing::info!(topic = %topic.id, secs = duration_secs, "Synthesized narration");
        Ok(AudioAsset {
            topic_id: topic.id.clone(),
            audio: path,
            duration_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn synth() -> HttpSpeechSynthesizer {
        HttpSpeechSynthesizer::new(
            "http://example.test/text:synthesize",
            "key",
            "en-US-Test-Voice",
            "en-US",
            "/tmp/tts",
        )
    }

    fn summary(parts: Vec<&str>) -> Summary {
        Summary {
            topic_id: "t01".into(),
            text: parts.join(" "),
            parts: parts.into_iter().map(String::from).collect(),
            target_duration_secs: 45,
        }
    }

    #[test]
    fn narration_strips_part_labels() {
        let s = synth();
        let text = s.narration_text(&summary(vec!["Part 1: Alpha.", "파트 2: Beta."]), None);
        assert_eq!(text, "Alpha. Beta.");
    }

    #[test]
    fn narration_prepends_top_text() {
        let s = synth();
        let text = s.narration_text(&summary(vec!["Body."]), Some("Today's briefing."));
        assert_eq!(text, "Today's briefing. Body.");
    }

    #[test]
    fn narration_skips_blank_parts() {
        let s = synth();
        let text = s.narration_text(&summary(vec!["", "  ", "Only line."]), None);
        assert_eq!(text, "Only line.");
    }

    #[test]
    fn synthesize_request_uses_camel_case() {
        let req = SynthesizeRequest {
            input: SynthesisInput { text: "hi" },
            voice: VoiceSelection {
                language_code: "en-US",
                name: "en-US-Test-Voice",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: 1.0,
                pitch: 0.0,
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["voice"]["languageCode"], "en-US");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
        assert_eq!(json["audioConfig"]["speakingRate"], 1.0);
    }

    #[test]
    fn synthesize_response_parses_audio_content() {
        let parsed: SynthesizeResponse =
            serde_json::from_str(r#"{"audioContent": "aGVsbG8="}"#).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(parsed.audio_content.as_bytes())
            .unwrap();
        assert_eq!(bytes, b"hello");
    }
}
