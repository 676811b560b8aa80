//! Summarization collaborator: articles → part-wise narration summary.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use shortreel_types::{Article, PipelineError, Result, Summary, Topic};

/// Condenses a topic's articles into one narration-ready [`Summary`].
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, topic: &Topic, articles: &[Article]) -> Result<Summary>;
}

// ---------------------------------------------------------------------------
// ChatSummarizer: chat-completions implementation
// ---------------------------------------------------------------------------

/// Number of narration parts a summary is split into. Each part becomes one
/// image panel and one beat of the narration.
pub const SUMMARY_PARTS: usize = 4;

/// Target spoken length of the whole summary.
pub const TARGET_DURATION_SECS: u32 = 45;

/// Cap on article text sent per request, to stay inside context limits.
const MAX_INPUT_CHARS: usize = 12_000;

pub struct ChatSummarizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    part_prefix: Regex,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl ChatSummarizer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            part_prefix: Regex::new(r"(?i)^\s*(?:part|파트)?\s*\d+\s*[.:)]\s*").expect("static regex"),
        }
    }

    fn err(message: impl Into<String>) -> PipelineError {
        PipelineError::Collaborator {
            name: "summarizer",
            message: message.into(),
        }
    }

    fn build_prompt(&self, topic: &Topic, articles: &[Article]) -> String {
        let mut body = String::new();
        for article in articles {
            if body.len() >= MAX_INPUT_CHARS {
                break;
            }
            let remaining = MAX_INPUT_CHARS - body.len();
            let take: String = article.text.chars().take(remaining).collect();
            body.push_str(&take);
            body.push_str("\n\n");
        }
        format!(
            "News topic: {title}\n\n\
             Summarize the following coverage as exactly {parts} short narration \
             lines for a {secs}-second news video. One line per part, numbered \
             1..{parts}, plain declarative sentences, no headlines, no quotes, \
             no attribution boilerplate.\n\n{body}",
            title = topic.title,
            parts = SUMMARY_PARTS,
            secs = TARGET_DURATION_SECS,
        )
    }

    /// Split model output into narration parts, stripping list numbering and
    /// "Part N:" prefixes. Keeps at most [`SUMMARY_PARTS`] non-empty lines.
    fn split_parts(&self, content: &str) -> Vec<String> {
        content
            .lines()
            .map(|line| self.part_prefix.replace(line.trim(), "").trim().to_string())
            .filter(|line| !line.is_empty())
            .take(SUMMARY_PARTS)
            .collect()
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, topic: &Topic, articles: &[Article]) -> Result<Summary> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You write tight, factual narration for short-form news videos."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: self.build_prompt(topic, articles),
                },
            ],
            temperature: 0.3,
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

        let parsed: ChatResponse = resp.json().await.map_err(|e| Self::err(e.to_string()))?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| Self::err("empty choices in response".to_string()))?;

        let parts = self.split_parts(&content);
        if parts.is_empty() {
            return Err(Self::err("model returned no usable summary lines".to_string()));
        }

        tracing::info!(topic = %topic.id, parts = parts.len(), "Summarized topic");
        Ok(Summary {
            topic_id: topic.id.clone(),
            text: parts.join(" "),
            parts,
            target_duration_secs: TARGET_DURATION_SECS,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn summarizer() -> ChatSummarizer {
        ChatSummarizer::new("http://example.test/v1/chat/completions", "key", "test-model")
    }

    fn topic() -> Topic {
        Topic {
            id: "t01".into(),
            title: "Example issue".into(),
            date: NaiveDate::from_ymd_opt(2025, 2, 6).unwrap(),
            source_count: 1,
        }
    }

    #[test]
    fn split_parts_strips_numbering_styles() {
        let s = summarizer();
        let content = "1. First beat.\nPart 2: Second beat.\n3) Third beat.\n\n4: Fourth beat.";
        let parts = s.split_parts(content);
        assert_eq!(
            parts,
            vec!["First beat.", "Second beat.", "Third beat.", "Fourth beat."]
        );
    }

    #[test]
    fn split_parts_caps_at_summary_parts() {
        let s = summarizer();
        let content = "1. a\n2. b\n3. c\n4. d\n5. e\n6. f";
        assert_eq!(s.split_parts(content).len(), SUMMARY_PARTS);
    }

    #[test]
    fn split_parts_drops_blank_lines() {
        let s = summarizer();
        assert!(s.split_parts("\n\n   \n").is_empty());
    }

    #[test]
    fn prompt_truncates_long_input() {
        let s = summarizer();
        let article = Article {
            topic_id: "t01".into(),
            url: "https://news.example/a".into(),
            text: "x".repeat(MAX_INPUT_CHARS * 2),
            crawled_at: Utc::now(),
        };
        let prompt = s.build_prompt(&topic(), &[article]);
        assert!(prompt.len() < MAX_INPUT_CHARS + 1_000);
        assert!(prompt.contains("Example issue"));
    }

    #[test]
    fn chat_response_parses() {
        let json = r#"{"choices": [{"message": {"content": "1. One.\n2. Two."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "1. One.\n2. Two.");
    }
}
