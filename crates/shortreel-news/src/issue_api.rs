//! Daily issue-ranking collaborator: one external query per run.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shortreel_types::{PipelineError, Result, Topic};

/// Source of the day's top news issues.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Return up to `max_topics` topics for `date`, most newsworthy first.
    async fn top_issues(&self, date: NaiveDate, max_topics: usize) -> Result<Vec<Topic>>;
}

// ---------------------------------------------------------------------------
// IssueRankingClient: HTTP implementation
// ---------------------------------------------------------------------------

/// Client for an issue-ranking API: a single POST returning the day's
/// clustered topics, optionally filtered to a set of news providers.
pub struct IssueRankingClient {
    http: reqwest::Client,
    endpoint: String,
    access_key: String,
    providers: Vec<String>,
}

#[derive(Serialize)]
struct IssueRequest<'a> {
    access_key: &'a str,
    argument: IssueArgument<'a>,
}

#[derive(Serialize)]
struct IssueArgument<'a> {
    date: String,
    provider: &'a [String],
}

#[derive(Deserialize)]
struct IssueResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    return_object: Option<ReturnObject>,
}

#[derive(Deserialize)]
struct ReturnObject {
    #[serde(default)]
    topics: Vec<RawIssue>,
}

#[derive(Deserialize)]
struct RawIssue {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    topic_rank: Option<u32>,
    #[serde(default)]
    news_cluster: Vec<serde_json::Value>,
}

impl IssueRankingClient {
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        providers: Vec<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            providers,
        }
    }

    fn err(message: impl Into<String>) -> PipelineError {
        PipelineError::Collaborator {
            name: "issue_ranking",
            message: message.into(),
        }
    }
}

/// Normalize raw API issues into ranked [`Topic`] records, dropping entries
/// without a title or with an already-seen rank, keeping at most `max_topics`.
fn normalize_issues(date: NaiveDate, raw: Vec<RawIssue>, max_topics: usize) -> Vec<Topic> {
    let mut seen = std::collections::BTreeSet::new();
    let mut topics = Vec::new();
    for (i, issue) in raw.into_iter().enumerate() {
        if topics.len() == max_topics {
            break;
        }
        let Some(title) = issue.topic.filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        let rank = issue.topic_rank.unwrap_or(i as u32 + 1);
        let id = format!("t{rank:02}");
        if !seen.insert(id.clone()) {
            tracing::warn!(id = %id, title = %title.trim(), "Dropping issue with duplicate rank");
            continue;
        }
        topics.push(Topic {
            id,
            title: title.trim().to_string(),
            date,
            source_count: issue.news_cluster.len(),
        });
    }
    topics
}

#[async_trait]
impl IssueSource for IssueRankingClient {
    async fn top_issues(&self, date: NaiveDate, max_topics: usize) -> Result<Vec<Topic>> {
        let body = IssueRequest {
            access_key: &self.access_key,
            argument: IssueArgument {
                date: date.format("%Y-%m-%d").to_string(),
                provider: &self.providers,
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::err(format!("HTTP {status}: {text}")));
        }

        let parsed: IssueResponse = resp.json().await.map_err(|e| Self::err(e.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(Self::err(format!("API error: {error}")));
        }

        let raw = parsed.return_object.map(|ro| ro.topics).unwrap_or_default();
        let topics = normalize_issues(date, raw, max_topics);
        tracing::info!(date = %date, count = topics.len(), "Collected news issues");
        Ok(topics)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
