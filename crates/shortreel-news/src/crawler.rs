//! Article crawling collaborator: resolve a topic to full-text articles.
//!
//! The HTTP implementation asks a document-search API for the topic's
//! articles. When the API already carries enough body text it is used
//! directly; otherwise the article page is fetched and the body extracted
//! from the HTML.

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use shortreel_types::{Article, PipelineError, Result, Topic};

/// Resolves a topic to zero or more full-text articles. Zero results is a
/// valid outcome, not an error.
#[async_trait]
pub trait ArticleCrawler: Send + Sync {
    async fn crawl(&self, topic: &Topic, per_topic_docs: usize) -> Result<Vec<Article>>;
}

// ---------------------------------------------------------------------------
// HttpCrawler
// ---------------------------------------------------------------------------

/// Body text shorter than this is treated as a teaser and the article page
/// is crawled for the full text instead.
const MIN_REASONABLE_LEN: usize = 800;

/// Shortest body text worth keeping when the page crawl also comes up short.
const MIN_LEN_TO_SAVE: usize = 500;

pub struct HttpCrawler {
    http: reqwest::Client,
    search_endpoint: String,
    access_key: String,
    noise_line: Regex,
    whitespace: Regex,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    access_key: &'a str,
    argument: SearchArgument<'a> ,
}

#[derive(Serialize)]
struct SearchArgument<'a> {
    query: &'a str,
    published_at: String,
    return_size: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    return_object: Option<SearchReturn>,
}

#[derive(Deserialize)]
struct SearchReturn {
    #[serde(default)]
    documents: Vec<SearchDocument>,
}

#[derive(Deserialize)]
struct SearchDocument {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl HttpCrawler {
    pub fn new(search_endpoint: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            search_endpoint: search_endpoint.into(),
            access_key: access_key.into(),
            noise_line: Regex::new(
                r"(?i)(copyright|all rights reserved|\u{00a9}|무단\s*전재|재배포\s*금지|기자\s*=|\S+@\S+\.\S+)",
            )
            .expect("static regex"),
            whitespace: Regex::new(r"\s+").expect("static regex"),
        }
    }

    fn err(message: impl Into<String>) -> PipelineError {
        PipelineError::Collaborator {
            name: "crawler",
            message: message.into(),
        }
    }

    async fn search(&self, topic: &Topic, size: usize) -> Result<Vec<SearchDocument>> {
        let body = SearchRequest {
            access_key: &self.access_key,
            argument: SearchArgument {
                query: &topic.title,
                published_at: topic.date.format("%Y-%m-%d").to_string(),
                return_size: size,
            },
        };

        let resp = self
            .http
            .post(&self.search_endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Self::err(format!("search HTTP {status}")));
        }

        let parsed: SearchResponse = resp.json().await.map_err(|e| Self::err(e.to_string()))?;
        Ok(parsed.return_object.map(|r| r.documents).unwrap_or_default())
    }

    async fn fetch_page_text(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Self::err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::err(format!("fetch HTTP {} for {url}", resp.status())));
        }
        let html = resp.text().await.map_err(|e| Self::err(e.to_string()))?;
        Ok(extract_body_text(&html))
    }

    fn cleanup(&self, text: &str) -> String {
        let kept: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !self.noise_line.is_match(line))
            .collect();
        self.whitespace.replace_all(&kept.join(" "), " ").trim().to_string()
    }
}

/// Pull readable body text out of an article page. Tries the usual article
/// containers first, then falls back to paragraph text from the whole page.
fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let container_selectors = [
        "article",
        "#articleBody",
        ".article_body",
        "#newsct_article",
        ".news_view",
        "#article-view-content-div",
    ];
    for sel in container_selectors {
        let selector = match Selector::parse(sel) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(node) = document.select(&selector).next() {
            let text: String = node.text().collect::<Vec<_>>().join("\n");
            if !text.trim().is_empty() {
                return text;
            }
        }
    }

    // Fallback: every paragraph on the page.
    let p = Selector::parse("p").expect("static selector");
    document
        .select(&p)
        .map(|n| n.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ArticleCrawler for HttpCrawler {
    async fn crawl(&self, topic: &Topic, per_topic_docs: usize) -> Result<Vec<Article>> {
        let documents = self.search(topic, per_topic_docs).await?;
        let mut articles = Vec::new();

        for doc in documents {
            if articles.len() >= per_topic_docs {
                break;
            }
            let url = match doc.url {
                Some(u) if !u.is_empty() => u,
                _ => continue,
            };

            let api_text = self.cleanup(doc.content.as_deref().unwrap_or(""));
            let text = if api_text.chars().count() >= MIN_REASONABLE_LEN {
                api_text
            } else {
                // Teaser-length API content: crawl the page for the full body.
                match self.fetch_page_text(&url).await {
                    Ok(page) => {
                        let page_text = self.cleanup(&page);
                        if page_text.chars().count() > api_text.chars().count() {
                            page_text
                        } else {
                            api_text
                        }
                    }
                    Err(e) => {
                        tracing::debug!(url = %url, error = %e, "Page crawl failed, keeping API text");
                        api_text
                    }
                }
            };

            if text.chars().count() < MIN_LEN_TO_SAVE {
                tracing::debug!(url = %url, len = text.chars().count(), "Dropping short article");
                continue;
            }

            articles.push(Article {
                topic_id: topic.id.clone(),
                url,
                text,
                crawled_at: Utc::now(),
            });
        }

        tracing::info!(topic = %topic.id, count = articles.len(), "Crawled articles");
        Ok(articles)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_prefers_article_container() {
        let html = r#"
            <html><body>
              <nav><p>Menu item</p></nav>
              <article>Real body text here.</article>
              <footer><p>Footer junk</p></footer>
            </body></html>
        "#;
        let text = extract_body_text(html);
        assert!(text.contains("Real body text here."));
        assert!(!text.contains("Menu item"));
    }

    #[test]
    fn extract_falls_back_to_paragraphs() {
        let html = "<html><body><p>First.</p><p>Second.</p></body></html>";
        let text = extract_body_text(html);
        assert!(text.contains("First."));
        assert!(text.contains("Second."));
    }

    #[test]
    fn cleanup_strips_noise_lines_and_collapses_whitespace() {
        let crawler = HttpCrawler::new("http://example.test/search", "key");
        let raw = "A real    sentence.\nCopyright 2025 Example News. All rights reserved.\nreporter@example.com\nAnother real one.";
        let cleaned = crawler.cleanup(raw);
        assert_eq!(cleaned, "A real sentence. Another real one.");
    }

    #[test]
    fn search_response_parses_documents() {
        let json = r#"{
            "return_object": {
                "documents": [
                    {"url": "https://news.example/a", "content": "body"},
                    {"url": null}
                ]
            }
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        let docs = parsed.return_object.unwrap().documents;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].url.as_deref(), Some("https://news.example/a"));
        assert!(docs[1].url.is_none());
    }
}
