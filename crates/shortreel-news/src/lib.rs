//! News collaborators: daily issue collection and article crawling.
//!
//! Both collaborators sit behind narrow async traits so the pipeline can be
//! driven by mocks in tests. The HTTP implementations own their endpoints,
//! keys, and rate behavior; the orchestrator never sees those concerns.

pub mod crawler;
pub mod issue_api;

pub use crawler::{ArticleCrawler, HttpCrawler};
pub use issue_api::{IssueRankingClient, IssueSource};
