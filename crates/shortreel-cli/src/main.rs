//! CLI binary for running the shortreel news-to-video pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use shortreel_media::{ChatSummarizer, FfmpegAssembler, HttpSpeechSynthesizer, PanelImageGenerator};
use shortreel_news::{HttpCrawler, IssueRankingClient};
use shortreel_pipeline::{default_registry, ArtifactStore, PipelineRunner, RunParams};
use shortreel_types::{PipelineError, StageKind, StageOutcome};

#[derive(Parser)]
#[command(name = "shortreel", version, about = "Daily news to short-form video pipeline")]
struct Cli {
    /// Run date (YYYY-MM-DD, default: today)
    #[arg(long)]
    date: Option<chrono::NaiveDate>,

    /// Maximum number of topics to process
    #[arg(long, default_value = "5")]
    max_topics: usize,

    /// Articles to crawl per topic
    #[arg(long, default_value = "1")]
    per_topic_docs: usize,

    /// Caption and spoken lead-in added to every video
    #[arg(long)]
    top_text: Option<String>,

    /// Start mid-pipeline, reusing artifacts already in the store
    /// (collection, crawling, summarization, image_generation,
    /// speech_generation, video_assembly)
    #[arg(long)]
    skip_to: Option<String>,

    /// Artifact store root directory
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Maximum concurrent topics within a stage
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Per-topic stage timeout in seconds
    #[arg(long, default_value = "180")]
    timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn required_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("environment variable {key} must be set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config = RunParams {
        date: cli.date,
        max_topics: Some(cli.max_topics),
        per_topic_docs: Some(cli.per_topic_docs),
        top_text: cli.top_text,
        skip_to: cli.skip_to,
        concurrency: Some(cli.concurrency),
        stage_timeout_secs: Some(cli.timeout_secs),
    }
    .resolve()?;

    let store = ArtifactStore::new(&cli.output_dir);
    let runner = build_runner(&store, &cli.output_dir)?;

    println!("Run date: {}", config.date);
    println!("Store: {}", cli.output_dir.display());
    if config.start_stage != StageKind::Collection {
        println!("Resuming from: {}", config.start_stage);
    }

    let report = match runner.run(&config).await {
        Ok(report) => report,
        Err(PipelineError::RunAborted { stage }) => {
            eprintln!("Run aborted at {stage}: every topic failed");
            eprintln!("Manifest: {}", manifest_path(&cli.output_dir, config.date));
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    // Per-stage summary
    println!("\nRun finished");
    for stage in config.start_stage.stages_from() {
        let succeeded = report
            .manifest
            .topics
            .values()
            .filter(|rec| {
                rec.stages
                    .get(stage)
                    .map(StageOutcome::is_success)
                    .unwrap_or(false)
            })
            .count();
        let attempted = report
            .manifest
            .topics
            .values()
            .filter(|rec| rec.stages.contains_key(stage))
            .count();
        println!("  {stage}: {succeeded}/{attempted}");
    }

    if !report.failures.is_empty() {
        println!("\nFailures:");
        for failure in &report.failures {
            println!("  {failure}");
        }
    }

    println!("\nCompleted videos: {}", report.completed.len());
    for id in &report.completed {
        let title = report
            .manifest
            .topics
            .get(id)
            .map(|rec| rec.title.as_str())
            .unwrap_or("");
        println!("  {id}  {title}");
    }
    println!("Manifest: {}", manifest_path(&cli.output_dir, config.date));

    Ok(())
}

fn manifest_path(root: &std::path::Path, date: chrono::NaiveDate) -> String {
    root.join(format!("manifest_{date}.json")).display().to_string()
}

/// Wire the HTTP and subprocess collaborators from the environment and
/// build a runner over them.
fn build_runner(store: &ArtifactStore, output_dir: &std::path::Path) -> anyhow::Result<PipelineRunner> {
    let news_key = required_env("SHORTREEL_NEWS_ACCESS_KEY")?;
    let issue_url = required_env("SHORTREEL_ISSUE_API_URL")?;
    let search_url = required_env("SHORTREEL_SEARCH_API_URL")?;
    let providers: Vec<String> = env_or("SHORTREEL_NEWS_PROVIDERS", "")
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();

    let openai_key = required_env("SHORTREEL_OPENAI_API_KEY")?;
    let chat_url = env_or(
        "SHORTREEL_CHAT_API_URL",
        "https://api.openai.com/v1/chat/completions",
    );
    let chat_model = env_or("SHORTREEL_CHAT_MODEL", "gpt-4o-mini");
    let image_url = env_or(
        "SHORTREEL_IMAGE_API_URL",
        "https://api.openai.com/v1/images/generations",
    );
    let image_model = env_or("SHORTREEL_IMAGE_MODEL", "dall-e-3");

    let tts_url = required_env("SHORTREEL_TTS_API_URL")?;
    let tts_key = required_env("SHORTREEL_TTS_API_KEY")?;
    let tts_voice = env_or("SHORTREEL_TTS_VOICE", "ko-KR-Neural2-A");
    let tts_language = env_or("SHORTREEL_TTS_LANGUAGE", "ko-KR");

    let issues = Arc::new(IssueRankingClient::new(issue_url, news_key.clone(), providers));
    let registry = default_registry(
        Arc::new(HttpCrawler::new(search_url, news_key)),
        Arc::new(ChatSummarizer::new(chat_url, openai_key.clone(), chat_model)),
        Arc::new(PanelImageGenerator::new(
            image_url,
            openai_key,
            image_model,
            output_dir.join("images"),
        )),
        Arc::new(HttpSpeechSynthesizer::new(
            tts_url,
            tts_key,
            tts_voice,
            tts_language,
            output_dir.join("tts"),
        )),
        Arc::new(FfmpegAssembler::new(output_dir.join("videos"))),
    );

    Ok(PipelineRunner::new(store.clone(), issues, registry))
}
