//! QuizLens - question image lookup
//!
//! Scans a photographed or uploaded question, extracts its text, and ranks
//! matching questions from a reference knowledge store.

mod capture;
mod config;
mod error;
mod extraction;
mod matcher;
mod session;
mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::capture::ImageSource;
use crate::config::AppConfig;
use crate::extraction::{TesseractExtractor, TextExtractor};
use crate::matcher::QuestionMatcher;
use crate::session::{ScanSession, ScanState, SessionView};
use crate::store::{JsonFileStore, QuestionStore, SqliteStore};

/// QuizLens - scan a question image and look up known solutions
#[derive(Parser, Debug)]
#[command(name = "quizlens")]
#[command(about = "Scan a question image and rank matching known questions")]
struct Args {
    /// Image file to scan (JPEG or PNG)
    image: PathBuf,

    /// Question store: a .json file or a SQLite database (.db/.sqlite)
    #[arg(short, long)]
    store: PathBuf,

    /// Configuration file (defaults to the per-user config file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the minimum match confidence (0-100)
    #[arg(long)]
    min_confidence: Option<u8>,

    /// Override the maximum number of results
    #[arg(long)]
    max_results: Option<usize>,

    /// Abandon the attempt after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the session result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = load_or_create_config(args.config.as_deref());
    if let Some(min) = args.min_confidence {
        config.matcher.min_confidence = min;
    }
    if let Some(max) = args.max_results {
        config.matcher.max_results = max;
    }

    let store = open_store(&args.store)?;
    let matcher = QuestionMatcher::new(store.clone(), config.matcher.to_matcher_config());
    let source = ImageSource::with_config(config.scanner.to_image_source_config());
    let extractor = TesseractExtractor::new(&config.extraction.language);

    let data = std::fs::read(&args.image)
        .with_context(|| format!("failed to read image {}", args.image.display()))?;

    let mut session = ScanSession::new();
    let state = run_scan(
        &mut session,
        &source,
        &extractor,
        &matcher,
        data,
        args.timeout,
        config.extraction.retry_on_timeout,
    )
    .await;

    let view = session.view();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return match state {
            ScanState::Failed => bail!("scan failed"),
            _ => Ok(()),
        };
    }

    render(&view, store.as_ref())
}

/// Drive one scan to completion, retrying once on a recognition timeout when
/// the configuration asks for it. Retry policy lives here, outside the
/// session, which only exposes cancellation and re-acquisition.
async fn run_scan(
    session: &mut ScanSession,
    source: &ImageSource,
    extractor: &dyn TextExtractor,
    matcher: &QuestionMatcher,
    data: Vec<u8>,
    timeout_secs: Option<u64>,
    retry_on_timeout: bool,
) -> ScanState {
    let state = attempt(session, source, extractor, matcher, data.clone(), timeout_secs).await;

    let timed_out = match state {
        ScanState::Failed => session.error().map(|e| e.is_retryable()).unwrap_or(false),
        // Only our own deadline cancels this token, so Idle here means the
        // deadline fired.
        ScanState::Idle => timeout_secs.is_some(),
        _ => false,
    };

    if timed_out && retry_on_timeout {
        info!("recognition timed out, retrying once");
        return attempt(session, source, extractor, matcher, data, timeout_secs).await;
    }

    state
}

/// One acquire + submit pass under an optional deadline.
async fn attempt(
    session: &mut ScanSession,
    source: &ImageSource,
    extractor: &dyn TextExtractor,
    matcher: &QuestionMatcher,
    data: Vec<u8>,
    timeout_secs: Option<u64>,
) -> ScanState {
    if session.acquire(source, data) != ScanState::Capturing {
        return session.state();
    }

    if let Some(secs) = timeout_secs {
        let token = session.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            token.cancel();
        });
    }

    session.submit(extractor, matcher).await
}

/// Load configuration from the given path, the per-user config file, or
/// built-in defaults, in that order.
fn load_or_create_config(path: Option<&Path>) -> AppConfig {
    if let Some(path) = path {
        match config::load_config(path) {
            Ok(config) => {
                info!("loaded configuration from {}", path.display());
                return config;
            }
            Err(e) => {
                tracing::warn!("could not load {}: {e}; using defaults", path.display());
                return AppConfig::default();
            }
        }
    }

    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("loaded configuration from {}", config_path.display());
                return config;
            }
        }
    }

    info!("using default configuration");
    AppConfig::default()
}

/// Open the question store named on the command line, picking the backend by
/// file extension.
fn open_store(path: &Path) -> Result<Arc<dyn QuestionStore>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Arc::new(JsonFileStore::new(path))),
        Some("db") | Some("sqlite") | Some("sqlite3") => {
            Ok(Arc::new(SqliteStore::open(path)?))
        }
        _ => bail!(
            "unrecognized store {}: expected .json or .db/.sqlite",
            path.display()
        ),
    }
}

/// Print the finished session for a terminal reader.
fn render(view: &SessionView, store: &dyn QuestionStore) -> Result<()> {
    match view.state {
        ScanState::Presenting => {}
        ScanState::Idle => {
            println!("Scan cancelled before completing.");
            return Ok(());
        }
        _ => {
            bail!(
                "scan failed: {}",
                view.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if let Some(ref text) = view.extracted_text {
        println!("Extracted text:");
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            println!("  {}", line.trim());
        }
        println!();
    }

    if view.results.is_empty() {
        println!("No matching questions found.");
        return Ok(());
    }

    let snapshot = store.snapshot()?;
    println!("Matches:");
    for result in &view.results {
        let record = snapshot.iter().find(|r| r.id == result.question_id);
        match record {
            Some(record) => {
                println!(
                    "  [{:>3}%] {} ({})",
                    result.confidence, record.question, record.subject
                );
                println!("         Answer: {}", record.answer);
                if !record.explanation.is_empty() {
                    println!("         {}", record.explanation.replace('\n', "\n         "));
                }
            }
            None => {
                // Store swapped between matching and rendering; show the id.
                println!("  [{:>3}%] {}", result.confidence, result.question_id);
            }
        }
    }

    Ok(())
}
