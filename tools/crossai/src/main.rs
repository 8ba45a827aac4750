use anyhow::{Context, Result, bail};
use capture::config::CaptureConfig;
use capture::inject::format_for_injection;
use capture::service::ContextService;
use capture::store::{FileKv, KvStore, TurnStore};
use capture::summarize::HttpSummarizer;
use capture::usage::UsageLimiter;
use clap::{Parser, Subcommand};
use crossai_types::UsageVerdict;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "crossai", about = "Inspect and manage captured CrossAI context")]
struct Cli {
    /// Store file to use instead of CROSSAI_STORE_PATH
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List conversation URLs with stored turns
    List,
    /// Number of stored turns for a conversation
    Count { url: String },
    /// Print each stored turn with its number and title
    Show { url: String },
    /// Remove every stored turn for a conversation (the last summary is kept)
    Clear { url: String },
    /// Print the context block that would be injected
    Context { url: String },
    /// Print the last summary stored for a conversation
    Summary { url: String },
    /// Show the remaining weekly summary quota
    Usage,
    /// Summarize a conversation through the backend (consumes quota)
    Summarize { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = CaptureConfig::from_env()?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    tracing::debug!(path = ?config.store_path, "using store");

    let kv: Arc<dyn KvStore> = Arc::new(FileKv::new(config.store_path.clone()));
    let mut out = std::io::stdout().lock();
    run(cli.command, kv, &config, &mut out).await
}

async fn run(
    command: Commands,
    kv: Arc<dyn KvStore>,
    config: &CaptureConfig,
    out: &mut impl Write,
) -> Result<()> {
    let store = TurnStore::new(kv.clone());

    match command {
        Commands::List => {
            for url in store.urls().await? {
                let count = store.stored_count(&url).await?;
                writeln!(out, "{count:>4}  {url}")?;
            }
        }
        Commands::Count { url } => {
            writeln!(out, "{}", store.stored_count(&url).await?)?;
        }
        Commands::Show { url } => {
            let turns = store.turns(&url).await?;
            if turns.is_empty() {
                writeln!(out, "no stored turns for {url}")?;
            }
            for (i, turn) in turns.iter().enumerate() {
                let label = turn
                    .platform()
                    .map(|p| p.label())
                    .unwrap_or("Unknown");
                writeln!(out, "{:>3}. [{label}] {}", i + 1, turn.title())?;
            }
        }
        Commands::Clear { url } => {
            store.clear(&url).await?;
            writeln!(out, "cleared {url}")?;
        }
        Commands::Context { url } => {
            let turns = store.turns(&url).await?;
            writeln!(out, "{}", format_for_injection(&turns))?;
        }
        Commands::Summary { url } => match store.last_summary(&url).await? {
            Some(summary) => writeln!(out, "{summary}")?,
            None => writeln!(out, "no summary stored for {url}")?,
        },
        Commands::Usage => {
            let limiter = UsageLimiter::new(kv, config.weekly_quota);
            let verdict = limiter.peek().await?;
            writeln!(out, "{}", describe_usage(&verdict))?;
        }
        Commands::Summarize { url } => {
            let service = ContextService::new(
                store,
                UsageLimiter::new(kv, config.weekly_quota),
                Arc::new(HttpSummarizer::new(config.summarizer_url.clone())),
            );
            let (reply, summary) = service.refresh_summary(&url).await;
            let Some(summary) = summary else {
                let reason = reply.error.unwrap_or_else(|| "unknown error".to_string());
                match reply.reset_at.filter(|_| reply.remaining == Some(0)) {
                    Some(reset_at) => bail!("{reason} (resets at {})", format_reset(reset_at)),
                    None => bail!("{reason}"),
                }
            };
            writeln!(out, "{summary}")?;
            if let Some(remaining) = reply.remaining {
                writeln!(out, "\n({remaining} summaries left this week)")?;
            }
        }
    }
    out.flush().context("flush output")?;
    Ok(())
}

fn describe_usage(verdict: &UsageVerdict) -> String {
    format!(
        "{} summaries left this week; window resets at {}",
        verdict.remaining,
        format_reset(verdict.reset_at)
    )
}

fn format_reset(reset_at: i64) -> String {
    chrono::DateTime::from_timestamp_millis(reset_at)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| reset_at.to_string())
}
