use anyhow::{Context, Result};
use castframe::app::App;
use castframe::config::{Config, API_KEY_ENV};
use castframe::feeds::neynar::NeynarFetcher;
use castframe::logging;
use castframe::terminal::{self, TerminalGuard};
use clap::{Parser, Subcommand};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "castframe", version, about = "Recent Farcaster casts in a terminal frame")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refresh interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Number of casts to fetch per refresh
    #[arg(long)]
    limit: Option<usize>,

    /// Log filter, e.g. "debug" or "castframe=trace"
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    if let Some(Command::Init) = cli.command {
        Config::write_default(&config_path)?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    }

    let mut config = Config::load(&config_path)?;
    if let Some(interval) = cli.interval {
        config.poll.interval_secs = interval;
    }
    if let Some(limit) = cli.limit {
        config.poll.batch_size = limit;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    let log_file = logging::init_logging(&config.logging)?;
    tracing::info!(config = %config_path.display(), log = %log_file.display(), "starting castframe");

    let api_key = config.api_key().with_context(|| {
        format!(
            "No Neynar API key. Set {} or neynar.api_key in {}",
            API_KEY_ENV,
            config_path.display()
        )
    })?;
    let fetcher = Arc::new(NeynarFetcher::with_base_url(
        api_key,
        config.neynar.base_url.clone(),
    ));

    let mut app = App::new(&config, fetcher);

    terminal::setup_panic_hook();
    let mut guard = TerminalGuard::enter().context("Failed to set up terminal")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let result = app.run(&mut terminal).await;
    guard.restore();

    if let Err(e) = &result {
        tracing::error!(error = %e, "castframe exited with error");
    }
    result
}
