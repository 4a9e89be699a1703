//! cronkit - command-line front end for the helper library.
//!
//! Each subcommand wraps one helper so shell scripts and crontabs can use
//! them directly.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cronkit::{
    humanize, write_graphite, FetchConfig, LogConfig, LogGuard, RelayOutcome, Sample, UrlFetcher,
    DEFAULT_FETCH_ATTEMPTS, DEFAULT_GRAPHITE_PORT, DEFAULT_GRAPHITE_SERVER,
    DEFAULT_USER_AGENT_PATH,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, Level};
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "cronkit")]
#[command(about = "Helpers for periodic personal-automation jobs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log file; enables the file + stdout + stderr sinks
    #[arg(long)]
    logfile: Option<String>,

    /// Enable verbose logging (without --logfile)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging (without --logfile)
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL and print the trimmed body
    Fetch(FetchArgs),

    /// Print a number with a binary unit prefix
    Humanize(HumanizeArgs),

    /// Send name=value samples to Graphite, spooling on failure
    Relay(RelayArgs),

    /// Post a message to the Telegram chat in a credentials file
    Notify(NotifyArgs),
}

#[derive(Args)]
struct FetchArgs {
    url: String,

    /// Retries after the first attempt
    #[arg(long, default_value_t = DEFAULT_FETCH_ATTEMPTS)]
    attempts: u32,

    /// Extra request header as "name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// User-Agent file used when no headers are given
    #[arg(long, default_value = DEFAULT_USER_AGENT_PATH)]
    user_agent_file: String,
}

#[derive(Args)]
struct HumanizeArgs {
    #[arg(allow_negative_numbers = true)]
    value: f64,

    #[arg(long, default_value = "bps")]
    suffix: String,
}

#[derive(Args)]
struct RelayArgs {
    /// Samples as name=value
    #[arg(required = true)]
    samples: Vec<Sample>,

    #[arg(long, default_value = DEFAULT_GRAPHITE_SERVER)]
    server: String,

    #[arg(long, default_value_t = DEFAULT_GRAPHITE_PORT)]
    port: u16,

    /// Prefix prepended to every metric name
    #[arg(long)]
    prefix: Option<String>,

    /// Spool file for undelivered lines
    #[arg(long)]
    spool: Option<String>,
}

#[derive(Args)]
struct NotifyArgs {
    /// JSON file with bot_id and chat_id
    #[arg(long)]
    creds: String,

    message: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = init_logging(&cli)?;

    match &cli.command {
        Commands::Fetch(args) => fetch_command(args).await?,
        Commands::Humanize(args) => println!("{}", humanize(args.value, &args.suffix)),
        Commands::Relay(args) => relay_command(args).await,
        Commands::Notify(args) => cronkit::telegram(&args.creds, &args.message)
            .await
            .context("failed to send notification")?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<Option<LogGuard>> {
    if let Some(logfile) = &cli.logfile {
        let guard = LogConfig::new(logfile)
            .init()
            .context("failed to set up logging")?;
        return Ok(Some(guard));
    }

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(console_filter(cli))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(None)
}

/// Level chosen by -v/-d, overridable through `RUST_LOG`.
fn console_filter(cli: &Cli) -> EnvFilter {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

fn parse_headers(raw: &[String]) -> anyhow::Result<Option<HeaderMap>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let mut headers = HeaderMap::new();
    for header in raw {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header '{}' is not of the form name: value", header))?;
        headers.insert(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    Ok(Some(headers))
}

async fn fetch_command(args: &FetchArgs) -> anyhow::Result<()> {
    let config = FetchConfig::default()
        .with_attempts(args.attempts)
        .with_user_agent_path(&args.user_agent_file);
    let fetcher = UrlFetcher::new(config)?;
    let body = fetcher.get(&args.url, parse_headers(&args.headers)?).await?;
    println!("{}", body);
    Ok(())
}

async fn relay_command(args: &RelayArgs) {
    let outcome = write_graphite(
        &args.samples,
        args.prefix.as_deref(),
        &args.server,
        args.port,
        args.spool.as_deref().map(Path::new),
    )
    .await;

    match outcome {
        RelayOutcome::Sent { entries } => debug!(entries, "Relay delivered"),
        RelayOutcome::Queued { entries } => debug!(entries, "Relay spooled"),
    }
}
