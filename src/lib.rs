//! # cronkit - helpers for periodic personal-automation jobs
//!
//! A handful of independent utilities meant to be imported together by
//! small cron-driven programs.
//!
//! ## Features
//!
//! - **Metrics relay**: push `name value timestamp.` lines to a Graphite
//!   plaintext collector, spooling them to disk when it is unreachable
//! - **URL fetch**: GET with a short timeout and linear retry backoff
//! - **Humanize**: render byte and bit-rate counts as `2Kbps`, `5GB`, ...
//! - **Logging**: file + stdout + stderr sinks with a compact line format
//! - **Notify**: post a message to a Telegram chat
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cronkit::{GraphiteRelay, RelayConfig, Sample};
//!
//! #[tokio::main]
//! async fn main() {
//!     let relay = GraphiteRelay::new(RelayConfig::new("graphite.lan", 2003).with_prefix("pi"));
//!     relay.relay(&[Sample::new("cpu.temp", 48.2)]).await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod humanize;
pub mod logging;
pub mod metrics;
pub mod notify;

// Re-export public API
pub use config::read_user_agent;
pub use error::{KitError, Result};
pub use fetch::{get_url, FetchConfig, UrlFetcher};
pub use humanize::{humanize, humanize_bps};
pub use logging::{LogConfig, LogGuard};
pub use metrics::{
    data::{MetricLine, Sample},
    relay::{write_graphite, GraphiteRelay, RelayConfig, RelayOutcome},
    spool::Spool,
};
pub use notify::{telegram, BotCredentials, TelegramNotifier};

/// Default Graphite host
pub const DEFAULT_GRAPHITE_SERVER: &str = "127.0.0.1";

/// Default Graphite plaintext port
pub const DEFAULT_GRAPHITE_PORT: u16 = 2003;

/// Where undelivered metric lines are kept between runs
pub const DEFAULT_SPOOL_PATH: &str = "/opt/graphite_data.txt";

/// File holding the User-Agent for fetches without explicit headers
pub const DEFAULT_USER_AGENT_PATH: &str = "/opt/user_agent.txt";

/// Retries after the first fetch attempt
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 5;
