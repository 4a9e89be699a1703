//! Three-sink logging setup for cron-driven jobs.
//!
//! - everything goes to a log file;
//! - DEBUG and INFO lines go to stdout;
//! - WARN and above go to stderr, so cron mails them.
//!
//! Lines look like `I2024-01-31_13:05:09 relay.rs:120]  Wrote 3 entries.`

use crate::error::{KitError, Result};
use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::{filter_fn, LevelFilter},
    fmt::{
        format::{FormatEvent, FormatFields, Writer},
        FmtContext,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// Default filter directive, overridable through `RUST_LOG`.
pub const DEFAULT_LOG_FILTER: &str = "debug,hyper=info,hyper_util=info,reqwest=info,rustls=info,h2=info";

/// Event format: level initial, local timestamp, source location, message.
#[derive(Debug, Clone, Copy, Default)]
pub struct CronFormat;

impl CronFormat {
    fn level_initial(level: &Level) -> char {
        match *level {
            Level::ERROR => 'E',
            Level::WARN => 'W',
            Level::INFO => 'I',
            Level::DEBUG => 'D',
            Level::TRACE => 'T',
        }
    }
}

impl<S, N> FormatEvent<S, N> for CronFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let file = meta
            .file()
            .and_then(|f| Path::new(f).file_name())
            .and_then(|f| f.to_str())
            .unwrap_or("?");

        write!(
            writer,
            "{}{} {}:{}]  ",
            Self::level_initial(meta.level()),
            Local::now().format("%Y-%m-%d_%H:%M:%S"),
            file,
            meta.line().unwrap_or(0)
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Logging configuration. Build once at process start and keep the returned
/// [`LogGuard`] alive until exit.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// File receiving every event
    pub logfile: PathBuf,
    /// Whether the stdout/stderr sinks are attached
    pub console: bool,
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl LogConfig {
    pub fn new(logfile: impl Into<PathBuf>) -> Self {
        Self {
            logfile: logfile.into(),
            console: true,
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Attach or detach the stdout/stderr sinks.
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    pub fn with_filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = directive.into();
        self
    }

    /// Build the subscriber without installing it.
    pub fn build(&self) -> Result<(impl Subscriber + Send + Sync + 'static, LogGuard)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.logfile)?;
        let (file_writer, file_guard) = tracing_appender::non_blocking(file);

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .map_err(|e| KitError::logging_error(format!("invalid filter directive: {}", e)))?;

        let file_layer = tracing_subscriber::fmt::layer()
            .event_format(CronFormat)
            .with_ansi(false)
            .with_writer(file_writer);

        let stdout_layer = self.console.then(|| {
            tracing_subscriber::fmt::layer()
                .event_format(CronFormat)
                .with_ansi(false)
                .with_writer(std::io::stdout)
                .with_filter(filter_fn(|meta| {
                    matches!(*meta.level(), Level::DEBUG | Level::INFO)
                }))
        });

        let stderr_layer = self.console.then(|| {
            tracing_subscriber::fmt::layer()
                .event_format(CronFormat)
                .with_ansi(false)
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::WARN)
        });

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(stdout_layer)
            .with(stderr_layer);

        let guard = LogGuard {
            logfile: self.logfile.clone(),
            _file_guard: file_guard,
        };
        Ok((subscriber, guard))
    }

    /// Build and install the subscriber as the process-wide default.
    pub fn init(&self) -> Result<LogGuard> {
        let (subscriber, guard) = self.build()?;
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| KitError::logging_error(format!("failed to set global subscriber: {}", e)))?;
        Ok(guard)
    }
}

/// Keeps the file sink alive; pending lines are flushed when it is dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    logfile: PathBuf,
    _file_guard: WorkerGuard,
}

impl LogGuard {
    pub fn logfile(&self) -> &Path {
        &self.logfile
    }
}

impl fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogGuard")
            .field("logfile", &self.logfile)
            .finish_non_exhaustive()
    }
}
