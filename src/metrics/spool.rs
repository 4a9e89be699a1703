//! Local flat-file queue of metric lines that could not be delivered.

use crate::metrics::data::MetricLine;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Spool file holding one `metric value timestamp.` line per entry.
///
/// Not safe against concurrent writers; callers are expected to be a single
/// periodic job.
#[derive(Debug, Clone)]
pub struct Spool {
    path: PathBuf,
}

impl Spool {
    /// Create a spool backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backlog. An absent or unreadable file is an empty backlog.
    pub async fn load(&self) -> Vec<String> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Spool file unreadable, treating as empty");
                return Vec::new();
            }
        };

        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| match line.parse::<MetricLine>() {
                Ok(_) => true,
                Err(e) => {
                    warn!(path = %self.path.display(), "Dropping malformed spool entry: {}", e);
                    false
                }
            })
            .map(str::to_string)
            .collect()
    }

    /// Replace the spool contents with `entries`, newline-joined.
    pub async fn store(&self, entries: &[String]) -> std::io::Result<()> {
        tokio::fs::write(&self.path, entries.join("\n")).await
    }

    /// Remove the spool file after a successful delivery.
    pub async fn clear(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cleared spool file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
