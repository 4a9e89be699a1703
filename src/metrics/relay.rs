//! Best-effort relay of metric samples to a Graphite plaintext collector.
//!
//! Each call loads the spool backlog, stamps the new samples, and tries a
//! single connection to the collector. Delivered entries clear the spool;
//! undelivered ones (backlog included) are written back to it for the next
//! run. Nothing is raised to the caller.

use crate::metrics::{data::Sample, spool::Spool};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Configuration for the Graphite relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Collector host name or address
    pub server: String,
    /// Collector plaintext port
    pub port: u16,
    /// Optional prefix prepended to every metric name
    pub prefix: Option<String>,
    /// Spool file for undelivered lines
    pub spool_path: PathBuf,
    /// Upper bound on the connection attempt
    pub connect_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: crate::DEFAULT_GRAPHITE_SERVER.to_string(),
            port: crate::DEFAULT_GRAPHITE_PORT,
            prefix: None,
            spool_path: PathBuf::from(crate::DEFAULT_SPOOL_PATH),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RelayConfig {
    /// Create a relay configuration for the given collector.
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the metric prefix. An empty prefix means none.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Set the spool file path.
    pub fn with_spool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.spool_path = path.into();
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Collector address as `host:port`.
    pub fn collector_address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

/// What happened to the entries handled by one relay call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Entries were written to the collector
    Sent { entries: usize },
    /// Collector unreachable; entries were written to the spool
    Queued { entries: usize },
}

/// Relay for Graphite plaintext metrics with a spool-file fallback.
#[derive(Debug, Clone)]
pub struct GraphiteRelay {
    config: RelayConfig,
    spool: Spool,
}

impl GraphiteRelay {
    pub fn new(config: RelayConfig) -> Self {
        let spool = Spool::new(config.spool_path.clone());
        Self { config, spool }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Relay `samples` stamped with the current wall-clock second.
    pub async fn relay(&self, samples: &[Sample]) -> RelayOutcome {
        self.relay_at(samples, chrono::Utc::now().timestamp()).await
    }

    /// Relay `samples` stamped with `timestamp` (seconds since the epoch).
    pub async fn relay_at(&self, samples: &[Sample], timestamp: i64) -> RelayOutcome {
        let mut entries = self.spool.load().await;
        if !entries.is_empty() {
            debug!(
                "Previously unwritten graphite data is {} entries long.",
                entries.len()
            );
        }

        let prefix = self.config.prefix.as_deref();
        for sample in samples {
            let line = sample.stamp(prefix, timestamp);
            match line.validate() {
                Ok(()) => entries.push(line.to_string()),
                Err(e) => error!("Discarding sample {:?}: {}", sample.name, e),
            }
        }

        match self.connect().await {
            Ok(mut stream) => {
                info!(collector = %self.config.collector_address(), "Connected to graphite.");
                match send(&mut stream, &entries).await {
                    Ok(()) => {
                        info!("Wrote {} entries.", entries.len());
                        if let Err(e) = self.spool.clear().await {
                            warn!(path = %self.spool.path().display(), error = %e, "Failed to clear spool file");
                        }
                        return RelayOutcome::Sent {
                            entries: entries.len(),
                        };
                    }
                    Err(e) => error!("ERROR couldn't write to graphite: {}", e),
                }
            }
            Err(e) => error!("ERROR couldn't connect to graphite: {}", e),
        }

        error!("Queueing data for later writing...");
        if let Err(e) = self.spool.store(&entries).await {
            error!(path = %self.spool.path().display(), error = %e, "Failed to write spool file");
        }
        RelayOutcome::Queued {
            entries: entries.len(),
        }
    }

    async fn connect(&self) -> io::Result<TcpStream> {
        let target = (self.config.server.as_str(), self.config.port);
        match timeout(self.config.connect_timeout, TcpStream::connect(target)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!(
                    "connection to {} timed out after {:?}",
                    self.config.collector_address(),
                    self.config.connect_timeout
                ),
            )),
        }
    }
}

/// Write all entries as one newline-terminated blob. No acknowledgement is read.
async fn send(stream: &mut TcpStream, entries: &[String]) -> io::Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut payload = entries.join("\n");
    payload.push('\n');
    stream.write_all(payload.as_bytes()).await?;
    stream.shutdown().await
}

/// Relay `samples` to `server:port`, spooling to `spool_path` or the default
/// spool file.
pub async fn write_graphite(
    samples: &[Sample],
    prefix: Option<&str>,
    server: &str,
    port: u16,
    spool_path: Option<&Path>,
) -> RelayOutcome {
    let config = RelayConfig::new(server, port)
        .with_prefix(prefix.unwrap_or_default())
        .with_spool_path(spool_path.unwrap_or(Path::new(crate::DEFAULT_SPOOL_PATH)));
    GraphiteRelay::new(config).relay(samples).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn collector() -> (u16, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = String::new();
            socket.read_to_string(&mut buf).await.unwrap();
            buf
        });
        (port, handle)
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn relay_for(port: u16, dir: &tempfile::TempDir) -> GraphiteRelay {
        GraphiteRelay::new(
            RelayConfig::new("127.0.0.1", port)
                .with_prefix("host1")
                .with_spool_path(dir.path().join("spool.txt"))
                .with_connect_timeout(Duration::from_secs(1)),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.collector_address(), "127.0.0.1:2003");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.prefix.is_none());
        assert_eq!(config.with_prefix("").prefix, None);
    }

    #[tokio::test]
    async fn test_sends_backlog_then_new_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spool.txt"), "host1.old 1 1699999999.").unwrap();
        let (port, received) = collector().await;

        let relay = relay_for(port, &dir);
        let outcome = relay
            .relay_at(&[Sample::new("cpu", 42)], 1_700_000_000)
            .await;

        assert_eq!(outcome, RelayOutcome::Sent { entries: 2 });
        assert_eq!(
            received.await.unwrap(),
            "host1.old 1 1699999999.\nhost1.cpu 42 1700000000.\n"
        );
        assert!(!dir.path().join("spool.txt").exists());
    }

    #[tokio::test]
    async fn test_failed_connection_spools_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spool.txt"), "host1.old 1 1699999999.").unwrap();
        let port = closed_port().await;

        let relay = relay_for(port, &dir);
        let outcome = relay
            .relay_at(&[Sample::new("cpu", 42), Sample::new("mem", 7)], 1_700_000_000)
            .await;

        assert_eq!(outcome, RelayOutcome::Queued { entries: 3 });
        let spooled = std::fs::read_to_string(dir.path().join("spool.txt")).unwrap();
        assert_eq!(
            spooled,
            "host1.old 1 1699999999.\nhost1.cpu 42 1700000000.\nhost1.mem 7 1700000000."
        );
    }

    #[tokio::test]
    async fn test_invalid_samples_never_reach_spool() {
        let dir = tempfile::tempdir().unwrap();
        let port = closed_port().await;
        let relay = relay_for(port, &dir);

        let outcome = relay
            .relay_at(&[Sample::new("disk free", 1), Sample::new("disk", 2)], 100)
            .await;
        assert_eq!(outcome, RelayOutcome::Queued { entries: 1 });

        relay.relay_at(&[Sample::new("x", 3)], 200).await;
        let spooled = std::fs::read_to_string(dir.path().join("spool.txt")).unwrap();
        assert_eq!(spooled, "host1.disk 2 100.\nhost1.x 3 200.");
    }

    #[tokio::test]
    async fn test_empty_batch_success_clears_spool() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spool.txt"), "").unwrap();
        let (port, received) = collector().await;

        let outcome = relay_for(port, &dir).relay_at(&[], 100).await;

        assert_eq!(outcome, RelayOutcome::Sent { entries: 0 });
        assert_eq!(received.await.unwrap(), "");
        assert!(!dir.path().join("spool.txt").exists());
    }

    #[tokio::test]
    async fn test_write_failure_after_connect_spools_entries() {
        let dir = tempfile::tempdir().unwrap();
        // Far more than the socket buffers hold, so the write cannot finish
        // before the peer resets the connection.
        let value = "7".repeat(1024);
        let backlog: Vec<String> = (0..32 * 1024)
            .map(|i| format!("host1.big{} {} 50.", i, value))
            .collect();
        std::fs::write(dir.path().join("spool.txt"), backlog.join("\n")).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let outcome = relay_for(port, &dir)
            .relay_at(&[Sample::new("cpu", 1)], 100)
            .await;

        assert_eq!(
            outcome,
            RelayOutcome::Queued {
                entries: backlog.len() + 1
            }
        );
        let spooled = std::fs::read_to_string(dir.path().join("spool.txt")).unwrap();
        assert!(spooled.starts_with(&backlog[0]));
        assert!(spooled.ends_with("\nhost1.cpu 1 100."));
    }

    #[tokio::test]
    async fn test_write_graphite_uses_given_spool() {
        let dir = tempfile::tempdir().unwrap();
        let spool = dir.path().join("graphite_data.txt");

        let outcome = write_graphite(
            &[Sample::new("cpu", 42)],
            Some("host1"),
            "127.0.0.1",
            closed_port().await,
            Some(spool.as_path()),
        )
        .await;
        assert_eq!(outcome, RelayOutcome::Queued { entries: 1 });
        assert!(std::fs::read_to_string(&spool)
            .unwrap()
            .starts_with("host1.cpu 42 "));

        let (port, received) = collector().await;
        let outcome = write_graphite(&[], None, "127.0.0.1", port, Some(spool.as_path())).await;
        assert_eq!(outcome, RelayOutcome::Sent { entries: 1 });
        assert!(received.await.unwrap().starts_with("host1.cpu 42 "));
        assert!(!spool.exists());
    }

    #[tokio::test]
    async fn test_empty_batch_failure_writes_empty_spool() {
        let dir = tempfile::tempdir().unwrap();
        let port = closed_port().await;

        let outcome = relay_for(port, &dir).relay_at(&[], 1_700_000_000).await;

        assert_eq!(outcome, RelayOutcome::Queued { entries: 0 });
        let spooled = std::fs::read_to_string(dir.path().join("spool.txt")).unwrap();
        assert_eq!(spooled, "");
    }
}
