//! Metric samples and their delivery to a Graphite-style collector.
//!
//! This module provides the sample and line-protocol types, the spool file
//! used as a local queue for undelivered lines, and the relay that ties them
//! together.

pub mod data;
pub mod relay;
pub mod spool;

// Re-export commonly used items
pub use data::{MetricLine, Sample};
pub use relay::{write_graphite, GraphiteRelay, RelayConfig, RelayOutcome};
pub use spool::Spool;
