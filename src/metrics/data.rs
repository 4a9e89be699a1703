//! Data structures for metric samples and their line-protocol form.

use crate::error::{Result, KitError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One (name, value) observation destined for the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Metric name, without any prefix
    pub name: String,
    /// Value already rendered as text (e.g. "42", "0.75")
    pub value: String,
}

impl Sample {
    /// Create a sample from anything that renders as a number.
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }

    /// Create a sample, rejecting names or values that would not survive the
    /// line protocol (empty, whitespace, non-ASCII).
    pub fn try_new(name: impl Into<String>, value: impl ToString) -> Result<Self> {
        let sample = Sample::new(name, value);
        sample.validate()?;
        Ok(sample)
    }

    /// Check that name and value are usable as line-protocol fields.
    pub fn validate(&self) -> Result<()> {
        check_field("name", &self.name)?;
        check_field("value", &self.value)
    }

    /// Full metric path, `prefix.name` when a non-empty prefix is given.
    pub fn metric_path(&self, prefix: Option<&str>) -> String {
        match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, self.name),
            _ => self.name.clone(),
        }
    }

    /// Stamp this sample, producing the line that goes on the wire.
    pub fn stamp(&self, prefix: Option<&str>, timestamp: i64) -> MetricLine {
        MetricLine {
            metric: self.metric_path(prefix),
            value: self.value.clone(),
            timestamp,
        }
    }
}

impl<N: Into<String>, V: ToString> From<(N, V)> for Sample {
    fn from((name, value): (N, V)) -> Self {
        Sample::new(name, value)
    }
}

impl FromStr for Sample {
    type Err = KitError;

    /// Parse the `name=value` form used on the command line.
    fn from_str(s: &str) -> Result<Self> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| KitError::parse_error(format!("expected name=value, got '{}'", s)))?;
        Sample::try_new(name.trim(), value.trim())
    }
}

/// A line-protocol field must be non-empty printable ASCII without spaces.
fn check_field(kind: &str, field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(KitError::parse_error(format!("metric {} is empty", kind)));
    }
    if !field.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(KitError::parse_error(format!(
            "metric {} '{}' must be ASCII without whitespace",
            kind,
            field.escape_debug()
        )));
    }
    Ok(())
}

/// A stamped sample in Graphite plaintext form: `metric value timestamp.`
///
/// The trailing period is part of the format and is kept both on the wire
/// and in the spool file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricLine {
    /// Metric path including any prefix
    pub metric: String,
    /// Value as text
    pub value: String,
    /// Seconds since the Unix epoch, assigned at relay time
    pub timestamp: i64,
}

impl MetricLine {
    /// Check that the line can be written and read back unchanged.
    pub fn validate(&self) -> Result<()> {
        check_field("path", &self.metric)?;
        check_field("value", &self.value)
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}.", self.metric, self.value, self.timestamp)
    }
}

impl FromStr for MetricLine {
    type Err = KitError;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let (Some(metric), Some(value), Some(stamp), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(KitError::parse_error(format!(
                "expected three fields in metric line '{}'",
                line
            )));
        };

        let timestamp = stamp
            .strip_suffix('.')
            .ok_or_else(|| {
                KitError::parse_error(format!("metric line '{}' lacks the trailing period", line))
            })?
            .parse::<i64>()
            .map_err(|e| KitError::parse_error(format!("bad timestamp in '{}': {}", line, e)))?;

        let line = MetricLine {
            metric: metric.to_string(),
            value: value.to_string(),
            timestamp,
        };
        line.validate()?;
        Ok(line)
    }
}
