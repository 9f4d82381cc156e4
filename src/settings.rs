//! Query settings consumed by the fan-out planner.
//!
//! Only the handful of fields the planner reads or rewrites live here. Durations
//! are kept as milliseconds so the structures round-trip through TOML unchanged.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FanoutError, Result};

/// Resource ceilings applied to a single query.
///
/// A ceiling is unset when absent or zero; read them through the accessors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Upper bound on query execution time in milliseconds.
    pub max_execution_time_ms: Option<u64>,
    /// Sustained network bandwidth ceiling in bytes per second.
    pub max_network_bandwidth: Option<u64>,
    /// Total bytes a query may send or receive over the network.
    pub max_network_bytes: Option<u64>,
}

impl Limits {
    /// Execution time limit, if one is configured.
    pub fn max_execution_time(&self) -> Option<Duration> {
        self.max_execution_time_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Bandwidth ceiling in bytes per second, if one is configured.
    pub fn network_bandwidth(&self) -> Option<u64> {
        self.max_network_bandwidth.filter(|v| *v > 0)
    }

    /// Total byte ceiling, if one is configured.
    pub fn network_bytes(&self) -> Option<u64> {
        self.max_network_bytes.filter(|v| *v > 0)
    }

    /// Returns true when any network ceiling requires a throttler.
    pub fn throttles_network(&self) -> bool {
        self.network_bandwidth().is_some() || self.network_bytes().is_some()
    }
}

/// Settings snapshot for one distributed query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum worker threads used for remote shards. Zero collapses all remote
    /// shards onto one multiplexed stream.
    pub max_distributed_processing_threads: u64,
    /// How long a query may wait in a server queue, in milliseconds.
    pub queue_max_wait_ms: u64,
    /// Per-user concurrent query ceiling. Zero disables the check.
    pub max_concurrent_queries_for_user: u64,
    /// Resource ceilings.
    pub limits: Limits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_distributed_processing_threads: 8,
            queue_max_wait_ms: 5_000,
            max_concurrent_queries_for_user: 0,
            limits: Limits::default(),
        }
    }
}

impl Settings {
    /// Settings with no network ceilings and no thread bound.
    pub fn unthrottled() -> Self {
        Self {
            max_distributed_processing_threads: 0,
            ..Self::default()
        }
    }

    /// Settings bounding remote fan-out to `threads` workers.
    pub fn bounded(threads: u64) -> Self {
        Self {
            max_distributed_processing_threads: threads,
            ..Self::default()
        }
    }

    /// Queue wait as a [`Duration`].
    pub fn queue_max_wait(&self) -> Duration {
        Duration::from_millis(self.queue_max_wait_ms)
    }

    /// Copy of these settings suitable for forwarding to shards.
    ///
    /// The queue wait is clamped to the execution time limit and the per-user
    /// concurrency ceiling is cleared, since the forwarded query usually runs
    /// under a different user on the remote node.
    pub fn for_remote(&self) -> Self {
        let mut forwarded = self.clone();
        let wait = saturate(self.queue_max_wait(), self.limits.max_execution_time());
        forwarded.queue_max_wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        forwarded.max_concurrent_queries_for_user = 0;
        forwarded
    }

    /// Parses settings from a TOML document.
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|err| FanoutError::config(path, err))?;
        Self::from_toml_str(&contents).map_err(|err| FanoutError::config(path, err))
    }
}

/// Caps `value` at `limit` when a limit is configured.
pub fn saturate(value: Duration, limit: Option<Duration>) -> Duration {
    match limit {
        Some(limit) if !limit.is_zero() && value > limit => limit,
        _ => value,
    }
}
