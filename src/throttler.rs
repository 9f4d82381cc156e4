//! Network throttler shared by every remote stream of one distributed query.
//!
//! - `add(n)` records `n` transferred bytes and fails once the byte ceiling is
//!   crossed.
//! - With a speed ceiling, `add` sleeps until the average rate since the first
//!   transfer is back under the ceiling.
//! - Counters are atomics so concurrent streams can share one handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::settings::Limits;

/// Message used when the planner creates a throttler for network limits.
pub const NETWORK_LIMIT_MESSAGE: &str =
    "Limit for bytes to send or receive over network exceeded.";

/// Shared handle passed to remote streams.
pub type ThrottlerHandle = Arc<Throttler>;

/// Errors raised by [`Throttler::add`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    /// The total byte ceiling was crossed.
    #[error("{message} Maximum: {limit}")]
    LimitExceeded {
        /// Configured message prefix.
        message: String,
        /// Configured byte ceiling.
        limit: u64,
    },
}

/// Point-in-time view of throttler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottlerSnapshot {
    /// Bytes accounted so far.
    pub bytes: u64,
    /// Total time spent sleeping to respect the speed ceiling.
    pub slept_us: u64,
    /// Calls rejected by the byte ceiling.
    pub rejected: u64,
}

/// Thread-safe bandwidth and volume limiter.
#[derive(Debug)]
pub struct Throttler {
    max_speed: Option<u64>,
    limit: Option<u64>,
    limit_exceeded_message: String,
    /// Set on the first accounted transfer.
    started: Mutex<Option<Instant>>,
    bytes: AtomicU64,
    slept_us: AtomicU64,
    rejected: AtomicU64,
}

impl Throttler {
    /// Creates a throttler. `None` or zero disables the matching ceiling.
    pub fn new(
        max_speed: Option<u64>,
        limit: Option<u64>,
        limit_exceeded_message: impl Into<String>,
    ) -> ThrottlerHandle {
        Arc::new(Self {
            max_speed: max_speed.filter(|v| *v > 0),
            limit: limit.filter(|v| *v > 0),
            limit_exceeded_message: limit_exceeded_message.into(),
            started: Mutex::new(None),
            bytes: AtomicU64::new(0),
            slept_us: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        })
    }

    /// Builds the per-query network throttler, or `None` when no ceiling is set.
    pub fn from_limits(limits: &Limits) -> Option<ThrottlerHandle> {
        limits.throttles_network().then(|| {
            Self::new(
                limits.network_bandwidth(),
                limits.network_bytes(),
                NETWORK_LIMIT_MESSAGE,
            )
        })
    }

    /// Configured speed ceiling in bytes per second.
    pub fn max_speed(&self) -> Option<u64> {
        self.max_speed
    }

    /// Configured byte ceiling.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Accounts `amount` bytes, sleeping if the speed ceiling requires it.
    ///
    /// Returns the time spent sleeping.
    pub fn add(&self, amount: u64) -> Result<Duration, ThrottleError> {
        if self.max_speed.is_none() && self.limit.is_none() {
            return Ok(Duration::ZERO);
        }
        let elapsed = {
            let mut started = self.started.lock();
            started.get_or_insert_with(Instant::now).elapsed()
        };
        let total = self
            .bytes
            .fetch_add(amount, Ordering::AcqRel)
            .saturating_add(amount);

        if let Some(limit) = self.limit {
            if total > limit {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(total, limit, "throttler.limit_exceeded");
                return Err(ThrottleError::LimitExceeded {
                    message: self.limit_exceeded_message.clone(),
                    limit,
                });
            }
        }

        let Some(speed) = self.max_speed else {
            return Ok(Duration::ZERO);
        };
        match pace(total, speed, elapsed) {
            Some(wait) => {
                std::thread::sleep(wait);
                self.slept_us.fetch_add(
                    u64::try_from(wait.as_micros()).unwrap_or(u64::MAX),
                    Ordering::Relaxed,
                );
                Ok(wait)
            }
            None => Ok(Duration::ZERO),
        }
    }

    /// Returns current counters.
    pub fn snapshot(&self) -> ThrottlerSnapshot {
        ThrottlerSnapshot {
            bytes: self.bytes.load(Ordering::Acquire),
            slept_us: self.slept_us.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// How long to wait so that `total` bytes over the elapsed window average at
/// most `speed` bytes per second.
fn pace(total: u64, speed: u64, elapsed: Duration) -> Option<Duration> {
    let desired_ns = u128::from(total) * 1_000_000_000 / u128::from(speed);
    let elapsed_ns = elapsed.as_nanos();
    if desired_ns <= elapsed_ns {
        return None;
    }
    let wait_ns = u64::try_from(desired_ns - elapsed_ns).unwrap_or(u64::MAX);
    Some(Duration::from_nanos(wait_ns))
}
