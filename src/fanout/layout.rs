use serde::Serialize;

use crate::cluster::{Cluster, ShardInfo};

/// Policy deciding whether a shard counts as remote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Any shard with a reachable remote replica is remote, even if also local.
    Inclusive,
    /// Exactly the shards that are not local are remote.
    Exclusive,
}

impl SelectionMode {
    /// Maps a constructor's inclusiveness flag to a mode.
    pub fn from_inclusive(inclusive: bool) -> Self {
        if inclusive {
            SelectionMode::Inclusive
        } else {
            SelectionMode::Exclusive
        }
    }

    /// Whether `shard` should receive a remote stream.
    pub fn is_remote(self, shard: &ShardInfo) -> bool {
        match self {
            SelectionMode::Inclusive => shard.has_remote_connections(),
            SelectionMode::Exclusive => !shard.is_local(),
        }
    }

    /// Number of remote-eligible shards in `cluster`.
    pub fn remote_count(self, cluster: &Cluster) -> usize {
        match self {
            SelectionMode::Inclusive => cluster
                .shards()
                .iter()
                .filter(|shard| shard.has_remote_connections())
                .count(),
            SelectionMode::Exclusive => cluster.remote_shard_count(),
        }
    }
}

/// Distribution of remote pools over worker threads.
///
/// Bucket `i` holds `pools_per_thread + 1` pools when `i < remainder`, and
/// `pools_per_thread` otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadLayout {
    /// Remote-eligible shards.
    pub remote_count: usize,
    /// Remote streams to create.
    pub thread_count: usize,
    /// Base bucket size.
    pub pools_per_thread: usize,
    /// Buckets receiving one extra pool.
    pub remainder: usize,
}

impl ThreadLayout {
    /// Derives the thread bound and bucket sizing.
    ///
    /// `max_threads == 0` means "unbounded" and collapses every remote shard
    /// onto a single multiplexed stream.
    pub fn compute(remote_count: usize, max_threads: u64, multiplexing: bool) -> Self {
        let thread_count = if !multiplexing {
            remote_count
        } else if remote_count == 0 {
            0
        } else if max_threads == 0 {
            1
        } else {
            let max_threads = usize::try_from(max_threads).unwrap_or(usize::MAX);
            remote_count.min(max_threads)
        };
        let (pools_per_thread, remainder) = if thread_count > 0 {
            (remote_count / thread_count, remote_count % thread_count)
        } else {
            (0, 0)
        };
        Self {
            remote_count,
            thread_count,
            pools_per_thread,
            remainder,
        }
    }

    /// Target size of the bucket consumed by thread `thread`.
    pub fn bucket_size(&self, thread: usize) -> usize {
        if thread < self.remainder {
            self.pools_per_thread + 1
        } else {
            self.pools_per_thread
        }
    }

    /// All bucket sizes in consumption order.
    pub fn bucket_sizes(&self) -> Vec<usize> {
        (0..self.thread_count).map(|t| self.bucket_size(t)).collect()
    }
}

/// Result of the counting pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FanoutLayout {
    /// Selection mode the constructor asked for.
    pub mode: SelectionMode,
    /// Thread bound and bucket sizing.
    pub threads: ThreadLayout,
    /// Streams contributed by local replicas.
    pub local_streams: usize,
    /// Remote streams (singleton or multiplexed).
    pub remote_streams: usize,
    /// Bucket sizes in the order streams are produced.
    pub bucket_sizes: Vec<usize>,
}

impl FanoutLayout {
    /// Total streams the barrier must be sized for.
    pub fn stream_count(&self) -> usize {
        self.local_streams + self.remote_streams
    }
}
