//! Shard directory consumed by the fan-out planner.
//!
//! A [`Cluster`] is an ordered, immutable list of [`ShardInfo`] entries. The
//! order is significant: both planner passes walk it front to back and the
//! streams they produce follow it.

mod address;
mod pool;

pub use address::{Address, AddressParseError, DEFAULT_PORT};
pub use pool::{ConnectionPool, PoolGroup, PoolHandle};

/// One horizontal partition of the dataset.
#[derive(Debug, Clone)]
pub struct ShardInfo {
    shard_num: u32,
    /// Replicas of this shard served by the local node.
    pub local_addresses: Vec<Address>,
    /// Pool reaching the remote replicas.
    pub pool: PoolHandle,
}

impl ShardInfo {
    /// Builds a shard from its local and remote replica addresses.
    pub fn new(shard_num: u32, local_addresses: Vec<Address>, remote_replicas: Vec<Address>) -> Self {
        Self {
            shard_num,
            local_addresses,
            pool: ConnectionPool::new(shard_num, remote_replicas),
        }
    }

    /// Shard number, 1-based by convention.
    pub fn shard_num(&self) -> u32 {
        self.shard_num
    }

    /// True when the local node can serve this shard.
    pub fn is_local(&self) -> bool {
        !self.local_addresses.is_empty()
    }

    /// True when at least one remote replica is reachable.
    pub fn has_remote_connections(&self) -> bool {
        self.pool.has_replicas()
    }
}

/// Ordered shard directory.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    shards: Vec<ShardInfo>,
    remote_shard_count: usize,
    local_shard_count: usize,
}

impl Cluster {
    /// Creates a directory over `shards`, keeping their order.
    pub fn new(shards: Vec<ShardInfo>) -> Self {
        let local_shard_count = shards.iter().filter(|s| s.is_local()).count();
        Self {
            remote_shard_count: shards.len() - local_shard_count,
            local_shard_count,
            shards,
        }
    }

    /// Shards in traversal order.
    pub fn shards(&self) -> &[ShardInfo] {
        &self.shards
    }

    /// Number of shards the local node cannot serve.
    pub fn remote_shard_count(&self) -> usize {
        self.remote_shard_count
    }

    /// Number of shards with at least one local replica.
    pub fn local_shard_count(&self) -> usize {
        self.local_shard_count
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// True when the directory has no shards.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

impl FromIterator<ShardInfo> for Cluster {
    fn from_iter<I: IntoIterator<Item = ShardInfo>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
