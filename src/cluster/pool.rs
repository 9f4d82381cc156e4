use std::fmt;
use std::sync::Arc;

use super::address::Address;

/// Shared handle to a shard's remote connection pool.
pub type PoolHandle = Arc<ConnectionPool>;

/// Pools multiplexed onto one remote stream, in shard order.
pub type PoolGroup = Vec<PoolHandle>;

/// Connection pool reaching the remote replicas of one shard.
///
/// The planner never opens connections; it only decides which stream owns
/// which pool.
#[derive(Debug, PartialEq, Eq)]
pub struct ConnectionPool {
    shard_num: u32,
    replicas: Vec<Address>,
}

impl ConnectionPool {
    /// Creates a pool over `replicas` for shard `shard_num`.
    pub fn new(shard_num: u32, replicas: Vec<Address>) -> PoolHandle {
        Arc::new(Self {
            shard_num,
            replicas,
        })
    }

    /// Shard this pool belongs to.
    pub fn shard_num(&self) -> u32 {
        self.shard_num
    }

    /// Remote replicas, in failover order.
    pub fn replicas(&self) -> &[Address] {
        &self.replicas
    }

    /// True when at least one replica is configured.
    pub fn has_replicas(&self) -> bool {
        !self.replicas.is_empty()
    }
}

impl fmt::Display for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard {} [", self.shard_num)?;
        for (i, replica) in self.replicas.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{replica}")?;
        }
        f.write_str("]")
    }
}
