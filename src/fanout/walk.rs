use crate::cluster::{Address, Cluster, PoolGroup, PoolHandle, ShardInfo};
use crate::error::Result;

use super::layout::{SelectionMode, ThreadLayout};

/// Remote stream decided by the walk.
#[derive(Debug, Clone)]
pub(crate) enum RemoteTarget {
    /// Bucket of size one: the shard's pool gets a dedicated stream.
    Single(PoolHandle),
    /// Several pools multiplexed onto one stream.
    Multiplexed(PoolGroup),
}

impl RemoteTarget {
    /// Number of pools served by the stream.
    pub fn pool_count(&self) -> usize {
        match self {
            RemoteTarget::Single(_) => 1,
            RemoteTarget::Multiplexed(pools) => pools.len(),
        }
    }
}

/// One stream-producing decision, in traversal order.
#[derive(Debug)]
pub(crate) enum Contribution<'a> {
    /// A local replica of `shard` at `address`.
    Local {
        /// Shard being served.
        shard: &'a ShardInfo,
        /// Local replica address.
        address: &'a Address,
    },
    /// A finalized remote bucket.
    Remote(RemoteTarget),
}

/// Running thread index and pool accumulator.
///
/// Both planner passes drive the same state machine so their bucket
/// boundaries cannot diverge.
#[derive(Debug, Default)]
pub(crate) struct WalkState {
    current_thread: usize,
    group: PoolGroup,
}

impl WalkState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feeds one remote-eligible pool, returning a target when a bucket closes.
    pub(crate) fn place(&mut self, layout: &ThreadLayout, pool: &PoolHandle) -> Option<RemoteTarget> {
        let target_size = layout.bucket_size(self.current_thread);
        if target_size == 1 {
            self.current_thread += 1;
            return Some(RemoteTarget::Single(pool.clone()));
        }
        self.group.push(pool.clone());
        if self.group.len() == target_size {
            self.current_thread += 1;
            return Some(RemoteTarget::Multiplexed(std::mem::take(&mut self.group)));
        }
        None
    }

    pub(crate) fn threads_consumed(&self) -> usize {
        self.current_thread
    }

    pub(crate) fn pending_pools(&self) -> usize {
        self.group.len()
    }
}

/// Walks `cluster` in order, reporting every stream to create.
///
/// Local contributions of a shard are visited before its remote one.
pub(crate) fn walk_shards<'a, F>(
    cluster: &'a Cluster,
    mode: SelectionMode,
    layout: &ThreadLayout,
    state: &mut WalkState,
    mut visit: F,
) -> Result<()>
where
    F: FnMut(Contribution<'a>) -> Result<()>,
{
    for shard in cluster.shards() {
        if shard.is_local() {
            for address in &shard.local_addresses {
                visit(Contribution::Local { shard, address })?;
            }
        }
        if mode.is_remote(shard) {
            if let Some(target) = state.place(layout, &shard.pool) {
                visit(Contribution::Remote(target))?;
            }
        }
    }
    Ok(())
}
