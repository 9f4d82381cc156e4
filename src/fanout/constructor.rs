use crate::cluster::{Address, PoolGroup, PoolHandle};
use crate::error::Result;
use crate::query::QueryRef;
use crate::settings::Settings;
use crate::throttler::ThrottlerHandle;

/// Per-query execution context passed to stream constructors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryContext {
    /// Identifier of the initiating query.
    pub query_id: String,
    /// User the query was issued by.
    pub user: String,
    /// Settings in effect for this context.
    pub settings: Settings,
}

impl QueryContext {
    /// Context for `user` running `query_id` with `settings`.
    pub fn new(query_id: impl Into<String>, user: impl Into<String>, settings: Settings) -> Self {
        Self {
            query_id: query_id.into(),
            user: user.into(),
            settings,
        }
    }

    /// Copy of this context with `settings` applied.
    pub fn with_settings(&self, settings: Settings) -> Self {
        Self {
            settings,
            ..self.clone()
        }
    }
}

/// Builds the streams of one distributed query.
///
/// Implementations differ by purpose: a plain SELECT fan-out reads each shard
/// once, a broadcast statement must reach every reachable replica group and
/// synchronize on a barrier.
pub trait StreamConstructor {
    /// Stream type handed back to the caller.
    type Stream;

    /// Whether shards with remote replicas are remote even when also local.
    fn is_inclusive(&self) -> bool;

    /// Called once, before any stream is created, with the final stream count.
    fn setup_barrier(&mut self, stream_count: usize);

    /// Builds a stream over a local replica. `None` skips the replica.
    fn create_local(
        &mut self,
        query: &QueryRef,
        context: &QueryContext,
        address: &Address,
    ) -> Result<Option<Self::Stream>>;

    /// Builds a stream over one shard's remote pool.
    fn create_remote(
        &mut self,
        pool: PoolHandle,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
        context: &QueryContext,
    ) -> Result<Self::Stream>;

    /// Builds one stream multiplexing several shards' remote pools.
    fn create_remote_multiplexed(
        &mut self,
        pools: PoolGroup,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
        context: &QueryContext,
    ) -> Result<Self::Stream>;
}
