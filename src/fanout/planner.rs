use tracing::{debug, error, info};

use crate::cluster::Cluster;
use crate::error::{FanoutError, Result};
use crate::query::QueryRef;
use crate::settings::Settings;
use crate::throttler::Throttler;

use super::constructor::{QueryContext, StreamConstructor};
use super::layout::{FanoutLayout, SelectionMode, ThreadLayout};
use super::walk::{walk_shards, Contribution, RemoteTarget, WalkState};

/// Fans one query out over a cluster.
pub struct FanoutQuery<'a, C: StreamConstructor> {
    constructor: &'a mut C,
    cluster: &'a Cluster,
    query: QueryRef,
    context: &'a QueryContext,
    settings: &'a Settings,
    enable_shard_multiplexing: bool,
}

impl<'a, C: StreamConstructor> FanoutQuery<'a, C> {
    /// Prepares a fan-out of `query` over `cluster`.
    pub fn new(
        constructor: &'a mut C,
        cluster: &'a Cluster,
        query: QueryRef,
        context: &'a QueryContext,
        settings: &'a Settings,
        enable_shard_multiplexing: bool,
    ) -> Self {
        Self {
            constructor,
            cluster,
            query,
            context,
            settings,
            enable_shard_multiplexing,
        }
    }

    /// Runs the counting pass only. Does not touch the barrier.
    pub fn layout(&self) -> Result<FanoutLayout> {
        let mode = SelectionMode::from_inclusive(self.constructor.is_inclusive());
        self.count(mode)
    }

    fn count(&self, mode: SelectionMode) -> Result<FanoutLayout> {
        let threads = ThreadLayout::compute(
            mode.remote_count(self.cluster),
            self.settings.max_distributed_processing_threads,
            self.enable_shard_multiplexing,
        );
        let mut local_streams = 0;
        let mut bucket_sizes = Vec::with_capacity(threads.thread_count);
        let mut state = WalkState::new();
        walk_shards(self.cluster, mode, &threads, &mut state, |step| {
            match step {
                Contribution::Local { .. } => local_streams += 1,
                Contribution::Remote(target) => bucket_sizes.push(target.pool_count()),
            }
            Ok(())
        })?;
        Ok(FanoutLayout {
            mode,
            threads,
            local_streams,
            remote_streams: bucket_sizes.len(),
            bucket_sizes,
        })
    }

    /// Sizes the barrier, then builds every stream in shard order.
    pub fn execute(self) -> Result<Vec<C::Stream>> {
        let mode = SelectionMode::from_inclusive(self.constructor.is_inclusive());
        let layout = self.count(mode)?;
        let Self {
            constructor,
            cluster,
            query,
            context,
            settings,
            ..
        } = self;

        let query_text = query.to_query_string();
        let remote_settings = settings.for_remote();
        let local_context = context.with_settings(remote_settings.clone());
        let throttler = Throttler::from_limits(&settings.limits);

        debug!(
            mode = ?layout.mode,
            remote_count = layout.threads.remote_count,
            thread_count = layout.threads.thread_count,
            pools_per_thread = layout.threads.pools_per_thread,
            remainder = layout.threads.remainder,
            throttled = throttler.is_some(),
            "fanout.execute.layout"
        );
        check_remote_streams(&layout, layout.remote_streams)?;

        let stream_count = layout.stream_count();
        constructor.setup_barrier(stream_count);
        debug!(stream_count, "fanout.execute.barrier");

        let mut streams = Vec::with_capacity(stream_count);
        let mut remote_created = 0usize;
        let mut local_declined = 0usize;
        let mut state = WalkState::new();
        walk_shards(cluster, mode, &layout.threads, &mut state, |step| {
            match step {
                Contribution::Local { address, .. } => {
                    match constructor.create_local(&query, &local_context, address)? {
                        Some(stream) => streams.push(stream),
                        None => local_declined += 1,
                    }
                }
                Contribution::Remote(target) => {
                    remote_created += 1;
                    if remote_created > layout.threads.thread_count {
                        return Err(mismatch(layout.threads.thread_count, remote_created));
                    }
                    let stream = match target {
                        RemoteTarget::Single(pool) => constructor.create_remote(
                            pool,
                            &query_text,
                            &remote_settings,
                            throttler.clone(),
                            context,
                        )?,
                        RemoteTarget::Multiplexed(pools) => constructor.create_remote_multiplexed(
                            pools,
                            &query_text,
                            &remote_settings,
                            throttler.clone(),
                            context,
                        )?,
                    };
                    streams.push(stream);
                }
            }
            Ok(())
        })?;

        check_remote_streams(&layout, remote_created)?;
        if state.threads_consumed() != layout.threads.thread_count || state.pending_pools() > 0 {
            return Err(mismatch(layout.threads.thread_count, state.threads_consumed()));
        }
        info!(
            streams = streams.len(),
            local = layout.local_streams - local_declined,
            local_declined,
            remote = remote_created,
            "fanout.execute.complete"
        );
        Ok(streams)
    }
}

/// Remote streams must match the thread layout's bucket count, which is what
/// `planned` always reports.
fn check_remote_streams(layout: &FanoutLayout, remote: usize) -> Result<()> {
    if remote == layout.threads.thread_count {
        Ok(())
    } else {
        Err(mismatch(layout.threads.thread_count, remote))
    }
}

fn mismatch(planned: usize, created: usize) -> FanoutError {
    error!(planned, created, "fanout.execute.stream_mismatch");
    FanoutError::StreamCountMismatch { planned, created }
}
