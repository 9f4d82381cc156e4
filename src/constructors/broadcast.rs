use std::sync::{Arc, Barrier};

use tracing::debug;

use crate::cluster::{Address, PoolGroup, PoolHandle};
use crate::error::{FanoutError, Result};
use crate::fanout::{QueryContext, StreamConstructor};
use crate::query::QueryRef;
use crate::settings::Settings;
use crate::throttler::ThrottlerHandle;

use super::stream::{StreamDescriptor, StreamTarget};

/// Administrative broadcast: every shard with reachable remote replicas gets a
/// remote stream, local replicas included, and all participants rendezvous on
/// one barrier. Local streams are never declined, so every participant the
/// barrier is sized for gets a stream.
#[derive(Debug, Default)]
pub struct BroadcastConstructor {
    barrier: Option<Arc<Barrier>>,
    participants: usize,
}

impl BroadcastConstructor {
    /// Creates a broadcast constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of participants the barrier was sized for.
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Barrier shared by produced streams, once sized.
    pub fn barrier(&self) -> Option<&Arc<Barrier>> {
        self.barrier.as_ref()
    }

    fn require_barrier(&self) -> Result<Arc<Barrier>> {
        self.barrier
            .clone()
            .ok_or_else(|| FanoutError::constructor("broadcast stream requested before barrier setup"))
    }

    fn remote(
        &self,
        target: StreamTarget,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
    ) -> Result<StreamDescriptor> {
        Ok(StreamDescriptor {
            target,
            query: query.to_string(),
            settings: settings.clone(),
            throttler,
            barrier: Some(self.require_barrier()?),
        })
    }
}

impl StreamConstructor for BroadcastConstructor {
    type Stream = StreamDescriptor;

    fn is_inclusive(&self) -> bool {
        true
    }

    fn setup_barrier(&mut self, stream_count: usize) {
        debug!(stream_count, "broadcast.setup_barrier");
        self.participants = stream_count;
        self.barrier = Some(Arc::new(Barrier::new(stream_count)));
    }

    fn create_local(
        &mut self,
        query: &QueryRef,
        context: &QueryContext,
        address: &Address,
    ) -> Result<Option<StreamDescriptor>> {
        Ok(Some(StreamDescriptor {
            target: StreamTarget::Local(address.clone()),
            query: query.to_query_string(),
            settings: context.settings.clone(),
            throttler: None,
            barrier: Some(self.require_barrier()?),
        }))
    }

    fn create_remote(
        &mut self,
        pool: PoolHandle,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
        _context: &QueryContext,
    ) -> Result<StreamDescriptor> {
        self.remote(StreamTarget::Remote(pool), query, settings, throttler)
    }

    fn create_remote_multiplexed(
        &mut self,
        pools: PoolGroup,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
        _context: &QueryContext,
    ) -> Result<StreamDescriptor> {
        self.remote(StreamTarget::Multiplexed(pools), query, settings, throttler)
    }
}
