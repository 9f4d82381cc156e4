use std::collections::HashSet;

use tracing::debug;

use crate::cluster::{Address, PoolGroup, PoolHandle};
use crate::error::Result;
use crate::fanout::{QueryContext, StreamConstructor};
use crate::query::QueryRef;
use crate::settings::Settings;
use crate::throttler::ThrottlerHandle;

use super::stream::{StreamDescriptor, StreamTarget};

/// Read fan-out: each shard is served either locally or remotely, never both.
#[derive(Debug, Default)]
pub struct SelectConstructor {
    skip_local: HashSet<Address>,
    planned_streams: Option<usize>,
}

impl SelectConstructor {
    /// Creates a constructor that serves every local replica.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines local streams for `address`.
    pub fn skip_local(mut self, address: Address) -> Self {
        self.skip_local.insert(address);
        self
    }

    /// Stream count reported by the planner, once known.
    pub fn planned_streams(&self) -> Option<usize> {
        self.planned_streams
    }

    fn remote(
        target: StreamTarget,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
    ) -> StreamDescriptor {
        StreamDescriptor {
            target,
            query: query.to_string(),
            settings: settings.clone(),
            throttler,
            barrier: None,
        }
    }
}

impl StreamConstructor for SelectConstructor {
    type Stream = StreamDescriptor;

    fn is_inclusive(&self) -> bool {
        false
    }

    fn setup_barrier(&mut self, stream_count: usize) {
        self.planned_streams = Some(stream_count);
    }

    fn create_local(
        &mut self,
        query: &QueryRef,
        context: &QueryContext,
        address: &Address,
    ) -> Result<Option<StreamDescriptor>> {
        if self.skip_local.contains(address) {
            debug!(%address, "select.create_local.skipped");
            return Ok(None);
        }
        Ok(Some(StreamDescriptor {
            target: StreamTarget::Local(address.clone()),
            query: query.to_query_string(),
            settings: context.settings.clone(),
            throttler: None,
            barrier: None,
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
        Ok(Self::remote(StreamTarget::Remote(pool), query, settings, throttler))
    }

    fn create_remote_multiplexed(
        &mut self,
        pools: PoolGroup,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
        _context: &QueryContext,
    ) -> Result<StreamDescriptor> {
        Ok(Self::remote(
            StreamTarget::Multiplexed(pools),
            query,
            settings,
            throttler,
        ))
    }
}
