use std::sync::{Arc, Barrier};
use std::time::Duration;

use serde::Serialize;

use crate::cluster::{Address, PoolGroup, PoolHandle};
use crate::error::Result;
use crate::settings::Settings;
use crate::throttler::ThrottlerHandle;

/// Where a described stream reads from.
#[derive(Debug, Clone)]
pub enum StreamTarget {
    /// Local replica.
    Local(Address),
    /// One shard's remote pool.
    Remote(PoolHandle),
    /// Several remote pools served by one worker.
    Multiplexed(PoolGroup),
}

/// Stream ready to be scheduled by an executor.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Data source.
    pub target: StreamTarget,
    /// Query text sent to the source.
    pub query: String,
    /// Settings forwarded with the query.
    pub settings: Settings,
    /// Shared network throttler, remote streams only.
    pub throttler: Option<ThrottlerHandle>,
    /// Barrier every participant waits on before committing, if any.
    pub barrier: Option<Arc<Barrier>>,
}

impl StreamDescriptor {
    /// True for local streams.
    pub fn is_local(&self) -> bool {
        matches!(self.target, StreamTarget::Local(_))
    }

    /// Shard numbers feeding this stream. Empty for local streams.
    pub fn shard_nums(&self) -> Vec<u32> {
        match &self.target {
            StreamTarget::Local(_) => Vec::new(),
            StreamTarget::Remote(pool) => vec![pool.shard_num()],
            StreamTarget::Multiplexed(pools) => pools.iter().map(|p| p.shard_num()).collect(),
        }
    }

    /// Accounts `bytes` received by this stream against the shared throttler.
    ///
    /// Returns the time spent pacing. Streams without a throttler never wait;
    /// a stream past the byte ceiling fails with [`FanoutError::Throttled`].
    ///
    /// [`FanoutError::Throttled`]: crate::FanoutError::Throttled
    pub fn record_transfer(&self, bytes: u64) -> Result<Duration> {
        match &self.throttler {
            Some(throttler) => Ok(throttler.add(bytes)?),
            None => Ok(Duration::ZERO),
        }
    }

    /// Serializable view of this stream.
    pub fn summary(&self) -> StreamSummary {
        let (kind, addresses) = match &self.target {
            StreamTarget::Local(address) => ("local", vec![address.to_string()]),
            StreamTarget::Remote(pool) => (
                "remote",
                pool.replicas().iter().map(ToString::to_string).collect(),
            ),
            StreamTarget::Multiplexed(pools) => (
                "multiplexed",
                pools
                    .iter()
                    .flat_map(|pool| pool.replicas().iter().map(ToString::to_string))
                    .collect(),
            ),
        };
        StreamSummary {
            kind,
            shards: self.shard_nums(),
            addresses,
            throttled: self.throttler.is_some(),
            synchronized: self.barrier.is_some(),
        }
    }
}

/// Flattened stream description for explain output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    /// `local`, `remote` or `multiplexed`.
    pub kind: &'static str,
    /// Remote shards served.
    pub shards: Vec<u32>,
    /// Addresses the stream may contact.
    pub addresses: Vec<String>,
    /// Whether a network throttler is attached.
    pub throttled: bool,
    /// Whether the stream waits on a barrier.
    pub synchronized: bool,
}
