//! Distributed query fan-out planning.
//!
//! `shardplex` decides how a query is spread over a sharded cluster: how many
//! execution streams to open, which shards feed which stream, how remote
//! connection pools are multiplexed onto a bounded number of workers, and how
//! large the cross-node barrier must be before anything runs. Executing the
//! streams is left to the caller.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cluster;
pub mod constructors;
pub mod error;
pub mod fanout;
pub mod query;
pub mod settings;
pub mod throttler;

pub use cluster::{Address, Cluster, ConnectionPool, PoolGroup, PoolHandle, ShardInfo};
pub use error::{FanoutError, Result};
pub use fanout::{FanoutLayout, FanoutQuery, QueryContext, StreamConstructor};
pub use query::{QueryAst, QueryRef, RawQuery};
pub use settings::{Limits, Settings};
pub use throttler::{Throttler, ThrottlerHandle};
