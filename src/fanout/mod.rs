//! Distributed query fan-out planning.
//!
//! Given a [`Cluster`](crate::cluster::Cluster) and a query, the planner
//! decides how many streams to open and which shards feed each one:
//!
//! 1. The [`StreamConstructor`] picks the [`SelectionMode`] deciding which
//!    shards count as remote.
//! 2. [`ThreadLayout`] bounds remote parallelism by
//!    `max_distributed_processing_threads` and spreads the remote pools over
//!    that many buckets, the leading buckets taking the remainder.
//! 3. A counting pass walks the shards and sizes the constructor's barrier.
//! 4. A second, identical walk materializes local streams (one per local
//!    replica address), singleton remote streams and multiplexed remote
//!    streams, in shard order.

/// Stream constructor trait and query context.
pub mod constructor;

/// Thread bound and bucket sizing.
pub mod layout;

/// The two-pass planner.
pub mod planner;

mod walk;

pub use constructor::{QueryContext, StreamConstructor};
pub use layout::{FanoutLayout, SelectionMode, ThreadLayout};
pub use planner::FanoutQuery;
