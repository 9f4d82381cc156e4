#![allow(dead_code)]

use shardplex::{
    cluster::{Address, PoolGroup, PoolHandle},
    Cluster, FanoutError, QueryContext, QueryRef, Result, Settings, ShardInfo, StreamConstructor,
    ThrottlerHandle,
};

/// Stream produced by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Local(Address),
    Remote(u32),
    Multiplexed(Vec<u32>),
}

impl Recorded {
    pub fn is_remote(&self) -> bool {
        !matches!(self, Recorded::Local(_))
    }
}

/// Constructor call, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Barrier(usize),
    Local,
    Remote,
}

/// Stream constructor that records everything the planner asks of it.
#[derive(Debug, Default)]
pub struct Recorder {
    pub inclusive: bool,
    pub calls: Vec<Call>,
    pub decline_local: bool,
    pub fail_remote_at: Option<usize>,
    pub remote_settings: Vec<Settings>,
    pub local_settings: Vec<Settings>,
    pub remote_queries: Vec<String>,
    pub throttlers: Vec<Option<ThrottlerHandle>>,
    remote_calls: usize,
}

impl Recorder {
    pub fn exclusive() -> Self {
        Self::default()
    }

    pub fn inclusive() -> Self {
        Self {
            inclusive: true,
            ..Self::default()
        }
    }

    pub fn barrier_sizes(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Barrier(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    fn next_remote(&mut self, settings: &Settings, query: &str, throttler: Option<ThrottlerHandle>) -> Result<()> {
        self.calls.push(Call::Remote);
        self.remote_calls += 1;
        if self.fail_remote_at == Some(self.remote_calls) {
            return Err(FanoutError::constructor("pool exhausted"));
        }
        self.remote_settings.push(settings.clone());
        self.remote_queries.push(query.to_string());
        self.throttlers.push(throttler);
        Ok(())
    }
}

impl StreamConstructor for Recorder {
    type Stream = Recorded;

    fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    fn setup_barrier(&mut self, stream_count: usize) {
        self.calls.push(Call::Barrier(stream_count));
    }

    fn create_local(
        &mut self,
        _query: &QueryRef,
        context: &QueryContext,
        address: &Address,
    ) -> Result<Option<Recorded>> {
        self.calls.push(Call::Local);
        if self.decline_local {
            return Ok(None);
        }
        self.local_settings.push(context.settings.clone());
        Ok(Some(Recorded::Local(address.clone())))
    }

    fn create_remote(
        &mut self,
        pool: PoolHandle,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
        _context: &QueryContext,
    ) -> Result<Recorded> {
        self.next_remote(settings, query, throttler)?;
        Ok(Recorded::Remote(pool.shard_num()))
    }

    fn create_remote_multiplexed(
        &mut self,
        pools: PoolGroup,
        query: &str,
        settings: &Settings,
        throttler: Option<ThrottlerHandle>,
        _context: &QueryContext,
    ) -> Result<Recorded> {
        self.next_remote(settings, query, throttler)?;
        Ok(Recorded::Multiplexed(
            pools.iter().map(|pool| pool.shard_num()).collect(),
        ))
    }
}

pub fn addr(host: &str) -> Address {
    Address::new(host, 9000)
}

/// Shard with `locals` local replicas and, if `remote`, one remote replica.
pub fn shard(num: u32, locals: usize, remote: bool) -> ShardInfo {
    let local_addresses = (0..locals)
        .map(|i| addr(&format!("local-{num}-{i}")))
        .collect();
    let remote_replicas = if remote {
        vec![addr(&format!("remote-{num}"))]
    } else {
        Vec::new()
    };
    ShardInfo::new(num, local_addresses, remote_replicas)
}

/// Cluster of `n` remote-only shards.
pub fn remote_cluster(n: u32) -> Cluster {
    (1..=n).map(|num| shard(num, 0, true)).collect()
}

pub fn context(settings: &Settings) -> QueryContext {
    QueryContext::new("q-1", "alice", settings.clone())
}
