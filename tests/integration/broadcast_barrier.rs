#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use shardplex::{
    constructors::{BroadcastConstructor, SelectConstructor, StreamDescriptor, StreamTarget},
    Address, Cluster, FanoutError, FanoutQuery, Limits, QueryContext, RawQuery, Settings,
    ShardInfo, StreamConstructor,
};

fn addr(host: &str) -> Address {
    Address::new(host, 9000)
}

fn mixed_cluster() -> Cluster {
    Cluster::new(vec![
        ShardInfo::new(1, vec![addr("127.0.0.1"), addr("127.0.0.2")], vec![addr("r1")]),
        ShardInfo::new(2, vec![], vec![addr("r2a"), addr("r2b")]),
        ShardInfo::new(3, vec![], vec![addr("r3")]),
        ShardInfo::new(4, vec![addr("127.0.0.1")], vec![]),
        ShardInfo::new(5, vec![], vec![addr("r5")]),
    ])
}

fn plan<C>(constructor: &mut C, settings: &Settings) -> Vec<StreamDescriptor>
where
    C: StreamConstructor<Stream = StreamDescriptor>,
{
    let cluster = mixed_cluster();
    let context = QueryContext::new("ddl-7", "admin", settings.clone());
    FanoutQuery::new(
        constructor,
        &cluster,
        RawQuery::shared("ALTER TABLE hits DROP PARTITION 201501"),
        &context,
        settings,
        true,
    )
    .execute()
    .expect("fan-out")
}

#[test]
fn broadcast_barrier_admits_every_stream() {
    let mut constructor = BroadcastConstructor::new();
    let streams = plan(&mut constructor, &Settings::bounded(2));

    // 3 local replicas + 4 remote shards over 2 threads.
    assert_eq!(streams.len(), 5);
    assert_eq!(constructor.participants(), 5);

    let arrived = AtomicUsize::new(0);
    thread::scope(|s| {
        for stream in &streams {
            let arrived = &arrived;
            s.spawn(move || {
                arrived.fetch_add(1, Ordering::SeqCst);
                stream.barrier.as_ref().expect("barrier").wait();
            });
        }
    });
    assert_eq!(arrived.load(Ordering::SeqCst), 5);
}

#[test]
fn broadcast_streams_share_one_barrier() {
    let mut constructor = BroadcastConstructor::new();
    let streams = plan(&mut constructor, &Settings::bounded(4));
    let barrier = constructor.barrier().expect("barrier").clone();
    assert!(streams
        .iter()
        .all(|s| std::sync::Arc::ptr_eq(s.barrier.as_ref().unwrap(), &barrier)));
}

#[test]
fn broadcast_rejects_streams_before_barrier_setup() {
    let mut constructor = BroadcastConstructor::new();
    let context = QueryContext::default();
    let err = constructor
        .create_local(&RawQuery::shared("SELECT 1"), &context, &addr("127.0.0.1"))
        .unwrap_err();
    assert!(err.to_string().contains("before barrier setup"));
}

#[test]
fn select_serves_local_shards_locally_only() {
    let mut constructor = SelectConstructor::new().skip_local(addr("127.0.0.2"));
    let mut settings = Settings::unthrottled();
    settings.limits = Limits {
        max_network_bandwidth: Some(10 << 20),
        ..Limits::default()
    };
    let streams = plan(&mut constructor, &settings);

    // Local: 127.0.0.1 (shard 1), 127.0.0.1 (shard 4); 127.0.0.2 declined.
    // Remote: shards 2, 3, 5 multiplexed onto one stream.
    assert_eq!(constructor.planned_streams(), Some(4));
    assert_eq!(streams.len(), 3);
    assert!(streams[0].is_local());
    assert!(streams[1].is_local());
    match &streams[2].target {
        StreamTarget::Multiplexed(pools) => {
            let shards: Vec<_> = pools.iter().map(|p| p.shard_num()).collect();
            assert_eq!(shards, vec![2, 3, 5]);
        }
        other => panic!("expected multiplexed stream, got {other:?}"),
    }
    let summary = streams[2].summary();
    assert_eq!(summary.kind, "multiplexed");
    assert_eq!(summary.addresses, vec!["r2a:9000", "r2b:9000", "r3:9000", "r5:9000"]);
    assert!(summary.throttled);
    assert!(!summary.synchronized);
    assert_eq!(streams[2].query, "ALTER TABLE hits DROP PARTITION 201501");
}

#[test]
fn broadcast_gives_every_local_replica_a_participant() {
    // Two local replicas on one shard: both must reach the barrier.
    let cluster = Cluster::new(vec![
        ShardInfo::new(1, vec![addr("127.0.0.1"), addr("127.0.0.2")], vec![addr("r1")]),
        ShardInfo::new(2, vec![], vec![addr("r2")]),
    ]);
    let settings = Settings::bounded(4);
    let context = QueryContext::new("ddl-8", "admin", settings.clone());
    let mut constructor = BroadcastConstructor::new();
    let streams = FanoutQuery::new(
        &mut constructor,
        &cluster,
        RawQuery::shared("ALTER TABLE hits DELETE WHERE 1"),
        &context,
        &settings,
        true,
    )
    .execute()
    .expect("fan-out");

    assert_eq!(streams.len(), constructor.participants());
    assert_eq!(streams.iter().filter(|s| s.is_local()).count(), 2);

    let released = AtomicUsize::new(0);
    thread::scope(|s| {
        for stream in &streams {
            let released = &released;
            s.spawn(move || {
                stream.barrier.as_ref().expect("barrier").wait();
                released.fetch_add(1, Ordering::SeqCst);
            });
        }
    });
    assert_eq!(released.load(Ordering::SeqCst), 4);
}

#[test]
fn transfers_past_byte_ceiling_fail_with_throttled() {
    let mut constructor = SelectConstructor::new();
    let mut settings = Settings::bounded(4);
    settings.limits = Limits {
        max_network_bytes: Some(1_000),
        ..Limits::default()
    };
    let streams = plan(&mut constructor, &settings);
    let (local, remote): (Vec<_>, Vec<_>) = streams.iter().partition(|s| s.is_local());

    assert_eq!(local[0].record_transfer(1 << 20).unwrap(), Duration::ZERO);
    assert_eq!(remote[0].record_transfer(600).unwrap(), Duration::ZERO);
    // The ceiling is shared, so a second remote stream tips it over.
    let err = remote[1].record_transfer(600).unwrap_err();
    assert!(matches!(err, FanoutError::Throttled(_)));
    assert!(err.to_string().contains("Maximum: 1000"));
}
