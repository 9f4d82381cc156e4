#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const TOPOLOGY: &str = r#"
[[shards]]
local = ["127.0.0.1:9000"]
remote = ["s1-replica:9000"]

[[shards]]
remote = ["s2-a:9000", "s2-b:9000"]

[[shards]]
remote = ["s3:9000"]

[[shards]]
remote = ["s4:9000"]

[[shards]]
remote = ["s5:9000"]
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn plan_json(args: &[&str]) -> Value {
    let dir = TempDir::new().expect("tempdir");
    let topology = write(&dir, "cluster.toml", TOPOLOGY);
    let output = Command::cargo_bin("shardplex")
        .expect("binary")
        .env_remove("SHARDPLEX_MAX_THREADS")
        .args(["--format", "json", "plan", "--topology"])
        .arg(&topology)
        .args(args)
        .output()
        .expect("run shardplex");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn select_plan_groups_remote_shards() {
    let report = plan_json(&["--max-threads", "2"]);
    assert_eq!(report["layout"]["mode"], "exclusive");
    assert_eq!(report["layout"]["threads"]["remote_count"], 4);
    assert_eq!(report["layout"]["bucket_sizes"], serde_json::json!([2, 2]));
    assert_eq!(report["stream_count"], 3);

    let streams = report["streams"].as_array().expect("streams");
    assert_eq!(streams.len(), 3);
    assert_eq!(streams[0]["kind"], "local");
    assert_eq!(streams[1]["shards"], serde_json::json!([2, 3]));
    assert_eq!(streams[2]["shards"], serde_json::json!([4, 5]));
}

#[test]
fn broadcast_plan_without_multiplexing() {
    let report = plan_json(&["--mode", "broadcast", "--no-multiplexing"]);
    assert_eq!(report["layout"]["mode"], "inclusive");
    assert_eq!(report["stream_count"], 6);
    let streams = report["streams"].as_array().expect("streams");
    assert!(streams[1..].iter().all(|s| s["kind"] == "remote"));
    assert!(streams.iter().all(|s| s["synchronized"] == true));
}

#[test]
fn settings_file_enables_throttling() {
    let dir = TempDir::new().expect("tempdir");
    let settings = write(
        &dir,
        "settings.toml",
        "max_distributed_processing_threads = 0\n\n[limits]\nmax_network_bandwidth = 1048576\n",
    );
    let report = plan_json(&["--settings", settings.to_str().expect("utf8 path")]);
    let streams = report["streams"].as_array().expect("streams");
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[1]["kind"], "multiplexed");
    assert_eq!(streams[1]["throttled"], true);
    assert_eq!(streams[0]["throttled"], false);
}

#[test]
fn missing_topology_fails() {
    Command::cargo_bin("shardplex")
        .expect("binary")
        .args(["plan", "--topology", "/nonexistent/cluster.toml"])
        .assert()
        .failure();
}

#[test]
fn broadcast_refuses_skip_local() {
    let dir = TempDir::new().expect("tempdir");
    let topology = write(&dir, "cluster.toml", TOPOLOGY);
    let output = Command::cargo_bin("shardplex")
        .expect("binary")
        .args(["plan", "--mode", "broadcast", "--skip-local", "127.0.0.1:9000", "--topology"])
        .arg(&topology)
        .output()
        .expect("run shardplex");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--skip-local"), "stderr: {stderr}");
}

#[test]
fn select_accepts_skip_local() {
    let report = plan_json(&["--skip-local", "127.0.0.1:9000", "--max-threads", "2"]);
    let streams = report["streams"].as_array().expect("streams");
    assert_eq!(streams.len(), 2);
    assert!(streams.iter().all(|s| s["kind"] == "multiplexed"));
}
