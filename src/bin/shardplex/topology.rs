use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shardplex::cluster::{Address, AddressParseError, Cluster, ShardInfo};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to read topology {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse topology {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("shard {shard}: {source}")]
    Address {
        shard: u32,
        #[source]
        source: AddressParseError,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTopology {
    user: Option<String>,
    shards: Vec<RawShard>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawShard {
    local: Vec<String>,
    remote: Vec<String>,
}

pub fn load(path: &Path) -> Result<Cluster, TopologyError> {
    let contents = fs::read_to_string(path).map_err(|source| TopologyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawTopology = toml::from_str(&contents).map_err(|source| TopologyError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    build(raw)
}

fn build(raw: RawTopology) -> Result<Cluster, TopologyError> {
    let mut shards = Vec::with_capacity(raw.shards.len());
    for (idx, shard) in raw.shards.iter().enumerate() {
        let shard_num = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        let parse = |values: &[String]| -> Result<Vec<Address>, TopologyError> {
            values
                .iter()
                .map(|value| {
                    let addr = value.parse::<Address>().map_err(|source| {
                        TopologyError::Address {
                            shard: shard_num,
                            source,
                        }
                    })?;
                    Ok(match &raw.user {
                        Some(user) => addr.with_user(user.clone()),
                        None => addr,
                    })
                })
                .collect()
        };
        shards.push(ShardInfo::new(
            shard_num,
            parse(&shard.local)?,
            parse(&shard.remote)?,
        ));
    }
    Ok(Cluster::new(shards))
}
