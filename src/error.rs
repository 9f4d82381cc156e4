use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

use crate::throttler::ThrottleError;

/// Result type used throughout the planner.
pub type Result<T> = std::result::Result<T, FanoutError>;

/// Errors surfaced while planning or materializing a distributed fan-out.
#[derive(Debug, Error)]
pub enum FanoutError {
    /// A stream constructor refused or failed to build a stream.
    #[error("stream construction failed: {0}")]
    Constructor(#[source] Box<dyn StdError + Send + Sync>),
    /// The materializing pass disagreed with the counting pass.
    #[error("fan-out produced {created} remote streams but {planned} were planned")]
    StreamCountMismatch {
        /// Remote streams the thread layout planned (its bucket count).
        planned: usize,
        /// Remote streams actually created.
        created: usize,
    },
    /// A stream hit its network byte ceiling while transferring data.
    #[error(transparent)]
    Throttled(#[from] ThrottleError),
    /// A settings or topology file could not be read or parsed.
    #[error("config error in {path}: {message}")]
    Config {
        /// File that failed to load.
        path: PathBuf,
        /// Human-readable cause.
        message: String,
    },
}

impl FanoutError {
    /// Wraps an arbitrary collaborator error.
    pub fn constructor(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        FanoutError::Constructor(err.into())
    }

    pub(crate) fn config(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        FanoutError::Config {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
