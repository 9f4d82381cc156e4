//! Opaque query representation handed to the planner.

use std::fmt;
use std::sync::Arc;

/// Parsed, immutable query. The planner only ever renders it back to text
/// for remote shards and hands it untouched to local stream construction.
pub trait QueryAst: fmt::Debug + Send + Sync {
    /// Serializes the query to the text sent over the wire.
    fn to_query_string(&self) -> String;
}

/// Shared query handle.
pub type QueryRef = Arc<dyn QueryAst>;

/// Query that is already plain text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawQuery(pub String);

impl RawQuery {
    /// Wraps `text` into a shareable handle.
    pub fn shared(text: impl Into<String>) -> QueryRef {
        Arc::new(Self(text.into()))
    }
}

impl QueryAst for RawQuery {
    fn to_query_string(&self) -> String {
        self.0.clone()
    }
}
