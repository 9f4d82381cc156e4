//! Built-in [`StreamConstructor`](crate::fanout::StreamConstructor)
//! implementations producing [`StreamDescriptor`]s for an executor.

mod broadcast;
mod select;
mod stream;

pub use broadcast::BroadcastConstructor;
pub use select::SelectConstructor;
pub use stream::{StreamDescriptor, StreamSummary, StreamTarget};
