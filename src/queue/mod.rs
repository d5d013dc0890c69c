//! Queue intake: consumes creation requests from a durable Redis stream.

mod backoff;
mod consumer;

pub use backoff::ReconnectBackoff;
pub use consumer::QueueConsumer;
