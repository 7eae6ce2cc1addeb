//! Submission ingestion surfaces: HTTP and Redis Pub/Sub.

mod backoff;
mod http;
mod redis;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use http::process_submission;
pub use redis::{RedisSubscriber, DEFAULT_SUBMISSION_CHANNEL};
