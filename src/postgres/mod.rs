//! PostgreSQL connection pooling for the notification config store.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
