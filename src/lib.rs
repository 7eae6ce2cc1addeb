// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
pub mod telemetry;

// Domain layer
pub mod notification;
pub mod submission;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;
