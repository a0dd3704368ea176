//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod feed_client;
pub mod http;
pub mod telemetry;
