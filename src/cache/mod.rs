//! Feedline cache.
//!
//! A single read-through layer sits in front of the feed:
//!
//! - **Store**: key→value storage with the instant each value was produced
//! - **Single flight**: concurrent misses on one key share a producer run,
//!   which runs on its own task and completes even if every caller is dropped
//!
//! ## Configuration
//!
//! The time-to-live comes from `cache.ttl_seconds`:
//!
//! ```toml
//! [cache]
//! ttl_seconds = 3600
//! ```
//!
//! Failed producer runs are never stored, so the next request retries.

mod config;
mod flight;
mod lock;
mod store;
mod ttl;

pub use config::CacheConfig;
pub use flight::{Flight, FlightAborted, InFlight};
pub use store::{CacheEntry, CacheStore, MemoryStore};
pub use ttl::TtlCache;
