//! Feedline: fetches a Medium author's feed through an RSS-to-JSON proxy,
//! normalizes it into posts and serves cached read-only views over them.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
