//! Application services: normalization, the post façade and their ports.

pub mod engagement;
pub mod error;
pub mod normalize;
pub mod posts;
pub mod sitemap;
pub mod source;
