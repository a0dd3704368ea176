//! Engagement figures attached to normalized posts.
//!
//! The feed carries no clap or response counts, so the default source
//! invents them. They are presentation filler, not data.

use rand::Rng;

use crate::domain::entities::RawFeedItem;

pub const PLACEHOLDER_CLAPS_MAX: u32 = 500;
pub const PLACEHOLDER_RESPONSES_MAX: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engagement {
    pub claps: u32,
    pub responses: u32,
}

pub trait EngagementSource: Send + Sync {
    fn engagement_for(&self, item: &RawFeedItem) -> Engagement;
}

/// Uniformly random figures, drawn again on every normalization pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderEngagement;

impl EngagementSource for PlaceholderEngagement {
    fn engagement_for(&self, _item: &RawFeedItem) -> Engagement {
        let mut rng = rand::thread_rng();
        Engagement {
            claps: rng.gen_range(0..PLACEHOLDER_CLAPS_MAX),
            responses: rng.gen_range(0..PLACEHOLDER_RESPONSES_MAX),
        }
    }
}

/// Reports zero engagement for every post.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEngagement;

impl EngagementSource for NoEngagement {
    fn engagement_for(&self, _item: &RawFeedItem) -> Engagement {
        Engagement::default()
    }
}
