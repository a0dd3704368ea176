//! Mapping from untrusted feed items to [`Post`]s.

use std::sync::Arc;

use tracing::debug;

use crate::{
    application::engagement::{EngagementSource, PlaceholderEngagement},
    domain::{
        content::{derive_description, reading_time, select_thumbnail, word_count},
        entities::{Post, RawFeedItem},
        slug::{SlugCollisionPolicy, SlugRegistry, slug_or_fallback},
    },
};

/// Turns raw feed items into posts.
///
/// Everything except engagement is a pure function of the item, so the same
/// item always yields the same slug, description, thumbnail and metrics.
#[derive(Clone)]
pub struct PostNormalizer {
    engagement: Arc<dyn EngagementSource>,
    collisions: SlugCollisionPolicy,
}

impl Default for PostNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderEngagement), SlugCollisionPolicy::Keep)
    }
}

impl PostNormalizer {
    pub fn new(engagement: Arc<dyn EngagementSource>, collisions: SlugCollisionPolicy) -> Self {
        Self {
            engagement,
            collisions,
        }
    }

    pub fn collisions(&self) -> SlugCollisionPolicy {
        self.collisions
    }

    /// Normalize a single item. Never fails; malformed fields fall back to defaults.
    pub fn normalize(&self, item: &RawFeedItem) -> Post {
        let words = word_count(&item.content);
        let engagement = self.engagement.engagement_for(item);

        Post {
            guid: item.guid.clone(),
            slug: slug_or_fallback(&item.title, &item.guid),
            title: item.title.clone(),
            content: item.content.clone(),
            description: derive_description(item.description.as_deref(), &item.content),
            link: item.link.clone(),
            author: item.author.clone(),
            pub_date: item.pub_date.clone(),
            reading_time: reading_time(words),
            word_count: words,
            thumbnail: select_thumbnail(item.thumbnail.as_deref(), &item.content),
            categories: item.categories.clone(),
            tags: item.categories.clone(),
            claps: engagement.claps,
            responses: engagement.responses,
        }
    }

    /// Normalize a whole feed in order, applying the slug collision policy.
    pub fn normalize_all(&self, items: &[RawFeedItem]) -> Vec<Post> {
        let mut posts: Vec<Post> = items.iter().map(|item| self.normalize(item)).collect();

        if self.collisions == SlugCollisionPolicy::Suffix {
            let mut registry = SlugRegistry::new();
            for post in &mut posts {
                let claimed = registry.claim(&post.slug, &post.guid);
                if claimed != post.slug {
                    debug!(
                        target = "application::normalize::normalize_all",
                        guid = %post.guid,
                        original = %post.slug,
                        resolved = %claimed,
                        "disambiguated colliding slug"
                    );
                    post.slug = claimed;
                }
            }
        }

        posts
    }
}
