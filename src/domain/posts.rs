//! Read-only views over a post collection.
//!
//! Everything here works on a borrowed snapshot and preserves feed order
//! unless stated otherwise.

use std::collections::HashSet;

use super::entities::{ChangeFrequency, Post, SitemapEntry};

pub const RELATED_LIMIT: usize = 3;
pub const SITEMAP_CHANGE_FREQUENCY: ChangeFrequency = ChangeFrequency::Monthly;
pub const SITEMAP_PRIORITY: f32 = 0.7;

/// First post carrying `slug`.
pub fn find_by_slug<'a>(posts: &'a [Post], slug: &str) -> Option<&'a Post> {
    posts.iter().find(|post| post.slug == slug)
}

/// Posts ranked by how many categories they share with the post at `slug`.
///
/// The reference post is never part of the result. Ties keep feed order. An
/// unknown slug yields the head of the collection instead.
pub fn related_posts(posts: &[Post], slug: &str, limit: usize) -> Vec<Post> {
    let Some(reference) = find_by_slug(posts, slug) else {
        return posts.iter().take(limit).cloned().collect();
    };

    let mut ranked: Vec<(usize, &Post)> = posts
        .iter()
        .filter(|post| post.slug != slug)
        .map(|post| (reference.shared_categories(post), post))
        .collect();
    ranked.sort_by(|left, right| right.0.cmp(&left.0));

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, post)| post.clone())
        .collect()
}

/// Distinct categories in first-seen order.
pub fn distinct_categories(posts: &[Post]) -> Vec<String> {
    let mut seen = HashSet::new();
    posts
        .iter()
        .flat_map(|post| post.categories.iter())
        .filter(|category| seen.insert(*category))
        .cloned()
        .collect()
}

pub fn sitemap_entries(posts: &[Post]) -> Vec<SitemapEntry> {
    posts
        .iter()
        .map(|post| SitemapEntry {
            slug: post.slug.clone(),
            last_modified: post.published_at(),
            change_frequency: SITEMAP_CHANGE_FREQUENCY,
            priority: SITEMAP_PRIORITY,
        })
        .collect()
}
