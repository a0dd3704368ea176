//! Query façade over the cached post collection.
//!
//! Every view is derived from one shared snapshot. The degrading accessors
//! never fail: when the feed is unavailable they log and return empty results.

use std::{sync::Arc, time::Duration, time::Instant};

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    application::{
        normalize::PostNormalizer,
        source::{FeedSource, FetchError},
    },
    cache::{FlightAborted, TtlCache},
    domain::{
        entities::{Post, SitemapEntry},
        posts::{RELATED_LIMIT, distinct_categories, find_by_slug, related_posts, sitemap_entries},
    },
};

pub const POSTS_CACHE_KEY: &str = "medium-posts";

const METRIC_FEED_FETCH_MS: &str = "feedline_feed_fetch_ms";
const METRIC_FEED_FETCH_ERROR: &str = "feedline_feed_fetch_error_total";

pub type PostCollection = Arc<Vec<Post>>;

#[derive(Debug, Clone, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Aborted(#[from] FlightAborted),
}

impl FeedError {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Fetch(err) => err.kind(),
            FeedError::Aborted(_) => "aborted",
        }
    }
}

#[derive(Clone)]
pub struct PostsService {
    source: Arc<dyn FeedSource>,
    normalizer: PostNormalizer,
    cache: TtlCache<Vec<Post>, FeedError>,
}

impl PostsService {
    pub fn new(
        source: Arc<dyn FeedSource>,
        normalizer: PostNormalizer,
        cache: TtlCache<Vec<Post>, FeedError>,
    ) -> Self {
        Self {
            source,
            normalizer,
            cache,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// The cached collection, fetching and normalizing the feed on a miss.
    ///
    /// Unlike the other accessors this surfaces upstream failures, so
    /// callers can tell an empty feed from an outage.
    pub async fn snapshot(&self) -> Result<PostCollection, FeedError> {
        let source = Arc::clone(&self.source);
        let normalizer = self.normalizer.clone();

        self.cache
            .get_or_fetch(POSTS_CACHE_KEY, move || async move {
                let started_at = Instant::now();
                let fetched = source.fetch().await;
                histogram!(METRIC_FEED_FETCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

                let items = fetched.inspect_err(|err| {
                    counter!(METRIC_FEED_FETCH_ERROR, "kind" => err.kind()).increment(1);
                })?;
                let posts = normalizer.normalize_all(&items);
                info!(
                    target = "application::posts::snapshot",
                    items = items.len(),
                    posts = posts.len(),
                    "feed refreshed"
                );
                Ok(posts)
            })
            .await
    }

    /// Every post in feed order.
    pub async fn list_all(&self) -> PostCollection {
        self.posts_or_empty("list_all").await
    }

    /// First post whose slug matches.
    pub async fn get_by_slug(&self, slug: &str) -> Option<Post> {
        let posts = self.posts_or_empty("get_by_slug").await;
        find_by_slug(&posts, slug).cloned()
    }

    /// The most recent post, i.e. the first in feed order.
    pub async fn get_featured(&self) -> Option<Post> {
        let posts = self.posts_or_empty("get_featured").await;
        posts.first().cloned()
    }

    /// Up to three posts sharing the most categories with `slug`.
    pub async fn get_related(&self, slug: &str) -> Vec<Post> {
        let posts = self.posts_or_empty("get_related").await;
        related_posts(&posts, slug, RELATED_LIMIT)
    }

    pub async fn list_categories(&self) -> Vec<String> {
        let posts = self.posts_or_empty("list_categories").await;
        distinct_categories(&posts)
    }

    pub async fn list_for_sitemap(&self) -> Vec<SitemapEntry> {
        let posts = self.posts_or_empty("list_for_sitemap").await;
        sitemap_entries(&posts)
    }

    async fn posts_or_empty(&self, op: &'static str) -> PostCollection {
        match self.snapshot().await {
            Ok(posts) => posts,
            Err(err) => {
                warn!(
                    target = "application::posts::posts_or_empty",
                    op,
                    kind = err.kind(),
                    error = %err,
                    "feed unavailable, serving empty result"
                );
                Arc::new(Vec::new())
            }
        }
    }
}
