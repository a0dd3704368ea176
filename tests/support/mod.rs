#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use feedline::{
    application::{
        engagement::NoEngagement,
        normalize::PostNormalizer,
        posts::PostsService,
        source::{FeedSource, FetchError},
    },
    cache::{CacheConfig, TtlCache},
    domain::{entities::RawFeedItem, slug::SlugCollisionPolicy},
};

/// Feed source that replays queued responses, then keeps returning the last fallback.
pub struct ScriptedSource {
    responses: Mutex<Vec<Result<Vec<RawFeedItem>, FetchError>>>,
    fallback: Result<Vec<RawFeedItem>, FetchError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(mut responses: Vec<Result<Vec<RawFeedItem>, FetchError>>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            fallback: Ok(Vec::new()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(response: Result<Vec<RawFeedItem>, FetchError>) -> Self {
        Self {
            fallback: response,
            ..Self::new(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<RawFeedItem>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.responses.lock().expect("responses lock").pop();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn item(title: &str, pub_date: &str, categories: &[&str]) -> RawFeedItem {
    RawFeedItem {
        title: title.to_string(),
        pub_date: pub_date.to_string(),
        link: format!("https://medium.com/@someone/{}", title.to_lowercase().replace(' ', "-")),
        guid: format!("https://medium.com/p/{}", title.len()),
        author: "Someone".to_string(),
        content: format!("<p>{title} body with a handful of words.</p>"),
        categories: categories.iter().map(|value| value.to_string()).collect(),
        ..Default::default()
    }
}

pub fn sample_feed() -> Vec<RawFeedItem> {
    vec![
        item("Open Banking", "2024-03-03 09:00:00", &["fintech", "apis"]),
        item("Payments Rails", "2024-02-20 09:00:00", &["fintech"]),
        item("Sourdough Notes", "2024-01-10 09:00:00", &["cooking"]),
    ]
}

pub fn posts_service(source: Arc<ScriptedSource>, ttl: Duration) -> PostsService {
    PostsService::new(
        source,
        PostNormalizer::new(Arc::new(NoEngagement), SlugCollisionPolicy::Keep),
        TtlCache::new(&CacheConfig { ttl }),
    )
}
