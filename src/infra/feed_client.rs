//! HTTP adapter for the RSS-to-JSON proxy.

use async_trait::async_trait;
use reqwest::{Client, Url, header::ACCEPT};
use tracing::{debug, warn};

use crate::{
    application::source::{FeedSource, FetchError},
    config::FeedSettings,
    domain::entities::{RawFeedItem, RawFeedResponse},
    infra::error::InfraError,
};

const FEED_QUERY_PARAM: &str = "rss_url";
const PROXY_STATUS_OK: &str = "ok";

/// Fetches one feed through an rss2json-style proxy: `GET {proxy}?rss_url={feed}`.
#[derive(Clone, Debug)]
pub struct Rss2JsonClient {
    client: Client,
    request_url: Url,
}

impl Rss2JsonClient {
    pub fn new(settings: &FeedSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::client(format!("failed to build feed client: {err}")))?;

        Ok(Self {
            client,
            request_url: request_url(&settings.proxy_base, &settings.url),
        })
    }

    pub fn request_url(&self) -> &Url {
        &self.request_url
    }
}

/// Proxy URL with the feed URL attached as its `rss_url` query parameter.
pub fn request_url(proxy_base: &Url, feed_url: &Url) -> Url {
    let mut url = proxy_base.clone();
    url.query_pairs_mut()
        .append_pair(FEED_QUERY_PARAM, feed_url.as_str());
    url
}

#[async_trait]
impl FeedSource for Rss2JsonClient {
    async fn fetch(&self) -> Result<Vec<RawFeedItem>, FetchError> {
        let response = self
            .client
            .get(self.request_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target = "infra::feed_client::fetch",
                status = status.as_u16(),
                url = %self.request_url,
                "feed proxy returned an error status"
            );
            return Err(FetchError::UpstreamHttp {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(FetchError::transport)?;
        let payload: RawFeedResponse = serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::transport(format!("invalid feed payload: {err}")))?;

        if payload.status != PROXY_STATUS_OK {
            warn!(
                target = "infra::feed_client::fetch",
                proxy_status = %payload.status,
                message = payload.message.as_deref().unwrap_or(""),
                "feed proxy reported a failure"
            );
            return Err(FetchError::UpstreamLogical {
                status: payload.status,
                message: payload.message,
            });
        }

        debug!(
            target = "infra::feed_client::fetch",
            items = payload.items.len(),
            feed_title = payload.feed.as_ref().map(|feed| feed.title.as_str()).unwrap_or(""),
            "feed fetched"
        );
        Ok(payload.items)
    }
}
