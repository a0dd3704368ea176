//! Port for the upstream feed.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::RawFeedItem;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("feed transport failed: {0}")]
    Transport(String),
    #[error("feed proxy responded with HTTP {status}")]
    UpstreamHttp { status: u16 },
    #[error("feed proxy reported status `{status}`{}", detail_suffix(.message))]
    UpstreamLogical {
        status: String,
        message: Option<String>,
    },
}

impl FetchError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::UpstreamHttp { .. } => "upstream_http",
            Self::UpstreamLogical { .. } => "upstream_logical",
        }
    }
}

fn detail_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

/// Anything that can produce the raw items of the feed, in feed order.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawFeedItem>, FetchError>;
}
