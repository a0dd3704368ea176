use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so that `fetch` can write clean JSON to stdout.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "feedline_cache_hit_total",
            Unit::Count,
            "Total number of post cache lookups served from a fresh entry."
        );
        describe_counter!(
            "feedline_cache_miss_total",
            Unit::Count,
            "Total number of post cache lookups that started a producer run."
        );
        describe_counter!(
            "feedline_cache_coalesced_total",
            Unit::Count,
            "Total number of post cache lookups that joined an in-flight producer run."
        );
        describe_counter!(
            "feedline_feed_fetch_error_total",
            Unit::Count,
            "Total number of failed feed fetches, labelled by error kind."
        );
        describe_histogram!(
            "feedline_feed_fetch_ms",
            Unit::Milliseconds,
            "Upstream feed fetch latency in milliseconds."
        );
    });
}
