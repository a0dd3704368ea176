//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::slug::SlugCollisionPolicy;

mod cli;

pub use cli::{CliArgs, Command, FeedOverrides, FetchArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "feedline";
const ENV_PREFIX: &str = "FEEDLINE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PROXY_BASE: &str = "https://api.rss2json.com/v1/api.json";
const DEFAULT_FEED_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;
const DEFAULT_STALE_WHILE_REVALIDATE_FACTOR: u32 = 2;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub feed: FeedSettings,
    pub cache: CacheSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub public_site_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub url: Url,
    pub proxy_base: Url,
    pub user_agent: String,
    pub timeout: Duration,
    pub slug_collisions: SlugCollisionPolicy,
    pub placeholder_engagement: bool,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub stale_while_revalidate_factor: NonZeroU32,
}

impl HttpSettings {
    /// `Cache-Control` value for successful post listings.
    pub fn cache_control(&self, ttl: Duration) -> String {
        let max_age = ttl.as_secs();
        let stale = max_age.saturating_mul(u64::from(self.stale_while_revalidate_factor.get()));
        format!("public, s-maxage={max_age}, stale-while-revalidate={stale}")
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Fetch(args)) => raw.apply_feed_overrides(&args.feed),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    feed: RawFeedSettings,
    cache: RawCacheSettings,
    http: RawHttpSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(url) = overrides.public_site_url.as_ref() {
            self.server.public_site_url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }

        self.apply_feed_overrides(&overrides.feed);
    }

    fn apply_feed_overrides(&mut self, overrides: &FeedOverrides) {
        if let Some(url) = overrides.feed_url.as_ref() {
            self.feed.url = Some(url.clone());
        }
        if let Some(base) = overrides.proxy_base.as_ref() {
            self.feed.proxy_base = Some(base.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.feed.timeout_seconds = Some(seconds);
        }
        if let Some(policy) = overrides.slug_collisions.as_ref() {
            self.feed.slug_collisions = Some(policy.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            feed,
            cache,
            http,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let feed = build_feed_settings(feed)?;
        let cache = build_cache_settings(cache)?;
        let http = build_http_settings(http)?;

        Ok(Self {
            server,
            logging,
            feed,
            cache,
            http,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let public_site_url = non_blank(server.public_site_url)
        .map(|value| parse_http_url(&value, "server.public_site_url"))
        .transpose()?;

    Ok(ServerSettings {
        addr,
        public_site_url,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_feed_settings(feed: RawFeedSettings) -> Result<FeedSettings, LoadError> {
    let url = non_blank(feed.url).ok_or_else(|| LoadError::invalid("feed.url", "must be set"))?;
    let url = parse_http_url(&url, "feed.url")?;

    let proxy_base = non_blank(feed.proxy_base).unwrap_or_else(|| DEFAULT_PROXY_BASE.to_string());
    let proxy_base = parse_http_url(&proxy_base, "feed.proxy_base")?;

    let user_agent = non_blank(feed.user_agent)
        .unwrap_or_else(|| format!("feedline/{}", env!("CARGO_PKG_VERSION")));

    let timeout_secs = feed.timeout_seconds.unwrap_or(DEFAULT_FEED_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "feed.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let slug_collisions = match non_blank(feed.slug_collisions) {
        Some(value) => SlugCollisionPolicy::from_str(&value)
            .map_err(|reason| LoadError::invalid("feed.slug_collisions", reason))?,
        None => SlugCollisionPolicy::default(),
    };

    Ok(FeedSettings {
        url,
        proxy_base,
        user_agent,
        timeout: Duration::from_secs(timeout_secs),
        slug_collisions,
        placeholder_engagement: feed.placeholder_engagement.unwrap_or(true),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        ttl: Duration::from_secs(ttl_seconds),
    })
}

fn build_http_settings(http: RawHttpSettings) -> Result<HttpSettings, LoadError> {
    let factor = http
        .stale_while_revalidate_factor
        .unwrap_or(DEFAULT_STALE_WHILE_REVALIDATE_FACTOR);
    let stale_while_revalidate_factor = NonZeroU32::new(factor).ok_or_else(|| {
        LoadError::invalid(
            "http.stale_while_revalidate_factor",
            "must be greater than zero",
        )
    })?;

    Ok(HttpSettings {
        stale_while_revalidate_factor,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    public_site_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFeedSettings {
    url: Option<String>,
    proxy_base: Option<String>,
    user_agent: Option<String>,
    timeout_seconds: Option<u64>,
    slug_collisions: Option<String>,
    placeholder_engagement: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHttpSettings {
    stale_while_revalidate_factor: Option<u32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_http_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value)
        .map_err(|err| LoadError::invalid(key, format!("invalid URL `{value}`: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`, expected http or https"),
        )),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
