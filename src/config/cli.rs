use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Feedline binary.
#[derive(Debug, Parser)]
#[command(name = "feedline", version, about = "Feedline post aggregation service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FEEDLINE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Feedline HTTP service.
    Serve(Box<ServeArgs>),
    /// Fetch and normalize the feed once, printing the posts as JSON.
    Fetch(FetchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub feed: FeedOverrides,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FeedOverrides {
    /// Override the RSS feed URL.
    #[arg(long = "feed-url", value_name = "URL")]
    pub feed_url: Option<String>,

    /// Override the RSS-to-JSON proxy endpoint.
    #[arg(long = "feed-proxy-base", value_name = "URL")]
    pub proxy_base: Option<String>,

    /// Override the upstream request timeout.
    #[arg(long = "feed-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the slug collision policy (keep|suffix).
    #[arg(long = "feed-slug-collisions", value_name = "POLICY")]
    pub slug_collisions: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub feed: FeedOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the public site URL used in sitemap links.
    #[arg(long = "server-public-site-url", value_name = "URL")]
    pub public_site_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the post cache time-to-live.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,
}
