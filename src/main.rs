use std::{
    io::{self, Write},
    process,
    sync::Arc,
};

use feedline::{
    application::{
        engagement::{EngagementSource, NoEngagement, PlaceholderEngagement},
        error::AppError,
        normalize::PostNormalizer,
        posts::PostsService,
    },
    cache::{CacheConfig, TtlCache},
    config::{self, FetchArgs},
    infra::{
        error::InfraError,
        feed_client::Rss2JsonClient,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Fetch(args) => run_fetch(settings, args).await,
    }
}

fn build_posts_service(settings: &config::Settings) -> Result<PostsService, AppError> {
    let source = Rss2JsonClient::new(&settings.feed)?;
    info!(
        target = "main::build_posts_service",
        url = %source.request_url(),
        ttl_secs = settings.cache.ttl.as_secs(),
        slug_collisions = settings.feed.slug_collisions.as_str(),
        "feed source configured"
    );

    let engagement: Arc<dyn EngagementSource> = if settings.feed.placeholder_engagement {
        Arc::new(PlaceholderEngagement)
    } else {
        Arc::new(NoEngagement)
    };
    let normalizer = PostNormalizer::new(engagement, settings.feed.slug_collisions);
    let cache = TtlCache::new(&CacheConfig::from(&settings.cache));

    Ok(PostsService::new(Arc::new(source), normalizer, cache))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let posts = Arc::new(build_posts_service(&settings)?);
    let state = HttpState::new(
        posts,
        settings.server.public_site_url.clone(),
        &settings.http,
    );
    if state.public_site_url.is_none() {
        warn!(
            target = "main::run_serve",
            "server.public_site_url is not set, sitemap.xml and robots.txt will return 404"
        );
    }
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "main::run_serve", addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "main::run_serve", "server stopped");
    Ok(())
}

async fn run_fetch(settings: config::Settings, args: FetchArgs) -> Result<(), AppError> {
    let posts = build_posts_service(&settings)?;
    let snapshot = posts.snapshot().await?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(snapshot.as_slice())
    } else {
        serde_json::to_string(snapshot.as_slice())
    }
    .map_err(|err| AppError::unexpected(format!("failed to serialize posts: {err}")))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(target = "main::run_fetch", posts = snapshot.len(), "fetch complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "main::shutdown_signal", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "main::shutdown_signal", "shutdown signal received");
}
