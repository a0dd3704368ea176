use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::warn;
use url::Url;

use crate::{
    application::{
        error::HttpError,
        posts::PostsService,
        sitemap::{render_robots_txt, render_sitemap_xml},
    },
    config::HttpSettings,
    domain::entities::Post,
};

use super::middleware::{log_responses, set_request_context};

const NO_STORE: &str = "no-store";

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostsService>,
    pub public_site_url: Option<Url>,
    pub list_cache_control: HeaderValue,
}

impl HttpState {
    pub fn new(posts: Arc<PostsService>, public_site_url: Option<Url>, http: &HttpSettings) -> Self {
        let list_cache_control = HeaderValue::from_str(&http.cache_control(posts.cache_ttl()))
            .unwrap_or_else(|_| HeaderValue::from_static(NO_STORE));
        Self {
            posts,
            public_site_url,
            list_cache_control,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/medium-posts", get(list_posts))
        .route("/api/medium-posts/featured", get(featured_post))
        .route("/api/medium-posts/categories", get(list_categories))
        .route("/api/medium-posts/{slug}", get(post_by_slug))
        .route("/api/medium-posts/{slug}/related", get(related_posts))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
        .route("/_health", get(health))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn list_posts(State(state): State<HttpState>) -> Response {
    match state.posts.snapshot().await {
        Ok(posts) => {
            let mut response = Json(posts.as_slice()).into_response();
            response
                .headers_mut()
                .insert(CACHE_CONTROL, state.list_cache_control.clone());
            response
        }
        Err(err) => {
            warn!(
                target = "infra::http::public::list_posts",
                kind = err.kind(),
                error = %err,
                "feed unavailable, serving empty post list"
            );
            let mut response = Json(Vec::<Post>::new()).into_response();
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
            response
        }
    }
}

async fn featured_post(State(state): State<HttpState>) -> Response {
    match state.posts.get_featured().await {
        Some(post) => Json(post).into_response(),
        None => HttpError::new(
            "infra::http::public::featured_post",
            StatusCode::NOT_FOUND,
            "Post not found",
            "no posts available",
        )
        .into_response(),
    }
}

async fn list_categories(State(state): State<HttpState>) -> Response {
    Json(state.posts.list_categories().await).into_response()
}

async fn post_by_slug(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.posts.get_by_slug(&slug).await {
        Some(post) => Json(post).into_response(),
        None => HttpError::new(
            "infra::http::public::post_by_slug",
            StatusCode::NOT_FOUND,
            "Post not found",
            format!("slug `{slug}` did not match any post"),
        )
        .into_response(),
    }
}

async fn related_posts(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    Json(state.posts.get_related(&slug).await).into_response()
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    let Some(base) = state.public_site_url.as_ref() else {
        return site_url_missing("infra::http::public::sitemap");
    };
    let entries = state.posts.list_for_sitemap().await;
    xml_response(render_sitemap_xml(base, &entries), "application/xml")
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    let Some(base) = state.public_site_url.as_ref() else {
        return site_url_missing("infra::http::public::robots");
    };
    plain_response(render_robots_txt(base))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found(request: Request<Body>) -> Response {
    HttpError::new(
        "infra::http::public::not_found",
        StatusCode::NOT_FOUND,
        "Not found",
        format!("no route for `{}`", request.uri().path()),
    )
    .into_response()
}

fn site_url_missing(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Not found",
        "server.public_site_url is not configured",
    )
    .into_response()
}

fn xml_response(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn plain_response(body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
