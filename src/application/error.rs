use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{application::posts::FeedError, config::LoadError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::application::source::FetchError;

    use super::*;

    #[test]
    fn app_error_reports_the_underlying_failure() {
        let error = AppError::from(FeedError::Fetch(FetchError::UpstreamHttp { status: 503 }));
        assert_eq!(error.to_string(), "feed proxy responded with HTTP 503");

        let error = AppError::from(LoadError::Invalid {
            key: "feed.url",
            reason: "must be set".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "invalid configuration for `feed.url`: must be set"
        );
    }

    #[test]
    fn http_error_keeps_detail_out_of_the_body() {
        let response = HttpError::new(
            "test",
            StatusCode::NOT_FOUND,
            "Post not found",
            "slug `missing` did not match",
        )
        .into_response();

        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["slug `missing` did not match"]);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
