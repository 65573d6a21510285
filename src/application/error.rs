use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        accounts::AccountError, blog::BlogError, catalog::CatalogError, repos::RepoError,
        sessions::SessionError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
    presentation::views::render_error_page,
};

/// Diagnostic attached to error responses and emitted by the response logger.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

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

/// An error that ends a request with a rendered error page.
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

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn not_found(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(source, StatusCode::NOT_FOUND, "Page not found", error)
    }

    pub fn forbidden(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::FORBIDDEN,
            "You do not have permission to do that",
            error,
        )
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = render_error_page(self.status, self.public_message);
        self.report.attach(&mut response);
        response
    }
}

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        let source = "application::error::repo_error_to_http";
        match &error {
            RepoError::NotFound => HttpError::not_found(source, &error),
            RepoError::Timeout => HttpError::from_error(
                source,
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
                &error,
            ),
            _ => HttpError::internal(source, &error),
        }
    }
}

impl From<BlogError> for HttpError {
    fn from(error: BlogError) -> Self {
        let source = "application::error::blog_error_to_http";
        match error {
            BlogError::Repo(err) => err.into(),
            other => HttpError::not_found(source, &other),
        }
    }
}

impl From<SessionError> for HttpError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Repo(err) => err.into(),
        }
    }
}

impl From<AccountError> for HttpError {
    fn from(error: AccountError) -> Self {
        let source = "application::error::account_error_to_http";
        match error {
            AccountError::Repo(err) => err.into(),
            AccountError::UnknownUser(_) => HttpError::not_found(source, &error),
            AccountError::Invalid(_) | AccountError::InvalidCredentials => HttpError::from_error(
                source,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Request could not be processed",
                &error,
            ),
            AccountError::Password(_) => HttpError::internal(source, &error),
        }
    }
}

/// Failures surfaced by the command line and server bootstrap.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
