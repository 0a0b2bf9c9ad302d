use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use vetrina_api_types::{ApiErrorBody, ApiErrorMessage};

use crate::domain::error::DomainError;
use crate::infra::error::InfraError;
use crate::infra::fetch::FetchError;
use crate::infra::script::ScriptError;

/// Structured diagnostics attached to error responses so the shared logging
/// middleware can emit the full cause chain without leaking it to clients.
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

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Eval(#[from] ScriptError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Error kind label for logs and metrics. Clients never see this split;
    /// every kind collapses to the same generic response.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::Eval(_) => "eval",
            AppError::Domain(DomainError::MalformedHash { .. }) => "malformed_hash",
            AppError::Domain(_) => "domain",
            AppError::Infra(_) => "infra",
            AppError::Unexpected(_) => "unexpected",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Detail stays server-side: one generic body for every error kind.
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: "internal_error".to_string(),
                message: "Internal processing error".to_string(),
                hint: None,
            },
        };
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
