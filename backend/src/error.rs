//! Application error type
//!
//! Every handler returns `AppResult<T>`; errors render as the standard
//! `ApiResponse` error envelope.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),

    /// Cluster call failed; carries the full context chain
    #[error("Kubernetes error: {0}")]
    Cluster(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn not_found(msg: &str) -> Self {
        AppError::NotFound(msg.to_string())
    }

    pub fn bad_request(msg: &str) -> Self {
        AppError::BadRequest(msg.to_string())
    }

    pub fn unauthorized(msg: &str) -> Self {
        AppError::Unauthorized(msg.to_string())
    }

    pub fn forbidden(msg: &str) -> Self {
        AppError::Forbidden(msg.to_string())
    }

    pub fn internal(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }

    /// Convert a cluster client failure, keeping 404s from the API server as not found
    pub fn cluster(err: anyhow::Error) -> Self {
        let api_status = err
            .chain()
            .find_map(|e| match e.downcast_ref::<kube::Error>() {
                Some(kube::Error::Api(response)) => Some(response.code),
                _ => None,
            });

        match api_status {
            Some(404) => AppError::NotFound(format!("{:#}", err)),
            _ => AppError::Cluster(format!("{:#}", err)),
        }
    }

    /// Error code used in the response envelope
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Kubernetes(_) | AppError::Cluster(_) => "KUBERNETES_ERROR",
            AppError::Serialization(_) => "JSON_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::Internal(msg)
            | AppError::Cluster(msg) => msg.clone(),
            AppError::Database(err) => err.to_string(),
            AppError::Kubernetes(err) => err.to_string(),
            AppError::Serialization(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
            }
            AppError::Kubernetes(_) | AppError::Cluster(_) => {
                tracing::warn!(error = %self, "Kubernetes request failed");
            }
            _ => {}
        }
        ApiResponse::error(self.code(), self.message()).into_response()
    }
}
