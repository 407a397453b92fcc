//! Error types for the fan-out trigger service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;

/// A configuration value that could not be used; always recovered with a default.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}={value:?} is not an integer")]
    InvalidInteger { key: &'static str, value: String },

    #[error("{key}={value} is out of range")]
    OutOfRange { key: &'static str, value: i64 },
}

/// Why a single outbound attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    Request(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No async runtime available to launch dispatch")]
    NoRuntime,

    #[error("Worker pool closed")]
    PoolClosed,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
