//! Configuration management
//!
//! Settings are read from the environment (and `.env`, if present) once at
//! startup. Dispatch settings that fail to parse fall back to their defaults
//! with a logged warning instead of failing the process.

use crate::dispatcher::DispatchRequest;
use crate::error::ConfigError;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TARGET_URL: &str = "https://www.google.com";
pub const DEFAULT_REQUEST_COUNT: u64 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HANDLER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URL every dispatched GET is sent to
    pub target_url: String,
    /// Number of GETs per trigger
    pub request_count: u64,
    /// Deadline for a single outbound GET
    pub request_timeout: Duration,
    /// Server port
    pub server_port: u16,
    /// Inbound handler timeout in seconds
    pub handler_timeout_secs: u64,
}

fn parse_integer(key: &'static str, raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidInteger {
            key,
            value: raw.to_string(),
        })
}

/// Negative counts are valid input and mean "send nothing".
pub fn parse_request_count(raw: &str) -> Result<u64, ConfigError> {
    let count = parse_integer("REQUEST_COUNT", raw)?;
    Ok(u64::try_from(count).unwrap_or(0))
}

pub fn parse_timeout_secs(raw: &str) -> Result<u64, ConfigError> {
    let secs = parse_integer("TIMEOUT", raw)?;
    match u64::try_from(secs) {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::OutOfRange {
            key: "TIMEOUT",
            value: secs,
        }),
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok(); // Load .env if present

        Self::resolve(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let target_url = match lookup("TARGET_URL") {
            Some(url) if !url.trim().is_empty() => url,
            Some(_) => {
                warn!(
                    default = DEFAULT_TARGET_URL,
                    "TARGET_URL is empty, using default"
                );
                DEFAULT_TARGET_URL.to_string()
            }
            None => DEFAULT_TARGET_URL.to_string(),
        };

        let request_count = lookup("REQUEST_COUNT")
            .map(|raw| {
                parse_request_count(&raw).unwrap_or_else(|e| {
                    warn!(error = %e, default = DEFAULT_REQUEST_COUNT, "Invalid REQUEST_COUNT, using default");
                    DEFAULT_REQUEST_COUNT
                })
            })
            .unwrap_or(DEFAULT_REQUEST_COUNT);

        let timeout_secs = lookup("TIMEOUT")
            .map(|raw| {
                parse_timeout_secs(&raw).unwrap_or_else(|e| {
                    warn!(error = %e, default = DEFAULT_TIMEOUT_SECS, "Invalid TIMEOUT, using default");
                    DEFAULT_TIMEOUT_SECS
                })
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            target_url,
            request_count,
            request_timeout: Duration::from_secs(timeout_secs),

            server_port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),

            handler_timeout_secs: lookup("HANDLER_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HANDLER_TIMEOUT_SECS),
        }
    }

    /// A fresh dispatch for one trigger invocation.
    pub fn dispatch_request(&self) -> DispatchRequest {
        DispatchRequest::new(
            self.target_url.clone(),
            self.request_count,
            self.request_timeout,
        )
    }
}
