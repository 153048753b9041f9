// src/error.rs
//! Error taxonomy for the feed pipeline.
//!
//! Source failures are data (`SourceError`) collected by the aggregator; only
//! cache and refresh failures are real error enums.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One source's fetch failed (network, parse, timeout or panic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source: String,
    pub cause: String,
}

impl SourceError {
    pub fn new(source: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            source: source.into(),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source '{}' failed: {}", self.source, self.cause)
    }
}

impl std::error::Error for SourceError {}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache backend rejected request: {0}")]
    Remote(String),

    #[error("feed generated at {incoming} is older than stored feed generated at {stored}")]
    Superseded {
        incoming: DateTime<Utc>,
        stored: DateTime<Utc>,
    },
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("all {} sources failed", .errors.len())]
    AllSourcesFailed { errors: Vec<SourceError> },
}
