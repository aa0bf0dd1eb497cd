pub mod neynar;
pub mod poller;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Message shown when a fetch fails without anything more specific to say.
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to load recent casts";

/// A single cast as returned by the feed provider.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub hash: String,
    pub author_display_name: Option<String>,
    pub author_username: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Casts ordered newest first. Casts sharing a timestamp keep the order the
/// provider returned them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    items: Vec<FeedItem>,
}

impl FeedSnapshot {
    pub fn from_provider_order(mut items: Vec<FeedItem>) -> Self {
        // `sort_by` is stable, which is what keeps ties in provider order.
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self { items }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of one refresh cycle. A new outcome always replaces the previous one.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(FeedSnapshot),
    Failure(String),
}

impl FetchOutcome {
    pub fn from_result(result: Result<Vec<FeedItem>, FeedError>) -> Self {
        match result {
            Ok(items) => FetchOutcome::Success(FeedSnapshot::from_provider_order(items)),
            Err(e) => FetchOutcome::Failure(e.display_message()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeedError {
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Request(String),

    #[error("{0}")]
    Parse(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{}", FALLBACK_ERROR_MESSAGE)]
    Unknown,
}

impl FeedError {
    /// Text shown in place of the cast list when a fetch fails.
    pub fn display_message(&self) -> String {
        match self {
            FeedError::Api { status, message } => format!("API Error: {} - {}", status, message),
            FeedError::Request(message) | FeedError::Parse(message) if !message.is_empty() => {
                message.clone()
            }
            FeedError::Timeout(_) => self.to_string(),
            _ => FALLBACK_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FeedError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            }
        } else {
            FeedError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(err.to_string())
    }
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch up to `limit` recent casts in provider order.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<FeedItem>, FeedError>;
}

#[cfg(test)]
pub(crate) fn test_item(hash: &str, timestamp: &str) -> FeedItem {
    FeedItem {
        hash: hash.to_string(),
        author_display_name: Some(format!("Author {}", hash)),
        author_username: Some(hash.to_lowercase()),
        text: format!("cast {}", hash),
        timestamp: DateTime::parse_from_rfc3339(timestamp)
            .unwrap()
            .with_timezone(&Utc),
    }
}
