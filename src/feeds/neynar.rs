use super::{FeedError, FeedFetcher, FeedItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const NEYNAR_API_BASE: &str = "https://api.neynar.com";

/// Fetches the global cast feed from the Neynar v2 API.
pub struct NeynarFetcher {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    casts: Vec<NeynarCast>,
}

#[derive(Debug, Deserialize)]
struct NeynarCast {
    hash: String,
    #[serde(default)]
    text: String,
    timestamp: String,
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    username: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl NeynarFetcher {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, NEYNAR_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl TryFrom<NeynarCast> for FeedItem {
    type Error = FeedError;

    fn try_from(cast: NeynarCast) -> Result<Self, Self::Error> {
        let timestamp = DateTime::parse_from_rfc3339(&cast.timestamp)
            .map_err(|e| {
                FeedError::Parse(format!(
                    "Invalid timestamp '{}' on cast {}: {}",
                    cast.timestamp, cast.hash, e
                ))
            })?
            .with_timezone(&Utc);

        let (author_username, author_display_name) = match cast.author {
            Some(author) => (author.username, author.display_name),
            None => (None, None),
        };

        Ok(FeedItem {
            hash: cast.hash,
            author_display_name,
            author_username,
            text: cast.text,
            timestamp,
        })
    }
}

#[async_trait]
impl FeedFetcher for NeynarFetcher {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<FeedItem>, FeedError> {
        let url = format!("{}/v2/farcaster/feed", self.base_url);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("feed_type", "filter"),
                ("filter_type", "global_trending"),
                ("limit", limit.as_str()),
            ])
            .header("x-api-key", &self.api_key)
            .header("User-Agent", "castframe")
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(FeedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let feed: FeedResponse = serde_json::from_str(&body)?;

        feed.casts.into_iter().map(FeedItem::try_from).collect()
    }
}
