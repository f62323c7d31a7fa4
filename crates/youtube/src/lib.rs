//! Client for the YouTube Data API `channels.list` endpoint.
//!
//! The only thing the rest of the system needs from YouTube is a normalized
//! [`StatsRecord`] per channel id, so the client exposes exactly that through
//! the [`StatsClient`] trait. An id YouTube does not know about is reported as
//! `Ok(None)`, never as an error.

use async_trait::async_trait;
use chanwatch_core::StatsRecord;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[async_trait]
pub trait StatsClient: Send + Sync {
    /// Fetch current statistics for `channel_id`. `Ok(None)` means the remote
    /// service has no channel with that id.
    async fn fetch(&self, channel_id: &str) -> Result<Option<StatsRecord>, FetchError>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("ClientBuild: {source}")]
    ClientBuild { source: reqwest::Error },

    #[error("RequestSend: {source}")]
    RequestSend { source: reqwest::Error },

    #[error("ResponseRead: {source}")]
    ResponseRead { source: reqwest::Error },

    #[error("Status: youtube api returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode: {source}")]
    Decode { source: serde_json::Error },

    #[error("InvalidCount: {field} = `{value}`")]
    InvalidCount { field: &'static str, value: String },
}

#[derive(Clone)]
pub struct YoutubeClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for YoutubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YoutubeClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl StatsClient for YoutubeClient {
    async fn fetch(&self, channel_id: &str) -> Result<Option<StatsRecord>, FetchError> {
        let url = format!("{}/channels", self.base_url);

        // The key travels in the query string, so urls are stripped from
        // reqwest errors before they can reach a log line.
        let response = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet,contentDetails,statistics"),
                ("id", channel_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|source| FetchError::RequestSend {
                source: source.without_url(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| FetchError::ResponseRead {
                source: source.without_url(),
            })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let record = parse_channel_list(channel_id, &body)?;
        if record.is_none() {
            tracing::debug!(channel_id, "youtube returned no channel");
        }
        Ok(record)
    }
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    published_at: DateTime<Utc>,
}

// Counts arrive as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<String>,
    video_count: Option<String>,
    view_count: Option<String>,
}

/// Normalize a `channels.list` response body. The first item wins; an empty
/// or absent `items` array yields `None`.
pub fn parse_channel_list(channel_id: &str, body: &str) -> Result<Option<StatsRecord>, FetchError> {
    let response: ChannelListResponse =
        serde_json::from_str(body).map_err(|source| FetchError::Decode { source })?;

    let Some(item) = response.items.into_iter().next() else {
        return Ok(None);
    };

    Ok(Some(StatsRecord {
        channel_id: channel_id.to_string(),
        title: item.snippet.title,
        description: item.snippet.description,
        published_at: item.snippet.published_at,
        subscriber_count: parse_count("subscriberCount", item.statistics.subscriber_count)?,
        video_count: parse_count("videoCount", item.statistics.video_count)?,
        view_count: parse_count("viewCount", item.statistics.view_count)?,
    }))
}

fn parse_count(field: &'static str, raw: Option<String>) -> Result<i64, FetchError> {
    let Some(raw) = raw else {
        return Ok(0);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 0 => Ok(value),
        _ => Err(FetchError::InvalidCount { field, value: raw }),
    }
}
