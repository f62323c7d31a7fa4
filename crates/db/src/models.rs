use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Channel {
    pub id: i64,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub subscriber_count: i64,
    pub video_count: i64,
    pub view_count: i64,
    pub last_updated: DateTime<Utc>,
}

/// One row of `channel_history`. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChannelSnapshot {
    pub id: i64,
    pub channel_id: String,
    pub subscriber_count: i64,
    pub video_count: i64,
    pub view_count: i64,
    pub timestamp: DateTime<Utc>,
}
