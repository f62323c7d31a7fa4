use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized statistics for one channel as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub subscriber_count: i64,
    pub video_count: i64,
    pub view_count: i64,
}

/// Columns a channel listing may be ordered by. Ordering is always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    SubscriberCount,
    VideoCount,
    ViewCount,
}

impl SortBy {
    pub const ALL: [SortBy; 3] = [SortBy::SubscriberCount, SortBy::VideoCount, SortBy::ViewCount];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::SubscriberCount => "subscriber_count",
            SortBy::VideoCount => "video_count",
            SortBy::ViewCount => "view_count",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported sort key `{0}`, expected one of subscriber_count, video_count, view_count")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortBy {
    type Err = UnknownSortKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SortBy::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| UnknownSortKey(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_parses_known_keys() {
        assert_eq!("subscriber_count".parse::<SortBy>(), Ok(SortBy::SubscriberCount));
        assert_eq!("video_count".parse::<SortBy>(), Ok(SortBy::VideoCount));
        assert_eq!("view_count".parse::<SortBy>(), Ok(SortBy::ViewCount));
    }

    #[test]
    fn test_sort_by_rejects_unknown_key() {
        let err = "title".parse::<SortBy>().unwrap_err();
        assert_eq!(err, UnknownSortKey("title".to_string()));
        assert!(err.to_string().contains("`title`"));
    }

    #[test]
    fn test_sort_by_is_case_sensitive() {
        assert!("Subscriber_Count".parse::<SortBy>().is_err());
    }

    #[test]
    fn test_sort_by_defaults_to_subscribers() {
        assert_eq!(SortBy::default(), SortBy::SubscriberCount);
    }

    #[test]
    fn test_sort_by_serde_matches_column_names() {
        for key in SortBy::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }
}
