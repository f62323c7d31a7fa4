//! In-memory [`ChannelStore`] for tests.
//!
//! Mirrors the Postgres semantics the rest of the system relies on: unique
//! channel ids, one snapshot on create, cascade delete and newest-first
//! history ordered by `(timestamp, id)`.

use crate::models::{Channel, ChannelSnapshot};
use crate::store::{ChannelStore, ListQuery, RefreshCommit, StoreError, StoreResult};
use async_trait::async_trait;
use chanwatch_core::{SortBy, StatsRecord};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    channels: Vec<Channel>,
    history: Vec<ChannelSnapshot>,
    next_channel_id: i64,
    next_history_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    // Never goes backwards, so history order matches insertion order.
    fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(now);
        now
    }

    fn snapshot(&mut self, channel_id: &str) -> Option<ChannelSnapshot> {
        let (subscriber_count, video_count, view_count) = self
            .channels
            .iter()
            .find(|c| c.channel_id == channel_id)
            .map(|c| (c.subscriber_count, c.video_count, c.view_count))?;

        let timestamp = self.now();
        self.next_history_id += 1;
        let row = ChannelSnapshot {
            id: self.next_history_id,
            channel_id: channel_id.to_string(),
            subscriber_count,
            video_count,
            view_count,
            timestamp,
        };
        self.history.push(row.clone());
        Some(row)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn history_len(&self, channel_id: &str) -> usize {
        self.state
            .read()
            .await
            .history
            .iter()
            .filter(|h| h.channel_id == channel_id)
            .count()
    }

    pub async fn total_history_len(&self) -> usize {
        self.state.read().await.history.len()
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn sort_value(channel: &Channel, key: SortBy) -> i64 {
    match key {
        SortBy::SubscriberCount => channel.subscriber_count,
        SortBy::VideoCount => channel.video_count,
        SortBy::ViewCount => channel.view_count,
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn list_channels(&self, query: ListQuery) -> StoreResult<Vec<Channel>> {
        self.check()?;
        let state = self.state.read().await;
        let mut channels = state.channels.clone();
        channels.sort_by(|a, b| {
            sort_value(b, query.sort)
                .cmp(&sort_value(a, query.sort))
                .then(a.id.cmp(&b.id))
        });
        Ok(channels
            .into_iter()
            .skip(query.skip.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn get_channel(&self, channel_id: &str) -> StoreResult<Option<Channel>> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .channels
            .iter()
            .find(|c| c.channel_id == channel_id)
            .cloned())
    }

    async fn channel_exists(&self, channel_id: &str) -> StoreResult<bool> {
        Ok(self.get_channel(channel_id).await?.is_some())
    }

    async fn create_channel(&self, stats: &StatsRecord) -> StoreResult<Channel> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.channels.iter().any(|c| c.channel_id == stats.channel_id) {
            return Err(StoreError::Duplicate(stats.channel_id.clone()));
        }

        let last_updated = state.now();
        state.next_channel_id += 1;
        let channel = Channel {
            id: state.next_channel_id,
            channel_id: stats.channel_id.clone(),
            title: stats.title.clone(),
            description: stats.description.clone(),
            published_at: stats.published_at,
            subscriber_count: stats.subscriber_count,
            video_count: stats.video_count,
            view_count: stats.view_count,
            last_updated,
        };
        state.channels.push(channel.clone());
        state.snapshot(&channel.channel_id);

        Ok(channel)
    }

    async fn tracked_channel_ids(&self) -> StoreResult<Vec<String>> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.channels.iter().map(|c| c.channel_id.clone()).collect())
    }

    async fn apply_refresh(
        &self,
        updates: &[StatsRecord],
        tracked: &[String],
    ) -> StoreResult<RefreshCommit> {
        self.check()?;
        let mut state = self.state.write().await;
        let mut commit = RefreshCommit::default();

        for stats in updates {
            let now = state.now();
            if let Some(channel) = state
                .channels
                .iter_mut()
                .find(|c| c.channel_id == stats.channel_id)
            {
                channel.title = stats.title.clone();
                channel.description = stats.description.clone();
                channel.subscriber_count = stats.subscriber_count;
                channel.video_count = stats.video_count;
                channel.view_count = stats.view_count;
                channel.last_updated = now;
                commit.updated += 1;
            }
        }

        for channel_id in tracked {
            if state.snapshot(channel_id).is_some() {
                commit.snapshots += 1;
            }
        }

        Ok(commit)
    }

    async fn history(&self, channel_id: &str, limit: i64) -> StoreResult<Vec<ChannelSnapshot>> {
        self.check()?;
        let state = self.state.read().await;
        let mut rows: Vec<ChannelSnapshot> = state
            .history
            .iter()
            .filter(|h| h.channel_id == channel_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn delete_channel(&self, channel_id: &str) -> StoreResult<bool> {
        self.check()?;
        let mut state = self.state.write().await;
        let before = state.channels.len();
        state.channels.retain(|c| c.channel_id != channel_id);
        if state.channels.len() == before {
            return Ok(false);
        }
        state.history.retain(|h| h.channel_id != channel_id);
        Ok(true)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check()
    }
}
