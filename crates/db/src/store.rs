//! Store trait shared by the HTTP layer and the refresh job.

use crate::models::{Channel, ChannelSnapshot};
use crate::queries;
use async_trait::async_trait;
use chanwatch_core::{SortBy, StatsRecord};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("channel {0} is already tracked")]
    Duplicate(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub skip: i64,
    pub limit: i64,
    pub sort: SortBy,
}

/// What a committed refresh cycle wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshCommit {
    pub updated: u64,
    pub snapshots: u64,
}

#[async_trait]
pub trait ChannelStore: Send + Sync {
    async fn list_channels(&self, query: ListQuery) -> StoreResult<Vec<Channel>>;

    async fn get_channel(&self, channel_id: &str) -> StoreResult<Option<Channel>>;

    async fn channel_exists(&self, channel_id: &str) -> StoreResult<bool>;

    /// Insert a channel and its initial snapshot as one unit.
    /// Fails with [`StoreError::Duplicate`] if the id is already tracked.
    async fn create_channel(&self, stats: &StatsRecord) -> StoreResult<Channel>;

    async fn tracked_channel_ids(&self) -> StoreResult<Vec<String>>;

    /// Apply `updates`, then append one snapshot for every id in `tracked`
    /// that still exists, all in one batch.
    async fn apply_refresh(
        &self,
        updates: &[StatsRecord],
        tracked: &[String],
    ) -> StoreResult<RefreshCommit>;

    /// Newest-first history, at most `limit` rows.
    async fn history(&self, channel_id: &str, limit: i64) -> StoreResult<Vec<ChannelSnapshot>>;

    /// Remove a channel and all of its history. `false` if unknown.
    async fn delete_channel(&self, channel_id: &str) -> StoreResult<bool>;

    async fn ping(&self) -> StoreResult<()>;
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ChannelStore for PgStore {
    async fn list_channels(&self, query: ListQuery) -> StoreResult<Vec<Channel>> {
        Ok(queries::channels::list(&self.pool, query.skip, query.limit, query.sort).await?)
    }

    async fn get_channel(&self, channel_id: &str) -> StoreResult<Option<Channel>> {
        Ok(queries::channels::get_by_channel_id(&self.pool, channel_id).await?)
    }

    async fn channel_exists(&self, channel_id: &str) -> StoreResult<bool> {
        Ok(queries::channels::exists(&self.pool, channel_id).await?)
    }

    async fn create_channel(&self, stats: &StatsRecord) -> StoreResult<Channel> {
        queries::channels::create_with_snapshot(&self.pool, stats)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    StoreError::Duplicate(stats.channel_id.clone())
                }
                other => StoreError::Database(other),
            })
    }

    async fn tracked_channel_ids(&self) -> StoreResult<Vec<String>> {
        Ok(queries::channels::list_channel_ids(&self.pool).await?)
    }

    async fn apply_refresh(
        &self,
        updates: &[StatsRecord],
        tracked: &[String],
    ) -> StoreResult<RefreshCommit> {
        let (updated, snapshots) =
            queries::channels::apply_refresh(&self.pool, updates, tracked).await?;
        Ok(RefreshCommit { updated, snapshots })
    }

    async fn history(&self, channel_id: &str, limit: i64) -> StoreResult<Vec<ChannelSnapshot>> {
        Ok(queries::history::list_recent(&self.pool, channel_id, limit).await?)
    }

    async fn delete_channel(&self, channel_id: &str) -> StoreResult<bool> {
        Ok(queries::channels::delete(&self.pool, channel_id).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_error_message() {
        let err = StoreError::Duplicate("UC123".to_string());
        assert_eq!(err.to_string(), "channel UC123 is already tracked");
    }

    #[test]
    fn test_database_error_is_transparent() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.to_string(), sqlx::Error::PoolTimedOut.to_string());
    }
}
