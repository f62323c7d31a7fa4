//! Channel database operations.
//!
//! A channel row caches the latest statistics for one tracked YouTube channel.
//! Every write that creates or refreshes a channel also appends to
//! `channel_history`, see [`super::history`].

use crate::models::Channel;
use chanwatch_core::{SortBy, StatsRecord};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

const CHANNEL_COLUMNS: &str = "id, channel_id, title, description, published_at, \
                               subscriber_count, video_count, view_count, last_updated";

/// Insert a channel together with its first history snapshot.
///
/// Both rows are written in one transaction, so a channel never exists
/// without history.
pub async fn create_with_snapshot(
    pool: &PgPool,
    stats: &StatsRecord,
) -> Result<Channel, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let channel = sqlx::query_as::<_, Channel>(&format!(
        r#"
        INSERT INTO channels
            (channel_id, title, description, published_at,
             subscriber_count, video_count, view_count, last_updated)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        RETURNING {CHANNEL_COLUMNS}
        "#
    ))
    .bind(&stats.channel_id)
    .bind(&stats.title)
    .bind(&stats.description)
    .bind(stats.published_at)
    .bind(stats.subscriber_count)
    .bind(stats.video_count)
    .bind(stats.view_count)
    .fetch_one(&mut *tx)
    .await?;

    super::history::append(
        &mut tx,
        &channel.channel_id,
        channel.subscriber_count,
        channel.video_count,
        channel.view_count,
    )
    .await?;

    tx.commit().await?;

    Ok(channel)
}

pub async fn get_by_channel_id(
    pool: &PgPool,
    channel_id: &str,
) -> Result<Option<Channel>, sqlx::Error> {
    sqlx::query_as::<_, Channel>(&format!(
        r#"
        SELECT {CHANNEL_COLUMNS}
        FROM channels
        WHERE channel_id = $1
        "#
    ))
    .bind(channel_id)
    .fetch_optional(pool)
    .await
}

pub async fn exists(pool: &PgPool, channel_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM channels WHERE channel_id = $1)")
        .bind(channel_id)
        .fetch_one(pool)
        .await
}

/// List channels with offset pagination.
///
/// Ordered by the chosen count, highest first. Ties keep insertion order.
pub async fn list(
    pool: &PgPool,
    skip: i64,
    limit: i64,
    sort: SortBy,
) -> Result<Vec<Channel>, sqlx::Error> {
    let mut qb = list_query(skip, limit, sort);
    qb.build_query_as::<Channel>().fetch_all(pool).await
}

fn list_query(skip: i64, limit: i64, sort: SortBy) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY "));

    // Column names come from a closed enum, never from user input.
    qb.push(sort.as_str()).push(" DESC, id ASC");

    qb.push(" OFFSET ").push_bind(skip);
    qb.push(" LIMIT ").push_bind(limit);
    qb
}

pub async fn list_channel_ids(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT channel_id FROM channels ORDER BY id ASC")
        .fetch_all(pool)
        .await
}

/// Overwrite the mutable fields of a channel with freshly fetched stats.
///
/// `published_at` is left untouched. Returns the number of rows updated,
/// which is zero when the channel was deleted in the meantime.
pub async fn apply_stats(conn: &mut PgConnection, stats: &StatsRecord) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE channels
        SET title = $1,
            description = $2,
            subscriber_count = $3,
            video_count = $4,
            view_count = $5,
            last_updated = now()
        WHERE channel_id = $6
        "#,
    )
    .bind(&stats.title)
    .bind(&stats.description)
    .bind(stats.subscriber_count)
    .bind(stats.video_count)
    .bind(stats.view_count)
    .bind(&stats.channel_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Commit one refresh cycle: apply every fetched update, then snapshot every
/// tracked channel that still exists. Runs in a single transaction.
pub async fn apply_refresh(
    pool: &PgPool,
    updates: &[StatsRecord],
    tracked: &[String],
) -> Result<(u64, u64), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut updated = 0;
    for stats in updates {
        updated += apply_stats(&mut tx, stats).await?;
    }

    let snapshots = super::history::append_current(&mut tx, tracked).await?;

    tx.commit().await?;

    Ok((updated, snapshots))
}

/// Delete a channel and its history. Returns `false` if it did not exist.
pub async fn delete(pool: &PgPool, channel_id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM channel_history WHERE channel_id = $1")
        .bind(channel_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM channels WHERE channel_id = $1")
        .bind(channel_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}
