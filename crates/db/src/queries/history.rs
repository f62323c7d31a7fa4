//! Channel history operations.
//!
//! History rows are only ever inserted. They disappear solely through the
//! `ON DELETE CASCADE` on `channel_history.channel_id` or an explicit channel
//! delete.

use crate::models::ChannelSnapshot;
use sqlx::{PgConnection, PgPool};

pub async fn append(
    conn: &mut PgConnection,
    channel_id: &str,
    subscriber_count: i64,
    video_count: i64,
    view_count: i64,
) -> Result<ChannelSnapshot, sqlx::Error> {
    sqlx::query_as::<_, ChannelSnapshot>(
        r#"
        INSERT INTO channel_history
            (channel_id, subscriber_count, video_count, view_count, "timestamp")
        VALUES ($1, $2, $3, $4, now())
        RETURNING id, channel_id, subscriber_count, video_count, view_count, "timestamp"
        "#,
    )
    .bind(channel_id)
    .bind(subscriber_count)
    .bind(video_count)
    .bind(view_count)
    .fetch_one(conn)
    .await
}

/// Snapshot the currently stored counts of each listed channel.
///
/// Ids that no longer exist are skipped rather than failing the batch.
pub async fn append_current(
    conn: &mut PgConnection,
    channel_ids: &[String],
) -> Result<u64, sqlx::Error> {
    if channel_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO channel_history
            (channel_id, subscriber_count, video_count, view_count, "timestamp")
        SELECT channel_id, subscriber_count, video_count, view_count, now()
        FROM channels
        WHERE channel_id = ANY($1)
        ORDER BY id
        "#,
    )
    .bind(channel_ids)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Most recent snapshots for a channel, newest first.
pub async fn list_recent(
    pool: &PgPool,
    channel_id: &str,
    limit: i64,
) -> Result<Vec<ChannelSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, ChannelSnapshot>(
        r#"
        SELECT id, channel_id, subscriber_count, video_count, view_count, "timestamp"
        FROM channel_history
        WHERE channel_id = $1
        ORDER BY "timestamp" DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(channel_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
