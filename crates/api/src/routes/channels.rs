use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Extension, Json, Router,
};
use chanwatch_core::SortBy;
use chanwatch_db::models::{Channel, ChannelSnapshot};
use chanwatch_db::{ListQuery, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{internal, ApiResult, AppError},
    state::{AppState, RequestId},
};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;
pub const DEFAULT_HISTORY_LIMIT: i64 = 30;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/channels", get(list_channels).post(create_channel))
        .route("/channels/", get(list_channels).post(create_channel))
        .route("/channels/{channel_id}", get(get_channel).delete(delete_channel))
        .route("/channels/{channel_id}/history", get(channel_history))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    skip: Option<i64>,
    limit: Option<i64>,
    sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    channel_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    id: i64,
    channel_id: String,
    title: String,
    description: String,
    published_at: DateTime<Utc>,
    subscriber_count: i64,
    video_count: i64,
    view_count: i64,
    last_updated: DateTime<Utc>,
}

impl From<Channel> for ChannelResponse {
    fn from(channel: Channel) -> Self {
        Self {
            id: channel.id,
            channel_id: channel.channel_id,
            title: channel.title,
            description: channel.description,
            published_at: channel.published_at,
            subscriber_count: channel.subscriber_count,
            video_count: channel.video_count,
            view_count: channel.view_count,
            last_updated: channel.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    id: i64,
    channel_id: String,
    subscriber_count: i64,
    video_count: i64,
    view_count: i64,
    timestamp: DateTime<Utc>,
}

impl From<ChannelSnapshot> for HistoryEntryResponse {
    fn from(row: ChannelSnapshot) -> Self {
        Self {
            id: row.id,
            channel_id: row.channel_id,
            subscriber_count: row.subscriber_count,
            video_count: row.video_count,
            view_count: row.view_count,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteChannelResponse {
    detail: &'static str,
}

pub async fn list_channels(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ChannelResponse>>> {
    let Query(params) = params
        .map_err(|err| AppError::BadRequest(err.body_text()).with_request_id(&request_id.0))?;

    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if skip < 0 {
        return Err(
            AppError::BadRequest("skip must not be negative".to_string())
                .with_request_id(&request_id.0),
        );
    }
    if !(0..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 0 and {MAX_LIST_LIMIT}"
        ))
        .with_request_id(&request_id.0));
    }

    let sort = match params.sort_by.as_deref() {
        None => SortBy::default(),
        Some(raw) => raw
            .parse::<SortBy>()
            .map_err(|err| AppError::BadRequest(err.to_string()).with_request_id(&request_id.0))?,
    };

    let channels = state
        .store
        .list_channels(ListQuery { skip, limit, sort })
        .await
        .map_err(|err| internal(&request_id, err))?;

    Ok(Json(channels.into_iter().map(ChannelResponse::from).collect()))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<ChannelResponse>> {
    let channel = state
        .store
        .get_channel(&channel_id)
        .await
        .map_err(|err| internal(&request_id, err))?
        .ok_or_else(|| channel_not_found(&request_id))?;

    Ok(Json(channel.into()))
}

pub async fn create_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<CreateChannelRequest>, JsonRejection>,
) -> ApiResult<Json<ChannelResponse>> {
    let Json(payload) = payload
        .map_err(|err| AppError::BadRequest(err.body_text()).with_request_id(&request_id.0))?;

    let channel_id = payload.channel_id.trim();
    if channel_id.is_empty() {
        return Err(
            AppError::BadRequest("channel_id required".to_string()).with_request_id(&request_id.0)
        );
    }

    let tracked = state
        .store
        .channel_exists(channel_id)
        .await
        .map_err(|err| internal(&request_id, err))?;
    if tracked {
        return Err(already_tracked(&request_id));
    }

    let stats = match state.stats.fetch(channel_id).await {
        Ok(Some(stats)) => stats,
        Ok(None) => {
            return Err(AppError::BadRequest("Channel not found on YouTube".to_string())
                .with_request_id(&request_id.0))
        }
        Err(err) => {
            warn!(request_id = %request_id.0, channel_id, error = %err, "youtube fetch failed");
            return Err(AppError::BadGateway("Failed to fetch channel from YouTube".to_string())
                .with_request_id(&request_id.0));
        }
    };

    let channel = state
        .store
        .create_channel(&stats)
        .await
        .map_err(|err| match err {
            StoreError::Duplicate(_) => already_tracked(&request_id),
            other => internal(&request_id, other),
        })?;

    info!(
        request_id = %request_id.0,
        channel_id = %channel.channel_id,
        subscriber_count = channel.subscriber_count,
        "channel tracked"
    );

    Ok(Json(channel.into()))
}

pub async fn channel_history(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(channel_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<HistoryEntryResponse>>> {
    let Query(params) = params
        .map_err(|err| AppError::BadRequest(err.body_text()).with_request_id(&request_id.0))?;

    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit < 0 {
        return Err(
            AppError::BadRequest("limit must not be negative".to_string())
                .with_request_id(&request_id.0),
        );
    }

    let tracked = state
        .store
        .channel_exists(&channel_id)
        .await
        .map_err(|err| internal(&request_id, err))?;
    if !tracked {
        return Err(channel_not_found(&request_id));
    }

    let history = state
        .store
        .history(&channel_id, limit)
        .await
        .map_err(|err| internal(&request_id, err))?;

    Ok(Json(history.into_iter().map(HistoryEntryResponse::from).collect()))
}

pub async fn delete_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<DeleteChannelResponse>> {
    let deleted = state
        .store
        .delete_channel(&channel_id)
        .await
        .map_err(|err| internal(&request_id, err))?;

    if !deleted {
        return Err(channel_not_found(&request_id));
    }

    info!(request_id = %request_id.0, channel_id = %channel_id, "channel deleted");

    Ok(Json(DeleteChannelResponse {
        detail: "Channel deleted successfully",
    }))
}

fn channel_not_found(request_id: &RequestId) -> crate::error::ApiError {
    AppError::NotFound("Channel not found".to_string()).with_request_id(&request_id.0)
}

fn already_tracked(request_id: &RequestId) -> crate::error::ApiError {
    AppError::BadRequest("Channel already tracked".to_string()).with_request_id(&request_id.0)
}
