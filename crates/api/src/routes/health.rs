use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse { status: "ok" }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanwatch_db::memory::MemoryStore;
    use chanwatch_youtube::testing::StaticStats;
    use std::sync::Arc;

    fn state(store: Arc<MemoryStore>) -> AppState {
        AppState {
            store,
            stats: Arc::new(StaticStats::new()),
        }
    }

    #[tokio::test]
    async fn test_health_ok() {
        let store = Arc::new(MemoryStore::new());
        let (status, Json(body)) = health(State(state(store))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_health_reports_store_outage() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let (status, Json(body)) = health(State(state(store))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "unavailable");
    }
}
