pub mod channels;
pub mod health;

use axum::{middleware::from_fn, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::request_id;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .merge(channels::router(state))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use chanwatch_core::StatsRecord;
    use chanwatch_db::memory::MemoryStore;
    use chanwatch_youtube::testing::StaticStats;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let remote = Arc::new(StaticStats::new());
        for id in ["UCone", "UCtwo"] {
            remote
                .set_channel(StatsRecord {
                    channel_id: id.to_string(),
                    title: id.to_string(),
                    description: String::new(),
                    published_at: Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap(),
                    subscriber_count: 10,
                    video_count: 2,
                    view_count: 300,
                })
                .await;
        }
        app(AppState {
            store: Arc::new(MemoryStore::new()),
            stats: remote,
        })
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request_id_of(response: &Response) -> String {
        response
            .headers()
            .get("x-request-id")
            .expect("x-request-id header")
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn assert_invalid_request(response: Response) {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let header_id = request_id_of(&response);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["request_id"], header_id.as_str());
    }

    #[tokio::test]
    async fn test_create_served_with_and_without_trailing_slash() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(post_json("/channels", json!({"channel_id": "UCone"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["channel_id"], "UCone");

        let response = app
            .clone()
            .oneshot(post_json("/channels/", json!({"channel_id": "UCtwo"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["channel_id"], "UCtwo");

        for uri in ["/channels", "/channels/"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));
        }
    }

    #[tokio::test]
    async fn test_channel_paths_round_trip_through_router() {
        let app = test_app().await;
        let created = app
            .clone()
            .oneshot(post_json("/channels/", json!({"channel_id": "UCone"})))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::OK);

        let response = app.clone().oneshot(get("/channels/UCone")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(get("/channels/UCone/history")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));

        let delete = Request::builder()
            .method(Method::DELETE)
            .uri("/channels/UCone")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Channel deleted successfully"})
        );

        let response = app.oneshot(get("/channels/UCone")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_unknown_sort_key_is_enveloped_bad_request() {
        let response = test_app()
            .await
            .oneshot(get("/channels/?sort_by=bogus"))
            .await
            .unwrap();
        assert_invalid_request(response).await;
    }

    #[tokio::test]
    async fn test_malformed_query_is_enveloped_bad_request() {
        let app = test_app().await;

        let response = app.clone().oneshot(get("/channels/?skip=abc")).await.unwrap();
        assert_invalid_request(response).await;

        let response = app.oneshot(get("/channels/UCone/history?limit=lots")).await.unwrap();
        assert_invalid_request(response).await;
    }

    #[tokio::test]
    async fn test_malformed_body_is_enveloped_bad_request() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(post_json("/channels/", json!({"id": "UCone"})))
            .await
            .unwrap();
        assert_invalid_request(response).await;

        let not_json = Request::builder()
            .method(Method::POST)
            .uri("/channels/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .unwrap();
        let response = app.oneshot(not_json).await.unwrap();
        assert_invalid_request(response).await;
    }

    #[tokio::test]
    async fn test_every_response_carries_request_id() {
        let app = test_app().await;

        for request in [
            get("/health"),
            get("/channels/"),
            get("/channels/UCnope"),
            get("/channels/?sort_by=bogus"),
        ] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert!(request_id_of(&response).starts_with("req_"));
        }
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_kept() {
        let request = Request::builder()
            .uri("/channels/UCnope")
            .header("x-request-id", "trace-42")
            .body(Body::empty())
            .unwrap();
        let response = test_app().await.oneshot(request).await.unwrap();

        assert_eq!(request_id_of(&response), "trace-42");
        assert_eq!(body_json(response).await["error"]["request_id"], "trace-42");
    }

    #[tokio::test]
    async fn test_unusable_inbound_request_id_is_replaced() {
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "not a token")
            .body(Body::empty())
            .unwrap();
        let response = test_app().await.oneshot(request).await.unwrap();

        assert!(request_id_of(&response).starts_with("req_"));
    }
}
