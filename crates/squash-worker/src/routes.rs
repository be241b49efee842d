//! Router configuration.

use axum::routing::post;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the worker's command router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/download", post(handlers::download))
        .route("/probe", post(handlers::probe))
        .route("/compress", post(handlers::compress))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = WorkerConfig {
            work_dir: std::env::temp_dir().join("squash-worker-tests"),
            ..WorkerConfig::default()
        };
        create_router(AppState::new(config))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_download_rejects_missing_fields() {
        let response = test_router()
            .oneshot(
                Request::post("/download")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"url":"","container":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["error"], "missing_fields");
    }

    #[tokio::test]
    async fn test_download_rejects_malformed_body() {
        let response = test_router()
            .oneshot(
                Request::post("/download")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["error"], "invalid_request_body");
    }

    #[tokio::test]
    async fn test_probe_without_input_is_rejected() {
        let response = test_router()
            .oneshot(Request::post("/probe").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["error"], "no_input");
    }

    #[tokio::test]
    async fn test_compress_rejects_invalid_parameters() {
        let body = r#"{
            "inputContainer": "mp4",
            "outputContainer": "mp4",
            "maxWidth": 1280,
            "maxHeight": 720,
            "codec": "libx264",
            "crf": 99,
            "preset": "medium",
            "audioBitrate": 128
        }"#;

        let response = test_router()
            .oneshot(
                Request::post("/compress")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["error"], "invalid_parameters");
    }

    #[tokio::test]
    async fn test_compress_without_input_is_rejected() {
        let body = r#"{
            "inputContainer": "nosuch",
            "outputContainer": "mp4",
            "maxWidth": 1280,
            "maxHeight": 720,
            "codec": "libx264",
            "crf": 23,
            "preset": "medium",
            "audioBitrate": 128
        }"#;

        let response = test_router()
            .oneshot(
                Request::post("/compress")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["error"], "no_input");
    }
}
