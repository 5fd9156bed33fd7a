//! HTTP routing and handlers.
//!
//! Routes:
//!   POST /post_coupang      → ingest one HTML capture
//!   GET  /list              → list stored captures, newest first
//!   GET  /view/{filename}   → full stored record
//!   GET  /health            → health check
//!   GET  /                  → endpoint description

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use pagecap_common::protocol::{
    CaptureAccepted, CaptureRequest, HealthResponse, ListResponse, ViewResponse,
};

use crate::error::ApiError;
use crate::store;

/// Shared state for route handlers.  No mutable state: the only shared
/// resource is the data directory itself.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(data_dir: PathBuf) -> Self {
        AppState {
            data_dir,
            start_time: Instant::now(),
        }
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/post_coupang", post(post_capture))
        .route("/list", get(list_captures))
        .route("/view/{filename}", get(view_capture))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── route handlers ───────────────────────────────────────────────────────

async fn post_capture(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CaptureAccepted>), ApiError> {
    info!("Capture request received");

    let received: Vec<String> = body
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    // Empty strings count as missing, like the absent/null cases.
    let present = |key: &str| {
        body.get(key).is_some_and(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
    };
    if !present("timestamp") || !present("url") || !present("html_content") {
        return Err(ApiError::MissingFields { received });
    }

    let request: CaptureRequest =
        serde_json::from_value(body).context("Malformed capture request")?;
    let summary = store::save_capture(&state.data_dir, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CaptureAccepted {
            success: true,
            message: "HTML capture stored successfully".to_string(),
            data: summary,
        }),
    ))
}

async fn list_captures(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiError> {
    let files = store::list_captures(&state.data_dir).await?;
    Ok(Json(ListResponse {
        success: true,
        count: files.len(),
        files,
    }))
}

async fn view_capture(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<ViewResponse>, ApiError> {
    // Traversal guard: nothing outside the data directory is reachable.
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(ApiError::NotFound);
    }

    let record = store::load_capture(&state.data_dir, &filename).await?;
    Ok(Json(ViewResponse {
        success: true,
        data: record,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Coupang HTML Capture Server is running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.start_time.elapsed().as_secs(),
        data_directory: state.data_dir.display().to_string(),
    })
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Coupang HTML Capture Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /post_coupang": "store an HTML capture",
            "GET /list": "list stored captures",
            "GET /view/{filename}": "view one stored capture",
            "GET /health": "server status",
        },
    }))
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pagecap_common::protocol::CaptureMode;
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> AppState {
        AppState::new(dir.path().to_path_buf())
    }

    fn valid_body() -> Value {
        json!({
            "timestamp": "2026-08-26T10:15:30.250Z",
            "url": "https://www.coupang.com/vp/products/1",
            "html_content": "<div id=\"a\"><div class=\"x\"></div><span></span></div>",
            "source": "extension",
            "app_version": "1.4.2",
            "user_agent": "test-agent",
        })
    }

    #[tokio::test]
    async fn test_post_then_view_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (status, Json(accepted)) =
            post_capture(State(state(&dir)), Json(valid_body()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(accepted.success);
        assert_eq!(accepted.data.capture_mode, CaptureMode::FullHtml);

        let Json(view) = view_capture(
            State(state(&dir)),
            Path(accepted.data.file_name.clone()),
        )
        .await
        .unwrap();
        assert!(view.success);
        assert_eq!(view.data.request_data.url, accepted.data.url);
        assert_eq!(
            view.data.request_data.timestamp,
            "2026-08-26T10:15:30.250Z"
        );
        assert_eq!(view.data.html_analysis.stats.div_count, 2);
        assert_eq!(view.data.html_analysis.stats.unique_ids, 1);
    }

    #[tokio::test]
    async fn test_post_missing_field_reports_received_fields() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({
            "timestamp": "2026-08-26T10:15:30.250Z",
            "source": "extension",
        });

        let err = post_capture(State(state(&dir)), Json(body))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let ApiError::MissingFields { mut received } = err else {
            panic!("expected MissingFields");
        };
        received.sort();
        assert_eq!(received, vec!["source", "timestamp"]);
    }

    #[tokio::test]
    async fn test_post_empty_required_field_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = valid_body();
        body["html_content"] = json!("");

        let err = post_capture(State(state(&dir)), Json(body))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_malformed_url_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = valid_body();
        body["url"] = json!("not a url");

        let err = post_capture(State(state(&dir)), Json(body))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_view_unknown_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = view_capture(
            State(state(&dir)),
            Path("coupang_absent.json".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_view_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let err = view_capture(
            State(state(&dir)),
            Path("../../etc/passwd".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_counts_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        for ts in ["2026-01-01T00:00:01Z", "2026-01-01T00:00:02Z"] {
            let mut body = valid_body();
            body["timestamp"] = json!(ts);
            let (status, _) = post_capture(State(state(&dir)), Json(body)).await.unwrap();
            assert_eq!(status, StatusCode::CREATED);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        let Json(listing) = list_captures(State(state(&dir))).await.unwrap();
        assert!(listing.success);
        assert_eq!(listing.count, 2);
        assert_eq!(
            listing.files[0].timestamp.as_deref(),
            Some("2026-01-01T00:00:02Z")
        );
    }

    #[tokio::test]
    async fn test_health_reports_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let Json(health) = health(State(state(&dir))).await;
        assert!(health.success);
        assert_eq!(health.data_directory, dir.path().display().to_string());
    }
}
