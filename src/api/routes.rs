//! API route definitions.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::state::AppState;
use crate::pipeline::{self, AnalyzeError, Report};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

type ApiError = (StatusCode, Json<Value>);

/// Accept a multipart-uploaded JSON log file and run the full analysis.
async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Report>, ApiError> {
    let mut contents = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart upload: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload: {e}")))?;
            contents = Some(data);
            break;
        }
    }
    let Some(contents) = contents else {
        return Err(bad_request("missing 'file' field in upload".to_string()));
    };

    let config = state.config.clone();
    let started = std::time::Instant::now();
    // Tree construction is CPU-bound; keep it off the async workers.
    let report = tokio::task::spawn_blocking(move || pipeline::analyze(&contents, &config))
        .await
        .map_err(|e| internal(format!("analysis task failed: {e}")))?
        .map_err(error_response)?;

    info!(
        total = report.stats.total_events,
        anomalies = report.stats.anomaly_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analyze request served"
    );
    Ok(Json(report))
}

fn error_response(err: AnalyzeError) -> ApiError {
    let status = match &err {
        AnalyzeError::Format(_) | AnalyzeError::InsufficientData { .. } => StatusCode::BAD_REQUEST,
        AnalyzeError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %err, "analysis failed");
    }
    (
        status,
        Json(json!({ "detail": format!("Analysis error: {err}") })),
    )
}

fn bad_request(detail: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail })))
}

fn internal(detail: String) -> ApiError {
    warn!("{}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": detail })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::AnalyzerConfig;

    fn app() -> axum::Router {
        crate::api::router(AppState {
            config: AnalyzerConfig::default(),
        })
    }

    fn multipart_upload(json: &str) -> Request<Body> {
        let boundary = "logtriage-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"events.json\"\r\n\
             Content-Type: application/json\r\n\r\n\
             {json}\r\n\
             --{boundary}--\r\n"
        );
        Request::post("/analyze")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = app()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_analyze_accepts_multipart_batch() {
        let events: Vec<serde_json::Value> = (0..12)
            .map(|i| {
                serde_json::json!({
                    "EventID": 4625,
                    "UserID": format!("user{}", i % 4),
                    "IpAddress": "10.0.0.1"
                })
            })
            .collect();
        let response = app()
            .oneshot(multipart_upload(&serde_json::to_string(&events).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_empty_batch_is_400() {
        let response = app().oneshot(multipart_upload("[]")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_missing_file_field_is_400() {
        let response = app()
            .oneshot(
                Request::post("/analyze")
                    .header(
                        "content-type",
                        "multipart/form-data; boundary=logtriage-test-boundary",
                    )
                    .body(Body::from("--logtriage-test-boundary--\r\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_mapping() {
        let (status, _) = error_response(AnalyzeError::Format("bad".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(AnalyzeError::InsufficientData { have: 0, need: 2 });
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = error_response(AnalyzeError::Encoding("0xZZ".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.0["detail"]
            .as_str()
            .unwrap()
            .starts_with("Analysis error:"));
    }
}
