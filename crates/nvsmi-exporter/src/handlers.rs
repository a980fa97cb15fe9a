//! HTTP routes: index page, health check and the metrics exposition.

use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tower_http::compression::CompressionLayer;
use tracing::{error, warn};

use nvsmi_core::collector::CommandRunner;

use crate::state::SharedState;

/// Header Prometheus sends with the scrape timeout it will enforce.
pub(crate) const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

pub(crate) fn router<R: CommandRunner + 'static>(state: SharedState<R>) -> Router {
    let metrics_path = state.metrics_path.clone();
    Router::new()
        .route("/", get(handle_index::<R>))
        .route("/health", get(handle_health))
        .route(&metrics_path, get(handle_metrics::<R>))
        .with_state(state)
        .layer(CompressionLayer::new())
}

// ============================================================
// Index
// ============================================================

pub(crate) async fn handle_index<R: CommandRunner>(State(state): State<SharedState<R>>) -> Html<String> {
    let path = escape_html(&state.metrics_path);
    let command = escape_html(&state.collector.command().command_line());
    let format = state.collector.command().format;
    let last = match state.collector.last_outcome().await {
        Some(Ok(report)) => format!(
            "ok at {} ({} devices)",
            report.finished_at.to_rfc3339(),
            report.devices
        ),
        Some(Err(e)) => format!("failed: {}", escape_html(&e.to_string())),
        None => "none yet".to_string(),
    };

    Html(format!(
        "<html>\n\
         <head><title>NVIDIA SMI Exporter</title></head>\n\
         <body>\n\
         <h1>NVIDIA SMI Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         <p>Version: {version}</p>\n\
         <p>Command: <code>{command}</code> ({format})</p>\n\
         <p>Last collection: {last}</p>\n\
         </body>\n\
         </html>\n",
        version = nvsmi_core::VERSION,
    ))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================
// Metrics
// ============================================================

/// Runs (or joins) a refresh cycle, then renders the whole table.
///
/// A failed cycle still answers 200: the failure is visible through
/// `nvidia_smi_collector_success` and previously published values.
pub(crate) async fn handle_metrics<R: CommandRunner>(
    State(state): State<SharedState<R>>,
    headers: HeaderMap,
) -> Response {
    let collector = &state.collector;
    let timeout = timeout_from_headers(&headers, collector.command().timeout);

    // Already logged by the collector.
    let _ = collector.collect_with_timeout(timeout).await;

    let table = collector.table();
    match table.render() {
        Ok(body) => ([(header::CONTENT_TYPE, table.format_type())], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Command timeout for this scrape: the scrape-timeout header when present
/// and valid, `default` otherwise.
pub(crate) fn timeout_from_headers(headers: &HeaderMap, default: Duration) -> Duration {
    let Some(value) = headers.get(SCRAPE_TIMEOUT_HEADER) else {
        return default;
    };

    let parsed = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    match parsed {
        Some(timeout) => timeout,
        None => {
            warn!(value = ?value, default_secs = default.as_secs_f64(), "invalid scrape timeout header");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderValue, Request};
    use tower::ServiceExt;

    use nvsmi_core::collector::{Collector, MockRunner, SmiCommand};
    use nvsmi_core::metrics::MetricTable;

    use crate::state::AppInner;

    fn app(runner: MockRunner) -> Router {
        let table = Arc::new(MetricTable::new().unwrap());
        let collector = Collector::new(runner, SmiCommand::default(), table);
        router(AppInner::shared(collector, "/metrics"))
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, HeaderMap, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (status, headers, body) = get_body(app(MockRunner::two_gpus()), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        assert!(body.contains("nvidia_smi_collector_success 1"));
        assert!(body.contains("nvidia_fan_speed_ratio{gpu=\"0\"} 0.3"));
        assert!(body.contains("nvidia_driver_info{version=\"470.10\"} 1"));
        assert!(!body.contains("nvidia_fan_speed_ratio{gpu=\"1\"}"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_on_failure() {
        let (status, _, body) = get_body(app(MockRunner::failing()), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("nvidia_smi_collector_success 0"));
        assert!(body.contains("nvidia_smi_exporter_build_info"));
        assert!(!body.contains("nvidia_temperature_celsius{"));
    }

    #[tokio::test]
    async fn test_metrics_each_scrape_runs_a_cycle() {
        let runner = MockRunner::two_gpus();
        let app = app(runner.clone());

        get_body(app.clone(), "/metrics").await;
        get_body(app, "/metrics").await;
        assert_eq!(runner.calls(), 2);
    }

    #[tokio::test]
    async fn test_health() {
        let runner = MockRunner::two_gpus();
        let (status, _, body) = get_body(app(runner.clone()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value, json!({ "status": "ok" }));
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn test_index_links_metrics_path() {
        let (status, _, body) = get_body(app(MockRunner::two_gpus()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<a href=\"/metrics\">"));
        assert!(body.contains("nvidia-smi -q -x"));
        assert!(body.contains(nvsmi_core::VERSION));
        assert!(body.contains("Last collection: none yet"));
    }

    #[tokio::test]
    async fn test_index_shows_last_collection() {
        let runner = MockRunner::two_gpus();
        let app = app(runner.clone());

        get_body(app.clone(), "/metrics").await;
        let (_, _, body) = get_body(app.clone(), "/").await;
        assert!(body.contains("Last collection: ok at "));
        assert!(body.contains("(2 devices)"));

        runner.set_output("<html></html>");
        get_body(app.clone(), "/metrics").await;
        let (_, _, body) = get_body(app, "/").await;
        assert!(body.contains("Last collection: failed: malformed output"));
        assert!(!body.contains("<html></html>"));
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let table = Arc::new(MetricTable::new().unwrap());
        let collector = Collector::new(MockRunner::two_gpus(), SmiCommand::default(), table);
        let app = router(AppInner::shared(collector, "/gpu/metrics"));

        let (status, _, _) = get_body(app.clone(), "/gpu/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = get_body(app, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_scrape_timeout_header_bounds_command() {
        let runner = MockRunner::hanging();
        let response = app(runner)
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .header(SCRAPE_TIMEOUT_HEADER, "0.05")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("nvidia_smi_collector_success 0"));
    }

    #[test]
    fn test_timeout_from_headers() {
        let default = Duration::from_secs(10);
        let mut headers = HeaderMap::new();
        assert_eq!(timeout_from_headers(&headers, default), default);

        headers.insert(SCRAPE_TIMEOUT_HEADER, HeaderValue::from_static("9.5"));
        assert_eq!(timeout_from_headers(&headers, default), Duration::from_millis(9500));

        for bad in ["abc", "0", "-3", "NaN", "inf", "1e400"] {
            headers.insert(SCRAPE_TIMEOUT_HEADER, HeaderValue::from_static(bad));
            assert_eq!(timeout_from_headers(&headers, default), default, "{}", bad);
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
