use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::Router;
use kestrel_core::analysis::{
    PageScanner, PerformanceAuditor, ScanOutcome, SessionAuditor, SweepOutcome, UrlAuditor,
};
use kestrel_core::model::{
    AnalysisInput, Category, CategoryScores, PerformanceMetric, PerformanceMetrics,
    PerformanceReport, ResponsivenessResult,
};
use kestrel_core::session::SessionRegistry;
use kestrel_core::{Error, Result};
use kestrel_server::{AnalysisServer, AppState, ServerConfig, create_router};
use kestrel_core::analysis::Orchestrator;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

const LIMIT: usize = 2 * 1024 * 1024;

/// Reports every viewport as fitting and no violations
struct CleanScanner;

#[async_trait]
impl PageScanner for CleanScanner {
    async fn scan(&self, _input: &AnalysisInput) -> Result<ScanOutcome> {
        let results = ["Desktop Large", "Desktop Standard", "Tablet", "Phone"]
            .iter()
            .map(|name| ResponsivenessResult {
                viewport_name: name.to_string(),
                has_horizontal_overflow: false,
                images_oversize: false,
            })
            .collect();
        Ok(ScanOutcome {
            load: Ok(()),
            violations: Ok(vec![]),
            responsiveness: SweepOutcome {
                results,
                interrupted: None,
            },
        })
    }
}

fn report() -> PerformanceReport {
    let metric = PerformanceMetric {
        percentile_value: 812.0,
        category: Category::Good,
    };
    PerformanceReport {
        overall_category: Category::Good,
        metrics: PerformanceMetrics {
            first_contentful_paint: metric,
            largest_contentful_paint: metric,
            cumulative_layout_shift: PerformanceMetric {
                percentile_value: 0.0,
                category: Category::Good,
            },
            interaction_to_next_paint: PerformanceMetric {
                percentile_value: 0.0,
                category: Category::Good,
            },
            time_to_first_byte: PerformanceMetric {
                percentile_value: 2.0,
                category: Category::Good,
            },
        },
        category_scores: CategoryScores {
            performance: 1.0,
            accessibility: 0.82,
            best_practices: 0.96,
            seo: 0.8,
        },
    }
}

struct CountingAuditor {
    calls: AtomicUsize,
}

#[async_trait]
impl PerformanceAuditor for CountingAuditor {
    async fn audit(&self, _input: &AnalysisInput) -> Result<PerformanceReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(report())
    }
}

fn app() -> (Router, Arc<CountingAuditor>, SessionRegistry) {
    let auditor = Arc::new(CountingAuditor {
        calls: AtomicUsize::new(0),
    });
    let registry = SessionRegistry::new();
    let orchestrator = Orchestrator::new(Arc::new(CleanScanner), auditor.clone());
    let router = create_router(AppState::new(orchestrator, registry.clone()), LIMIT);
    (router, auditor, registry)
}

fn analyse_request(query: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/analyse{}", query))
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_neither_input_is_rejected() {
    let (app, auditor, _) = app();

    let response = app.oneshot(analyse_request("", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Html field or url field must be specified" })
    );
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_both_inputs_are_rejected() {
    let (app, auditor, _) = app();
    let body = json!({ "html": "<p>x</p>", "url": "https://example.com" }).to_string();

    let response = app
        .oneshot(analyse_request("?performanceRequired=true", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Specify either html or url field" })
    );
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_html_without_performance() {
    let (app, auditor, _) = app();
    let body = json!({ "html": "<html><body><p>Hello</p></body></html>" }).to_string();

    let response = app
        .oneshot(analyse_request("?performanceRequired=false", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["violations"], json!([]));
    assert_eq!(json["performance"], Value::Null);
    let names: Vec<&str> = json["responsiveness"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["viewportName"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Desktop Large", "Desktop Standard", "Tablet", "Phone"]);
    assert_eq!(json["responsiveness"][3]["hasHorizontalOverflow"], false);
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_performance_report_shape() {
    let (app, auditor, _) = app();
    let body = json!({ "url": "https://example.com" }).to_string();

    let response = app
        .oneshot(analyse_request("?performanceRequired=true", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let performance = &json["performance"];
    assert_eq!(performance["overallCategory"], "GOOD");
    assert_eq!(performance["metrics"].as_object().unwrap().len(), 5);
    assert_eq!(
        performance["metrics"]["firstContentfulPaint"]["percentileValue"],
        812.0
    );
    assert_eq!(performance["categoryScores"]["bestPractices"], 0.96);
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_legacy_query_name_enables_audit() {
    let (app, auditor, _) = app();
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .oneshot(analyse_request("?lightHouseRequired=true", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_both_query_names_together_run_one_audit() {
    let (app, auditor, _) = app();
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .oneshot(analyse_request(
            "?performanceRequired=true&lightHouseRequired=true",
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_either_query_name_can_enable_audit() {
    let (app, auditor, _) = app();
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .oneshot(analyse_request(
            "?performanceRequired=false&lightHouseRequired=true",
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_true_flag_skips_audit() {
    let (app, auditor, _) = app();
    let body = json!({ "html": "<p>x</p>" }).to_string();

    let response = app
        .oneshot(analyse_request("?performanceRequired=yes", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["performance"], Value::Null);
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _, _) = app();

    let response = app
        .oneshot(analyse_request("", "{\"html\": "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_oversize_body_is_rejected() {
    let (app, auditor, _) = app();
    let html = "a".repeat(LIMIT + 1);
    let body = json!({ "html": html }).to_string();

    let response = app.oneshot(analyse_request("", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(auditor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_session_exposure_serves_published_html() {
    let (app, _, registry) = app();
    let id = registry.publish("<p>published</p>");

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/__session-exposure/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<p>published</p>");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (app, _, registry) = app();
    let id = registry.publish("<p>gone</p>");
    registry.revoke(id);

    for path in [
        format!("/__session-exposure/{}", id),
        "/__session-exposure/not-a-uuid".to_string(),
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Session not found");
    }
}

#[tokio::test]
async fn test_health_reports_active_sessions() {
    let (app, _, registry) = app();
    let _lease = registry.lease("<p>in flight</p>");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "status": "ok", "activeSessions": 1 })
    );
}

/// Fetches the audited URL over plain HTTP, as an external audit tool would
struct FetchingAuditor;

async fn http_get(url: &str) -> std::io::Result<String> {
    let rest = url.trim_start_matches("http://");
    let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
    let mut stream = tokio::net::TcpStream::connect(authority).await?;
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, authority
    );
    stream.write_all(request.as_bytes()).await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}

#[async_trait]
impl UrlAuditor for FetchingAuditor {
    async fn audit_url(&self, url: &str) -> Result<PerformanceReport> {
        let response = http_get(url).await?;
        if response.starts_with("HTTP/1.1 200") && response.contains("<h1>served</h1>") {
            Ok(report())
        } else {
            Err(Error::AuditUnavailable(format!("unexpected response from {}", url)))
        }
    }
}

#[tokio::test]
async fn test_live_server_exposes_html_during_audit() {
    let server = AnalysisServer::bind(&ServerConfig {
        port: 0,
        ..ServerConfig::default()
    })
    .await
    .unwrap();
    let base_url = server.base_url();

    let registry = SessionRegistry::new();
    let auditor = SessionAuditor::new(registry.clone(), base_url.clone(), FetchingAuditor);
    let orchestrator = Orchestrator::new(Arc::new(CleanScanner), Arc::new(auditor));
    let state = AppState::new(orchestrator, registry.clone());

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve_with_shutdown(state, async {
        let _ = stop_rx.await;
    }));

    let body = json!({ "html": "<h1>served</h1>" }).to_string();
    let authority = base_url.trim_start_matches("http://").to_string();
    let mut stream = tokio::net::TcpStream::connect(&authority).await.unwrap();
    let request = format!(
        "POST /analyse?performanceRequired=true HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        authority,
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("\"overallCategory\":\"GOOD\""));
    assert!(registry.is_empty());

    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
}
