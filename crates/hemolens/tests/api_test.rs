//! End-to-end tests for the analyze endpoint: validation, cleanup,
//! default-query substitution, and timeout behavior, driven through the
//! router with stub providers.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use hemolens::api::{ApiState, create_router};
use hemolens::{
    AnalysisQuery, AppConfig, ChatProvider, HemolensError, Pipeline, ReportReader, Result,
    TIMEOUT_MESSAGE,
};

struct CannedProvider(&'static str);

#[async_trait]
impl ChatProvider for CannedProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[hemolens::agent::ChatMessage],
    ) -> Result<String> {
        Ok(self.0.to_string())
    }
}

struct SleepyProvider(Duration);

#[async_trait]
impl ChatProvider for SleepyProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[hemolens::agent::ChatMessage],
    ) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}

struct FailingProvider;

#[async_trait]
impl ChatProvider for FailingProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[hemolens::agent::ChatMessage],
    ) -> Result<String> {
        Err(HemolensError::provider("model unavailable"))
    }
}

/// Provider for rejection tests: any call would surface as a 500, so a 400
/// response proves validation failed fast before the pipeline ran.
struct MustNotRunProvider;

#[async_trait]
impl ChatProvider for MustNotRunProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[hemolens::agent::ChatMessage],
    ) -> Result<String> {
        Err(HemolensError::provider("pipeline must not run for rejected uploads"))
    }
}

/// Build a router whose pipeline talks to `provider`, with uploads going
/// under a fresh temp dir. The `TempDir` guard must outlive the requests.
fn test_app(provider: Arc<dyn ChatProvider>, timeout: Duration) -> (Router, TempDir) {
    let upload_dir = TempDir::new().expect("create upload dir");
    let config = AppConfig {
        model: "test-model".to_string(),
        api_key: "test-key".to_string(),
        timeout,
        upload_dir: upload_dir.path().to_path_buf(),
        max_upload_size_bytes: 10 * 1024 * 1024,
    };
    let state = ApiState {
        config: Arc::new(config),
        pipeline: Arc::new(Pipeline::medical(provider, Arc::new(ReportReader::new()))),
    };
    (create_router(state), upload_dir)
}

const BOUNDARY: &str = "hemolens-test-boundary";

/// Hand-build a multipart/form-data body with a `file` part and an optional
/// `query` part.
fn multipart_body(
    filename: &str,
    content_type: &str,
    bytes: &[u8],
    query: Option<&str>,
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");

    if let Some(query) = query {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\n{query}\r\n")
                .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn analyze_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build request")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse body")
}

fn upload_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read upload dir").count()
}

#[tokio::test]
async fn test_root_liveness_probe() {
    let (app, _guard) = test_app(Arc::new(MustNotRunProvider), Duration::from_secs(5));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Blood Test Report Analyser API is running");
}

#[tokio::test]
async fn test_valid_upload_with_empty_query_uses_default() {
    // Scenario A: valid signature, empty query -> 200 with the default
    // summarization query echoed back.
    let (app, guard) = test_app(
        Arc::new(CannedProvider("Your results look healthy.")),
        Duration::from_secs(5),
    );

    let body = multipart_body("sample.pdf", "application/pdf", b"%PDF-1.4 fake report", Some(""));
    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["query"], AnalysisQuery::DEFAULT_QUERY);
    assert_eq!(json["analysis"], "Your results look healthy.");
    assert_eq!(json["file_processed"], "sample.pdf");

    // Cleanup invariant: the temp file is gone after the response.
    assert_eq!(upload_count(guard.path()), 0);
}

#[tokio::test]
async fn test_missing_query_field_uses_default() {
    let (app, _guard) = test_app(Arc::new(CannedProvider("ok")), Duration::from_secs(5));

    let body = multipart_body("sample.pdf", "application/pdf", b"%PDF-1.4 fake report", None);
    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["query"], AnalysisQuery::DEFAULT_QUERY);
}

#[tokio::test]
async fn test_supplied_query_is_trimmed_and_echoed() {
    let (app, _guard) = test_app(Arc::new(CannedProvider("ok")), Duration::from_secs(5));

    let body = multipart_body(
        "sample.pdf",
        "application/pdf",
        b"%PDF-1.4 fake report",
        Some("  why is my LDL high?  "),
    );
    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["query"], "why is my LDL high?");
}

#[tokio::test]
async fn test_non_pdf_extension_rejected() {
    let (app, guard) = test_app(Arc::new(MustNotRunProvider), Duration::from_secs(5));

    let body = multipart_body("report.txt", "application/pdf", b"%PDF-1.4 content", None);
    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["detail"], "Only PDF files are supported");
    // Rejected before persistence.
    assert_eq!(upload_count(guard.path()), 0);
}

#[tokio::test]
async fn test_uppercase_pdf_extension_accepted() {
    let (app, _guard) = test_app(Arc::new(CannedProvider("ok")), Duration::from_secs(5));

    let body = multipart_body("REPORT.PDF", "application/pdf", b"%PDF-1.4 content", None);
    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_content_type_rejected() {
    // Scenario B: .pdf extension but text/plain content type.
    let (app, guard) = test_app(Arc::new(MustNotRunProvider), Duration::from_secs(5));

    let body = multipart_body("test.pdf", "text/plain", b"%PDF-1.4 content", None);
    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["detail"], "Invalid file type. Please upload a PDF file");
    assert_eq!(upload_count(guard.path()), 0);
}

#[tokio::test]
async fn test_bad_magic_bytes_rejected_and_cleaned_up() {
    // Scenario C: right extension and content type, wrong signature.
    let (app, guard) = test_app(Arc::new(MustNotRunProvider), Duration::from_secs(5));

    let body = multipart_body("report.pdf", "application/pdf", b"GIF89a not a pdf", None);
    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["detail"], "Invalid PDF file format");
    // The file was persisted for the signature check, then removed.
    assert_eq!(upload_count(guard.path()), 0);
}

#[tokio::test]
async fn test_missing_file_field_rejected() {
    let (app, _guard) = test_app(Arc::new(MustNotRunProvider), Duration::from_secs(5));

    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\nhello\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let response = app.oneshot(analyze_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["detail"], "No file provided");
}

#[tokio::test]
async fn test_pipeline_failure_maps_to_500_and_cleans_up() {
    let (app, guard) = test_app(Arc::new(FailingProvider), Duration::from_secs(5));

    let body = multipart_body("sample.pdf", "application/pdf", b"%PDF-1.4 fake report", None);
    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    let detail = json["detail"].as_str().unwrap();
    assert!(
        detail.starts_with("Error processing blood report:"),
        "detail: {detail}"
    );
    assert!(detail.contains("model unavailable"));
    assert_eq!(upload_count(guard.path()), 0);
}

#[tokio::test]
async fn test_timeout_returns_deterministic_message() {
    // Scenario D: the pipeline never returns within the window; the
    // response is still a success envelope carrying the timeout message,
    // delivered within timeout + bounded overhead.
    let (app, guard) = test_app(
        Arc::new(SleepyProvider(Duration::from_secs(30))),
        Duration::from_millis(100),
    );

    let body = multipart_body("sample.pdf", "application/pdf", b"%PDF-1.4 fake report", None);
    let started = Instant::now();
    let response = app.oneshot(analyze_request(body)).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["analysis"], TIMEOUT_MESSAGE);
    assert_eq!(upload_count(guard.path()), 0);
}

#[tokio::test]
async fn test_repeated_submissions_are_independent() {
    // Idempotence: the same upload twice produces two independent
    // invocations and leaves nothing behind.
    let (app, guard) = test_app(Arc::new(CannedProvider("ok")), Duration::from_secs(5));

    for _ in 0..2 {
        let body = multipart_body("sample.pdf", "application/pdf", b"%PDF-1.4 fake report", None);
        let response = app.clone().oneshot(analyze_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(upload_count(guard.path()), 0);
}
