//! API request handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};

use super::error::ApiError;
use super::types::{AnalyzeResponse, ApiState, RootResponse};
use super::upload::UploadedReport;
use crate::agent::AnalysisQuery;
use crate::runner::{PipelineResult, PipelineRunner, TIMEOUT_MESSAGE};

/// Liveness probe.
///
/// GET /
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Blood Test Report Analyser API is running".to_string(),
    })
}

/// The `file` field of the analyze form.
struct UploadField {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Analyze endpoint handler.
///
/// POST /analyze
///
/// Accepts multipart form data with:
/// - `file`: the blood-test report PDF (required)
/// - `query` (optional): free-text question; defaults to a summarization
///   query when empty or absent
///
/// Validation fails fast with a 400 before any model invocation; the
/// persisted upload is removed on every exit path after persistence.
pub async fn analyze_handler(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (file, raw_query) = read_analyze_form(multipart).await?;

    // Cheap checks before touching the filesystem.
    if !file.filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::validation("Only PDF files are supported"));
    }
    if file.content_type != "application/pdf" {
        return Err(ApiError::validation(
            "Invalid file type. Please upload a PDF file",
        ));
    }

    let report = UploadedReport::persist(
        &state.config.upload_dir,
        file.filename,
        file.content_type,
        &file.bytes,
    )
    .await
    .map_err(|e| ApiError::internal(format!("Error processing blood report: {e}")))?;

    // From here on the temp file exists; remove it on every path.
    let outcome = process_report(&state, &report, raw_query.as_deref()).await;
    report.cleanup().await;
    outcome
}

/// Validate the persisted file, run the bounded pipeline, and map the
/// outcome to a response envelope. Cleanup stays with the caller.
async fn process_report(
    state: &ApiState,
    report: &UploadedReport,
    raw_query: Option<&str>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let is_pdf = report
        .has_pdf_magic()
        .await
        .map_err(|e| ApiError::internal(format!("Error processing blood report: {e}")))?;
    if !is_pdf {
        return Err(ApiError::validation("Invalid PDF file format"));
    }

    let request = AnalysisQuery::new(raw_query, report.path());
    let effective_query = request.query().to_string();

    tracing::info!(
        upload_id = %report.id(),
        filename = %report.original_filename(),
        size = report.size(),
        "analyzing blood test report"
    );

    // One runner per request: concurrent requests proceed independently
    // while each invocation stays singly-bounded.
    let runner = PipelineRunner::new(Arc::clone(&state.pipeline), state.config.timeout);

    let analysis = match runner.run(request).await {
        PipelineResult::Completed(analysis) => analysis,
        // A timeout still resolves to a success envelope carrying the
        // deterministic timeout message in `analysis`.
        PipelineResult::TimedOut => TIMEOUT_MESSAGE.to_string(),
        PipelineResult::Failed(reason) => {
            return Err(ApiError::internal(format!(
                "Error processing blood report: {reason}"
            )));
        }
    };

    Ok(Json(AnalyzeResponse {
        status: "success".to_string(),
        query: effective_query,
        analysis,
        file_processed: report.original_filename().to_string(),
    }))
}

/// Read the multipart form into its two known fields.
async fn read_analyze_form(
    mut multipart: Multipart,
) -> Result<(UploadField, Option<String>), ApiError> {
    let mut file = None;
    let mut query = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.to_string()))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
                file = Some(UploadField {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "query" => {
                query = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::validation(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::validation("No file provided"))?;
    Ok((file, query))
}
