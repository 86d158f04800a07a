//! API request and response types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::Pipeline;
use crate::config::AppConfig;

/// Liveness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    /// Running-status text.
    pub message: String,
}

/// Successful analysis envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Always `"success"` when this envelope is returned.
    pub status: String,
    /// The effective (defaulted, trimmed) query.
    pub query: String,
    /// The pipeline's synthesized analysis, or the timeout message.
    pub analysis: String,
    /// Original filename of the uploaded report.
    pub file_processed: String,
}

/// Error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable failure reason.
    pub detail: String,
}

/// API server state: process-wide read-only configuration plus the shared
/// pipeline definition. No mutable state is shared between requests.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<Pipeline>,
}
