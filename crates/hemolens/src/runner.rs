//! Bounded pipeline execution.
//!
//! [`PipelineRunner`] wraps exactly one pipeline invocation with a hard
//! wall-clock timeout and isolates it on a spawned task so the caller never
//! blocks past the deadline. A single-permit semaphore keeps at most one
//! invocation in flight per runner instance, which bounds concurrent load
//! against the rate-limited model provider.
//!
//! On timeout the in-flight task is aborted rather than leaked: its next
//! await point cancels it, so a timed-out invocation stops consuming
//! provider quota.
//!
//! The runner never lets an error or panic propagate: every invocation
//! resolves to exactly one [`PipelineResult`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::agent::{AnalysisQuery, Pipeline};

/// Deterministic message returned when an invocation exceeds the timeout.
pub const TIMEOUT_MESSAGE: &str =
    "Analysis timed out. Please try with a shorter query or simpler blood report.";

/// Outcome of one pipeline invocation: produced once, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    /// The final step's synthesized text.
    Completed(String),
    /// The invocation exceeded the wall-clock budget.
    TimedOut,
    /// The invocation failed; carries the stringified reason.
    Failed(String),
}

/// Timeout- and concurrency-bounded wrapper around one [`Pipeline`].
pub struct PipelineRunner {
    pipeline: Arc<Pipeline>,
    timeout: Duration,
    slot: Semaphore,
}

impl PipelineRunner {
    pub fn new(pipeline: Arc<Pipeline>, timeout: Duration) -> Self {
        Self {
            pipeline,
            timeout,
            slot: Semaphore::new(1),
        }
    }

    /// Run one pipeline invocation to completion or to timeout.
    ///
    /// Guarantee: exactly one of completed / timed-out / failed comes back,
    /// within the timeout plus scheduling overhead.
    pub async fn run(&self, request: AnalysisQuery) -> PipelineResult {
        let permit = match self.slot.acquire().await {
            Ok(permit) => permit,
            // The semaphore is never closed; treat it as a failure anyway
            // rather than panicking inside the request path.
            Err(e) => return PipelineResult::Failed(e.to_string()),
        };

        let pipeline = Arc::clone(&self.pipeline);
        let mut handle = tokio::spawn(async move { pipeline.run(&request).await });

        let result = match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(analysis))) => PipelineResult::Completed(analysis),
            Ok(Ok(Err(e))) => {
                tracing::error!(error = %e, "error in pipeline execution");
                PipelineResult::Failed(e.to_string())
            }
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "pipeline task aborted or panicked");
                PipelineResult::Failed(join_err.to_string())
            }
            Err(_) => {
                tracing::error!(timeout_secs = self.timeout.as_secs(), "pipeline execution timed out");
                handle.abort();
                PipelineResult::TimedOut
            }
        };

        drop(permit);
        result
    }
}
