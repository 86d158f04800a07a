//! HTTP surface for the blood-test analysis service.
//!
//! # Endpoints
//!
//! - `GET /` - Liveness probe, no side effects
//! - `POST /analyze` - Analyze an uploaded blood-test report
//!   (multipart form data: `file` required, `query` optional)
//!
//! # cURL examples
//!
//! ```bash
//! # Liveness
//! curl http://localhost:8080/
//!
//! # Analyze a report with the default summarization query
//! curl -F "file=@report.pdf;type=application/pdf" http://localhost:8080/analyze
//!
//! # Analyze with an explicit query
//! curl -F "file=@report.pdf;type=application/pdf" \
//!      -F "query=Why is my LDL high?" \
//!      http://localhost:8080/analyze
//! ```

mod error;
mod handlers;
mod server;
mod types;
mod upload;

pub use error::ApiError;
pub use server::{create_router, serve};
pub use types::{AnalyzeResponse, ApiState, ErrorResponse, RootResponse};
pub use upload::UploadedReport;
