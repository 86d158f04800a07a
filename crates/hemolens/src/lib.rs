//! Hemolens - Blood-Test Report Analysis Service
//!
//! Hemolens accepts an uploaded PDF blood-test report plus a free-text
//! query, extracts the report text, and runs a fixed sequential pipeline of
//! role-specialized language-model agents (verifier, nutritionist, exercise
//! physiologist, doctor) that produces a synthesized analysis.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use hemolens::{AppConfig, api};
//!
//! #[tokio::main]
//! async fn main() -> hemolens::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     api::serve("127.0.0.1", 8080, config).await
//! }
//! ```
//!
//! # Architecture
//!
//! - [`report`] - PDF text extraction behind the never-fails tool contract
//! - [`agent`] - personas, the provider call contract, and the sequential
//!   step pipeline
//! - [`runner`] - the timeout- and concurrency-bounded execution wrapper
//! - [`api`] - axum routes: upload validation, persistence, cleanup, and
//!   response envelopes
//!
//! The invariants the request path guarantees: validation fails fast before
//! any model call, each upload lives at a collision-free unique path, no
//! uploaded file outlives its request, and every invocation resolves within
//! the configured timeout plus scheduling overhead.

#![deny(unsafe_code)]

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;

pub use agent::{AgentPersona, AnalysisQuery, ChatProvider, Pipeline, PipelineStep};
pub use config::AppConfig;
pub use error::{HemolensError, Result};
pub use report::ReportReader;
pub use runner::{PipelineResult, PipelineRunner, TIMEOUT_MESSAGE};
