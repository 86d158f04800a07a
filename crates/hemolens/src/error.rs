//! Error types for hemolens.
//!
//! All fallible operations in the library return [`Result`], built on
//! [`HemolensError`]. The error handling policy:
//!
//! - IO errors bubble up unchanged via `?` — they indicate real system
//!   problems and must surface.
//! - Application errors (`Validation`, `Extraction`, `Provider`,
//!   `Serialization`) carry a message and, where available, the source
//!   error for the chain.
//! - Nothing inside the agent pipeline is allowed to escape to the HTTP
//!   layer as a panic or an unclassified error; the pipeline runner
//!   converts every failure into a textual outcome.

use thiserror::Error;

/// Result type alias using `HemolensError`.
pub type Result<T> = std::result::Result<T, HemolensError>;

/// Main error type for all hemolens operations.
#[derive(Debug, Error)]
pub enum HemolensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input: bad upload, bad configuration value, empty step list.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// PDF parsing or text extraction failure.
    #[error("Extraction error: {message}")]
    Extraction {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Model provider failure: transport error, non-success status, or a
    /// response the call contract cannot interpret.
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for HemolensError {
    fn from(err: serde_json::Error) -> Self {
        HemolensError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for HemolensError {
    fn from(err: reqwest::Error) -> Self {
        HemolensError::Provider {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl HemolensError {
    /// Create a Validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Create an Extraction error.
    pub fn extraction<S: Into<String>>(message: S) -> Self {
        Self::Extraction {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Provider error.
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Provider error with source.
    pub fn provider_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
