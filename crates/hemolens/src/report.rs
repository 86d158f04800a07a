//! Blood-test report reading.
//!
//! [`ReportReader`] is the tool the pipeline's agents use to turn an
//! uploaded PDF into text. It is a stateless capability; the pipeline holds
//! it behind an `Arc` and every step shares the same instance.
//!
//! Two surfaces:
//!
//! - [`ReportReader::extract`] is the fallible extraction path used by the
//!   CLI and by tests.
//! - [`ReportReader::read_to_text`] is the tool contract consumed by the
//!   pipeline: it never fails. A missing file, an unparseable PDF, or an
//!   empty document all come back as an `Error: ...` description that flows
//!   into the pipeline as if it were report content.

use std::path::Path;

use crate::{HemolensError, Result};

/// Well-known sample path used when a step invokes the tool without a path.
pub const DEFAULT_REPORT_PATH: &str = "data/sample.pdf";

/// Stateless PDF-to-text reader shared across pipeline steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportReader;

impl ReportReader {
    pub fn new() -> Self {
        Self
    }

    /// Extract the concatenated text of all pages.
    ///
    /// Pages are separated by single newlines and runs of blank lines are
    /// collapsed, so downstream prompts stay compact.
    pub fn extract(&self, path: &Path) -> Result<String> {
        let document = lopdf::Document::load(path).map_err(|e| {
            HemolensError::extraction(format!("failed to parse PDF {}: {}", path.display(), e))
        })?;

        let mut full_report = String::new();
        for page_number in document.get_pages().keys() {
            match document.extract_text(&[*page_number]) {
                Ok(content) => {
                    full_report.push_str(&content);
                    full_report.push('\n');
                }
                Err(e) => {
                    // A single unreadable page should not sink the report.
                    tracing::warn!(
                        page = page_number,
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable PDF page"
                    );
                }
            }
        }

        let text = collapse_blank_lines(&full_report);
        if text.trim().is_empty() {
            return Err(HemolensError::extraction(format!(
                "could not extract text from PDF {}",
                path.display()
            )));
        }
        Ok(text)
    }

    /// Tool contract: read a report to text, absorbing every failure into a
    /// textual error description. Never returns an error.
    pub fn read_to_text(&self, path: Option<&Path>) -> String {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_REPORT_PATH));

        if !path.exists() {
            return format!("Error: File {} not found", path.display());
        }

        match self.extract(path) {
            Ok(text) => text,
            Err(e) => format!("Error reading file {}: {}", path.display(), e),
        }
    }
}

/// Collapse runs of blank lines to single newlines and drop trailing
/// whitespace per line.
fn collapse_blank_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for line in input.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
