//! Uploaded report lifecycle.
//!
//! An [`UploadedReport`] is created per request, owned exclusively by the
//! request handler, and removed unconditionally at request end. The central
//! invariant: no uploaded file outlives its request.

use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::Result;

/// Leading bytes every persisted upload must carry.
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// One persisted upload, alive for the duration of one request.
#[derive(Debug)]
pub struct UploadedReport {
    id: Uuid,
    path: PathBuf,
    original_filename: String,
    content_type: String,
    size: usize,
}

impl UploadedReport {
    /// Persist upload bytes under a collision-free unique path inside
    /// `upload_dir` (created on demand). Concurrent requests never contend
    /// on the same path.
    pub async fn persist(
        upload_dir: &Path,
        original_filename: String,
        content_type: String,
        bytes: &[u8],
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let path = upload_dir.join(format!("blood_test_report_{id}.pdf"));

        tokio::fs::create_dir_all(upload_dir).await?;
        tokio::fs::write(&path, bytes).await?;

        Ok(Self {
            id,
            path,
            original_filename,
            content_type,
            size: bytes.len(),
        })
    }

    /// Check the persisted file's leading bytes against the PDF signature.
    pub async fn has_pdf_magic(&self) -> Result<bool> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        let mut header = [0u8; 4];
        match file.read_exact(&mut header).await {
            Ok(_) => Ok(&header == PDF_MAGIC),
            // Shorter than four bytes cannot be a PDF.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the persisted file. Failures are logged, never escalated.
    pub async fn cleanup(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "could not delete uploaded report"
                );
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
