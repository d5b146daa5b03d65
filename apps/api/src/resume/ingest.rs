//! Resume ingestion: validate → store → extract → parse → persist.
//!
//! Each step runs only if the previous one succeeded. Nothing is rolled back on
//! failure: a stored file stays on disk, and the next upload of the same name
//! overwrites it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::profile::ProfileRow;
use crate::resume::extract::{extract, DocumentFormat, ExtractError};
use crate::resume::fields::{FieldParser, ParseError};
use crate::resume::store::{ProfileStore, StoreError};

/// A resume as received from the client. Lives for one request.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub user_id: Uuid,
    pub filename: String,
    pub bytes: Bytes,
}

/// The step a failed ingestion stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Validated,
    Stored,
    Extracted,
    Parsed,
    Persisted,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Validated => "validation",
            IngestStage::Stored => "storage",
            IngestStage::Extracted => "text extraction",
            IngestStage::Parsed => "parsing",
            IngestStage::Persisted => "profile update",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("only PDF and DOCX formats are allowed (got '{0}')")]
    UnsupportedFormat(String),

    #[error("failed to save resume: {0}")]
    Storage(#[source] std::io::Error),

    #[error("failed to extract resume text: {0}")]
    Extraction(#[source] ExtractError),

    #[error("failed to parse resume: {0}")]
    Parsing(#[source] ParseError),

    #[error("failed to save profile: {0}")]
    Persistence(#[source] StoreError),
}

impl IngestError {
    pub fn stage(&self) -> IngestStage {
        match self {
            IngestError::UnsupportedFormat(_) => IngestStage::Validated,
            IngestError::Storage(_) => IngestStage::Stored,
            IngestError::Extraction(_) => IngestStage::Extracted,
            IngestError::Parsing(_) => IngestStage::Parsed,
            IngestError::Persistence(_) => IngestStage::Persisted,
        }
    }
}

/// Drives a single upload through the pipeline.
#[derive(Clone)]
pub struct ResumeIngestor {
    parser: Arc<dyn FieldParser>,
    profiles: Arc<dyn ProfileStore>,
    upload_dir: PathBuf,
}

impl ResumeIngestor {
    pub fn new(
        parser: Arc<dyn FieldParser>,
        profiles: Arc<dyn ProfileStore>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            parser,
            profiles,
            upload_dir: upload_dir.into(),
        }
    }

    /// `<upload_dir>/<user_id>_<filename>`. The same user and filename always map to the same path.
    pub fn stored_path(&self, user_id: Uuid, filename: &str) -> PathBuf {
        self.upload_dir.join(format!("{user_id}_{filename}"))
    }

    pub async fn ingest(&self, upload: ResumeUpload) -> Result<ProfileRow, IngestError> {
        let user_id = upload.user_id;
        let result = self.run(upload).await;
        if let Err(e) = &result {
            warn!("Resume ingestion for user {user_id} failed at {}: {e}", e.stage());
        }
        result
    }

    async fn run(&self, upload: ResumeUpload) -> Result<ProfileRow, IngestError> {
        let ResumeUpload {
            user_id,
            filename,
            bytes,
        } = upload;

        // Received → Validated
        let (filename, format) = validate_filename(&filename)?;
        info!("Resume upload for user {user_id} validated as {format}: {filename}");

        // Validated → Stored
        let path = self.stored_path(user_id, &filename);
        store_file(&path, &bytes).await.map_err(IngestError::Storage)?;
        info!("Resume for user {user_id} stored at {}", path.display());

        // Stored → Extracted
        let text = extract(&path, format)
            .await
            .map_err(IngestError::Extraction)?;
        info!("Extracted {} chars of text for user {user_id}", text.len());

        // Extracted → Parsed
        let fields = self
            .parser
            .parse(&text)
            .await
            .map_err(IngestError::Parsing)?;
        info!("Resume fields parsed for user {user_id}");

        // Parsed → Persisted
        let file_path = path.to_string_lossy();
        let profile = self
            .profiles
            .upsert(user_id, &file_path, &fields)
            .await
            .map_err(IngestError::Persistence)?;
        info!("Profile updated for user {user_id}");

        Ok(profile)
    }
}

/// Reduces the client-supplied name to its last path component and resolves its format.
fn validate_filename(raw: &str) -> Result<(String, DocumentFormat), IngestError> {
    let name = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(IngestError::UnsupportedFormat(raw.to_string()));
    }
    let format = DocumentFormat::from_path(Path::new(name))
        .map_err(|_| IngestError::UnsupportedFormat(name.to_string()))?;
    Ok((name.to_string(), format))
}

async fn store_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}
