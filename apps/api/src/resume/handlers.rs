use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::models::user::Role;
use crate::resume::ingest::ResumeUpload;
use crate::state::AppState;

/// Multipart field carrying the document.
const RESUME_FIELD: &str = "resume";

#[derive(Debug, Serialize)]
pub struct UploadResumeResponse {
    pub message: String,
    pub profile: ProfileRow,
}

/// POST /uploadResume
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResumeResponse>, AppError> {
    user.require(Role::Applicant)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read resume file: {e}")))?;
        upload = Some(ResumeUpload {
            user_id: user.user_id,
            filename,
            bytes,
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| AppError::Validation("Resume file is required".to_string()))?;
    let profile = state.ingestor.ingest(upload).await?;

    Ok(Json(UploadResumeResponse {
        message: "Resume uploaded and processed successfully".to_string(),
        profile,
    }))
}
