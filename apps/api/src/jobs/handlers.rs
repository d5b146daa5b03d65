//! Axum route handlers for job postings, applications and the admin views.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::job::JobRow;
use crate::models::profile::ProfileRow;
use crate::models::user::{Role, User};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub company_name: String,
}

impl CreateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("company_name", &self.company_name),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} cannot be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub message: String,
    pub job_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ApplyQuery {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobRow>,
}

#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    pub job: JobRow,
    pub applicants: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct ApplicantsResponse {
    pub applicants: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: ProfileRow,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<JobsResponse>, AppError> {
    let jobs = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY posted_on DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(JobsResponse { jobs }))
}

/// GET|POST /jobs/apply?job_id=
///
/// The duplicate check, insert and counter bump share one transaction.
pub async fn handle_apply(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ApplyQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    user.require(Role::Applicant)?;

    let mut tx = state.db.begin().await?;

    let job: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
        .bind(query.job_id)
        .fetch_optional(&mut *tx)
        .await?;
    let job = job.ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO applications (id, job_id, applicant_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (job_id, applicant_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job.id)
    .bind(user.user_id)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(AppError::Validation("Already applied to this job".to_string()));
    }

    sqlx::query("UPDATE jobs SET total_applications = total_applications + 1 WHERE id = $1")
        .bind(job.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!("User {} applied to job {}", user.user_id, job.id);
    Ok(Json(MessageResponse {
        message: "Applied to job successfully".to_string(),
    }))
}

/// POST /admin/job
pub async fn handle_create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>), AppError> {
    user.require(Role::Admin)?;
    req.validate()?;

    let job_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO jobs (id, title, description, company_name, posted_by)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(job_id)
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(req.company_name.trim())
    .bind(user.user_id)
    .execute(&state.db)
    .await?;

    info!("Admin {} created job {job_id}", user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(CreateJobResponse {
            message: "Job created successfully".to_string(),
            job_id,
        }),
    ))
}

/// GET /admin/job/:job_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDetailResponse>, AppError> {
    user.require(Role::Admin)?;

    let job: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(&state.db)
        .await?;
    let job = job.ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let applicants: Vec<User> = sqlx::query_as(
        r#"
        SELECT u.* FROM users u
        JOIN applications a ON a.applicant_id = u.id
        WHERE a.job_id = $1
        ORDER BY a.created_at
        "#,
    )
    .bind(job_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(JobDetailResponse { job, applicants }))
}

/// GET /admin/applicants
pub async fn handle_list_applicants(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApplicantsResponse>, AppError> {
    user.require(Role::Admin)?;

    let applicants: Vec<User> =
        sqlx::query_as("SELECT * FROM users WHERE user_type = $1 ORDER BY created_at")
            .bind(Role::Applicant.as_str())
            .fetch_all(&state.db)
            .await?;

    Ok(Json(ApplicantsResponse { applicants }))
}

/// GET /admin/applicant/:applicant_id
pub async fn handle_get_applicant_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(applicant_id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, AppError> {
    user.require(Role::Admin)?;

    let profile = state
        .profiles
        .get(applicant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Applicant profile not found".to_string()))?;

    Ok(Json(ProfileResponse { profile }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_job_validation() {
        let mut req = CreateJobRequest {
            title: "Rust Engineer".to_string(),
            description: "Build services".to_string(),
            company_name: "Acme".to_string(),
        };
        assert!(req.validate().is_ok());
        req.company_name = "  ".to_string();
        assert!(matches!(
            req.validate(),
            Err(AppError::Validation(msg)) if msg.contains("company_name")
        ));
    }
}
