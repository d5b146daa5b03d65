pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::jobs::handlers as jobs;
use crate::resume::handlers as resume;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Public
        .route("/signup", post(auth::handle_signup))
        .route("/login", post(auth::handle_login))
        // Applicant
        .route("/uploadResume", post(resume::handle_upload_resume))
        .route("/jobs", get(jobs::handle_list_jobs))
        .route("/jobs/apply", get(jobs::handle_apply).post(jobs::handle_apply))
        // Admin
        .route("/admin/job", post(jobs::handle_create_job))
        .route("/admin/job/:job_id", get(jobs::handle_get_job))
        .route("/admin/applicants", get(jobs::handle_list_applicants))
        .route("/admin/applicant/:applicant_id", get(jobs::handle_get_applicant_profile))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
