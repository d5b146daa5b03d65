//! Axum route handlers for sign-up and login.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::jwt::issue_token;
use crate::auth::password::{hash_password, verify_password};
use crate::errors::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_type: String,
    #[serde(default)]
    pub profile_headline: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl SignupRequest {
    fn validate(&self) -> Result<Role, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        let email = self.email.trim();
        if email.len() < 3 || !email.contains('@') {
            return Err(AppError::Validation("email is not valid".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        self.user_type
            .parse::<Role>()
            .map_err(|_| AppError::Validation("user_type must be Admin or Applicant".to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let role = req.validate()?;
    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, address, user_type, password_hash, profile_headline)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(user_id)
    .bind(req.name.trim())
    .bind(req.email.trim().to_lowercase())
    .bind(&req.address)
    .bind(role.as_str())
    .bind(&password_hash)
    .bind(&req.profile_headline)
    .execute(&state.db)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    info!("Registered {role} user {user_id}");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User registered successfully".to_string(),
            user_id,
        }),
    ))
}

/// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(req.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or(AppError::Unauthorized)?;
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let role = user
        .user_type
        .parse::<Role>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("user {}: {e}", user.id)))?;
    let token = issue_token(
        user.id,
        role,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    info!("Issued token for user {}", user.id);
    Ok(Json(LoginResponse { token }))
}
