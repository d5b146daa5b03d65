use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::profile::ProfileRow;
use crate::resume::fields::ParsedFields;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile persistence failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for per-user profiles. Exactly one row per user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Inserts the profile, or replaces every field of the existing one.
    async fn upsert(
        &self,
        user_id: Uuid,
        file_path: &str,
        fields: &ParsedFields,
    ) -> Result<ProfileRow, StoreError>;

    async fn get(&self, user_id: Uuid) -> Result<Option<ProfileRow>, StoreError>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        file_path: &str,
        fields: &ParsedFields,
    ) -> Result<ProfileRow, StoreError> {
        // Last writer wins on the user_id key
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles
                (user_id, resume_file_path, name, email, phone, education, experience, skills)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                resume_file_path = EXCLUDED.resume_file_path,
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                education = EXCLUDED.education,
                experience = EXCLUDED.experience,
                skills = EXCLUDED.skills,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(file_path)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.education)
        .bind(&fields.experience)
        .bind(&fields.skills)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<ProfileRow>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
