use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
display_name, date_of_birth, gender, location, created_at";

/// True when the wrapped sqlx error is a Postgres unique violation, i.e. a
/// username/email conflict that raced past the pre-check.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.code().as_deref() == Some("23505"))
        .unwrap_or(false)
}

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(db)
                .await?;
        Ok(user)
    }

    /// Pre-registration availability check on both unique columns at once.
    pub async fn username_or_email_taken(
        db: &PgPool,
        username: &str,
        email: &str,
    ) -> anyhow::Result<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2 LIMIT 1")
                .bind(username)
                .bind(email)
                .fetch_optional(db)
                .await?;
        Ok(row.is_some())
    }

    pub async fn create(db: &PgPool, candidate: &NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (
                username, email, password_hash, first_name, last_name,
                display_name, date_of_birth, gender, location
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&candidate.username)
        .bind(&candidate.email)
        .bind(&candidate.password_hash)
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(&candidate.display_name)
        .bind(candidate.date_of_birth)
        .bind(&candidate.gender)
        .bind(&candidate.location)
        .fetch_one(db)
        .await
        .map_err(anyhow::Error::from)?;
        Ok(user)
    }

    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(db)
            .await
            .context("update password")?;
        Ok(())
    }

    pub async fn update_password_by_email(
        db: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(email)
            .execute(db)
            .await
            .context("update password by email")?;
        Ok(())
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                first_name = $1, last_name = $2, display_name = $3,
                date_of_birth = $4, gender = $5, location = $6
            WHERE id = $7
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.display_name)
        .bind(update.date_of_birth)
        .bind(&update.gender)
        .bind(&update.location)
        .bind(id)
        .execute(db)
        .await
        .context("update profile")?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes the user and every owned identification in one transaction,
    /// so a failure at any step leaves both tables untouched.
    pub async fn delete_with_identifications(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = db.begin().await.context("begin delete tx")?;

        sqlx::query("DELETE FROM plant_identifications WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete identifications")?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete user")?;

        tx.commit().await.context("commit delete tx")?;
        Ok(result.rows_affected() > 0)
    }
}
