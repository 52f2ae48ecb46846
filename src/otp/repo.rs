use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::OtpPurpose;

/// Insert a fresh code with the standard 15-minute expiry window.
pub async fn insert(
    db: &PgPool,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO otp_codes (email, code, purpose, expires_at)
        VALUES ($1, $2, $3, now() + interval '15 minutes')
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(code)
    .bind(purpose.as_str())
    .fetch_one(db)
    .await
    .context("insert otp code")?;
    Ok(id)
}

/// Roll back an issuance whose email dispatch failed.
pub async fn delete_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM otp_codes WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete otp code")?;
    Ok(())
}

/// Atomically consume a matching, unexpired code. Deleting in the same
/// statement makes the code single-use without a separate read.
pub async fn consume(
    db: &PgPool,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM otp_codes
        WHERE email = $1 AND code = $2 AND purpose = $3 AND expires_at > now()
        "#,
    )
    .bind(email)
    .bind(code)
    .bind(purpose.as_str())
    .execute(db)
    .await
    .context("consume otp code")?;
    Ok(result.rows_affected() > 0)
}

/// Drop every outstanding code for an address and purpose, used after a
/// successful registration or reset.
pub async fn delete_all(db: &PgPool, email: &str, purpose: OtpPurpose) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM otp_codes WHERE email = $1 AND purpose = $2")
        .bind(email)
        .bind(purpose.as_str())
        .execute(db)
        .await
        .context("delete otp codes")?;
    Ok(())
}

/// Codes issued for this address and purpose inside the current validity
/// window; the rate limit bounds brute-force and mail spam.
pub async fn issued_in_window(
    db: &PgPool,
    email: &str,
    purpose: OtpPurpose,
) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM otp_codes
        WHERE email = $1 AND purpose = $2 AND created_at > now() - interval '15 minutes'
        "#,
    )
    .bind(email)
    .bind(purpose.as_str())
    .fetch_one(db)
    .await
    .context("count recent otp codes")?;
    Ok(count)
}
