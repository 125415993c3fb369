use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::Session;
use crate::error::AppError;

#[instrument(skip(pool, token))]
pub async fn create_session(
    pool: &Pool<Sqlite>,
    identity_id: Uuid,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<i64, AppError> {
    info!("Creating identity session");

    let res = sqlx::query(
        "INSERT INTO identity_sessions (identity_id, token, expires_at) VALUES (?, ?, ?)",
    )
    .bind(identity_id)
    .bind(token)
    .bind(expires_at.naive_utc())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(pool: &Pool<Sqlite>, token: &str) -> Result<Session, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, Session>(
        "SELECT id, identity_id, token, created_at, expires_at
         FROM identity_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    session.ok_or_else(|| AppError::Authentication("Invalid session token".to_string()))
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM identity_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let result = sqlx::query(
        "DELETE FROM identity_sessions WHERE julianday(expires_at) < julianday(?)",
    )
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
