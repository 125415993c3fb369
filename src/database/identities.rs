use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::Actor;
use crate::database::begin_write;
use crate::error::AppError;
use crate::models::Profile;

#[cfg(not(test))]
const PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const PASSWORD_COST: u32 = 4;

/// Creates an identity and its profile in one transaction.
#[instrument(skip_all, fields(email))]
pub async fn register_identity(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<Profile, AppError> {
    info!("Registering identity");

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM identities WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "Email '{}' is already registered",
            email
        )));
    }

    let password_hash = bcrypt::hash(password, PASSWORD_COST)?;
    let id = Uuid::new_v4();

    let mut tx = begin_write(pool).await?;

    sqlx::query("INSERT INTO identities (id, email, password_hash) VALUES (?, ?, ?)")
        .bind(id)
        .bind(email)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

    let profile = sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (id, full_name) VALUES (?, ?)
         RETURNING id, full_name, avatar_url, created_at, updated_at",
    )
    .bind(id)
    .bind(full_name)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(profile)
}

/// Returns the identity id when `password` matches the stored hash.
#[instrument(skip_all, fields(email))]
pub async fn authenticate_identity(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<Uuid>, AppError> {
    info!("Authenticating identity");

    let row = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, password_hash FROM identities WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((id, password_hash)) => match bcrypt::verify(password, &password_hash) {
            Ok(true) => Ok(Some(id)),
            _ => Ok(None),
        },
        None => Ok(None),
    }
}

/// Deletes an identity. Its profile, mentor row, bookings and sessions go
/// with it. Identities may only delete themselves.
#[instrument(skip(pool))]
pub async fn delete_identity(pool: &Pool<Sqlite>, actor: &Actor, id: Uuid) -> Result<bool, AppError> {
    info!("Deleting identity");

    match actor {
        Actor::Service => {}
        Actor::Authenticated(actor_id) if *actor_id == id => {}
        Actor::Authenticated(_) => {
            return Err(AppError::Authorization(
                "Identities can only delete themselves".to_string(),
            ));
        }
    }

    let result = sqlx::query("DELETE FROM identities WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
