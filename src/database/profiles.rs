use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Action, Actor, Predicate, ProfilePolicy, RowPolicy, check_for, filter_for};
use crate::database::{RowUpdate, begin_write, delete_row, select_where};
use crate::error::AppError;
use crate::models::{Profile, ProfileChanges};

const PROFILE_COLUMNS: &str = "id, full_name, avatar_url, created_at, updated_at";

#[instrument(skip(pool))]
pub async fn get_profile(pool: &Pool<Sqlite>, actor: &Actor, id: Uuid) -> Result<Profile, AppError> {
    info!("Fetching profile");
    let mut qb = select_where(
        PROFILE_COLUMNS,
        ProfilePolicy::TABLE,
        &filter_for::<ProfilePolicy>(actor, Action::Select),
    );
    qb.push(" AND id = ").push_bind(id);

    qb.build_query_as::<Profile>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))
}

#[instrument(skip(pool))]
pub async fn list_profiles(pool: &Pool<Sqlite>, actor: &Actor) -> Result<Vec<Profile>, AppError> {
    info!("Listing profiles");
    let mut qb = select_where(
        PROFILE_COLUMNS,
        ProfilePolicy::TABLE,
        &filter_for::<ProfilePolicy>(actor, Action::Select),
    );
    qb.push(" ORDER BY created_at");

    Ok(qb.build_query_as::<Profile>().fetch_all(pool).await?)
}

#[instrument(skip(pool))]
pub async fn update_profile(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    id: Uuid,
    changes: &ProfileChanges,
) -> Result<Profile, AppError> {
    info!("Updating profile");
    let using = filter_for::<ProfilePolicy>(actor, Action::Update);

    let mut tx = begin_write(pool).await?;

    let mut qb = select_where(PROFILE_COLUMNS, ProfilePolicy::TABLE, &using);
    qb.push(" AND id = ").push_bind(id);
    let current = qb
        .build_query_as::<Profile>()
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))?;

    let next = changes.apply_to(&current);

    if !check_for::<ProfilePolicy>(actor, Action::Update).matches(&next) {
        return Err(AppError::Authorization(
            "Updated profile violates row policy".to_string(),
        ));
    }

    let mut update = RowUpdate::new(ProfilePolicy::TABLE);
    update
        .set("full_name", next.full_name.clone())
        .set("avatar_url", next.avatar_url.clone());
    update.execute_one(id, &using, &mut *tx).await?;

    let mut qb = select_where(PROFILE_COLUMNS, ProfilePolicy::TABLE, &Predicate::Allow);
    qb.push(" AND id = ").push_bind(id);
    let updated = qb.build_query_as::<Profile>().fetch_one(&mut *tx).await?;

    tx.commit().await?;

    Ok(updated)
}

#[instrument(skip(pool))]
pub async fn delete_profile(pool: &Pool<Sqlite>, actor: &Actor, id: Uuid) -> Result<bool, AppError> {
    delete_row::<ProfilePolicy>(pool, actor, id).await
}
