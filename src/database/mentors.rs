use sqlx::types::Json;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Action, Actor, MentorPolicy, Predicate, RowPolicy, check_for, filter_for};
use crate::database::{RowUpdate, begin_write, delete_row, select_where};
use crate::error::AppError;
use crate::models::{DbMentor, Mentor, MentorChanges, NewMentor};

const MENTOR_COLUMNS: &str = "id, company, position, bio, experience_years, hourly_rate, \
                              expertise, available, created_at, updated_at";

#[instrument(skip(pool, mentor), fields(mentor_id = %mentor.id))]
pub async fn create_mentor(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    mentor: &NewMentor,
) -> Result<Mentor, AppError> {
    info!("Creating mentor");

    if !check_for::<MentorPolicy>(actor, Action::Insert).matches(mentor) {
        return Err(AppError::Authorization(
            "Identities can only register themselves as mentors".to_string(),
        ));
    }

    let row = sqlx::query_as::<_, DbMentor>(&format!(
        "INSERT INTO mentors
         (id, company, position, bio, experience_years, hourly_rate, expertise, available)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING {}",
        MENTOR_COLUMNS
    ))
    .bind(mentor.id)
    .bind(&mentor.company)
    .bind(&mentor.position)
    .bind(&mentor.bio)
    .bind(mentor.experience_years)
    .bind(mentor.hourly_rate)
    .bind(Json(&mentor.expertise))
    .bind(mentor.available)
    .fetch_one(pool)
    .await?;

    Ok(Mentor::from(row))
}

#[instrument(skip(pool))]
pub async fn get_mentor(pool: &Pool<Sqlite>, actor: &Actor, id: Uuid) -> Result<Mentor, AppError> {
    info!("Fetching mentor");
    let mut qb = select_where(
        MENTOR_COLUMNS,
        MentorPolicy::TABLE,
        &filter_for::<MentorPolicy>(actor, Action::Select),
    );
    qb.push(" AND id = ").push_bind(id);

    qb.build_query_as::<DbMentor>()
        .fetch_optional(pool)
        .await?
        .map(Mentor::from)
        .ok_or_else(|| AppError::NotFound(format!("Mentor {} not found", id)))
}

/// Lists the mentors visible to `actor`, optionally restricted to those
/// carrying an expertise tag.
#[instrument(skip(pool))]
pub async fn list_mentors(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    expertise: Option<&str>,
) -> Result<Vec<Mentor>, AppError> {
    info!("Listing mentors");
    let mut qb = select_where(
        MENTOR_COLUMNS,
        MentorPolicy::TABLE,
        &filter_for::<MentorPolicy>(actor, Action::Select),
    );

    if let Some(tag) = expertise {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(mentors.expertise) WHERE json_each.value = ")
            .push_bind(tag.to_string())
            .push(")");
    }
    qb.push(" ORDER BY created_at");

    let rows = qb.build_query_as::<DbMentor>().fetch_all(pool).await?;

    Ok(rows.into_iter().map(Mentor::from).collect())
}

#[instrument(skip(pool))]
pub async fn update_mentor(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    id: Uuid,
    changes: &MentorChanges,
) -> Result<Mentor, AppError> {
    info!("Updating mentor");
    let using = filter_for::<MentorPolicy>(actor, Action::Update);

    let mut tx = begin_write(pool).await?;

    let mut qb = select_where(MENTOR_COLUMNS, MentorPolicy::TABLE, &using);
    qb.push(" AND id = ").push_bind(id);
    let current = qb
        .build_query_as::<DbMentor>()
        .fetch_optional(&mut *tx)
        .await?
        .map(Mentor::from)
        .ok_or_else(|| AppError::NotFound(format!("Mentor {} not found", id)))?;

    let next = changes.apply_to(&current);

    if !check_for::<MentorPolicy>(actor, Action::Update).matches(&next) {
        return Err(AppError::Authorization(
            "Updated mentor violates row policy".to_string(),
        ));
    }

    let mut update = RowUpdate::new(MentorPolicy::TABLE);
    update
        .set("company", next.company.clone())
        .set("position", next.position.clone())
        .set("bio", next.bio.clone())
        .set("experience_years", next.experience_years)
        .set("hourly_rate", next.hourly_rate)
        .set("expertise", Json(next.expertise.clone()))
        .set("available", next.available);
    update.execute_one(id, &using, &mut *tx).await?;

    let mut qb = select_where(MENTOR_COLUMNS, MentorPolicy::TABLE, &Predicate::Allow);
    qb.push(" AND id = ").push_bind(id);
    let updated = qb.build_query_as::<DbMentor>().fetch_one(&mut *tx).await?;

    tx.commit().await?;

    Ok(Mentor::from(updated))
}

#[instrument(skip(pool))]
pub async fn delete_mentor(pool: &Pool<Sqlite>, actor: &Actor, id: Uuid) -> Result<bool, AppError> {
    delete_row::<MentorPolicy>(pool, actor, id).await
}
