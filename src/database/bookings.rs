use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Action, Actor, BookingPolicy, Predicate, RowPolicy, check_for, filter_for};
use crate::database::{RowUpdate, begin_write, delete_row, select_where};
use crate::error::AppError;
use crate::models::{Booking, BookingChanges, BookingStatus, NewBooking};

const BOOKING_COLUMNS: &str =
    "id, mentor_id, user_id, start_time, duration, status, created_at, updated_at";

/// Inserts a booking. An omitted status falls back to the column default.
/// Nothing here checks the mentor's calendar; overlapping bookings are
/// accepted.
#[instrument(skip(pool))]
pub async fn create_booking(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    booking: &NewBooking,
) -> Result<Booking, AppError> {
    info!("Creating booking");

    if !check_for::<BookingPolicy>(actor, Action::Insert).matches(booking) {
        return Err(AppError::Authorization(
            "Bookings can only be made on behalf of the caller".to_string(),
        ));
    }

    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("INSERT INTO bookings (id, mentor_id, user_id, start_time, duration");
    if booking.status.is_some() {
        qb.push(", status");
    }
    qb.push(") VALUES (");

    let mut values = qb.separated(", ");
    values
        .push_bind(Uuid::new_v4())
        .push_bind(booking.mentor_id)
        .push_bind(booking.user_id)
        .push_bind(booking.start_time)
        .push_bind(booking.duration);
    if let Some(status) = booking.status {
        values.push_bind(status);
    }

    qb.push(") RETURNING ").push(BOOKING_COLUMNS);

    Ok(qb.build_query_as::<Booking>().fetch_one(pool).await?)
}

#[instrument(skip(pool))]
pub async fn get_booking(pool: &Pool<Sqlite>, actor: &Actor, id: Uuid) -> Result<Booking, AppError> {
    info!("Fetching booking");
    let mut qb = select_where(
        BOOKING_COLUMNS,
        BookingPolicy::TABLE,
        &filter_for::<BookingPolicy>(actor, Action::Select),
    );
    qb.push(" AND id = ").push_bind(id);

    qb.build_query_as::<Booking>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
}

#[instrument(skip(pool))]
pub async fn list_bookings(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    status: Option<BookingStatus>,
) -> Result<Vec<Booking>, AppError> {
    info!("Listing bookings");
    let mut qb = select_where(
        BOOKING_COLUMNS,
        BookingPolicy::TABLE,
        &filter_for::<BookingPolicy>(actor, Action::Select),
    );

    if let Some(status) = status {
        qb.push(" AND status = ").push_bind(status);
    }
    qb.push(" ORDER BY start_time");

    Ok(qb.build_query_as::<Booking>().fetch_all(pool).await?)
}

#[instrument(skip(pool))]
pub async fn update_booking(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    id: Uuid,
    changes: &BookingChanges,
) -> Result<Booking, AppError> {
    info!("Updating booking");
    let using = filter_for::<BookingPolicy>(actor, Action::Update);

    let mut tx = begin_write(pool).await?;

    let mut qb = select_where(BOOKING_COLUMNS, BookingPolicy::TABLE, &using);
    qb.push(" AND id = ").push_bind(id);
    let current = qb
        .build_query_as::<Booking>()
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

    let next = changes.apply_to(&current);

    // The caller must still be a participant once the change is applied.
    if !check_for::<BookingPolicy>(actor, Action::Update).matches(&next) {
        return Err(AppError::Authorization(
            "Updated booking violates row policy".to_string(),
        ));
    }

    let mut update = RowUpdate::new(BookingPolicy::TABLE);
    update
        .set("mentor_id", next.mentor_id)
        .set("start_time", next.start_time)
        .set("duration", next.duration)
        .set("status", next.status);
    update.execute_one(id, &using, &mut *tx).await?;

    let mut qb = select_where(BOOKING_COLUMNS, BookingPolicy::TABLE, &Predicate::Allow);
    qb.push(" AND id = ").push_bind(id);
    let updated = qb.build_query_as::<Booking>().fetch_one(&mut *tx).await?;

    tx.commit().await?;

    Ok(updated)
}

#[instrument(skip(pool))]
pub async fn delete_booking(pool: &Pool<Sqlite>, actor: &Actor, id: Uuid) -> Result<bool, AppError> {
    delete_row::<BookingPolicy>(pool, actor, id).await
}
