use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Action, Actor, Predicate, RowPolicy, filter_for};
use crate::error::AppError;

/// Starts `SELECT <columns> FROM <table> WHERE <predicate>`. Callers append
/// further conditions with `AND`.
pub fn select_where(
    columns: &str,
    table: &str,
    predicate: &Predicate,
) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM {} WHERE ", columns, table));
    predicate.push_sql(&mut qb);
    qb
}

/// Deletes the row with `id` if the table's delete policy reaches it.
/// Dependent rows follow through `ON DELETE CASCADE`.
#[instrument(skip(pool), fields(table = P::TABLE))]
pub async fn delete_row<P: RowPolicy>(
    pool: &SqlitePool,
    actor: &Actor,
    id: Uuid,
) -> Result<bool, AppError> {
    info!("Deleting row");
    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new(format!("DELETE FROM {} WHERE id = ", P::TABLE));
    qb.push_bind(id).push(" AND ");
    filter_for::<P>(actor, Action::Delete).push_sql(&mut qb);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
