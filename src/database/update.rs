use sqlx::{Encode, Executor, QueryBuilder, Sqlite, Type};
use tracing::debug;
use uuid::Uuid;

use crate::auth::Predicate;
use crate::error::AppError;

/// Current UTC time as stored in every timestamp column.
pub const NOW_SQL: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// Columns maintained by the datastore. Callers never assign them.
const MANAGED_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

/// UPDATE statement shared by every table.
///
/// `updated_at` is always refreshed, and never moves backwards, so it stays
/// at or after both its previous value and `created_at`. The row is only
/// reached if the policy predicate passed to [`RowUpdate::execute`] allows it.
pub struct RowUpdate<'args> {
    table: &'static str,
    qb: QueryBuilder<'args, Sqlite>,
    assignments: usize,
}

impl<'args> RowUpdate<'args> {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            qb: QueryBuilder::new(format!("UPDATE {} SET ", table)),
            assignments: 0,
        }
    }

    pub fn set<T>(&mut self, column: &'static str, value: T) -> &mut Self
    where
        T: 'args + Encode<'args, Sqlite> + Type<Sqlite>,
    {
        debug_assert!(
            !MANAGED_COLUMNS.contains(&column),
            "{} is maintained by RowUpdate",
            column
        );

        self.qb.push(column).push(" = ").push_bind(value).push(", ");
        self.assignments += 1;
        self
    }

    /// Runs the update against the row with `id`, returning whether a row was
    /// touched.
    pub async fn execute<'e, E>(
        mut self,
        id: Uuid,
        using: &Predicate,
        executor: E,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.qb
            .push("updated_at = MAX(")
            .push(NOW_SQL)
            .push(", updated_at) WHERE id = ")
            .push_bind(id)
            .push(" AND ");
        using.push_sql(&mut self.qb);

        debug!(table = self.table, assignments = self.assignments, "Executing row update");
        let result = self.qb.build().execute(executor).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Like [`RowUpdate::execute`], but a row the predicate does not reach is
    /// reported as not found.
    pub async fn execute_one<'e, E>(
        self,
        id: Uuid,
        using: &Predicate,
        executor: E,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let table = self.table;
        if self.execute(id, using, executor).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("No {} row {} to update", table, id)))
        }
    }
}
