//! SQLite adapter backed by sqlx

use crate::database::{RowCursor, SqlDatabase};
use crate::error::DbError;
use async_trait::async_trait;
use futures::StreamExt;
use kakehashi_sql::{ColumnIndex, ResultRow, SelectStatement, Sql92Dialect, SqlDialect};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Rows in flight between the fetch task and the cursor.
const CURSOR_BUFFER: usize = 32;

pub struct SqliteAdapter {
    pool: SqlitePool,
    dialect: Sql92Dialect,
}

impl SqliteAdapter {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| DbError::Connect {
                url: database_url.to_string(),
                source: Box::new(e),
            })?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteAdapter {
            pool,
            dialect: Sql92Dialect,
        }
    }
}

#[async_trait]
impl SqlDatabase for SqliteAdapter {
    fn dialect(&self) -> &dyn SqlDialect {
        &self.dialect
    }

    async fn execute_select(
        &self,
        statement: &SelectStatement,
    ) -> Result<Box<dyn RowCursor>, DbError> {
        let (tx, rx) = mpsc::channel(CURSOR_BUFFER);
        let pool = self.pool.clone();
        let sql = statement.sql.clone();
        let projection = statement.projection.clone();
        tokio::spawn(async move {
            let mut rows = sqlx::query(&sql).fetch(&pool);
            while let Some(fetched) = rows.next().await {
                let item = match fetched {
                    Ok(row) => decode_row(&row, &projection),
                    Err(e) => Err(DbError::Query {
                        source: Box::new(e),
                    }),
                };
                let terminal = item.is_err();
                if tx.send(item).await.is_err() || terminal {
                    // Cursor dropped, or the statement failed; either way
                    // the remaining rows are abandoned.
                    return;
                }
            }
        });
        Ok(Box::new(SqliteCursor { rows: rx }))
    }
}

/// Pulls rows on demand from the fetch task. Dropping the cursor closes
/// the channel and the task stops fetching.
pub struct SqliteCursor {
    rows: mpsc::Receiver<Result<ResultRow, DbError>>,
}

#[async_trait]
impl RowCursor for SqliteCursor {
    async fn next_row(&mut self) -> Result<Option<ResultRow>, DbError> {
        match self.rows.recv().await {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

fn decode_row(row: &SqliteRow, projection: &Arc<ColumnIndex>) -> Result<ResultRow, DbError> {
    let mut values = Vec::with_capacity(projection.len());
    for index in 0..projection.len() {
        values.push(decode_column(row, index)?);
    }
    Ok(ResultRow::new(projection.clone(), values))
}

/// SQLite columns are dynamically typed; fall back from text through the
/// numeric types before giving up.
fn decode_column(row: &SqliteRow, index: usize) -> Result<Option<String>, DbError> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(|v| v.to_string()));
    }
    match row.try_get::<Option<f64>, _>(index) {
        Ok(value) => Ok(value.map(|v| v.to_string())),
        Err(e) => Err(DbError::Decode {
            index,
            source: Box::new(e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakehashi_sql::{ColumnRef, FragmentBuilder, SelectBuilder};

    fn col(qualified: &str) -> ColumnRef {
        ColumnRef::parse(qualified).unwrap()
    }

    async fn seeded_adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE employees (id INTEGER PRIMARY KEY, name TEXT, dept TEXT)",
        )
        .execute(&adapter.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO employees (id, name, dept) VALUES \
             (1, 'Alice', 'Sales'), (2, 'Bob', NULL)",
        )
        .execute(&adapter.pool)
        .await
        .unwrap();
        adapter
    }

    #[tokio::test]
    async fn test_select_round_trip() {
        let adapter = seeded_adapter().await;
        let statement = SelectBuilder::new(adapter.dialect())
            .build(
                &FragmentBuilder::new()
                    .table("employees")
                    .projection(col("employees.id"))
                    .projection(col("employees.name"))
                    .projection(col("employees.dept"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let mut cursor = adapter.execute_select(&statement).await.unwrap();

        let first = cursor.next_row().await.unwrap().unwrap();
        // INTEGER column comes back through the numeric fallback.
        assert_eq!(first.get(&col("employees.id")), Some("1"));
        assert_eq!(first.get(&col("employees.name")), Some("Alice"));

        let second = cursor.next_row().await.unwrap().unwrap();
        assert_eq!(second.get(&col("employees.dept")), None);
        assert!(cursor.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_error_surfaces_on_first_row() {
        let adapter = seeded_adapter().await;
        let statement = SelectBuilder::new(adapter.dialect())
            .build(
                &FragmentBuilder::new()
                    .table("missing_table")
                    .projection(col("missing_table.c"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        // The statement is only sent when the cursor is pulled.
        let mut cursor = adapter.execute_select(&statement).await.unwrap();
        assert!(matches!(cursor.next_row().await, Err(DbError::Query { .. })));
    }

    #[tokio::test]
    async fn test_dropping_cursor_midstream_releases_the_connection() {
        let adapter = seeded_adapter().await;
        let statement = SelectBuilder::new(adapter.dialect())
            .build(
                &FragmentBuilder::new()
                    .table("employees")
                    .projection(col("employees.id"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let mut cursor = adapter.execute_select(&statement).await.unwrap();
        assert!(cursor.next_row().await.unwrap().is_some());
        drop(cursor);

        let mut again = adapter.execute_select(&statement).await.unwrap();
        assert!(again.next_row().await.unwrap().is_some());
    }
}
