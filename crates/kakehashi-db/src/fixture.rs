//! Canned database for tests
//!
//! A [`FixtureDatabase`] answers SELECTs from predeclared row sets keyed
//! by SQL substrings, records every statement it was asked to run, and
//! counts live cursors so tests can assert that cancellation releases
//! them.

use crate::database::{RowCursor, SqlDatabase, VecCursor};
use crate::error::DbError;
use async_trait::async_trait;
use kakehashi_sql::{ColumnRef, ResultRow, SelectStatement, Sql92Dialect, SqlDialect};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One canned row: (column, value) pairs, resolved against the incoming
/// statement's projection when the query runs.
pub type FixtureRow = Vec<(ColumnRef, Option<String>)>;

enum Response {
    Rows(Vec<FixtureRow>),
    Fail(String),
}

struct Rule {
    sql_contains: String,
    response: Response,
}

#[derive(Default)]
pub struct FixtureDatabase {
    dialect: Sql92Dialect,
    rules: Vec<Rule>,
    fallback_empty: bool,
    issued: Mutex<Vec<String>>,
    open_cursors: Arc<AtomicUsize>,
}

impl FixtureDatabase {
    pub fn new() -> Self {
        FixtureDatabase::default()
    }

    /// Statements matching no rule answer with zero rows instead of an
    /// [`DbError::UnmatchedFixture`] error.
    pub fn with_empty_fallback(mut self) -> Self {
        self.fallback_empty = true;
        self
    }

    /// Answers any statement whose SQL contains `sql_contains` with the
    /// given rows. Earlier rules win.
    pub fn with_rows<S: Into<String>>(mut self, sql_contains: S, rows: Vec<FixtureRow>) -> Self {
        self.rules.push(Rule {
            sql_contains: sql_contains.into(),
            response: Response::Rows(rows),
        });
        self
    }

    /// Fails any statement whose SQL contains `sql_contains`.
    pub fn with_failure<S: Into<String>, M: Into<String>>(
        mut self,
        sql_contains: S,
        message: M,
    ) -> Self {
        self.rules.push(Rule {
            sql_contains: sql_contains.into(),
            response: Response::Fail(message.into()),
        });
        self
    }

    /// Every SQL statement executed so far, in order.
    pub fn issued_sql(&self) -> Vec<String> {
        self.lock_issued().clone()
    }

    /// The number of cursors handed out and not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    fn lock_issued(&self) -> MutexGuard<'_, Vec<String>> {
        self.issued.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn resolve_rows(
        statement: &SelectStatement,
        rows: &[FixtureRow],
    ) -> Vec<ResultRow> {
        rows.iter()
            .map(|row| {
                let mut values = vec![None; statement.projection.len()];
                for (column, value) in row {
                    if let Some(position) = statement.projection.position_of(column) {
                        values[position] = value.clone();
                    }
                }
                ResultRow::new(statement.projection.clone(), values)
            })
            .collect()
    }
}

#[async_trait]
impl SqlDatabase for FixtureDatabase {
    fn dialect(&self) -> &dyn SqlDialect {
        &self.dialect
    }

    async fn execute_select(
        &self,
        statement: &SelectStatement,
    ) -> Result<Box<dyn RowCursor>, DbError> {
        self.lock_issued().push(statement.sql.clone());
        let rule = self
            .rules
            .iter()
            .find(|rule| statement.sql.contains(&rule.sql_contains));
        let rows = match rule {
            Some(Rule {
                response: Response::Fail(message),
                ..
            }) => return Err(DbError::Injected(message.clone())),
            Some(Rule {
                response: Response::Rows(rows),
                ..
            }) => Self::resolve_rows(statement, rows),
            None if self.fallback_empty => Vec::new(),
            None => {
                return Err(DbError::UnmatchedFixture {
                    sql: statement.sql.clone(),
                })
            }
        };
        Ok(Box::new(CountedCursor::new(rows, self.open_cursors.clone())))
    }
}

/// A cursor that keeps the owning fixture's live-cursor count accurate.
struct CountedCursor {
    rows: VecCursor,
    counter: Arc<AtomicUsize>,
}

impl CountedCursor {
    fn new(rows: Vec<ResultRow>, counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        CountedCursor {
            rows: VecCursor::new(rows),
            counter,
        }
    }
}

impl Drop for CountedCursor {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RowCursor for CountedCursor {
    async fn next_row(&mut self) -> Result<Option<ResultRow>, DbError> {
        self.rows.next_row().await
    }
}

/// Shorthand for building fixture rows from `table.column` strings.
pub fn fixture_row(columns: &[(&str, Option<&str>)]) -> FixtureRow {
    columns
        .iter()
        .filter_map(|(column, value)| {
            ColumnRef::parse(column)
                .ok()
                .map(|c| (c, value.map(str::to_string)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakehashi_sql::{FragmentBuilder, SelectBuilder};

    fn col(qualified: &str) -> ColumnRef {
        ColumnRef::parse(qualified).unwrap()
    }

    fn employees_statement() -> SelectStatement {
        SelectBuilder::new(&Sql92Dialect)
            .build(
                &FragmentBuilder::new()
                    .table("employees")
                    .projection(col("employees.id"))
                    .projection(col("employees.name"))
                    .build()
                    .unwrap(),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_rows_resolve_against_projection() {
        let fixture = FixtureDatabase::new().with_rows(
            "employees",
            vec![fixture_row(&[
                ("employees.id", Some("1")),
                ("employees.name", Some("Alice")),
            ])],
        );
        let statement = employees_statement();
        let mut cursor = fixture.execute_select(&statement).await.unwrap();
        let row = cursor.next_row().await.unwrap().unwrap();
        assert_eq!(row.get(&col("employees.id")), Some("1"));
        assert_eq!(row.get(&col("employees.name")), Some("Alice"));
        assert_eq!(fixture.issued_sql(), vec![statement.sql]);
    }

    #[tokio::test]
    async fn test_unmatched_statement_errors_unless_fallback() {
        let strict = FixtureDatabase::new();
        assert!(matches!(
            strict.execute_select(&employees_statement()).await,
            Err(DbError::UnmatchedFixture { .. })
        ));
        let lenient = FixtureDatabase::new().with_empty_fallback();
        let mut cursor = lenient
            .execute_select(&employees_statement())
            .await
            .unwrap();
        assert!(cursor.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let fixture = FixtureDatabase::new().with_failure("employees", "disk on fire");
        assert!(matches!(
            fixture.execute_select(&employees_statement()).await,
            Err(DbError::Injected(_))
        ));
    }

    #[tokio::test]
    async fn test_cursor_count_tracks_drops() {
        let fixture = FixtureDatabase::new().with_rows("employees", Vec::new());
        assert_eq!(fixture.open_cursors(), 0);
        let cursor = fixture
            .execute_select(&employees_statement())
            .await
            .unwrap();
        assert_eq!(fixture.open_cursors(), 1);
        drop(cursor);
        assert_eq!(fixture.open_cursors(), 0);
    }
}
