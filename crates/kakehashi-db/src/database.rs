//! Connection traits
//!
//! The engine only ever needs two things from a database: the dialect to
//! render SQL in, and a way to run one SELECT and walk its rows. Cursors
//! are streaming by contract; dropping one releases its resources without
//! draining the remaining rows.

use crate::error::DbError;
use async_trait::async_trait;
use kakehashi_sql::{ResultRow, SelectStatement, SqlDialect};
use std::collections::VecDeque;

/// A forward-only walk over the rows of one executed statement.
#[async_trait]
pub trait RowCursor: Send {
    /// The next row, or `None` when the result set is exhausted.
    async fn next_row(&mut self) -> Result<Option<ResultRow>, DbError>;
}

/// One database connection, shared across concurrent stages.
#[async_trait]
pub trait SqlDatabase: Send + Sync {
    fn dialect(&self) -> &dyn SqlDialect;

    async fn execute_select(
        &self,
        statement: &SelectStatement,
    ) -> Result<Box<dyn RowCursor>, DbError>;
}

/// A cursor over rows already in memory. Adapters that fetch eagerly wrap
/// their results in one of these.
#[derive(Debug, Default)]
pub struct VecCursor {
    rows: VecDeque<ResultRow>,
}

impl VecCursor {
    pub fn new<I: IntoIterator<Item = ResultRow>>(rows: I) -> Self {
        VecCursor {
            rows: rows.into_iter().collect(),
        }
    }
}

#[async_trait]
impl RowCursor for VecCursor {
    async fn next_row(&mut self) -> Result<Option<ResultRow>, DbError> {
        Ok(self.rows.pop_front())
    }
}
