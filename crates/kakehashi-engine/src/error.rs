//! Engine errors
//!
//! Statically impossible patterns and rows skipped over NULLs are normal
//! outcomes, not errors; only real failures surface here.

use kakehashi_db::DbError;
use kakehashi_mapping::MappingError;
use kakehashi_sql::SqlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A statement failed at the database; the rendered SQL travels with
    /// the error.
    #[error("database error while executing `{sql}`")]
    Database {
        sql: String,
        #[source]
        source: DbError,
    },

    #[error(transparent)]
    Sql(#[from] SqlError),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}
