//! # Kakehashi DB
//!
//! The thin database boundary: the [`SqlDatabase`] and [`RowCursor`]
//! traits the engine runs against, a sqlx-backed SQLite adapter, and an
//! in-memory fixture database for tests.

pub mod adapter;
pub mod database;
pub mod error;
pub mod fixture;

#[cfg(feature = "sqlite")]
pub use adapter::SqliteAdapter;
pub use database::{RowCursor, SqlDatabase, VecCursor};
pub use error::DbError;
pub use fixture::{fixture_row, FixtureDatabase, FixtureRow};
