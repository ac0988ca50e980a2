//! # Kakehashi SQL
//!
//! The relational side of the engine:
//! - composable, immutable query fragments (tables, joins, filters,
//!   projections, alias maps)
//! - a small SQL expression tree
//! - pluggable dialect strategies for quoting, limits and concatenation
//! - a deterministic SELECT statement renderer

pub mod dialect;
pub mod error;
pub mod expr;
pub mod relation;
pub mod row;
pub mod select;

pub use dialect::{LimitStyle, MySqlDialect, OracleDialect, Sql92Dialect, SqlDialect, SqlServerDialect};
pub use error::SqlError;
pub use expr::{CompareOp, SqlExpression, SqlValueType};
pub use relation::{AliasMap, ColumnRef, FragmentBuilder, Join, OrderDirection, OrderSpec, RelationalFragment};
pub use row::{ColumnIndex, ResultRow};
pub use select::{render_expression, SelectBuilder, SelectStatement};
