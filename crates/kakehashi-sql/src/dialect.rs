//! SQL dialect strategies
//!
//! Encapsulates syntax differences between database engines: identifier
//! quoting, literal escaping, string concatenation and row-limit syntax.
//! Literals are never interpolated without quoting and escaping.

use crate::expr::SqlValueType;
use crate::relation::ColumnRef;

/// How an engine expresses a row-count limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `... LIMIT n` appended to the statement.
    LimitSuffix,
    /// `SELECT TOP n ...` modifier.
    TopModifier,
    /// `ROWNUM <= n` as an extra WHERE condition.
    RownumCondition,
    /// The engine cannot limit; callers stop reading the cursor instead.
    Unsupported,
}

pub trait SqlDialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// SQL-92 puts identifiers in double quotes, doubling embedded quotes.
    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn quote_table(&self, table: &str) -> String {
        self.quote_identifier(table)
    }

    fn quote_column(&self, column: &ColumnRef) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(&column.table),
            self.quote_identifier(&column.column)
        )
    }

    /// Single quotes with embedded quotes doubled. Engines that treat the
    /// backslash as an escape character override this.
    fn quote_string_literal(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    fn quote_literal(&self, value: &str, value_type: SqlValueType) -> String {
        match value_type {
            SqlValueType::Text => self.quote_string_literal(value),
            // A "numeric" value that does not parse is quoted rather than
            // interpolated raw.
            SqlValueType::Numeric => {
                if value.parse::<f64>().is_ok() {
                    value.to_string()
                } else {
                    self.quote_string_literal(value)
                }
            }
            SqlValueType::Boolean => match value {
                "true" | "TRUE" | "1" => "TRUE".to_string(),
                "false" | "FALSE" | "0" => "FALSE".to_string(),
                other => self.quote_string_literal(other),
            },
            SqlValueType::Date => format!("DATE {}", self.quote_string_literal(value)),
            SqlValueType::Time => format!("TIME {}", self.quote_string_literal(value)),
            SqlValueType::Timestamp => {
                format!("TIMESTAMP {}", self.quote_string_literal(value))
            }
        }
    }

    /// `a || b` in standard SQL.
    fn concat(&self, fragments: &[String]) -> String {
        fragments.join(" || ")
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitSuffix
    }

    fn supports_distinct(&self) -> bool {
        true
    }
}

/// Plain SQL-92; also serves SQLite and PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sql92Dialect;

impl SqlDialect for Sql92Dialect {
    fn name(&self) -> &'static str {
        "sql92"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn quote_string_literal(&self, s: &str) -> String {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn concat(&self, fragments: &[String]) -> String {
        format!("CONCAT({})", fragments.join(", "))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("[{}]", identifier.replace(']', "]]"))
    }

    fn concat(&self, fragments: &[String]) -> String {
        fragments.join(" + ")
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::TopModifier
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::RownumCondition
    }
}
