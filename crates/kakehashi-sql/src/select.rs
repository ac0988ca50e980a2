//! SELECT statement rendering
//!
//! Turns one fully merged, fully instantiated fragment into dialect-correct
//! SQL text plus the projection-to-index map the result iterator needs.
//! Rendering is deterministic: identical fragments produce identical SQL.

use crate::dialect::{LimitStyle, SqlDialect};
use crate::error::SqlError;
use crate::expr::SqlExpression;
use crate::relation::{OrderDirection, RelationalFragment};
use crate::row::ColumnIndex;
use std::sync::Arc;
use tracing::warn;

/// A rendered statement and the column layout of its result rows.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub sql: String,
    pub projection: Arc<ColumnIndex>,
}

pub struct SelectBuilder<'a> {
    dialect: &'a dyn SqlDialect,
}

impl<'a> SelectBuilder<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        SelectBuilder { dialect }
    }

    pub fn build(&self, fragment: &RelationalFragment) -> Result<SelectStatement, SqlError> {
        if fragment.is_trivial() {
            return Err(SqlError::EmptyFragment);
        }
        let dialect = self.dialect;
        let mut sql = String::from("SELECT ");

        // T-SQL wants `SELECT DISTINCT TOP n`, never the other way round.
        if !fragment.is_unique() && dialect.supports_distinct() {
            sql.push_str("DISTINCT ");
        }
        if let (Some(limit), LimitStyle::TopModifier) = (fragment.limit(), dialect.limit_style()) {
            sql.push_str(&format!("TOP {} ", limit));
        }
        if let (Some(limit), LimitStyle::Unsupported) = (fragment.limit(), dialect.limit_style()) {
            // The statement goes out uncapped; whoever reads the cursor
            // has to stop at the limit themselves.
            warn!(limit, dialect = dialect.name(), "dialect cannot express a row limit");
        }

        if fragment.projections().is_empty() {
            // Existence-only query; project a constant.
            sql.push('1');
        } else {
            let columns: Vec<String> = fragment
                .projections()
                .iter()
                .map(|column| dialect.quote_column(column))
                .collect();
            sql.push_str(&columns.join(", "));
        }

        sql.push_str(" FROM ");
        let tables: Vec<String> = fragment
            .tables()
            .map(|table| match fragment.aliases().original_of(table) {
                Some(original) => format!(
                    "{} AS {}",
                    dialect.quote_table(original),
                    dialect.quote_table(table)
                ),
                None => dialect.quote_table(table),
            })
            .collect();
        sql.push_str(&tables.join(", "));

        let mut conditions: Vec<String> = fragment
            .joins()
            .map(|join| {
                format!(
                    "{} = {}",
                    dialect.quote_column(&join.left),
                    dialect.quote_column(&join.right)
                )
            })
            .collect();
        if !fragment.condition().is_true() {
            conditions.push(render_expression(fragment.condition(), dialect));
        }
        if let (Some(limit), LimitStyle::RownumCondition) =
            (fragment.limit(), dialect.limit_style())
        {
            conditions.push(format!("ROWNUM <= {}", limit));
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if let Some(order) = fragment.order_by() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&dialect.quote_column(&order.column));
            sql.push_str(match order.direction {
                OrderDirection::Ascending => " ASC",
                OrderDirection::Descending => " DESC",
            });
        }

        if let (Some(limit), LimitStyle::LimitSuffix) = (fragment.limit(), dialect.limit_style()) {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        Ok(SelectStatement {
            sql,
            projection: Arc::new(ColumnIndex::from_projections(fragment.projections())),
        })
    }
}

/// Renders a filter expression in the given dialect.
pub fn render_expression(expr: &SqlExpression, dialect: &dyn SqlDialect) -> String {
    match expr {
        SqlExpression::True => "1=1".to_string(),
        SqlExpression::False => "1=0".to_string(),
        SqlExpression::Column(column) => dialect.quote_column(column),
        SqlExpression::Constant { value, value_type } => dialect.quote_literal(value, *value_type),
        SqlExpression::Equal(lhs, rhs) => format!(
            "{} = {}",
            render_expression(lhs, dialect),
            render_expression(rhs, dialect)
        ),
        SqlExpression::Compare { op, lhs, rhs } => format!(
            "{} {} {}",
            render_expression(lhs, dialect),
            op.symbol(),
            render_expression(rhs, dialect)
        ),
        SqlExpression::And(operands) => {
            let parts: Vec<String> = operands
                .iter()
                .map(|operand| render_expression(operand, dialect))
                .collect();
            format!("({})", parts.join(" AND "))
        }
        SqlExpression::Or(operands) => {
            let parts: Vec<String> = operands
                .iter()
                .map(|operand| render_expression(operand, dialect))
                .collect();
            format!("({})", parts.join(" OR "))
        }
        SqlExpression::Not(inner) => format!("NOT ({})", render_expression(inner, dialect)),
        SqlExpression::Concat(parts) => {
            let rendered: Vec<String> = parts
                .iter()
                .map(|part| render_expression(part, dialect))
                .collect();
            dialect.concat(&rendered)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, Sql92Dialect, SqlServerDialect};
    use crate::relation::{ColumnRef, FragmentBuilder};

    fn col(qualified: &str) -> ColumnRef {
        ColumnRef::parse(qualified).unwrap()
    }

    fn employees_fragment() -> crate::relation::RelationalFragment {
        FragmentBuilder::new()
            .table("employees")
            .projection(col("employees.id"))
            .projection(col("employees.name"))
            .condition(SqlExpression::column_equals_value(
                col("employees.dept"),
                "Sales",
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_basic_select() {
        let statement = SelectBuilder::new(&Sql92Dialect)
            .build(&employees_fragment())
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT \"employees\".\"id\", \"employees\".\"name\" FROM \"employees\" \
             WHERE \"employees\".\"dept\" = 'Sales'"
        );
        assert_eq!(statement.projection.position_of(&col("employees.id")), Some(0));
        assert_eq!(statement.projection.position_of(&col("employees.name")), Some(1));
    }

    #[test]
    fn test_aliased_table_rendering() {
        let fragment = employees_fragment()
            .rename(&employees_fragment().prefix_renames("T0_"))
            .unwrap();
        let statement = SelectBuilder::new(&Sql92Dialect).build(&fragment).unwrap();
        assert!(statement.sql.contains("FROM \"employees\" AS \"T0_employees\""));
        assert!(statement.sql.contains("\"T0_employees\".\"dept\" = 'Sales'"));
    }

    #[test]
    fn test_join_rendering() {
        let fragment = FragmentBuilder::new()
            .table("employees")
            .table("departments")
            .join(col("employees.dept_id"), col("departments.id"))
            .projection(col("departments.name"))
            .build()
            .unwrap();
        let statement = SelectBuilder::new(&Sql92Dialect).build(&fragment).unwrap();
        assert!(statement
            .sql
            .contains("\"departments\".\"id\" = \"employees\".\"dept_id\""));
    }

    #[test]
    fn test_distinct_only_for_duplicate_prone_fragments() {
        let unique = employees_fragment();
        let duplicates = FragmentBuilder::new()
            .table("employees")
            .projection(col("employees.name"))
            .unique(false)
            .build()
            .unwrap();
        let builder = SelectBuilder::new(&Sql92Dialect);
        assert!(!builder.build(&unique).unwrap().sql.contains("DISTINCT"));
        assert!(builder.build(&duplicates).unwrap().sql.starts_with("SELECT DISTINCT"));
    }

    #[test]
    fn test_limit_styles() {
        let fragment = FragmentBuilder::new()
            .table("t")
            .projection(col("t.c"))
            .limit(5)
            .build()
            .unwrap();
        assert!(SelectBuilder::new(&Sql92Dialect)
            .build(&fragment)
            .unwrap()
            .sql
            .ends_with(" LIMIT 5"));
        assert!(SelectBuilder::new(&SqlServerDialect)
            .build(&fragment)
            .unwrap()
            .sql
            .starts_with("SELECT TOP 5 "));
        assert!(SelectBuilder::new(&OracleDialect)
            .build(&fragment)
            .unwrap()
            .sql
            .contains("ROWNUM <= 5"));
    }

    #[test]
    fn test_sqlserver_distinct_precedes_top() {
        let fragment = FragmentBuilder::new()
            .table("t")
            .projection(col("t.c"))
            .unique(false)
            .limit(5)
            .build()
            .unwrap();
        let statement = SelectBuilder::new(&SqlServerDialect).build(&fragment).unwrap();
        assert!(statement.sql.starts_with("SELECT DISTINCT TOP 5 "));
    }

    #[test]
    fn test_unsupported_limit_style_renders_no_limit() {
        struct NoLimitDialect;
        impl crate::dialect::SqlDialect for NoLimitDialect {
            fn name(&self) -> &'static str {
                "nolimit"
            }
            fn limit_style(&self) -> LimitStyle {
                LimitStyle::Unsupported
            }
        }
        let fragment = FragmentBuilder::new()
            .table("t")
            .projection(col("t.c"))
            .limit(5)
            .build()
            .unwrap();
        let statement = SelectBuilder::new(&NoLimitDialect).build(&fragment).unwrap();
        assert!(!statement.sql.contains("LIMIT"));
        assert!(!statement.sql.contains("TOP"));
        assert!(!statement.sql.contains("ROWNUM"));
    }

    #[test]
    fn test_mysql_rendering() {
        let statement = SelectBuilder::new(&MySqlDialect)
            .build(&employees_fragment())
            .unwrap();
        assert!(statement.sql.contains("`employees`.`id`"));
    }

    #[test]
    fn test_deterministic_rendering() {
        let builder = SelectBuilder::new(&Sql92Dialect);
        let first = builder.build(&employees_fragment()).unwrap();
        let second = builder.build(&employees_fragment()).unwrap();
        assert_eq!(first.sql, second.sql);
    }

    #[test]
    fn test_trivial_fragment_is_rejected() {
        let result = SelectBuilder::new(&Sql92Dialect)
            .build(&crate::relation::RelationalFragment::unit());
        assert!(matches!(result, Err(SqlError::EmptyFragment)));
    }

    #[test]
    fn test_concat_rendering() {
        let expr = SqlExpression::concat(vec![
            SqlExpression::text("emp/"),
            SqlExpression::Column(col("employees.id")),
        ]);
        assert_eq!(
            render_expression(&expr, &Sql92Dialect),
            "'emp/' || \"employees\".\"id\""
        );
        assert_eq!(
            render_expression(&expr, &MySqlDialect),
            "CONCAT('emp/', `employees`.`id`)"
        );
    }
}
