//! SQL filter expressions
//!
//! A small expression tree used for fragment conditions: column/constant
//! equalities, comparisons, boolean connectives and string concatenation.
//! `and`/`or` are smart constructors that flatten nested connectives and
//! short-circuit on TRUE/FALSE.

use crate::relation::{AliasMap, ColumnRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a constant should be rendered and escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlValueType {
    Text,
    Numeric,
    Boolean,
    Date,
    Time,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SqlExpression {
    True,
    False,
    Column(ColumnRef),
    Constant {
        value: String,
        value_type: SqlValueType,
    },
    Equal(Box<SqlExpression>, Box<SqlExpression>),
    Compare {
        op: CompareOp,
        lhs: Box<SqlExpression>,
        rhs: Box<SqlExpression>,
    },
    And(Vec<SqlExpression>),
    Or(Vec<SqlExpression>),
    Not(Box<SqlExpression>),
    Concat(Vec<SqlExpression>),
}

impl SqlExpression {
    pub fn text<S: Into<String>>(value: S) -> Self {
        SqlExpression::Constant {
            value: value.into(),
            value_type: SqlValueType::Text,
        }
    }

    pub fn numeric<S: Into<String>>(value: S) -> Self {
        SqlExpression::Constant {
            value: value.into(),
            value_type: SqlValueType::Numeric,
        }
    }

    pub fn column(column: ColumnRef) -> Self {
        SqlExpression::Column(column)
    }

    pub fn equal(lhs: SqlExpression, rhs: SqlExpression) -> Self {
        if lhs == rhs {
            return SqlExpression::True;
        }
        SqlExpression::Equal(Box::new(lhs), Box::new(rhs))
    }

    /// `column = 'value'`, the workhorse condition for bound values.
    pub fn column_equals_value<S: Into<String>>(column: ColumnRef, value: S) -> Self {
        SqlExpression::equal(SqlExpression::Column(column), SqlExpression::text(value))
    }

    pub fn columns_equal(left: ColumnRef, right: ColumnRef) -> Self {
        SqlExpression::equal(SqlExpression::Column(left), SqlExpression::Column(right))
    }

    pub fn compare(op: CompareOp, lhs: SqlExpression, rhs: SqlExpression) -> Self {
        SqlExpression::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Conjunction with flattening; TRUE operands vanish, a FALSE operand
    /// collapses the whole expression.
    pub fn and<I: IntoIterator<Item = SqlExpression>>(operands: I) -> Self {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                SqlExpression::True => {}
                SqlExpression::False => return SqlExpression::False,
                SqlExpression::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => SqlExpression::True,
            1 => flat.into_iter().next().unwrap_or(SqlExpression::True),
            _ => SqlExpression::And(flat),
        }
    }

    /// Disjunction with flattening; FALSE operands vanish, a TRUE operand
    /// collapses the whole expression.
    pub fn or<I: IntoIterator<Item = SqlExpression>>(operands: I) -> Self {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                SqlExpression::False => {}
                SqlExpression::True => return SqlExpression::True,
                SqlExpression::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => SqlExpression::False,
            1 => flat.into_iter().next().unwrap_or(SqlExpression::False),
            _ => SqlExpression::Or(flat),
        }
    }

    pub fn not(operand: SqlExpression) -> Self {
        match operand {
            SqlExpression::True => SqlExpression::False,
            SqlExpression::False => SqlExpression::True,
            SqlExpression::Not(inner) => *inner,
            other => SqlExpression::Not(Box::new(other)),
        }
    }

    pub fn concat<I: IntoIterator<Item = SqlExpression>>(parts: I) -> Self {
        let parts: Vec<SqlExpression> = parts
            .into_iter()
            .filter(|p| !matches!(p, SqlExpression::Constant { value, .. } if value.is_empty()))
            .collect();
        match parts.len() {
            0 => SqlExpression::text(""),
            1 => parts.into_iter().next().unwrap_or(SqlExpression::text("")),
            _ => SqlExpression::Concat(parts),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, SqlExpression::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, SqlExpression::False)
    }

    pub fn referenced_columns(&self) -> BTreeSet<ColumnRef> {
        let mut columns = BTreeSet::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, into: &mut BTreeSet<ColumnRef>) {
        match self {
            SqlExpression::True | SqlExpression::False | SqlExpression::Constant { .. } => {}
            SqlExpression::Column(column) => {
                into.insert(column.clone());
            }
            SqlExpression::Equal(lhs, rhs) => {
                lhs.collect_columns(into);
                rhs.collect_columns(into);
            }
            SqlExpression::Compare { lhs, rhs, .. } => {
                lhs.collect_columns(into);
                rhs.collect_columns(into);
            }
            SqlExpression::And(operands)
            | SqlExpression::Or(operands)
            | SqlExpression::Concat(operands) => {
                for operand in operands {
                    operand.collect_columns(into);
                }
            }
            SqlExpression::Not(inner) => inner.collect_columns(into),
        }
    }

    /// Rewrites every column reference through the alias map. Pure.
    pub fn rename(&self, aliases: &AliasMap) -> SqlExpression {
        match self {
            SqlExpression::True => SqlExpression::True,
            SqlExpression::False => SqlExpression::False,
            SqlExpression::Constant { value, value_type } => SqlExpression::Constant {
                value: value.clone(),
                value_type: *value_type,
            },
            SqlExpression::Column(column) => SqlExpression::Column(aliases.apply_column(column)),
            SqlExpression::Equal(lhs, rhs) => SqlExpression::Equal(
                Box::new(lhs.rename(aliases)),
                Box::new(rhs.rename(aliases)),
            ),
            SqlExpression::Compare { op, lhs, rhs } => SqlExpression::Compare {
                op: *op,
                lhs: Box::new(lhs.rename(aliases)),
                rhs: Box::new(rhs.rename(aliases)),
            },
            SqlExpression::And(operands) => {
                SqlExpression::And(operands.iter().map(|o| o.rename(aliases)).collect())
            }
            SqlExpression::Or(operands) => {
                SqlExpression::Or(operands.iter().map(|o| o.rename(aliases)).collect())
            }
            SqlExpression::Not(inner) => SqlExpression::Not(Box::new(inner.rename(aliases))),
            SqlExpression::Concat(parts) => {
                SqlExpression::Concat(parts.iter().map(|p| p.rename(aliases)).collect())
            }
        }
    }
}
