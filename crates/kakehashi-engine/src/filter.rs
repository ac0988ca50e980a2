//! Value filters
//!
//! Comparisons between variables and constants attached to a stage.
//! A filter is pushed into the generated SQL when every variable it
//! mentions resolves to a column expression; otherwise it stays behind
//! as a residual guard evaluated on reconstructed bindings.

use kakehashi_core::{BindingRow, SlotMap, Term};
use kakehashi_sql::{CompareOp, SqlExpression};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Variable(String),
    Constant(Term),
}

impl FilterValue {
    pub fn variable<S: Into<String>>(name: S) -> Self {
        FilterValue::Variable(name.into())
    }

    pub fn constant(term: Term) -> Self {
        FilterValue::Constant(term)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueFilter {
    pub lhs: FilterValue,
    pub op: CompareOp,
    pub rhs: FilterValue,
}

impl ValueFilter {
    pub fn new(lhs: FilterValue, op: CompareOp, rhs: FilterValue) -> Self {
        ValueFilter { lhs, op, rhs }
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        [&self.lhs, &self.rhs].into_iter().filter_map(|v| match v {
            FilterValue::Variable(name) => Some(name.as_str()),
            FilterValue::Constant(_) => None,
        })
    }

    /// Evaluates against a binding row; `None` when a variable is unbound.
    pub fn evaluate(&self, row: &BindingRow, slots: &SlotMap) -> Option<bool> {
        let lhs = self.resolve(&self.lhs, row, slots)?;
        let rhs = self.resolve(&self.rhs, row, slots)?;
        let ordering = compare_values(&lhs, &rhs);
        Some(match self.op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        })
    }

    fn resolve(&self, value: &FilterValue, row: &BindingRow, slots: &SlotMap) -> Option<String> {
        match value {
            FilterValue::Constant(term) => Some(term.lexical_form().to_string()),
            FilterValue::Variable(name) => {
                let slot = slots.slot_of(name)?;
                Some(row.get(slot)?.lexical_form().to_string())
            }
        }
    }

    /// The filter as a SQL condition, given a resolver from variable name
    /// to column expression. `None` when any variable fails to resolve.
    pub fn to_sql(
        &self,
        resolve: &dyn Fn(&str) -> Option<SqlExpression>,
    ) -> Option<SqlExpression> {
        let lhs = self.operand_sql(&self.lhs, resolve)?;
        let rhs = self.operand_sql(&self.rhs, resolve)?;
        Some(match self.op {
            CompareOp::Eq => SqlExpression::equal(lhs, rhs),
            op => SqlExpression::compare(op, lhs, rhs),
        })
    }

    fn operand_sql(
        &self,
        value: &FilterValue,
        resolve: &dyn Fn(&str) -> Option<SqlExpression>,
    ) -> Option<SqlExpression> {
        match value {
            FilterValue::Variable(name) => resolve(name),
            FilterValue::Constant(term) => {
                let lexical = term.lexical_form();
                if lexical.parse::<f64>().is_ok() {
                    Some(SqlExpression::numeric(lexical))
                } else {
                    Some(SqlExpression::text(lexical))
                }
            }
        }
    }
}

/// Numbers compare numerically; everything else falls back to the
/// lexicographic order SQL would apply to text.
fn compare_values(lhs: &str, rhs: &str) -> Ordering {
    if let (Ok(a), Ok(b)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    lhs.cmp(rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound_row(values: &[(&str, Term)]) -> (BindingRow, SlotMap) {
        let mut slots = SlotMap::new();
        let mut row = BindingRow::empty();
        for (name, term) in values {
            let slot = slots.allocate(*name);
            row.set(slot, term.clone());
        }
        (row, slots)
    }

    #[test]
    fn test_numeric_comparison() {
        let filter = ValueFilter::new(
            FilterValue::variable("age"),
            CompareOp::Gt,
            FilterValue::constant(Term::literal("9")),
        );
        let (row, slots) = bound_row(&[("age", Term::literal("30"))]);
        // "30" > "9" numerically even though it sorts lower as text.
        assert_eq!(filter.evaluate(&row, &slots), Some(true));
    }

    #[test]
    fn test_lexicographic_fallback() {
        let filter = ValueFilter::new(
            FilterValue::variable("name"),
            CompareOp::Lt,
            FilterValue::constant(Term::literal("Bob")),
        );
        let (row, slots) = bound_row(&[("name", Term::literal("Alice"))]);
        assert_eq!(filter.evaluate(&row, &slots), Some(true));
    }

    #[test]
    fn test_unbound_variable_is_unknown() {
        let filter = ValueFilter::new(
            FilterValue::variable("missing"),
            CompareOp::Eq,
            FilterValue::constant(Term::literal("x")),
        );
        let (row, slots) = bound_row(&[("name", Term::literal("Alice"))]);
        assert_eq!(filter.evaluate(&row, &slots), None);
    }

    #[test]
    fn test_to_sql_with_resolver() {
        use kakehashi_sql::ColumnRef;
        let filter = ValueFilter::new(
            FilterValue::variable("age"),
            CompareOp::Ge,
            FilterValue::constant(Term::literal("21")),
        );
        let age = ColumnRef::new("T0_employees", "age");
        let resolve = |name: &str| {
            (name == "age").then(|| SqlExpression::Column(age.clone()))
        };
        let expr = filter.to_sql(&resolve).unwrap();
        assert_eq!(
            expr,
            SqlExpression::compare(
                CompareOp::Ge,
                SqlExpression::Column(age.clone()),
                SqlExpression::numeric("21"),
            )
        );
        let unresolved = |_: &str| None::<SqlExpression>;
        assert!(filter.to_sql(&unresolved).is_none());
    }
}
