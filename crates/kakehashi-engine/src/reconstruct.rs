//! Binding reconstruction
//!
//! Applies a conjunction's term makers to each database row, merging the
//! new values into the upstream binding row. Rows that cannot produce a
//! required term (a NULL column, a failed translation, a constraint
//! rejection) are skipped, never treated as errors.

use crate::combine::CompiledConjunction;
use crate::filter::ValueFilter;
use kakehashi_core::{BindingRow, SlotMap};
use kakehashi_sql::ResultRow;

pub struct BindingMaker<'a> {
    conjunction: &'a CompiledConjunction,
    slots: &'a SlotMap,
}

impl<'a> BindingMaker<'a> {
    pub fn new(conjunction: &'a CompiledConjunction, slots: &'a SlotMap) -> Self {
        BindingMaker { conjunction, slots }
    }

    /// One output binding from one database row, or `None` when the row
    /// is skipped.
    pub fn make_binding(&self, upstream: &BindingRow, row: &ResultRow) -> Option<BindingRow> {
        let mut binding = upstream.clone();
        for (slot, maker) in self.conjunction.binders() {
            let term = maker.build(row)?;
            if let Some(existing) = binding.get(*slot) {
                if *existing != term {
                    return None;
                }
            }
            binding.set(*slot, term);
        }
        for guard in self.conjunction.guards() {
            // Wildcard position: the term is discarded, but the row must
            // still produce one.
            guard.build(row)?;
        }
        for filter in self.conjunction.residual() {
            if !self.passes(filter, &binding) {
                return None;
            }
        }
        Some(binding)
    }

    // An unbound variable in a residual filter fails the guard; a filter
    // that asked for a value the row never produced cannot hold.
    fn passes(&self, filter: &ValueFilter, binding: &BindingRow) -> bool {
        filter.evaluate(binding, self.slots).unwrap_or(false)
    }
}
