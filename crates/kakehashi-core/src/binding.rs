//! Variable binding slots and binding rows
//!
//! A slot is a stable integer index assigned the first time a shared
//! variable is seen within one compiled conjunction. Binding rows are
//! arrays of optional term values indexed by slot; they are created once
//! per upstream row and discarded after being pushed downstream.

use crate::term::Term;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Allocates stable slot indexes for variable names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMap {
    names: Vec<String>,
}

impl SlotMap {
    pub fn new() -> Self {
        SlotMap { names: Vec::new() }
    }

    /// Returns the existing slot for `name`, or allocates the next one.
    pub fn allocate<S: Into<String>>(&mut self, name: S) -> usize {
        let name = name.into();
        if let Some(slot) = self.slot_of(&name) {
            return slot;
        }
        self.names.push(name);
        self.names.len() - 1
    }

    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn name_of(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// An assignment of term values to a conjunction's variable slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRow {
    values: Vec<Option<Term>>,
}

impl BindingRow {
    pub fn empty() -> Self {
        BindingRow { values: Vec::new() }
    }

    pub fn with_slots(count: usize) -> Self {
        BindingRow {
            values: vec![None; count],
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Term> {
        self.values.get(slot).and_then(Option::as_ref)
    }

    /// Sets `slot`, growing the row if a later stage added slots.
    pub fn set(&mut self, slot: usize, term: Term) {
        if slot >= self.values.len() {
            self.values.resize(slot + 1, None);
        }
        self.values[slot] = Some(term);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// View by variable name, for downstream consumers.
    pub fn to_map(&self, slots: &SlotMap) -> HashMap<String, Term> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| {
                let term = value.clone()?;
                let name = slots.name_of(slot)?;
                Some((name.to_string(), term))
            })
            .collect()
    }
}
