//! Result rows and projection indexes
//!
//! Rows come back from the database as string-typed values ordered by the
//! statement's projection list. A [`ColumnIndex`] maps projected columns
//! to value positions and is shared by every row of one statement.

use crate::relation::ColumnRef;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Projection column to value-index map for one SELECT statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: BTreeMap<ColumnRef, usize>,
}

impl ColumnIndex {
    pub fn from_projections(projections: &[ColumnRef]) -> Self {
        ColumnIndex {
            positions: projections
                .iter()
                .enumerate()
                .map(|(index, column)| (column.clone(), index))
                .collect(),
        }
    }

    pub fn position_of(&self, column: &ColumnRef) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnRef> {
        self.positions.keys()
    }
}

/// One database row: string-typed values, NULL as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    index: Arc<ColumnIndex>,
    values: Vec<Option<String>>,
}

impl ResultRow {
    pub fn new(index: Arc<ColumnIndex>, values: Vec<Option<String>>) -> Self {
        ResultRow { index, values }
    }

    /// A row with no columns, for trivial (table-free) fragments.
    pub fn empty() -> Self {
        ResultRow {
            index: Arc::new(ColumnIndex::default()),
            values: Vec::new(),
        }
    }

    /// The value of `column`; `None` when NULL or not projected.
    pub fn get(&self, column: &ColumnRef) -> Option<&str> {
        let position = self.index.position_of(column)?;
        self.values.get(position)?.as_deref()
    }

    pub fn index(&self) -> &Arc<ColumnIndex> {
        &self.index
    }
}
