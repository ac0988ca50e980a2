//! Triple relations
//!
//! A triple relation is the compiled form of one property bridge: three
//! term makers over one relational fragment. Selecting the fragment and
//! applying the makers row by row enumerates every triple the bridge
//! contributes.

use crate::error::MappingError;
use crate::term_maker::TermMaker;
use kakehashi_core::TriplePosition;
use kakehashi_sql::{AliasMap, RelationalFragment, SqlError};

#[derive(Debug, Clone)]
pub struct TripleRelation {
    subject: TermMaker,
    predicate: TermMaker,
    object: TermMaker,
    base: RelationalFragment,
}

impl TripleRelation {
    /// Assembles a relation, projecting every column the three makers
    /// read. Fails when a maker references a column outside the
    /// fragment's tables.
    pub fn new(
        subject: TermMaker,
        predicate: TermMaker,
        object: TermMaker,
        base: RelationalFragment,
    ) -> Result<Self, MappingError> {
        let mut columns = subject.required_columns();
        columns.extend(predicate.required_columns());
        columns.extend(object.required_columns());
        let base = base.with_projections(columns)?;
        Ok(TripleRelation {
            subject,
            predicate,
            object,
            base,
        })
    }

    pub fn maker(&self, position: TriplePosition) -> &TermMaker {
        match position {
            TriplePosition::Subject => &self.subject,
            TriplePosition::Predicate => &self.predicate,
            TriplePosition::Object => &self.object,
        }
    }

    pub fn base(&self) -> &RelationalFragment {
        &self.base
    }

    /// The relation with tables renamed, makers included.
    pub fn rename(&self, renames: &AliasMap) -> Result<TripleRelation, SqlError> {
        Ok(TripleRelation {
            subject: self.subject.rename(renames),
            predicate: self.predicate.rename(renames),
            object: self.object.rename(renames),
            base: self.base.rename(renames)?,
        })
    }

    /// The relation with all tables renamed under `T{index}_`, makers
    /// included, so that relations for different patterns of one query
    /// never collide.
    pub fn with_pattern_index(&self, index: usize) -> Result<TripleRelation, SqlError> {
        self.rename(&self.base.prefix_renames(&format!("T{}_", index)))
    }
}
