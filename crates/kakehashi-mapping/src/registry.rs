//! Candidate lookup
//!
//! Given a triple pattern, the registry returns every compiled relation
//! that could contribute matching triples. Constant positions are checked
//! with `could_fit`; variables and wildcards match any maker. The check is
//! a sound over-approximation, so filtering never loses answers.

use crate::bridge::Mapping;
use crate::error::MappingError;
use crate::relation::TripleRelation;
use kakehashi_core::{TriplePattern, TriplePosition};

#[derive(Debug, Default)]
pub struct BridgeRegistry {
    relations: Vec<TripleRelation>,
}

impl BridgeRegistry {
    pub fn from_mapping(mapping: &Mapping) -> Result<Self, MappingError> {
        Ok(BridgeRegistry {
            relations: mapping.compile()?,
        })
    }

    pub fn from_relations(relations: Vec<TripleRelation>) -> Self {
        BridgeRegistry { relations }
    }

    pub fn relations(&self) -> &[TripleRelation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Every relation whose makers could produce the pattern's constant
    /// positions.
    pub fn candidates_for(&self, pattern: &TriplePattern) -> Vec<&TripleRelation> {
        self.relations
            .iter()
            .filter(|relation| {
                TriplePosition::ALL.into_iter().all(|position| {
                    match pattern.position(position).as_const() {
                        Some(term) => relation.maker(position).could_fit(term),
                        None => true,
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ClassMap, PropertyBridge};
    use crate::translate::TranslatorRegistry;
    use kakehashi_core::{term, var, Term, TermPattern};
    use kakehashi_sql::ColumnRef;

    fn col(qualified: &str) -> ColumnRef {
        ColumnRef::parse(qualified).unwrap()
    }

    fn registry() -> BridgeRegistry {
        let mut mapping = Mapping::new();
        mapping.add_class_map(
            ClassMap::builder("Employee")
                .table("employees")
                .uri_template("http://example.org/emp/@@employees.id@@")
                .build()
                .unwrap(),
        );
        mapping.add_bridge(
            PropertyBridge::builder("Employee", "http://example.org/p/name")
                .table("employees")
                .object_column(col("employees.name"))
                .build(&TranslatorRegistry::new())
                .unwrap(),
        );
        mapping.add_bridge(
            PropertyBridge::builder("Employee", "http://example.org/p/age")
                .table("employees")
                .object_column(col("employees.age"))
                .datatype("http://www.w3.org/2001/XMLSchema#integer")
                .build(&TranslatorRegistry::new())
                .unwrap(),
        );
        BridgeRegistry::from_mapping(&mapping).unwrap()
    }

    #[test]
    fn test_fixed_predicate_selects_one_bridge() {
        let registry = registry();
        let pattern = TriplePattern::new(
            var("e"),
            term(Term::iri("http://example.org/p/name")),
            var("n"),
        );
        assert_eq!(registry.candidates_for(&pattern).len(), 1);
    }

    #[test]
    fn test_open_pattern_selects_everything() {
        let registry = registry();
        let pattern = TriplePattern::new(var("s"), var("p"), TermPattern::Any);
        assert_eq!(registry.candidates_for(&pattern).len(), registry.len());
    }

    #[test]
    fn test_unfitting_subject_filters_out_all_bridges() {
        let registry = registry();
        let pattern = TriplePattern::new(
            term(Term::iri("http://other.org/emp/1")),
            var("p"),
            var("o"),
        );
        assert!(registry.candidates_for(&pattern).is_empty());
    }

    #[test]
    fn test_object_shape_filters_candidates() {
        let registry = registry();
        // A plain literal object cannot come from the typed age bridge.
        let pattern = TriplePattern::new(var("e"), var("p"), term(Term::literal("Alice")));
        let candidates = registry.candidates_for(&pattern);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0]
            .maker(TriplePosition::Predicate)
            .could_fit(&Term::iri("http://example.org/p/name")));
    }
}
