//! # Kakehashi Core
//!
//! RDF term model, triple patterns and variable bindings shared by the
//! Kakehashi relational-to-RDF query engine.

pub mod binding;
pub mod pattern;
pub mod term;

pub use binding::{BindingRow, SlotMap};
pub use pattern::{term, var, TermPattern, TriplePattern, TriplePosition};
pub use term::{Term, XSD_STRING};

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(test)]
    mod term_tests {
        use super::*;

        #[test]
        fn test_term_display_iri() {
            assert_eq!(Term::iri("http://example.org/a").to_string(), "<http://example.org/a>");
        }

        #[test]
        fn test_term_display_blank() {
            assert_eq!(Term::blank("b1").to_string(), "_:b1");
        }

        #[test]
        fn test_term_display_plain_literal() {
            assert_eq!(Term::literal("Alice").to_string(), "\"Alice\"");
        }

        #[test]
        fn test_term_display_literal_escaping() {
            assert_eq!(Term::literal("say \"hi\"").to_string(), "\"say \\\"hi\\\"\"");
        }

        #[test]
        fn test_term_display_lang_literal() {
            assert_eq!(Term::lang_literal("Hallo", "de").to_string(), "\"Hallo\"@de");
        }

        #[test]
        fn test_term_display_typed_literal() {
            assert_eq!(
                Term::typed_literal("42", "http://www.w3.org/2001/XMLSchema#integer").to_string(),
                "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
            );
        }

        #[test]
        fn test_xsd_string_datatype_suppressed() {
            assert_eq!(Term::typed_literal("x", term::XSD_STRING).to_string(), "\"x\"");
        }

        #[test]
        fn test_lexical_form() {
            assert_eq!(Term::iri("http://example.org/a").lexical_form(), "http://example.org/a");
            assert_eq!(Term::blank("b").lexical_form(), "b");
            assert_eq!(Term::literal("v").lexical_form(), "v");
        }

        #[test]
        fn test_serde_round_trip() {
            let original = Term::lang_literal("hello", "en");
            let json = serde_json::to_string(&original).unwrap();
            let back: Term = serde_json::from_str(&json).unwrap();
            assert_eq!(original, back);
        }
    }

    #[cfg(test)]
    mod pattern_tests {
        use super::*;

        #[test]
        fn test_position_accessor() {
            let pattern = TriplePattern::new(
                var("s"),
                term(Term::iri("http://example.org/name")),
                var("o"),
            );
            assert_eq!(pattern.position(TriplePosition::Subject).as_var(), Some("s"));
            assert!(pattern.position(TriplePosition::Predicate).is_const());
            assert_eq!(pattern.position(TriplePosition::Object).as_var(), Some("o"));
        }

        #[test]
        fn test_variables_in_order() {
            let pattern = TriplePattern::new(var("a"), var("b"), TermPattern::Any);
            let names: Vec<&str> = pattern.variables().collect();
            assert_eq!(names, vec!["a", "b"]);
        }

        #[test]
        fn test_display() {
            let pattern = TriplePattern::new(
                var("e"),
                term(Term::iri("http://example.org/name")),
                term(Term::literal("Alice")),
            );
            assert_eq!(pattern.to_string(), "?e <http://example.org/name> \"Alice\"");
        }
    }

    #[cfg(test)]
    mod binding_tests {
        use super::*;

        #[test]
        fn test_slot_allocation_is_stable() {
            let mut slots = SlotMap::new();
            let e = slots.allocate("e");
            let n = slots.allocate("n");
            assert_eq!(e, 0);
            assert_eq!(n, 1);
            // Re-allocating an existing name returns the same slot.
            assert_eq!(slots.allocate("e"), e);
            assert_eq!(slots.len(), 2);
        }

        #[test]
        fn test_slot_lookup() {
            let mut slots = SlotMap::new();
            slots.allocate("x");
            assert_eq!(slots.slot_of("x"), Some(0));
            assert_eq!(slots.slot_of("y"), None);
            assert_eq!(slots.name_of(0), Some("x"));
            assert_eq!(slots.name_of(1), None);
        }

        #[test]
        fn test_binding_row_set_get() {
            let mut row = BindingRow::with_slots(2);
            assert_eq!(row.get(0), None);
            row.set(0, Term::literal("v"));
            assert_eq!(row.get(0), Some(&Term::literal("v")));
            assert_eq!(row.get(1), None);
        }

        #[test]
        fn test_binding_row_grows_on_set() {
            let mut row = BindingRow::empty();
            row.set(2, Term::iri("http://example.org/x"));
            assert_eq!(row.len(), 3);
            assert_eq!(row.get(0), None);
            assert!(row.get(2).is_some());
        }

        #[test]
        fn test_to_map() {
            let mut slots = SlotMap::new();
            let e = slots.allocate("e");
            slots.allocate("n");
            let mut row = BindingRow::with_slots(slots.len());
            row.set(e, Term::iri("http://example.org/emp/1"));
            let map = row.to_map(&slots);
            assert_eq!(map.len(), 1);
            assert_eq!(map.get("e"), Some(&Term::iri("http://example.org/emp/1")));
        }
    }
}
