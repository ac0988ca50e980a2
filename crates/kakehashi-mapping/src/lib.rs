//! # Kakehashi Mapping
//!
//! The declarative bridge between a relational schema and RDF terms:
//! value templates, translation tables, compiled term makers, class maps,
//! property bridges and the candidate registry the query engine consults.

pub mod bridge;
pub mod error;
pub mod registry;
pub mod relation;
pub mod template;
pub mod term_maker;
pub mod translate;

pub use bridge::{ClassMap, ClassMapBuilder, Mapping, PropertyBridge, PropertyBridgeBuilder};
pub use error::MappingError;
pub use registry::BridgeRegistry;
pub use relation::TripleRelation;
pub use template::{ColumnCodec, TemplateSlot, ValueTemplate};
pub use term_maker::{TermMaker, TermRole, ValueConstraint};
pub use translate::{TranslationPairs, TranslationTable, TranslatorRegistry, ValueTranslator};
