//! Value translation between database and RDF space
//!
//! A translation table rewrites a column value before it enters a term and
//! back again when a term is matched against the mapping. Tables are either
//! finite bijective pair sets or named custom translators supplied by the
//! host application.

use crate::error::MappingError;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A bidirectional, partial value rewrite. Both directions return `None`
/// for values outside the translator's domain.
pub trait ValueTranslator: Send + Sync {
    fn to_rdf_value(&self, db_value: &str) -> Option<String>;
    fn to_db_value(&self, rdf_value: &str) -> Option<String>;
}

/// A finite translation given as (database value, RDF value) pairs.
///
/// The pair set must be bijective so that translation stays invertible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPairs {
    to_rdf: BTreeMap<String, String>,
    to_db: BTreeMap<String, String>,
}

impl TranslationPairs {
    pub fn new<I, D, R>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (D, R)>,
        D: Into<String>,
        R: Into<String>,
    {
        let mut to_rdf = BTreeMap::new();
        let mut to_db = BTreeMap::new();
        for (db, rdf) in pairs {
            let db = db.into();
            let rdf = rdf.into();
            if to_rdf.contains_key(&db) {
                return Err(MappingError::DuplicateTranslation(db));
            }
            if to_db.contains_key(&rdf) {
                return Err(MappingError::DuplicateTranslation(rdf));
            }
            to_rdf.insert(db.clone(), rdf.clone());
            to_db.insert(rdf, db);
        }
        Ok(TranslationPairs { to_rdf, to_db })
    }
}

impl ValueTranslator for TranslationPairs {
    fn to_rdf_value(&self, db_value: &str) -> Option<String> {
        self.to_rdf.get(db_value).cloned()
    }

    fn to_db_value(&self, rdf_value: &str) -> Option<String> {
        self.to_db.get(rdf_value).cloned()
    }
}

/// A translation table attached to a term maker: either inline pairs or a
/// named translator resolved through the [`TranslatorRegistry`].
#[derive(Clone)]
pub struct TranslationTable {
    name: String,
    translator: Arc<dyn ValueTranslator>,
}

impl TranslationTable {
    pub fn from_pairs<I, D, R>(name: &str, pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (D, R)>,
        D: Into<String>,
        R: Into<String>,
    {
        Ok(TranslationTable {
            name: name.to_string(),
            translator: Arc::new(TranslationPairs::new(pairs)?),
        })
    }

    pub fn from_translator(name: &str, translator: Arc<dyn ValueTranslator>) -> Self {
        TranslationTable {
            name: name.to_string(),
            translator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_rdf_value(&self, db_value: &str) -> Option<String> {
        self.translator.to_rdf_value(db_value)
    }

    pub fn to_db_value(&self, rdf_value: &str) -> Option<String> {
        self.translator.to_db_value(rdf_value)
    }
}

impl fmt::Debug for TranslationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationTable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Named custom translators available to a mapping. A closed registry
/// replaces any kind of runtime class loading: everything a mapping can
/// reference must be registered up front.
#[derive(Default)]
pub struct TranslatorRegistry {
    translators: HashMap<String, Arc<dyn ValueTranslator>>,
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        TranslatorRegistry::default()
    }

    pub fn register<S: Into<String>>(
        &mut self,
        name: S,
        translator: Arc<dyn ValueTranslator>,
    ) -> Result<(), MappingError> {
        let name = name.into();
        if self.translators.contains_key(&name) {
            return Err(MappingError::DuplicateTranslator(name));
        }
        self.translators.insert(name, translator);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<TranslationTable, MappingError> {
        match self.translators.get(name) {
            Some(translator) => Ok(TranslationTable::from_translator(name, translator.clone())),
            None => Err(MappingError::UnknownTranslator(name.to_string())),
        }
    }
}

impl fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.translators.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TranslatorRegistry")
            .field("translators", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_translate_both_ways() {
        let table = TranslationTable::from_pairs(
            "status",
            [("1", "http://example.org/status#active"), ("0", "http://example.org/status#inactive")],
        )
        .unwrap();
        assert_eq!(
            table.to_rdf_value("1").as_deref(),
            Some("http://example.org/status#active")
        );
        assert_eq!(
            table.to_db_value("http://example.org/status#inactive").as_deref(),
            Some("0")
        );
        assert_eq!(table.to_rdf_value("2"), None);
        assert_eq!(table.to_db_value("http://example.org/status#gone"), None);
    }

    #[test]
    fn test_pairs_must_be_bijective() {
        assert!(TranslationPairs::new([("1", "a"), ("1", "b")]).is_err());
        assert!(TranslationPairs::new([("1", "a"), ("2", "a")]).is_err());
    }

    struct Doubler;

    impl ValueTranslator for Doubler {
        fn to_rdf_value(&self, db_value: &str) -> Option<String> {
            db_value.parse::<i64>().ok().map(|n| (n * 2).to_string())
        }

        fn to_db_value(&self, rdf_value: &str) -> Option<String> {
            let n = rdf_value.parse::<i64>().ok()?;
            (n % 2 == 0).then(|| (n / 2).to_string())
        }
    }

    #[test]
    fn test_registry_resolves_custom_translators() {
        let mut registry = TranslatorRegistry::new();
        registry.register("doubler", Arc::new(Doubler)).unwrap();
        let table = registry.resolve("doubler").unwrap();
        assert_eq!(table.to_rdf_value("21").as_deref(), Some("42"));
        assert_eq!(table.to_db_value("42").as_deref(), Some("21"));
        assert_eq!(table.to_db_value("43"), None);
        assert!(registry.resolve("missing").is_err());
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let mut registry = TranslatorRegistry::new();
        registry.register("doubler", Arc::new(Doubler)).unwrap();
        assert!(registry.register("doubler", Arc::new(Doubler)).is_err());
    }
}
