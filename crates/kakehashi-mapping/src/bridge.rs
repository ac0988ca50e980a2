//! Class maps and property bridges
//!
//! The declarative mapping surface. A class map describes how rows of a
//! table become resources; a property bridge attaches one property to a
//! class map's resources. Builders validate option combinations eagerly,
//! so a mapping that constructs is a mapping that compiles.

use crate::error::MappingError;
use crate::relation::TripleRelation;
use crate::term_maker::{TermMaker, TermRole, ValueConstraint};
use crate::translate::{TranslationTable, TranslatorRegistry};
use kakehashi_core::Term;
use kakehashi_sql::{ColumnRef, FragmentBuilder, RelationalFragment, SqlExpression};

/// Maps rows of a table to subject resources.
#[derive(Debug, Clone)]
pub struct ClassMap {
    name: String,
    subject: TermMaker,
    fragment: RelationalFragment,
}

impl ClassMap {
    pub fn builder<S: Into<String>>(name: S) -> ClassMapBuilder {
        ClassMapBuilder {
            name: name.into(),
            tables: Vec::new(),
            subject: None,
            joins: Vec::new(),
            conditions: Vec::new(),
            contains_duplicates: false,
            contradiction: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subject(&self) -> &TermMaker {
        &self.subject
    }

    pub fn fragment(&self) -> &RelationalFragment {
        &self.fragment
    }
}

#[derive(Debug, Clone)]
enum SubjectSpec {
    IriTemplate(String),
    IriColumn(ColumnRef),
    BlankColumns(Vec<ColumnRef>),
}

pub struct ClassMapBuilder {
    name: String,
    tables: Vec<String>,
    subject: Option<SubjectSpec>,
    joins: Vec<(ColumnRef, ColumnRef)>,
    conditions: Vec<SqlExpression>,
    contains_duplicates: bool,
    contradiction: Option<String>,
}

impl ClassMapBuilder {
    fn set_subject(mut self, spec: SubjectSpec) -> Self {
        match self.subject {
            None => self.subject = Some(spec),
            Some(_) => {
                self.contradiction = Some("more than one subject specification".to_string());
            }
        }
        self
    }

    pub fn table<S: Into<String>>(mut self, table: S) -> Self {
        self.tables.push(table.into());
        self
    }

    pub fn uri_template<S: Into<String>>(self, template: S) -> Self {
        self.set_subject(SubjectSpec::IriTemplate(template.into()))
    }

    pub fn uri_column(self, column: ColumnRef) -> Self {
        self.set_subject(SubjectSpec::IriColumn(column))
    }

    pub fn blank_node_columns(self, columns: Vec<ColumnRef>) -> Self {
        self.set_subject(SubjectSpec::BlankColumns(columns))
    }

    pub fn join(mut self, left: ColumnRef, right: ColumnRef) -> Self {
        self.joins.push((left, right));
        self
    }

    pub fn condition(mut self, condition: SqlExpression) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Declares that one resource may come back from more than one row.
    pub fn contains_duplicates(mut self, duplicates: bool) -> Self {
        self.contains_duplicates = duplicates;
        self
    }

    pub fn build(self) -> Result<ClassMap, MappingError> {
        let context = format!("class map `{}`", self.name);
        if let Some(detail) = self.contradiction {
            return Err(MappingError::ContradictoryOptions { context, detail });
        }
        let spec = self.subject.ok_or_else(|| MappingError::MissingOption {
            context: context.clone(),
            detail: "one of uri_template, uri_column or blank_node_columns".to_string(),
        })?;
        let subject = match spec {
            SubjectSpec::IriTemplate(template) => TermMaker::iri_template(&template)?,
            SubjectSpec::IriColumn(column) => TermMaker::iri_column(column),
            SubjectSpec::BlankColumns(columns) => {
                if columns.is_empty() {
                    return Err(MappingError::MissingOption {
                        context,
                        detail: "blank_node_columns needs at least one column".to_string(),
                    });
                }
                TermMaker::blank(self.name.clone(), columns)
            }
        };
        if self.tables.is_empty() {
            return Err(MappingError::MissingOption {
                context,
                detail: "at least one table".to_string(),
            });
        }
        let mut fragment = FragmentBuilder::new().unique(!self.contains_duplicates);
        for table in self.tables {
            fragment = fragment.table(table);
        }
        for (left, right) in self.joins {
            fragment = fragment.join(left, right);
        }
        for condition in self.conditions {
            fragment = fragment.condition(condition);
        }
        Ok(ClassMap {
            name: self.name,
            subject,
            fragment: fragment.build()?,
        })
    }
}

/// How a bridge's object position gets its term.
#[derive(Debug, Clone)]
enum ObjectSpec {
    LiteralColumn(ColumnRef),
    LiteralTemplate(String),
    IriColumn(ColumnRef),
    IriTemplate(String),
    Constant(Term),
    /// The subject of another class map, joined in.
    ClassMapRef(String),
}

/// Attaches one property to the resources of a class map.
#[derive(Debug, Clone)]
pub struct PropertyBridge {
    class_map: String,
    predicate: Term,
    object: CompiledObject,
    fragment: RelationalFragment,
}

#[derive(Debug, Clone)]
enum CompiledObject {
    Maker(TermMaker),
    ClassMapRef(String),
}

impl PropertyBridge {
    pub fn builder<C: Into<String>, P: Into<String>>(
        class_map: C,
        predicate: P,
    ) -> PropertyBridgeBuilder {
        PropertyBridgeBuilder {
            class_map: class_map.into(),
            predicate: predicate.into(),
            object: None,
            datatype: None,
            language: None,
            translator: None,
            translation: None,
            constraints: Vec::new(),
            tables: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            contains_duplicates: false,
            contradiction: None,
        }
    }

    pub fn class_map(&self) -> &str {
        &self.class_map
    }

    pub fn predicate(&self) -> &Term {
        &self.predicate
    }
}

pub struct PropertyBridgeBuilder {
    class_map: String,
    predicate: String,
    object: Option<ObjectSpec>,
    datatype: Option<String>,
    language: Option<String>,
    translator: Option<String>,
    translation: Option<TranslationTable>,
    constraints: Vec<ValueConstraint>,
    tables: Vec<String>,
    joins: Vec<(ColumnRef, ColumnRef)>,
    conditions: Vec<SqlExpression>,
    contains_duplicates: bool,
    contradiction: Option<String>,
}

impl PropertyBridgeBuilder {
    fn set_object(mut self, spec: ObjectSpec) -> Self {
        match self.object {
            None => self.object = Some(spec),
            Some(_) => {
                self.contradiction = Some("more than one object specification".to_string());
            }
        }
        self
    }

    pub fn object_column(self, column: ColumnRef) -> Self {
        self.set_object(ObjectSpec::LiteralColumn(column))
    }

    pub fn object_pattern<S: Into<String>>(self, template: S) -> Self {
        self.set_object(ObjectSpec::LiteralTemplate(template.into()))
    }

    pub fn object_uri_column(self, column: ColumnRef) -> Self {
        self.set_object(ObjectSpec::IriColumn(column))
    }

    pub fn object_uri_pattern<S: Into<String>>(self, template: S) -> Self {
        self.set_object(ObjectSpec::IriTemplate(template.into()))
    }

    pub fn object_constant(self, term: Term) -> Self {
        self.set_object(ObjectSpec::Constant(term))
    }

    /// The object becomes the subject of another class map; join columns
    /// connect the two.
    pub fn refers_to_class_map<S: Into<String>>(self, class_map: S) -> Self {
        self.set_object(ObjectSpec::ClassMapRef(class_map.into()))
    }

    pub fn datatype<S: Into<String>>(mut self, datatype: S) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Attaches an inline translation table.
    pub fn translate_with(mut self, table: TranslationTable) -> Self {
        self.translation = Some(table);
        self
    }

    /// References a translator registered in the [`TranslatorRegistry`].
    pub fn translate_via<S: Into<String>>(mut self, translator: S) -> Self {
        self.translator = Some(translator.into());
        self
    }

    pub fn constraint(mut self, constraint: ValueConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn table<S: Into<String>>(mut self, table: S) -> Self {
        self.tables.push(table.into());
        self
    }

    pub fn join(mut self, left: ColumnRef, right: ColumnRef) -> Self {
        self.joins.push((left, right));
        self
    }

    pub fn condition(mut self, condition: SqlExpression) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn contains_duplicates(mut self, duplicates: bool) -> Self {
        self.contains_duplicates = duplicates;
        self
    }

    pub fn build(self, translators: &TranslatorRegistry) -> Result<PropertyBridge, MappingError> {
        let context = format!(
            "property bridge `{}` on `{}`",
            self.predicate, self.class_map
        );
        if let Some(detail) = self.contradiction {
            return Err(MappingError::ContradictoryOptions { context, detail });
        }
        if self.datatype.is_some() && self.language.is_some() {
            return Err(MappingError::ContradictoryOptions {
                context,
                detail: "both datatype and language".to_string(),
            });
        }
        if self.translation.is_some() && self.translator.is_some() {
            return Err(MappingError::ContradictoryOptions {
                context,
                detail: "both an inline translation table and a named translator".to_string(),
            });
        }
        let spec = self.object.ok_or_else(|| MappingError::MissingOption {
            context: context.clone(),
            detail: "an object specification".to_string(),
        })?;

        let resource_valued = matches!(
            spec,
            ObjectSpec::IriColumn(_)
                | ObjectSpec::IriTemplate(_)
                | ObjectSpec::Constant(_)
                | ObjectSpec::ClassMapRef(_)
        );
        if resource_valued && (self.datatype.is_some() || self.language.is_some()) {
            return Err(MappingError::ContradictoryOptions {
                context,
                detail: "datatype/language on a resource-valued object".to_string(),
            });
        }

        let literal_role = match (self.datatype.clone(), self.language.clone()) {
            (Some(datatype), None) => TermRole::typed_literal(datatype),
            (None, Some(language)) => TermRole::lang_literal(language),
            _ => TermRole::plain_literal(),
        };
        let object = match spec {
            ObjectSpec::LiteralColumn(column) => {
                CompiledObject::Maker(TermMaker::literal_column(column, literal_role))
            }
            ObjectSpec::LiteralTemplate(template) => {
                CompiledObject::Maker(TermMaker::literal_template(&template, literal_role)?)
            }
            ObjectSpec::IriColumn(column) => {
                CompiledObject::Maker(TermMaker::iri_column(column))
            }
            ObjectSpec::IriTemplate(template) => {
                CompiledObject::Maker(TermMaker::iri_template(&template)?)
            }
            ObjectSpec::Constant(term) => CompiledObject::Maker(TermMaker::fixed(term)),
            ObjectSpec::ClassMapRef(name) => CompiledObject::ClassMapRef(name),
        };

        let translation = match (self.translation, self.translator) {
            (Some(table), _) => Some(table),
            (None, Some(name)) => Some(translators.resolve(&name)?),
            (None, None) => None,
        };
        let object = match (object, translation) {
            (CompiledObject::Maker(maker), Some(table)) => {
                if matches!(maker, TermMaker::Fixed(_)) {
                    return Err(MappingError::ContradictoryOptions {
                        context,
                        detail: "translation on a constant object".to_string(),
                    });
                }
                CompiledObject::Maker(TermMaker::translated(maker, table))
            }
            (CompiledObject::ClassMapRef(_), Some(_)) => {
                return Err(MappingError::ContradictoryOptions {
                    context,
                    detail: "translation on a class map reference".to_string(),
                });
            }
            (object, None) => object,
        };
        let object = match object {
            CompiledObject::Maker(mut maker) => {
                for constraint in self.constraints {
                    maker = TermMaker::constrained(maker, constraint);
                }
                CompiledObject::Maker(maker)
            }
            reference => {
                if !self.constraints.is_empty() {
                    return Err(MappingError::ContradictoryOptions {
                        context,
                        detail: "constraints on a class map reference".to_string(),
                    });
                }
                reference
            }
        };

        let mut fragment = FragmentBuilder::new().unique(!self.contains_duplicates);
        for table in self.tables {
            fragment = fragment.table(table);
        }
        for (left, right) in self.joins {
            fragment = fragment.join(left, right);
        }
        for condition in self.conditions {
            fragment = fragment.condition(condition);
        }

        Ok(PropertyBridge {
            class_map: self.class_map,
            predicate: Term::iri(self.predicate),
            object,
            fragment: fragment.build()?,
        })
    }
}

/// A complete mapping: class maps plus the bridges that hang off them.
#[derive(Debug, Default)]
pub struct Mapping {
    class_maps: Vec<ClassMap>,
    bridges: Vec<PropertyBridge>,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping::default()
    }

    pub fn add_class_map(&mut self, class_map: ClassMap) {
        self.class_maps.push(class_map);
    }

    pub fn add_bridge(&mut self, bridge: PropertyBridge) {
        self.bridges.push(bridge);
    }

    pub fn class_map(&self, name: &str) -> Option<&ClassMap> {
        self.class_maps.iter().find(|cm| cm.name == name)
    }

    /// Compiles every bridge into a triple relation: the bridge's own
    /// fragment merged with its class map's, subject maker taken from the
    /// class map, class map references in object position resolved.
    pub fn compile(&self) -> Result<Vec<TripleRelation>, MappingError> {
        let mut relations = Vec::with_capacity(self.bridges.len());
        for bridge in &self.bridges {
            let class_map =
                self.class_map(&bridge.class_map)
                    .ok_or_else(|| MappingError::UnknownClassMap {
                        bridge: bridge.predicate.to_string(),
                        class_map: bridge.class_map.clone(),
                    })?;
            let mut base = class_map.fragment.merge(&bridge.fragment)?;
            let object = match &bridge.object {
                CompiledObject::Maker(maker) => maker.clone(),
                CompiledObject::ClassMapRef(name) => {
                    let referenced =
                        self.class_map(name)
                            .ok_or_else(|| MappingError::UnknownClassMap {
                                bridge: bridge.predicate.to_string(),
                                class_map: name.clone(),
                            })?;
                    base = base.merge(&referenced.fragment)?;
                    referenced.subject.clone()
                }
            };
            relations.push(TripleRelation::new(
                class_map.subject.clone(),
                TermMaker::fixed(bridge.predicate.clone()),
                object,
                base,
            )?);
        }
        Ok(relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakehashi_core::TriplePosition;
    use kakehashi_sql::{SelectBuilder, Sql92Dialect};

    fn col(qualified: &str) -> ColumnRef {
        ColumnRef::parse(qualified).unwrap()
    }

    fn employees() -> ClassMap {
        ClassMap::builder("Employee")
            .table("employees")
            .uri_template("http://example.org/emp/@@employees.id@@")
            .build()
            .unwrap()
    }

    #[test]
    fn test_class_map_requires_subject_spec() {
        let result = ClassMap::builder("Employee").table("employees").build();
        assert!(matches!(result, Err(MappingError::MissingOption { .. })));
    }

    #[test]
    fn test_class_map_rejects_two_subject_specs() {
        let result = ClassMap::builder("Employee")
            .table("employees")
            .uri_template("http://example.org/emp/@@employees.id@@")
            .uri_column(col("employees.homepage"))
            .build();
        assert!(matches!(
            result,
            Err(MappingError::ContradictoryOptions { .. })
        ));
    }

    #[test]
    fn test_bridge_rejects_datatype_and_language_together() {
        let result = PropertyBridge::builder("Employee", "http://example.org/p/name")
            .table("employees")
            .object_column(col("employees.name"))
            .datatype("http://www.w3.org/2001/XMLSchema#string")
            .language("en")
            .build(&TranslatorRegistry::new());
        assert!(matches!(
            result,
            Err(MappingError::ContradictoryOptions { .. })
        ));
    }

    #[test]
    fn test_bridge_rejects_datatype_on_uri_object() {
        let result = PropertyBridge::builder("Employee", "http://example.org/p/dept")
            .table("employees")
            .object_uri_pattern("http://example.org/dept/@@employees.dept_id@@")
            .datatype("http://www.w3.org/2001/XMLSchema#int")
            .build(&TranslatorRegistry::new());
        assert!(matches!(
            result,
            Err(MappingError::ContradictoryOptions { .. })
        ));
    }

    #[test]
    fn test_mapping_compiles_bridge_over_class_map() {
        let mut mapping = Mapping::new();
        mapping.add_class_map(employees());
        mapping.add_bridge(
            PropertyBridge::builder("Employee", "http://example.org/p/name")
                .table("employees")
                .object_column(col("employees.name"))
                .build(&TranslatorRegistry::new())
                .unwrap(),
        );
        let relations = mapping.compile().unwrap();
        assert_eq!(relations.len(), 1);
        let relation = &relations[0];
        assert!(relation
            .maker(TriplePosition::Predicate)
            .could_fit(&Term::iri("http://example.org/p/name")));
        assert_eq!(
            relation.base().projections(),
            &[col("employees.id"), col("employees.name")]
        );
        let statement = SelectBuilder::new(&Sql92Dialect)
            .build(relation.base())
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT \"employees\".\"id\", \"employees\".\"name\" FROM \"employees\""
        );
    }

    #[test]
    fn test_bridge_with_unknown_class_map_fails_compile() {
        let mut mapping = Mapping::new();
        mapping.add_bridge(
            PropertyBridge::builder("Nowhere", "http://example.org/p/name")
                .table("employees")
                .object_column(col("employees.name"))
                .build(&TranslatorRegistry::new())
                .unwrap(),
        );
        assert!(matches!(
            mapping.compile(),
            Err(MappingError::UnknownClassMap { .. })
        ));
    }

    #[test]
    fn test_refers_to_class_map_joins_subject_makers() {
        let mut mapping = Mapping::new();
        mapping.add_class_map(employees());
        mapping.add_class_map(
            ClassMap::builder("Department")
                .table("departments")
                .uri_template("http://example.org/dept/@@departments.id@@")
                .build()
                .unwrap(),
        );
        mapping.add_bridge(
            PropertyBridge::builder("Employee", "http://example.org/p/worksIn")
                .table("employees")
                .table("departments")
                .join(col("employees.dept_id"), col("departments.id"))
                .refers_to_class_map("Department")
                .build(&TranslatorRegistry::new())
                .unwrap(),
        );
        let relations = mapping.compile().unwrap();
        let relation = &relations[0];
        assert!(relation
            .maker(TriplePosition::Object)
            .could_fit(&Term::iri("http://example.org/dept/3")));
        assert_eq!(relation.base().table_count(), 2);
        assert_eq!(relation.base().joins().count(), 1);
    }

    #[test]
    fn test_duplicate_prone_bridge_compiles_to_nonunique_fragment() {
        let mut mapping = Mapping::new();
        mapping.add_class_map(employees());
        mapping.add_bridge(
            PropertyBridge::builder("Employee", "http://example.org/p/skill")
                .table("employees")
                .object_column(col("employees.skill"))
                .contains_duplicates(true)
                .build(&TranslatorRegistry::new())
                .unwrap(),
        );
        let relations = mapping.compile().unwrap();
        assert!(!relations[0].base().is_unique());
    }

    #[test]
    fn test_translated_bridge_object() {
        let table = TranslationTable::from_pairs(
            "status",
            [("1", "http://example.org/status#active")],
        )
        .unwrap();
        let bridge = PropertyBridge::builder("Employee", "http://example.org/p/status")
            .table("employees")
            .object_uri_column(col("employees.status"))
            .translate_with(table)
            .build(&TranslatorRegistry::new())
            .unwrap();
        let mut mapping = Mapping::new();
        mapping.add_class_map(employees());
        mapping.add_bridge(bridge);
        let relations = mapping.compile().unwrap();
        assert!(relations[0]
            .maker(TriplePosition::Object)
            .could_fit(&Term::iri("http://example.org/status#active")));
        assert!(!relations[0]
            .maker(TriplePosition::Object)
            .could_fit(&Term::iri("http://example.org/status#unknown")));
    }
}
