//! Term makers
//!
//! A term maker is a compiled recipe that turns database row values into
//! one RDF term and, in reverse, decides whether a given term could have
//! been produced and which column values it would require. The forward
//! and backward directions must agree: whenever `build` yields a term,
//! `could_fit` accepts it and `column_values_for` recovers the row values
//! that went in.

use crate::error::MappingError;
use crate::template::ValueTemplate;
use crate::translate::TranslationTable;
use kakehashi_core::{Term, XSD_STRING};
use kakehashi_sql::{AliasMap, ColumnRef, ResultRow, SqlExpression};
use regex::Regex;

/// The delimiter between the class tag and the column values inside a
/// generated blank node label.
const BLANK_DELIMITER: &str = "@@";

/// What kind of term a column or template value becomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermRole {
    Iri,
    Literal {
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl TermRole {
    pub fn plain_literal() -> Self {
        TermRole::Literal {
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal<S: Into<String>>(datatype: S) -> Self {
        TermRole::Literal {
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang_literal<S: Into<String>>(language: S) -> Self {
        TermRole::Literal {
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn make_term(&self, value: String) -> Term {
        match self {
            TermRole::Iri => Term::Iri(value),
            TermRole::Literal { datatype, language } => Term::Literal {
                lexical: value,
                datatype: datatype.clone(),
                language: language.clone(),
            },
        }
    }

    /// The lexical form of `term` if the term has this role's shape,
    /// datatype and language. A plain literal and an explicit
    /// `xsd:string` literal count as the same datatype.
    pub fn lexical_of<'a>(&self, term: &'a Term) -> Option<&'a str> {
        match (self, term) {
            (TermRole::Iri, Term::Iri(iri)) => Some(iri),
            (
                TermRole::Literal { datatype, language },
                Term::Literal {
                    lexical,
                    datatype: term_datatype,
                    language: term_language,
                },
            ) => {
                let same_datatype =
                    normalize_datatype(datatype) == normalize_datatype(term_datatype);
                let same_language = match (language, term_language) {
                    (None, None) => true,
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    _ => false,
                };
                (same_datatype && same_language).then_some(lexical.as_str())
            }
            _ => None,
        }
    }
}

fn normalize_datatype(datatype: &Option<String>) -> Option<&str> {
    datatype.as_deref().filter(|dt| *dt != XSD_STRING)
}

/// A static restriction on the values a maker can produce. Constraints
/// narrow `could_fit` and are also checked when building terms.
#[derive(Debug, Clone)]
pub enum ValueConstraint {
    Matches(Regex),
    Contains(String),
    MaxLength(usize),
}

impl ValueConstraint {
    pub fn matches(pattern: &str) -> Result<Self, MappingError> {
        let regex = Regex::new(pattern).map_err(|e| MappingError::InvalidConstraint {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(ValueConstraint::Matches(regex))
    }

    pub fn contains<S: Into<String>>(needle: S) -> Self {
        ValueConstraint::Contains(needle.into())
    }

    pub fn max_length(length: usize) -> Self {
        ValueConstraint::MaxLength(length)
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ValueConstraint::Matches(regex) => regex.is_match(value),
            ValueConstraint::Contains(needle) => value.contains(needle),
            ValueConstraint::MaxLength(length) => value.chars().count() <= *length,
        }
    }
}

/// A compiled recipe for one triple position.
#[derive(Debug, Clone)]
pub enum TermMaker {
    /// Always the same term, independent of the row.
    Fixed(Term),
    /// A single column value becomes the term.
    Column { column: ColumnRef, role: TermRole },
    /// A templated value becomes the term.
    Template {
        template: ValueTemplate,
        role: TermRole,
    },
    /// A blank node labeled from a class tag and one or more columns.
    BlankNode {
        class_tag: String,
        columns: Vec<ColumnRef>,
    },
    /// The base maker's value passes through a translation table first.
    Translated {
        base: Box<TermMaker>,
        table: TranslationTable,
    },
    /// The base maker restricted to values a constraint accepts.
    Constrained {
        base: Box<TermMaker>,
        constraint: ValueConstraint,
    },
}

impl TermMaker {
    pub fn fixed(term: Term) -> Self {
        TermMaker::Fixed(term)
    }

    pub fn iri_column(column: ColumnRef) -> Self {
        TermMaker::Column {
            column,
            role: TermRole::Iri,
        }
    }

    pub fn iri_template(raw: &str) -> Result<Self, MappingError> {
        Ok(TermMaker::Template {
            template: ValueTemplate::parse(raw)?,
            role: TermRole::Iri,
        })
    }

    pub fn literal_column(column: ColumnRef, role: TermRole) -> Self {
        TermMaker::Column { column, role }
    }

    pub fn literal_template(raw: &str, role: TermRole) -> Result<Self, MappingError> {
        Ok(TermMaker::Template {
            template: ValueTemplate::parse(raw)?,
            role,
        })
    }

    pub fn blank<S: Into<String>>(class_tag: S, columns: Vec<ColumnRef>) -> Self {
        TermMaker::BlankNode {
            class_tag: class_tag.into(),
            columns,
        }
    }

    pub fn translated(base: TermMaker, table: TranslationTable) -> Self {
        TermMaker::Translated {
            base: Box::new(base),
            table,
        }
    }

    pub fn constrained(base: TermMaker, constraint: ValueConstraint) -> Self {
        TermMaker::Constrained {
            base: Box::new(base),
            constraint,
        }
    }

    /// Builds the term for one row; `None` when a referenced column is
    /// NULL, a translation has no entry, or a constraint rejects the value.
    pub fn build(&self, row: &ResultRow) -> Option<Term> {
        match self {
            TermMaker::Fixed(term) => Some(term.clone()),
            TermMaker::Column { column, role } => {
                Some(role.make_term(row.get(column)?.to_string()))
            }
            TermMaker::Template { template, role } => {
                Some(role.make_term(template.build(row)?))
            }
            TermMaker::BlankNode { class_tag, columns } => {
                let mut label = class_tag.clone();
                for column in columns {
                    label.push_str(BLANK_DELIMITER);
                    label.push_str(row.get(column)?);
                }
                Some(Term::BlankNode(label))
            }
            TermMaker::Translated { base, table } => {
                let value = base.value_of(row)?;
                let translated = table.to_rdf_value(&value)?;
                Some(base.role()?.make_term(translated))
            }
            TermMaker::Constrained { base, constraint } => {
                let term = base.build(row)?;
                constraint.accepts(term.lexical_form()).then_some(term)
            }
        }
    }

    /// Fast check: can this maker produce `term` for any row at all?
    /// Sound over-approximation of the row-level question, so candidate
    /// filtering never loses answers.
    pub fn could_fit(&self, term: &Term) -> bool {
        match self {
            TermMaker::Fixed(fixed) => fixed == term,
            TermMaker::Column { role, .. } => role.lexical_of(term).is_some(),
            TermMaker::Template { template, role } => match role.lexical_of(term) {
                Some(lexical) => template.matches(lexical),
                None => false,
            },
            TermMaker::BlankNode { class_tag, columns } => {
                parse_blank_label(term, class_tag, columns.len()).is_some()
            }
            TermMaker::Translated { base, table } => {
                let Some(role) = base.role() else { return false };
                let Some(lexical) = role.lexical_of(term) else {
                    return false;
                };
                match table.to_db_value(lexical) {
                    Some(db_value) => base.fits_value(&db_value),
                    None => false,
                }
            }
            TermMaker::Constrained { base, constraint } => {
                constraint.accepts(term.lexical_form()) && base.could_fit(term)
            }
        }
    }

    /// The column values a row must carry for this maker to produce
    /// exactly `term`. `None` when no row can.
    pub fn column_values_for(&self, term: &Term) -> Option<Vec<(ColumnRef, String)>> {
        match self {
            TermMaker::Fixed(fixed) => (fixed == term).then(Vec::new),
            TermMaker::Column { column, role } => {
                let lexical = role.lexical_of(term)?;
                Some(vec![(column.clone(), lexical.to_string())])
            }
            TermMaker::Template { template, role } => {
                template.column_values(role.lexical_of(term)?)
            }
            TermMaker::BlankNode { class_tag, columns } => {
                let values = parse_blank_label(term, class_tag, columns.len())?;
                Some(
                    columns
                        .iter()
                        .cloned()
                        .zip(values.into_iter().map(str::to_string))
                        .collect(),
                )
            }
            TermMaker::Translated { base, table } => {
                let lexical = base.role()?.lexical_of(term)?;
                let db_value = table.to_db_value(lexical)?;
                base.columns_for_value(&db_value)
            }
            TermMaker::Constrained { base, constraint } => {
                if !constraint.accepts(term.lexical_form()) {
                    return None;
                }
                base.column_values_for(term)
            }
        }
    }

    /// Every column the maker reads.
    pub fn required_columns(&self) -> Vec<ColumnRef> {
        match self {
            TermMaker::Fixed(_) => Vec::new(),
            TermMaker::Column { column, .. } => vec![column.clone()],
            TermMaker::Template { template, .. } => template.columns().cloned().collect(),
            TermMaker::BlankNode { columns, .. } => columns.clone(),
            TermMaker::Translated { base, .. } | TermMaker::Constrained { base, .. } => {
                base.required_columns()
            }
        }
    }

    /// The maker with every column reference rewritten through the alias
    /// map. Pure.
    pub fn rename(&self, aliases: &AliasMap) -> TermMaker {
        match self {
            TermMaker::Fixed(term) => TermMaker::Fixed(term.clone()),
            TermMaker::Column { column, role } => TermMaker::Column {
                column: aliases.apply_column(column),
                role: role.clone(),
            },
            TermMaker::Template { template, role } => TermMaker::Template {
                template: template.rename(aliases),
                role: role.clone(),
            },
            TermMaker::BlankNode { class_tag, columns } => TermMaker::BlankNode {
                class_tag: class_tag.clone(),
                columns: columns.iter().map(|c| aliases.apply_column(c)).collect(),
            },
            TermMaker::Translated { base, table } => TermMaker::Translated {
                base: Box::new(base.rename(aliases)),
                table: table.clone(),
            },
            TermMaker::Constrained { base, constraint } => TermMaker::Constrained {
                base: Box::new(base.rename(aliases)),
                constraint: constraint.clone(),
            },
        }
    }

    /// The maker's value as a SQL expression, when it can be computed by
    /// the database. Used to push shared-variable equalities into WHERE
    /// clauses. Translations and codec-bearing templates return `None`.
    pub fn sql_value_expression(&self) -> Option<SqlExpression> {
        match self {
            TermMaker::Fixed(term) => Some(SqlExpression::text(term.lexical_form())),
            TermMaker::Column { column, .. } => Some(SqlExpression::Column(column.clone())),
            TermMaker::Template { template, .. } => template.sql_expression(),
            TermMaker::BlankNode { class_tag, columns } => {
                let mut parts = vec![SqlExpression::text(class_tag.clone())];
                for column in columns {
                    parts.push(SqlExpression::text(BLANK_DELIMITER));
                    parts.push(SqlExpression::Column(column.clone()));
                }
                Some(SqlExpression::concat(parts))
            }
            TermMaker::Translated { .. } => None,
            TermMaker::Constrained { base, .. } => base.sql_value_expression(),
        }
    }

    /// Whether this maker and `other` could ever produce the same term.
    /// Conservative: `true` unless the makers are provably disjoint.
    pub fn unifiable_with(&self, other: &TermMaker) -> bool {
        if let (Some(a), Some(b)) = (self.shape(), other.shape()) {
            if a != b {
                return false;
            }
        }
        if let (
            TermMaker::BlankNode {
                class_tag: tag_a,
                columns: cols_a,
            },
            TermMaker::BlankNode {
                class_tag: tag_b,
                columns: cols_b,
            },
        ) = (self.innermost(), other.innermost())
        {
            return tag_a == tag_b && cols_a.len() == cols_b.len();
        }
        match (self.literal_role(), other.literal_role()) {
            (Some(a), Some(b)) => a.lexical_of(&b.make_term(String::new())).is_some(),
            _ => true,
        }
    }

    fn shape(&self) -> Option<TermShape> {
        match self {
            TermMaker::Fixed(Term::Iri(_)) => Some(TermShape::Iri),
            TermMaker::Fixed(Term::BlankNode(_)) => Some(TermShape::Blank),
            TermMaker::Fixed(Term::Literal { .. }) => Some(TermShape::Literal),
            TermMaker::Column { role, .. } | TermMaker::Template { role, .. } => match role {
                TermRole::Iri => Some(TermShape::Iri),
                TermRole::Literal { .. } => Some(TermShape::Literal),
            },
            TermMaker::BlankNode { .. } => Some(TermShape::Blank),
            TermMaker::Translated { base, .. } | TermMaker::Constrained { base, .. } => {
                base.shape()
            }
        }
    }

    fn innermost(&self) -> &TermMaker {
        match self {
            TermMaker::Translated { base, .. } | TermMaker::Constrained { base, .. } => {
                base.innermost()
            }
            other => other,
        }
    }

    fn literal_role(&self) -> Option<&TermRole> {
        match self.role() {
            Some(role @ TermRole::Literal { .. }) => Some(role),
            _ => None,
        }
    }

    /// The value-level role, for makers that have one.
    fn role(&self) -> Option<&TermRole> {
        match self {
            TermMaker::Column { role, .. } | TermMaker::Template { role, .. } => Some(role),
            TermMaker::Translated { base, .. } | TermMaker::Constrained { base, .. } => {
                base.role()
            }
            TermMaker::Fixed(_) | TermMaker::BlankNode { .. } => None,
        }
    }

    /// The raw (pre-role) value for one row, for column and template
    /// makers.
    fn value_of(&self, row: &ResultRow) -> Option<String> {
        match self {
            TermMaker::Column { column, .. } => row.get(column).map(str::to_string),
            TermMaker::Template { template, .. } => template.build(row),
            TermMaker::Constrained { base, .. } => base.value_of(row),
            _ => None,
        }
    }

    /// Whether a raw value fits the maker's value shape.
    fn fits_value(&self, value: &str) -> bool {
        match self {
            TermMaker::Column { .. } => true,
            TermMaker::Template { template, .. } => template.matches(value),
            TermMaker::Constrained { base, .. } => base.fits_value(value),
            _ => false,
        }
    }

    /// The raw value decomposed into column assignments.
    fn columns_for_value(&self, value: &str) -> Option<Vec<(ColumnRef, String)>> {
        match self {
            TermMaker::Column { column, .. } => Some(vec![(column.clone(), value.to_string())]),
            TermMaker::Template { template, .. } => template.column_values(value),
            TermMaker::Constrained { base, .. } => base.columns_for_value(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermShape {
    Iri,
    Blank,
    Literal,
}

/// Splits a blank node label back into its column values. The label must
/// start with the class tag and carry exactly `arity` delimited values.
fn parse_blank_label<'a>(term: &'a Term, class_tag: &str, arity: usize) -> Option<Vec<&'a str>> {
    let Term::BlankNode(label) = term else {
        return None;
    };
    let mut parts = label.split(BLANK_DELIMITER);
    if parts.next()? != class_tag {
        return None;
    }
    let values: Vec<&str> = parts.collect();
    (values.len() == arity).then_some(values)
}
