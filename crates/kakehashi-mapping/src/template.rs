//! Value templates
//!
//! A template interleaves literal text with column placeholders written
//! `@@table.column@@`, optionally suffixed with a codec as in
//! `@@table.column|urlencode@@`. Templates build values from rows and,
//! going the other way, recover column values from a candidate string by
//! matching against the literal skeleton.

use crate::error::MappingError;
use kakehashi_sql::{ColumnRef, SqlExpression};
use kakehashi_sql::{AliasMap, ResultRow};
use regex::Regex;
use std::fmt;
use std::fmt::Write as _;

/// Per-column value transformation applied between database and RDF space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCodec {
    /// Value used verbatim.
    Identity,
    /// Form-style percent encoding; space becomes `+`.
    UrlEncode,
    /// Like [`ColumnCodec::UrlEncode`] but space becomes `_` for more
    /// readable identifiers; a literal underscore is percent-encoded.
    Urlify,
    /// IRI-safe percent encoding; space becomes `%20`.
    Encode,
}

impl ColumnCodec {
    fn from_name(name: &str) -> Option<ColumnCodec> {
        match name {
            "urlencode" => Some(ColumnCodec::UrlEncode),
            "urlify" => Some(ColumnCodec::Urlify),
            "encode" => Some(ColumnCodec::Encode),
            _ => None,
        }
    }

    fn name(&self) -> Option<&'static str> {
        match self {
            ColumnCodec::Identity => None,
            ColumnCodec::UrlEncode => Some("urlencode"),
            ColumnCodec::Urlify => Some("urlify"),
            ColumnCodec::Encode => Some("encode"),
        }
    }

    pub fn encode(&self, value: &str) -> String {
        match self {
            ColumnCodec::Identity => value.to_string(),
            ColumnCodec::UrlEncode => percent_encode(value, SpaceStyle::Plus),
            ColumnCodec::Urlify => percent_encode(value, SpaceStyle::Underscore),
            ColumnCodec::Encode => percent_encode(value, SpaceStyle::Percent),
        }
    }

    /// Inverts [`ColumnCodec::encode`]; `None` when the input is not a
    /// well-formed encoding (stray `%`, bad hex, invalid UTF-8).
    pub fn decode(&self, value: &str) -> Option<String> {
        match self {
            ColumnCodec::Identity => Some(value.to_string()),
            ColumnCodec::UrlEncode => percent_decode(value, SpaceStyle::Plus),
            ColumnCodec::Urlify => percent_decode(value, SpaceStyle::Underscore),
            ColumnCodec::Encode => percent_decode(value, SpaceStyle::Percent),
        }
    }

    /// Whether encoded output equals the input for every value. Only the
    /// identity codec can be pushed into SQL.
    pub fn is_identity(&self) -> bool {
        matches!(self, ColumnCodec::Identity)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SpaceStyle {
    Plus,
    Underscore,
    Percent,
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'~')
}

fn percent_encode(value: &str, space: SpaceStyle) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if is_unreserved(byte) || (byte == b'_' && space != SpaceStyle::Underscore) {
            out.push(byte as char);
        } else if byte == b' ' {
            match space {
                SpaceStyle::Plus => out.push('+'),
                SpaceStyle::Underscore => out.push('_'),
                SpaceStyle::Percent => out.push_str("%20"),
            }
        } else {
            let _ = write!(out, "%{:02X}", byte);
        }
    }
    out
}

fn percent_decode(value: &str, space: SpaceStyle) -> Option<String> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut input = value.bytes();
    while let Some(byte) = input.next() {
        match byte {
            b'%' => {
                let high = hex_digit(input.next()?)?;
                let low = hex_digit(input.next()?)?;
                bytes.push(high << 4 | low);
            }
            b'+' if space == SpaceStyle::Plus => bytes.push(b' '),
            b'_' if space == SpaceStyle::Underscore => bytes.push(b' '),
            other => bytes.push(other),
        }
    }
    String::from_utf8(bytes).ok()
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

/// One column placeholder in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSlot {
    pub column: ColumnRef,
    pub codec: ColumnCodec,
}

/// A parsed `literal @@t.c@@ literal ...` template.
///
/// Structurally: `literals[0] slot[0] literals[1] slot[1] ... literals[n]`,
/// with `literals.len() == slots.len() + 1`.
#[derive(Debug, Clone)]
pub struct ValueTemplate {
    literals: Vec<String>,
    slots: Vec<TemplateSlot>,
    matcher: Regex,
}

impl PartialEq for ValueTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.literals == other.literals && self.slots == other.slots
    }
}

impl Eq for ValueTemplate {}

impl ValueTemplate {
    pub fn parse(template: &str) -> Result<Self, MappingError> {
        let placeholder = Regex::new(r"@@([^@|]+)(?:\|([a-z]+))?@@")
            .map_err(|e| MappingError::MalformedTemplate {
                template: template.to_string(),
                reason: e.to_string(),
            })?;
        let malformed = |reason: &str| MappingError::MalformedTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut literals = Vec::new();
        let mut slots = Vec::new();
        let mut cursor = 0;
        for capture in placeholder.captures_iter(template) {
            let whole = capture.get(0).ok_or_else(|| malformed("empty match"))?;
            let literal = &template[cursor..whole.start()];
            if literal.contains("@@") {
                return Err(malformed("unbalanced @@ delimiter"));
            }
            literals.push(literal.to_string());
            let column = capture
                .get(1)
                .ok_or_else(|| malformed("missing column reference"))?
                .as_str()
                .trim();
            let column = ColumnRef::parse(column)
                .map_err(|_| malformed(&format!("`{}` is not a table.column reference", column)))?;
            let codec = match capture.get(2) {
                None => ColumnCodec::Identity,
                Some(name) => ColumnCodec::from_name(name.as_str())
                    .ok_or_else(|| malformed(&format!("unknown codec `{}`", name.as_str())))?,
            };
            slots.push(TemplateSlot { column, codec });
            cursor = whole.end();
        }
        let tail = &template[cursor..];
        if tail.contains("@@") {
            return Err(malformed("unbalanced @@ delimiter"));
        }
        literals.push(tail.to_string());
        if slots.is_empty() {
            return Err(malformed("no column placeholders"));
        }

        let matcher = Self::compile_matcher(&literals).map_err(|e| malformed(&e.to_string()))?;
        Ok(ValueTemplate {
            literals,
            slots,
            matcher,
        })
    }

    /// Anchored matcher over the literal skeleton; each slot becomes a
    /// non-greedy capture group.
    fn compile_matcher(literals: &[String]) -> Result<Regex, regex::Error> {
        let mut pattern = String::from("^(?s)");
        for (index, literal) in literals.iter().enumerate() {
            if index > 0 {
                pattern.push_str("(.*?)");
            }
            pattern.push_str(&regex::escape(literal));
        }
        pattern.push('$');
        Regex::new(&pattern)
    }

    pub fn slots(&self) -> &[TemplateSlot] {
        &self.slots
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnRef> {
        self.slots.iter().map(|slot| &slot.column)
    }

    /// Builds the templated value from a row; `None` when any referenced
    /// column is NULL.
    pub fn build(&self, row: &ResultRow) -> Option<String> {
        let mut out = self.literals[0].clone();
        for (slot, literal) in self.slots.iter().zip(&self.literals[1..]) {
            let value = row.get(&slot.column)?;
            out.push_str(&slot.codec.encode(value));
            out.push_str(literal);
        }
        Some(out)
    }

    pub fn matches(&self, value: &str) -> bool {
        self.column_values(value).is_some()
    }

    /// Recovers (column, decoded value) pairs from a candidate string, or
    /// `None` when the string does not fit the skeleton or a captured part
    /// is not a valid encoding.
    pub fn column_values(&self, value: &str) -> Option<Vec<(ColumnRef, String)>> {
        let captures = self.matcher.captures(value)?;
        let mut pairs = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.iter().enumerate() {
            let captured = captures.get(index + 1)?.as_str();
            let decoded = slot.codec.decode(captured)?;
            pairs.push((slot.column.clone(), decoded));
        }
        Some(pairs)
    }

    /// Whether two templates produce the same value exactly when their
    /// column values agree position by position: same literal skeleton,
    /// same codecs.
    pub fn is_equivalent_to(&self, other: &ValueTemplate) -> bool {
        self.literals == other.literals
            && self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(&other.slots)
                .all(|(a, b)| a.codec == b.codec)
    }

    /// The template as a SQL concatenation, when every codec is the
    /// identity. Codec-bearing templates cannot be expressed in SQL.
    pub fn sql_expression(&self) -> Option<SqlExpression> {
        if !self.slots.iter().all(|slot| slot.codec.is_identity()) {
            return None;
        }
        let mut parts = vec![SqlExpression::text(self.literals[0].clone())];
        for (slot, literal) in self.slots.iter().zip(&self.literals[1..]) {
            parts.push(SqlExpression::Column(slot.column.clone()));
            parts.push(SqlExpression::text(literal.clone()));
        }
        Some(SqlExpression::concat(parts))
    }

    /// The template with every column reference rewritten through the
    /// alias map. Pure.
    pub fn rename(&self, aliases: &AliasMap) -> ValueTemplate {
        ValueTemplate {
            literals: self.literals.clone(),
            slots: self
                .slots
                .iter()
                .map(|slot| TemplateSlot {
                    column: aliases.apply_column(&slot.column),
                    codec: slot.codec,
                })
                .collect(),
            matcher: self.matcher.clone(),
        }
    }
}

impl fmt::Display for ValueTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.literals[0])?;
        for (slot, literal) in self.slots.iter().zip(&self.literals[1..]) {
            match slot.codec.name() {
                Some(codec) => write!(f, "@@{}|{}@@", slot.column, codec)?,
                None => write!(f, "@@{}@@", slot.column)?,
            }
            write!(f, "{}", literal)?;
        }
        Ok(())
    }
}
