//! Immutable relational query fragments and alias maps
//!
//! A fragment describes "what to select": source tables, join equalities,
//! a filter condition, projected columns, table aliases and row-set
//! properties. Fragments never mutate; merging and renaming produce new
//! values.

use crate::error::SqlError;
use crate::expr::SqlExpression;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A qualified column reference, `table.column`. The table part names the
/// query-local table (after aliasing, if any alias applies).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new<T: Into<String>, C: Into<String>>(table: T, column: C) -> Self {
        ColumnRef {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Parses a `table.column` reference.
    pub fn parse(qualified: &str) -> Result<Self, SqlError> {
        match qualified.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Ok(ColumnRef::new(table, column))
            }
            _ => Err(SqlError::MalformedColumnRef(qualified.to_string())),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// An equality join between two columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Join {
    pub left: ColumnRef,
    pub right: ColumnRef,
}

impl Join {
    pub fn new(left: ColumnRef, right: ColumnRef) -> Self {
        // Normalized so that `a.x = b.y` and `b.y = a.x` compare equal.
        if right < left {
            Join { left: right, right: left }
        } else {
            Join { left, right }
        }
    }

    pub fn rename(&self, aliases: &AliasMap) -> Join {
        Join::new(aliases.apply_column(&self.left), aliases.apply_column(&self.right))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub column: ColumnRef,
    pub direction: OrderDirection,
}

/// Map from query-local aliases to original table names.
///
/// Keyed by alias, so one base table may appear under several aliases in
/// the same fragment (a self-join reads `employees` as both
/// `T0_employees` and `T1_employees`), while no alias ever names two
/// tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasMap {
    entries: BTreeMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        AliasMap::default()
    }

    /// An alias map renaming every given table to `prefix` + table name.
    /// Used by the query combiner to isolate pattern indexes from each
    /// other (`T0_`, `T1_`, ...).
    pub fn prefixing<'a, I: IntoIterator<Item = &'a str>>(prefix: &str, tables: I) -> Self {
        let entries = tables
            .into_iter()
            .map(|table| (format!("{}{}", prefix, table), table.to_string()))
            .collect();
        AliasMap { entries }
    }

    pub fn with_alias<O: Into<String>, A: Into<String>>(
        mut self,
        original: O,
        alias: A,
    ) -> Result<Self, SqlError> {
        self.insert(original.into(), alias.into())?;
        Ok(self)
    }

    fn insert(&mut self, original: String, alias: String) -> Result<(), SqlError> {
        if let Some(existing) = self.entries.get(&alias) {
            if *existing == original {
                return Ok(());
            }
            return Err(SqlError::DuplicateAlias(alias));
        }
        if self.entries.contains_key(&original) {
            return Err(SqlError::AliasCycle(original));
        }
        if self.entries.values().any(|o| *o == alias) {
            return Err(SqlError::AliasCycle(alias));
        }
        self.entries.insert(alias, original);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Some alias declared for `original`. Rename instructions carry at
    /// most one alias per table; record maps may carry several, in which
    /// case the lexically first wins.
    pub fn alias_of(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, o)| o.as_str() == original)
            .map(|(alias, _)| alias.as_str())
    }

    pub fn original_of(&self, alias: &str) -> Option<&str> {
        self.entries.get(alias).map(String::as_str)
    }

    /// The query-local name for `table`: its alias if one is declared.
    pub fn apply_table(&self, table: &str) -> String {
        self.alias_of(table).unwrap_or(table).to_string()
    }

    pub fn apply_column(&self, column: &ColumnRef) -> ColumnRef {
        ColumnRef::new(self.apply_table(&column.table), column.column.clone())
    }

    /// Union of two alias maps; fails when an alias would name two
    /// different tables.
    pub fn merge_with(&self, other: &AliasMap) -> Result<AliasMap, SqlError> {
        let mut merged = self.clone();
        for (alias, original) in &other.entries {
            merged.insert(original.clone(), alias.clone())?;
        }
        Ok(merged)
    }

    /// (original, alias) pairs in alias order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, o)| (o.as_str(), a.as_str()))
    }
}

/// A composable, immutable description of what to select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationalFragment {
    tables: BTreeSet<String>,
    joins: BTreeSet<Join>,
    condition: SqlExpression,
    projections: Vec<ColumnRef>,
    aliases: AliasMap,
    unique: bool,
    order_by: Option<OrderSpec>,
    limit: Option<u64>,
}

impl RelationalFragment {
    /// The empty fragment: no tables, condition TRUE. Selecting from it
    /// yields exactly one empty row.
    pub fn unit() -> Self {
        RelationalFragment {
            tables: BTreeSet::new(),
            joins: BTreeSet::new(),
            condition: SqlExpression::True,
            projections: Vec::new(),
            aliases: AliasMap::new(),
            unique: true,
            order_by: None,
            limit: None,
        }
    }

    pub fn builder() -> FragmentBuilder {
        FragmentBuilder::new()
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn joins(&self) -> impl Iterator<Item = &Join> {
        self.joins.iter()
    }

    pub fn condition(&self) -> &SqlExpression {
        &self.condition
    }

    pub fn projections(&self) -> &[ColumnRef] {
        &self.projections
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn order_by(&self) -> Option<&OrderSpec> {
        self.order_by.as_ref()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_trivial(&self) -> bool {
        self.tables.is_empty()
    }

    /// A new fragment with `condition` ANDed in.
    pub fn with_condition(&self, condition: SqlExpression) -> Result<Self, SqlError> {
        let mut fragment = self.clone();
        fragment.condition = SqlExpression::and(vec![fragment.condition, condition]);
        fragment.validate()?;
        Ok(fragment)
    }

    /// A new fragment with additional projected columns (duplicates kept
    /// out, first occurrence wins the position).
    pub fn with_projections<I: IntoIterator<Item = ColumnRef>>(
        &self,
        columns: I,
    ) -> Result<Self, SqlError> {
        let mut fragment = self.clone();
        for column in columns {
            if !fragment.projections.contains(&column) {
                fragment.projections.push(column);
            }
        }
        fragment.validate()?;
        Ok(fragment)
    }

    /// Merges two fragments: union of tables and joins, conditions ANDed,
    /// projections concatenated, alias maps united. Uniqueness only
    /// survives if both sides guarantee it; the smaller limit wins.
    pub fn merge(&self, other: &RelationalFragment) -> Result<Self, SqlError> {
        let aliases = self.aliases.merge_with(&other.aliases)?;
        let mut tables = self.tables.clone();
        tables.extend(other.tables.iter().cloned());
        let mut joins = self.joins.clone();
        joins.extend(other.joins.iter().cloned());
        let mut projections = self.projections.clone();
        for column in &other.projections {
            if !projections.contains(column) {
                projections.push(column.clone());
            }
        }
        let merged = RelationalFragment {
            tables,
            joins,
            condition: SqlExpression::and(vec![
                self.condition.clone(),
                other.condition.clone(),
            ]),
            projections,
            aliases,
            unique: self.unique && other.unique,
            order_by: self.order_by.clone().or_else(|| other.order_by.clone()),
            limit: match (self.limit, other.limit) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        };
        merged.validate()?;
        Ok(merged)
    }

    /// Applies a renaming to every table reference: source tables, joins,
    /// condition, projections and ordering. Pure; the original fragment is
    /// untouched.
    pub fn rename(&self, renames: &AliasMap) -> Result<Self, SqlError> {
        let mut aliases = AliasMap::new();
        for table in &self.tables {
            let renamed = renames.apply_table(table);
            let original = self.aliases.original_of(table).unwrap_or(table);
            if renamed != *original {
                aliases = aliases.with_alias(original.clone(), renamed)?;
            }
        }
        let fragment = RelationalFragment {
            tables: self.tables.iter().map(|t| renames.apply_table(t)).collect(),
            joins: self.joins.iter().map(|j| j.rename(renames)).collect(),
            condition: self.condition.rename(renames),
            projections: self
                .projections
                .iter()
                .map(|c| renames.apply_column(c))
                .collect(),
            aliases,
            unique: self.unique,
            order_by: self.order_by.as_ref().map(|o| OrderSpec {
                column: renames.apply_column(&o.column),
                direction: o.direction,
            }),
            limit: self.limit,
        };
        fragment.validate()?;
        Ok(fragment)
    }

    /// An alias map renaming every table of this fragment under `prefix`.
    pub fn prefix_renames(&self, prefix: &str) -> AliasMap {
        AliasMap::prefixing(prefix, self.tables.iter().map(String::as_str))
    }

    fn referenced_columns(&self) -> BTreeSet<ColumnRef> {
        let mut columns = self.condition.referenced_columns();
        for join in &self.joins {
            columns.insert(join.left.clone());
            columns.insert(join.right.clone());
        }
        columns.extend(self.projections.iter().cloned());
        if let Some(order) = &self.order_by {
            columns.insert(order.column.clone());
        }
        columns
    }

    /// Every referenced column must resolve to a source table. Checked
    /// whenever a fragment is built, merged or renamed rather than deferred
    /// to SQL execution.
    fn validate(&self) -> Result<(), SqlError> {
        for column in self.referenced_columns() {
            if !self.tables.contains(&column.table) {
                return Err(SqlError::UnresolvedColumn {
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`RelationalFragment`].
#[derive(Debug, Default)]
pub struct FragmentBuilder {
    tables: BTreeSet<String>,
    joins: BTreeSet<Join>,
    conditions: Vec<SqlExpression>,
    projections: Vec<ColumnRef>,
    aliases: AliasMap,
    unique: bool,
    order_by: Option<OrderSpec>,
    limit: Option<u64>,
}

impl FragmentBuilder {
    pub fn new() -> Self {
        FragmentBuilder {
            unique: true,
            ..FragmentBuilder::default()
        }
    }

    pub fn table<S: Into<String>>(mut self, table: S) -> Self {
        self.tables.insert(table.into());
        self
    }

    /// Declares `original` under a query-local alias and adds the alias as
    /// a source table.
    pub fn aliased_table<O: Into<String>, A: Into<String>>(mut self, original: O, alias: A) -> Self {
        let alias = alias.into();
        self.tables.insert(alias.clone());
        // Conflicts surface in build().
        self.aliases = self
            .aliases
            .clone()
            .with_alias(original, alias)
            .unwrap_or(self.aliases);
        self
    }

    pub fn join(mut self, left: ColumnRef, right: ColumnRef) -> Self {
        self.joins.insert(Join::new(left, right));
        self
    }

    pub fn condition(mut self, condition: SqlExpression) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn projection(mut self, column: ColumnRef) -> Self {
        if !self.projections.contains(&column) {
            self.projections.push(column);
        }
        self
    }

    pub fn projections<I: IntoIterator<Item = ColumnRef>>(mut self, columns: I) -> Self {
        for column in columns {
            if !self.projections.contains(&column) {
                self.projections.push(column);
            }
        }
        self
    }

    /// Whether the selected row set is guaranteed duplicate-free.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn order_by(mut self, column: ColumnRef, direction: OrderDirection) -> Self {
        self.order_by = Some(OrderSpec { column, direction });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> Result<RelationalFragment, SqlError> {
        let fragment = RelationalFragment {
            tables: self.tables,
            joins: self.joins,
            condition: SqlExpression::and(self.conditions),
            projections: self.projections,
            aliases: self.aliases,
            unique: self.unique,
            order_by: self.order_by,
            limit: self.limit,
        };
        fragment.validate()?;
        Ok(fragment)
    }
}
