//! Stage compilation
//!
//! Turns a conjunction of triple patterns into executable SQL shapes.
//! Every combination of candidate bridges (one per pattern) becomes one
//! candidate conjunction; combinations whose fragments cannot merge or
//! whose shared variables can never unify are dropped during compilation
//! and cost nothing at query time.

use crate::classify::{Role, StagePlan};
use crate::error::EngineError;
use crate::filter::ValueFilter;
use itertools::Itertools;
use kakehashi_core::{BindingRow, SlotMap, TriplePattern, TriplePosition};
use kakehashi_mapping::{BridgeRegistry, TermMaker, TripleRelation};
use kakehashi_sql::{AliasMap, RelationalFragment, SqlExpression};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One executable alternative: a merged fragment, the makers that bind
/// this stage's new slots, the makers guarding wildcard positions,
/// per-row narrowing for upstream slots, and the filters SQL could not
/// absorb.
#[derive(Debug, Clone)]
pub struct CompiledConjunction {
    fragment: RelationalFragment,
    binders: Vec<(usize, TermMaker)>,
    guards: Vec<TermMaker>,
    bound_makers: Vec<(usize, TermMaker)>,
    residual: Vec<ValueFilter>,
}

impl CompiledConjunction {
    pub fn fragment(&self) -> &RelationalFragment {
        &self.fragment
    }

    pub fn binders(&self) -> &[(usize, TermMaker)] {
        &self.binders
    }

    /// Makers for wildcard positions. They bind no slot but must still
    /// produce a term for the row to count as a triple.
    pub fn guards(&self) -> &[TermMaker] {
        &self.guards
    }

    pub fn residual(&self) -> &[ValueFilter] {
        &self.residual
    }

    /// The fragment narrowed to one upstream row: every upstream-bound
    /// slot's term is decomposed into column equalities. `None` when a
    /// bound term cannot come from this conjunction at all.
    pub fn narrow(&self, row: &BindingRow) -> Result<Option<RelationalFragment>, EngineError> {
        let mut conditions = Vec::new();
        for (slot, maker) in &self.bound_makers {
            let Some(term) = row.get(*slot) else {
                return Ok(None);
            };
            let Some(pairs) = maker.column_values_for(term) else {
                return Ok(None);
            };
            for (column, value) in pairs {
                conditions.push(SqlExpression::column_equals_value(column, value));
            }
        }
        if conditions.is_empty() {
            return Ok(Some(self.fragment.clone()));
        }
        Ok(Some(
            self.fragment
                .with_condition(SqlExpression::and(conditions))?,
        ))
    }
}

/// A fully compiled stage. An empty conjunction list means the stage is
/// statically impossible and never touches the database.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    plan: StagePlan,
    conjunctions: Vec<CompiledConjunction>,
}

impl CompiledStage {
    pub fn compile(
        registry: &BridgeRegistry,
        patterns: &[TriplePattern],
        upstream: &SlotMap,
        filters: &[ValueFilter],
    ) -> Result<Self, EngineError> {
        let plan = StagePlan::classify(patterns, upstream);
        if patterns.is_empty() {
            // Pure filter stage: pass upstream rows through the residual
            // guard.
            return Ok(CompiledStage {
                plan,
                conjunctions: vec![CompiledConjunction {
                    fragment: RelationalFragment::unit(),
                    binders: Vec::new(),
                    guards: Vec::new(),
                    bound_makers: Vec::new(),
                    residual: filters.to_vec(),
                }],
            });
        }

        let mut candidates_per_pattern = Vec::with_capacity(patterns.len());
        for (index, pattern) in patterns.iter().enumerate() {
            let candidates = registry.candidates_for(pattern);
            if candidates.is_empty() {
                debug!(pattern = %pattern, "no candidate bridges; stage is statically impossible");
                return Ok(CompiledStage {
                    plan,
                    conjunctions: Vec::new(),
                });
            }
            let mut prefixed = Vec::with_capacity(candidates.len());
            for relation in candidates {
                prefixed.push(relation.with_pattern_index(index)?);
            }
            candidates_per_pattern.push(prefixed);
        }

        let mut conjunctions = Vec::new();
        for combination in candidates_per_pattern
            .iter()
            .map(|candidates| candidates.iter())
            .multi_cartesian_product()
        {
            if let Some(conjunction) = compile_conjunction(&plan, &combination, filters)? {
                conjunctions.push(conjunction);
            }
        }
        debug!(
            patterns = patterns.len(),
            conjunctions = conjunctions.len(),
            "stage compiled"
        );
        Ok(CompiledStage { plan, conjunctions })
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    pub fn slots(&self) -> &SlotMap {
        &self.plan.slots
    }

    pub fn conjunctions(&self) -> &[CompiledConjunction] {
        &self.conjunctions
    }

    pub fn is_statically_impossible(&self) -> bool {
        self.conjunctions.is_empty()
    }
}

fn compile_conjunction(
    plan: &StagePlan,
    relations: &[&TripleRelation],
    filters: &[ValueFilter],
) -> Result<Option<CompiledConjunction>, EngineError> {
    let relations = unify_aliases(plan, relations)?;
    let mut fragment = relations[0].base().clone();
    for relation in &relations[1..] {
        match fragment.merge(relation.base()) {
            Ok(merged) => fragment = merged,
            Err(e) => {
                debug!(error = %e, "dropping conjunction: fragments do not merge");
                return Ok(None);
            }
        }
    }

    let mut conditions = Vec::new();
    let mut binders: BTreeMap<usize, TermMaker> = BTreeMap::new();
    let mut guards = Vec::new();
    let mut bound_makers = Vec::new();

    for (pattern_index, relation) in relations.iter().enumerate() {
        let roles = &plan.roles[pattern_index];
        for position in TriplePosition::ALL {
            let maker = relation.maker(position);
            match roles.role(position) {
                // A wildcard matches any term, but the position must
                // still yield one; a NULL there means no triple.
                Role::Wild => guards.push(maker.clone()),
                Role::Fixed(term) => match maker.column_values_for(term) {
                    Some(pairs) => conditions.extend(
                        pairs
                            .into_iter()
                            .map(|(column, value)| {
                                SqlExpression::column_equals_value(column, value)
                            }),
                    ),
                    None => {
                        debug!("dropping conjunction: fixed term does not decompose");
                        return Ok(None);
                    }
                },
                Role::Bind(slot) => {
                    binders.insert(*slot, maker.clone());
                }
                Role::Bound(slot) if plan.is_upstream_slot(*slot) => {
                    bound_makers.push((*slot, maker.clone()));
                }
                Role::Bound(slot) => {
                    // Same-stage repeat of a variable: both makers must
                    // produce the same term, enforced inside the SQL.
                    let Some(first) = binders.get(slot) else {
                        return Ok(None);
                    };
                    if !first.unifiable_with(maker) {
                        debug!("dropping conjunction: shared variable makers never unify");
                        return Ok(None);
                    }
                    match join_condition(first, maker) {
                        Some(condition) => conditions.push(condition),
                        None => {
                            warn!(
                                "dropping conjunction: shared variable cannot be compared in SQL"
                            );
                            return Ok(None);
                        }
                    }
                }
            }
        }
    }

    let mut residual = Vec::new();
    let resolver = |name: &str| -> Option<SqlExpression> {
        let slot = plan.slots.slot_of(name)?;
        binders.get(&slot)?.sql_value_expression()
    };
    for filter in filters {
        match filter.to_sql(&resolver) {
            Some(expression) => conditions.push(expression),
            None => residual.push(filter.clone()),
        }
    }

    let fragment = fragment.with_condition(SqlExpression::and(conditions))?;
    if fragment.condition().is_false() {
        return Ok(None);
    }
    Ok(Some(CompiledConjunction {
        fragment,
        binders: binders.into_iter().collect(),
        guards,
        bound_makers,
        residual,
    }))
}

/// Collapses self-joins. When a later pattern reaches an entity through
/// the same identity template over the same base table as an earlier
/// pattern, the later relation is renamed onto the earlier one's aliases
/// and both read a single table instance; the shared-variable join then
/// degenerates to TRUE. Only duplicate-free relations qualify; a
/// duplicate-prone side keeps its own alias and the explicit join.
fn unify_aliases(
    plan: &StagePlan,
    relations: &[&TripleRelation],
) -> Result<Vec<TripleRelation>, EngineError> {
    let mut unified: Vec<TripleRelation> = relations.iter().map(|r| (*r).clone()).collect();
    let mut owners: BTreeMap<usize, (usize, TriplePosition)> = BTreeMap::new();
    for index in 0..unified.len() {
        let mut wanted: BTreeMap<String, String> = BTreeMap::new();
        let mut consistent = true;
        for position in TriplePosition::ALL {
            match plan.roles[index].role(position) {
                Role::Bind(slot) => {
                    owners.entry(*slot).or_insert((index, position));
                }
                Role::Bound(slot) if !plan.is_upstream_slot(*slot) => {
                    let Some((owner_index, owner_position)) = owners.get(slot) else {
                        continue;
                    };
                    let owner = &unified[*owner_index];
                    let Some(pairs) = identity_renames(
                        owner.maker(*owner_position),
                        owner.base(),
                        unified[index].maker(position),
                        unified[index].base(),
                    ) else {
                        continue;
                    };
                    for (from, to) in pairs {
                        match wanted.get(&from) {
                            Some(existing) if *existing != to => consistent = false,
                            _ => {
                                wanted.insert(from, to);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        if !consistent || wanted.is_empty() {
            continue;
        }
        let Ok(renames) = wanted
            .into_iter()
            .try_fold(AliasMap::new(), |map, (from, to)| map.with_alias(from, to))
        else {
            // Two shared variables pull distinct tables toward the same
            // alias; keep the explicit join.
            continue;
        };
        let renamed = unified[index].rename(&renames).map_err(EngineError::Sql)?;
        unified[index] = renamed;
    }
    Ok(unified)
}

/// Table renames that would make `second` read the rows `first` already
/// reads, or `None` when the two makers do not share an identity.
fn identity_renames(
    first: &TermMaker,
    first_base: &RelationalFragment,
    second: &TermMaker,
    second_base: &RelationalFragment,
) -> Option<Vec<(String, String)>> {
    if !first_base.is_unique() || !second_base.is_unique() {
        return None;
    }
    let (TermMaker::Template { template: ta, .. }, TermMaker::Template { template: tb, .. }) =
        (first, second)
    else {
        return None;
    };
    if !ta.is_equivalent_to(tb) {
        return None;
    }
    let mut pairs = Vec::new();
    for (to, from) in ta.columns().zip(tb.columns()) {
        let target_original = first_base.aliases().original_of(&to.table)?;
        let source_original = second_base.aliases().original_of(&from.table)?;
        if target_original != source_original {
            return None;
        }
        if from.table != to.table {
            pairs.push((from.table.clone(), to.table.clone()));
        }
    }
    Some(pairs)
}

/// A SQL condition forcing two makers to produce the same value.
/// Equivalent templates join column by column, which also covers
/// codec-bearing templates; anything else needs both sides expressible
/// as SQL values.
fn join_condition(a: &TermMaker, b: &TermMaker) -> Option<SqlExpression> {
    if let (TermMaker::Template { template: ta, .. }, TermMaker::Template { template: tb, .. }) =
        (a, b)
    {
        if ta.is_equivalent_to(tb) {
            return Some(SqlExpression::and(
                ta.columns()
                    .zip(tb.columns())
                    .map(|(left, right)| {
                        SqlExpression::columns_equal(left.clone(), right.clone())
                    })
                    .collect::<Vec<_>>(),
            ));
        }
    }
    Some(SqlExpression::equal(
        a.sql_value_expression()?,
        b.sql_value_expression()?,
    ))
}
