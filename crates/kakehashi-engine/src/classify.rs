//! Binding role classification
//!
//! Before a stage compiles its patterns, every pattern position is
//! classified once: constants stay fixed, variables already carrying a
//! value from upstream become bound, first occurrences of new variables
//! bind, and wildcards constrain nothing. Classification is stable for
//! the stage's lifetime; it never changes per row.

use kakehashi_core::{SlotMap, Term, TermPattern, TriplePattern, TriplePosition};

/// How one pattern position participates in the compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// A constant term; narrowed into the WHERE clause at compile time.
    Fixed(Term),
    /// A variable whose value is already in the binding row when the
    /// stage runs. Slots below the upstream slot count are narrowed per
    /// row; slots at or above it are same-stage repeats handled by
    /// equality pushdown.
    Bound(usize),
    /// The first occurrence of a variable this stage introduces; the
    /// stage produces its value.
    Bind(usize),
    /// A wildcard; matches anything and produces nothing.
    Wild,
}

/// The three roles of one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRoles {
    pub subject: Role,
    pub predicate: Role,
    pub object: Role,
}

impl PatternRoles {
    pub fn role(&self, position: TriplePosition) -> &Role {
        match position {
            TriplePosition::Subject => &self.subject,
            TriplePosition::Predicate => &self.predicate,
            TriplePosition::Object => &self.object,
        }
    }
}

/// The classified shape of one stage: per-pattern roles plus the slot
/// map extended with this stage's new variables.
#[derive(Debug, Clone)]
pub struct StagePlan {
    pub roles: Vec<PatternRoles>,
    pub slots: SlotMap,
    pub upstream_slot_count: usize,
}

impl StagePlan {
    pub fn classify(patterns: &[TriplePattern], upstream: &SlotMap) -> StagePlan {
        let upstream_slot_count = upstream.len();
        let mut slots = upstream.clone();
        let mut seen_this_stage = Vec::new();
        let mut roles = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let mut classify_position = |position: TriplePosition| match pattern.position(position)
            {
                TermPattern::Const(term) => Role::Fixed(term.clone()),
                TermPattern::Any => Role::Wild,
                TermPattern::Var(name) => {
                    let known = slots.slot_of(name);
                    let slot = slots.allocate(name.clone());
                    match known {
                        Some(slot) => Role::Bound(slot),
                        None if seen_this_stage.contains(name) => Role::Bound(slot),
                        None => {
                            seen_this_stage.push(name.clone());
                            Role::Bind(slot)
                        }
                    }
                }
            };
            roles.push(PatternRoles {
                subject: classify_position(TriplePosition::Subject),
                predicate: classify_position(TriplePosition::Predicate),
                object: classify_position(TriplePosition::Object),
            });
        }
        StagePlan {
            roles,
            slots,
            upstream_slot_count,
        }
    }

    /// Whether `slot` carries a value from upstream rows.
    pub fn is_upstream_slot(&self, slot: usize) -> bool {
        slot < self.upstream_slot_count
    }
}
