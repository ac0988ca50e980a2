//! Triple patterns: templates over terms with variables and wildcards

use crate::term::Term;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One position of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TermPattern {
    Const(Term),
    Var(String),
    Any,
}

impl TermPattern {
    pub fn as_var(&self) -> Option<&str> {
        match self {
            TermPattern::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&Term> {
        match self {
            TermPattern::Const(term) => Some(term),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, TermPattern::Const(_))
    }
}

/// Shorthand for a variable pattern position.
pub fn var<S: Into<String>>(name: S) -> TermPattern {
    TermPattern::Var(name.into())
}

/// Shorthand for a constant pattern position.
pub fn term(t: Term) -> TermPattern {
    TermPattern::Const(t)
}

/// The three positions of a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriplePosition {
    Subject,
    Predicate,
    Object,
}

impl TriplePosition {
    pub const ALL: [TriplePosition; 3] = [
        TriplePosition::Subject,
        TriplePosition::Predicate,
        TriplePosition::Object,
    ];
}

/// A (subject, predicate, object) template with constants, variables and
/// wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
}

impl TriplePattern {
    pub fn new(subject: TermPattern, predicate: TermPattern, object: TermPattern) -> Self {
        TriplePattern {
            subject,
            predicate,
            object,
        }
    }

    pub fn position(&self, position: TriplePosition) -> &TermPattern {
        match position {
            TriplePosition::Subject => &self.subject,
            TriplePosition::Predicate => &self.predicate,
            TriplePosition::Object => &self.object,
        }
    }

    /// Variable names in subject, predicate, object order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        TriplePosition::ALL
            .into_iter()
            .filter_map(|position| self.position(position).as_var())
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |p: &TermPattern| match p {
            TermPattern::Const(t) => t.to_string(),
            TermPattern::Var(name) => format!("?{}", name),
            TermPattern::Any => "_".to_string(),
        };
        write!(
            f,
            "{} {} {}",
            show(&self.subject),
            show(&self.predicate),
            show(&self.object)
        )
    }
}
