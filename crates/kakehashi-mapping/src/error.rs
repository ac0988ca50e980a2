//! Mapping-layer errors

use kakehashi_sql::SqlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("malformed value template `{template}`: {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("invalid constraint pattern `{pattern}`: {reason}")]
    InvalidConstraint { pattern: String, reason: String },

    #[error("contradictory options on {context}: {detail}")]
    ContradictoryOptions { context: String, detail: String },

    #[error("missing required option on {context}: {detail}")]
    MissingOption { context: String, detail: String },

    #[error("property bridge `{bridge}` references unknown class map `{class_map}`")]
    UnknownClassMap { bridge: String, class_map: String },

    #[error("unknown translator `{0}`")]
    UnknownTranslator(String),

    #[error("translator `{0}` is already registered")]
    DuplicateTranslator(String),

    #[error("translation table maps `{0}` more than once")]
    DuplicateTranslation(String),

    #[error(transparent)]
    Sql(#[from] SqlError),
}
