use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlError {
    #[error("column {column} does not resolve to any table in the fragment")]
    UnresolvedColumn { column: String },

    #[error("alias {0} is already in use for a different table")]
    DuplicateAlias(String),

    #[error("alias {0} shadows an original table name")]
    AliasCycle(String),

    #[error("malformed column reference: {0}")]
    MalformedColumnRef(String),

    #[error("cannot render SQL for a fragment without tables")]
    EmptyFragment,
}
