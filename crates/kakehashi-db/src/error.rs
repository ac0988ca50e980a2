//! Database-layer errors

use thiserror::Error;

type Source = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to `{url}`")]
    Connect {
        url: String,
        #[source]
        source: Source,
    },

    #[error("query failed")]
    Query {
        #[source]
        source: Source,
    },

    #[error("failed to decode column {index} of a result row")]
    Decode {
        index: usize,
        #[source]
        source: Source,
    },

    #[error("no fixture response matches `{sql}`")]
    UnmatchedFixture { sql: String },

    #[error("injected failure: {0}")]
    Injected(String),
}
