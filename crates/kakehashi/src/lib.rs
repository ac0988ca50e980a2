//! # Kakehashi - Virtual RDF Views over Relational Databases
//!
//! Kakehashi compiles conjunctive triple patterns into SQL through
//! declarative table-to-RDF mappings and streams the matching variable
//! bindings back, without ever materializing the graph.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kakehashi::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut mapping = Mapping::new();
//!     mapping.add_class_map(
//!         ClassMap::builder("Employee")
//!             .table("employees")
//!             .uri_template("http://example.org/emp/@@employees.id@@")
//!             .build()?,
//!     );
//!     mapping.add_bridge(
//!         PropertyBridge::builder("Employee", "http://example.org/p/name")
//!             .table("employees")
//!             .object_column(ColumnRef::parse("employees.name")?)
//!             .build(&TranslatorRegistry::new())?,
//!     );
//!     let registry = BridgeRegistry::from_mapping(&mapping)?;
//!
//!     let database = Arc::new(SqliteAdapter::connect("sqlite:company.db").await?);
//!     let mut results = PipelineBuilder::new()
//!         .stage(vec![TriplePattern::new(
//!             var("e"),
//!             term(Term::iri("http://example.org/p/name")),
//!             var("n"),
//!         )])
//!         .run(database, &registry)?;
//!     while let Some(binding) = results.next().await {
//!         println!("{:?}", binding?.to_map(results.slots()));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Kakehashi consists of several specialized crates:
//!
//! - **`kakehashi-core`**: RDF terms, triple patterns and binding rows
//! - **`kakehashi-sql`**: relational fragments, dialects and SELECT rendering
//! - **`kakehashi-mapping`**: templates, term makers, class maps and bridges
//! - **`kakehashi-db`**: connection traits, the SQLite adapter, test fixtures
//! - **`kakehashi-engine`**: pattern compilation and the streaming pipeline
//!
//! ## Feature Flags
//!
//! - `full` (default): all crates included
//! - `core` / `sql` / `mapping` / `db` / `engine`: individual layers
//! - `sqlite` (default): the sqlx-backed SQLite adapter

// Re-export all public APIs from sub-crates (feature-gated)

#[cfg(feature = "kakehashi-core")]
pub use kakehashi_core as core;

#[cfg(feature = "kakehashi-sql")]
pub use kakehashi_sql as sql;

#[cfg(feature = "kakehashi-mapping")]
pub use kakehashi_mapping as mapping;

#[cfg(feature = "kakehashi-db")]
pub use kakehashi_db as db;

#[cfg(feature = "kakehashi-engine")]
pub use kakehashi_engine as engine;

// Convenience re-exports for common types (feature-gated)
#[cfg(feature = "kakehashi-core")]
pub use kakehashi_core::{term, var, Term, TermPattern, TriplePattern, TriplePosition};

#[cfg(feature = "kakehashi-sql")]
pub use kakehashi_sql::{ColumnRef, SqlDialect};

#[cfg(feature = "kakehashi-mapping")]
pub use kakehashi_mapping::{
    BridgeRegistry, ClassMap, Mapping, PropertyBridge, TranslatorRegistry,
};

#[cfg(feature = "kakehashi-db")]
pub use kakehashi_db::SqlDatabase;

#[cfg(all(feature = "kakehashi-db", feature = "sqlite"))]
pub use kakehashi_db::SqliteAdapter;

#[cfg(feature = "kakehashi-engine")]
pub use kakehashi_engine::{EngineError, PipelineBuilder, QueryResults, TripleStage};

// Commonly used external dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tokio;

/// Prelude module for convenient imports
///
/// ```rust
/// use kakehashi::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "kakehashi-core")]
    pub use kakehashi_core::{term, var, BindingRow, SlotMap, Term, TermPattern, TriplePattern};

    #[cfg(feature = "kakehashi-sql")]
    pub use kakehashi_sql::{ColumnRef, Sql92Dialect, SqlDialect, SqlExpression};

    #[cfg(feature = "kakehashi-mapping")]
    pub use kakehashi_mapping::{
        BridgeRegistry, ClassMap, Mapping, PropertyBridge, TranslatorRegistry, ValueConstraint,
    };

    #[cfg(feature = "kakehashi-db")]
    pub use kakehashi_db::{RowCursor, SqlDatabase};

    #[cfg(all(feature = "kakehashi-db", feature = "sqlite"))]
    pub use kakehashi_db::SqliteAdapter;

    #[cfg(feature = "kakehashi-engine")]
    pub use kakehashi_engine::{
        EngineError, FilterValue, PipelineBuilder, QueryResults, ValueFilter,
    };

    // Common external types
    pub use anyhow::Result;
    pub use serde::{Deserialize, Serialize};
    pub use tokio;
}

/// Current version of Kakehashi
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
