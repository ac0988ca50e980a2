//! # Kakehashi Engine
//!
//! Compiles conjunctions of triple patterns against a bridge registry
//! into SQL, runs them through pluggable database connections, and
//! streams reconstructed variable bindings through a pipeline of
//! concurrent stages.

pub mod classify;
pub mod combine;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod pipeline;
pub mod reconstruct;
pub mod stage;

pub use classify::{PatternRoles, Role, StagePlan};
pub use combine::{CompiledConjunction, CompiledStage};
pub use error::EngineError;
pub use filter::{FilterValue, ValueFilter};
pub use metrics::{CountingMetrics, NoopMetrics, StageMetrics};
pub use pipeline::{PipelineBuilder, QueryResults};
pub use reconstruct::BindingMaker;
pub use stage::{source_channel, BindingReceiver, BindingResult, TripleStage};
