//! Pipeline stages
//!
//! Each stage owns a compiled conjunction set and a tokio task. Rows
//! arrive on a bounded channel, each one triggers at most one SELECT per
//! conjunction, and reconstructed bindings flow out on another bounded
//! channel. When a downstream receiver goes away the send fails, the
//! stage stops pulling from upstream and drops its open cursor, and the
//! shutdown chains backwards through the pipeline.

use crate::combine::CompiledStage;
use crate::error::EngineError;
use crate::filter::ValueFilter;
use crate::metrics::{NoopMetrics, StageMetrics};
use crate::reconstruct::BindingMaker;
use kakehashi_core::{BindingRow, SlotMap, TriplePattern};
use kakehashi_db::SqlDatabase;
use kakehashi_mapping::BridgeRegistry;
use kakehashi_sql::{ResultRow, SelectBuilder};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Channel item: a binding, or a terminal error that ends the stream.
pub type BindingResult = Result<BindingRow, EngineError>;
pub type BindingReceiver = mpsc::Receiver<BindingResult>;

/// The single-empty-row upstream that feeds the first stage of a
/// pipeline.
pub fn source_channel() -> BindingReceiver {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let _ = tx.send(Ok(BindingRow::empty())).await;
    });
    rx
}

pub struct TripleStage {
    database: Arc<dyn SqlDatabase>,
    compiled: CompiledStage,
    metrics: Arc<dyn StageMetrics>,
    channel_capacity: usize,
}

impl TripleStage {
    pub fn new(
        database: Arc<dyn SqlDatabase>,
        registry: &BridgeRegistry,
        patterns: &[TriplePattern],
        upstream_slots: &SlotMap,
        filters: &[ValueFilter],
    ) -> Result<Self, EngineError> {
        let compiled = CompiledStage::compile(registry, patterns, upstream_slots, filters)?;
        Ok(TripleStage {
            database,
            compiled,
            metrics: Arc::new(NoopMetrics),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn StageMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// The slot map downstream of this stage: upstream slots plus the
    /// variables this stage binds.
    pub fn slots(&self) -> &SlotMap {
        self.compiled.slots()
    }

    pub fn is_statically_impossible(&self) -> bool {
        self.compiled.is_statically_impossible()
    }

    /// Starts the stage task. The returned receiver yields bindings until
    /// the stream ends or a terminal error is delivered.
    pub fn spawn(self, mut upstream: BindingReceiver) -> BindingReceiver {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        tokio::spawn(async move {
            if self.compiled.is_statically_impossible() {
                info!("stage is statically impossible; emitting nothing");
                return;
            }
            'rows: while let Some(item) = upstream.recv().await {
                let row = match item {
                    Ok(row) => row,
                    Err(e) => {
                        // Pass the terminal error along and stop.
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                };
                for conjunction in self.compiled.conjunctions() {
                    let fragment = match conjunction.narrow(&row) {
                        Ok(Some(fragment)) => fragment,
                        Ok(None) => continue,
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            break 'rows;
                        }
                    };
                    if fragment.condition().is_false() {
                        continue;
                    }
                    let binder = BindingMaker::new(conjunction, self.compiled.slots());

                    if fragment.is_trivial() {
                        // No tables: exactly one empty row.
                        if let Some(binding) = binder.make_binding(&row, &ResultRow::empty()) {
                            self.metrics.binding_emitted();
                            if tx.send(Ok(binding)).await.is_err() {
                                break 'rows;
                            }
                        } else {
                            self.metrics.row_skipped();
                        }
                        continue;
                    }

                    let statement =
                        match SelectBuilder::new(self.database.dialect()).build(&fragment) {
                            Ok(statement) => statement,
                            Err(e) => {
                                let _ = tx.send(Err(EngineError::Sql(e))).await;
                                break 'rows;
                            }
                        };
                    debug!(sql = %statement.sql, "issuing select");
                    self.metrics.query_issued();
                    let mut cursor = match self.database.execute_select(&statement).await {
                        Ok(cursor) => cursor,
                        Err(source) => {
                            let _ = tx
                                .send(Err(EngineError::Database {
                                    sql: statement.sql,
                                    source,
                                }))
                                .await;
                            break 'rows;
                        }
                    };
                    loop {
                        match cursor.next_row().await {
                            Ok(Some(db_row)) => {
                                self.metrics.row_fetched();
                                match binder.make_binding(&row, &db_row) {
                                    Some(binding) => {
                                        self.metrics.binding_emitted();
                                        if tx.send(Ok(binding)).await.is_err() {
                                            // Downstream is gone; the cursor
                                            // drops with this scope.
                                            break 'rows;
                                        }
                                    }
                                    None => self.metrics.row_skipped(),
                                }
                            }
                            Ok(None) => break,
                            Err(source) => {
                                let _ = tx
                                    .send(Err(EngineError::Database {
                                        sql: statement.sql,
                                        source,
                                    }))
                                    .await;
                                break 'rows;
                            }
                        }
                    }
                    // Cursor is dropped here, before the next conjunction
                    // opens its own.
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::CountingMetrics;
    use kakehashi_core::{term, var, Term};
    use kakehashi_db::{fixture_row, FixtureDatabase};
    use kakehashi_mapping::{ClassMap, Mapping, PropertyBridge, TranslatorRegistry};
    use kakehashi_sql::ColumnRef;

    fn col(qualified: &str) -> ColumnRef {
        ColumnRef::parse(qualified).unwrap()
    }

    fn registry() -> BridgeRegistry {
        let mut mapping = Mapping::new();
        mapping.add_class_map(
            ClassMap::builder("Employee")
                .table("employees")
                .uri_template("http://example.org/emp/@@employees.id@@")
                .build()
                .unwrap(),
        );
        mapping.add_bridge(
            PropertyBridge::builder("Employee", "http://example.org/p/name")
                .table("employees")
                .object_column(col("employees.name"))
                .build(&TranslatorRegistry::new())
                .unwrap(),
        );
        BridgeRegistry::from_mapping(&mapping).unwrap()
    }

    fn name_pattern() -> TriplePattern {
        TriplePattern::new(
            var("e"),
            term(Term::iri("http://example.org/p/name")),
            var("n"),
        )
    }

    #[tokio::test]
    async fn test_stage_emits_bindings() {
        let database = Arc::new(FixtureDatabase::new().with_rows(
            "T0_employees",
            vec![
                fixture_row(&[
                    ("T0_employees.id", Some("1")),
                    ("T0_employees.name", Some("Alice")),
                ]),
                fixture_row(&[
                    ("T0_employees.id", Some("2")),
                    ("T0_employees.name", Some("Bob")),
                ]),
            ],
        ));
        let metrics = Arc::new(CountingMetrics::new());
        let stage = TripleStage::new(
            database,
            &registry(),
            &[name_pattern()],
            &SlotMap::new(),
            &[],
        )
        .unwrap()
        .with_metrics(metrics.clone());
        let slots = stage.slots().clone();
        let mut results = stage.spawn(source_channel());

        let first = results.recv().await.unwrap().unwrap().to_map(&slots);
        assert_eq!(first["e"], Term::iri("http://example.org/emp/1"));
        assert_eq!(first["n"], Term::literal("Alice"));
        let second = results.recv().await.unwrap().unwrap().to_map(&slots);
        assert_eq!(second["n"], Term::literal("Bob"));
        assert!(results.recv().await.is_none());

        assert_eq!(metrics.queries_issued(), 1);
        assert_eq!(metrics.rows_fetched(), 2);
        assert_eq!(metrics.bindings_emitted(), 2);
    }

    #[tokio::test]
    async fn test_null_rows_are_skipped_not_errors() {
        let database = Arc::new(FixtureDatabase::new().with_rows(
            "T0_employees",
            vec![
                fixture_row(&[("T0_employees.id", Some("1")), ("T0_employees.name", None)]),
                fixture_row(&[
                    ("T0_employees.id", Some("2")),
                    ("T0_employees.name", Some("Bob")),
                ]),
            ],
        ));
        let metrics = Arc::new(CountingMetrics::new());
        let stage = TripleStage::new(
            database,
            &registry(),
            &[name_pattern()],
            &SlotMap::new(),
            &[],
        )
        .unwrap()
        .with_metrics(metrics.clone());
        let slots = stage.slots().clone();
        let mut results = stage.spawn(source_channel());

        let only = results.recv().await.unwrap().unwrap().to_map(&slots);
        assert_eq!(only["n"], Term::literal("Bob"));
        assert!(results.recv().await.is_none());
        assert_eq!(metrics.rows_skipped(), 1);
    }

    #[tokio::test]
    async fn test_statically_impossible_stage_issues_no_sql() {
        let database = Arc::new(FixtureDatabase::new());
        let pattern = TriplePattern::new(
            var("e"),
            term(Term::iri("http://example.org/p/unmapped")),
            var("n"),
        );
        let stage = TripleStage::new(
            database.clone(),
            &registry(),
            &[pattern],
            &SlotMap::new(),
            &[],
        )
        .unwrap();
        assert!(stage.is_statically_impossible());
        let mut results = stage.spawn(source_channel());
        assert!(results.recv().await.is_none());
        assert!(database.issued_sql().is_empty());
    }

    #[tokio::test]
    async fn test_database_error_is_terminal_with_sql_attached() {
        let database =
            Arc::new(FixtureDatabase::new().with_failure("T0_employees", "disk on fire"));
        let stage = TripleStage::new(
            database,
            &registry(),
            &[name_pattern()],
            &SlotMap::new(),
            &[],
        )
        .unwrap();
        let mut results = stage.spawn(source_channel());
        match results.recv().await.unwrap() {
            Err(EngineError::Database { sql, .. }) => {
                assert!(sql.contains("T0_employees"));
            }
            other => panic!("expected database error, got {:?}", other.map(|_| ())),
        }
        assert!(results.recv().await.is_none());
    }
}
