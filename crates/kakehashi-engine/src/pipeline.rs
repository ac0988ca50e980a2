//! Query pipelines
//!
//! A pipeline chains stages: each stage consumes the bindings of the one
//! before it and extends them. The builder collects stage descriptions;
//! `run` compiles them against a registry, wires the channels and starts
//! every task.

use crate::error::EngineError;
use crate::filter::ValueFilter;
use crate::metrics::StageMetrics;
use crate::stage::{source_channel, BindingReceiver, BindingResult, TripleStage};
use kakehashi_core::{SlotMap, TriplePattern};
use kakehashi_db::SqlDatabase;
use kakehashi_mapping::BridgeRegistry;
use std::sync::Arc;

#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<(Vec<TriplePattern>, Vec<ValueFilter>)>,
    metrics: Option<Arc<dyn StageMetrics>>,
    channel_capacity: Option<usize>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        PipelineBuilder::default()
    }

    pub fn stage(self, patterns: Vec<TriplePattern>) -> Self {
        self.stage_with_filters(patterns, Vec::new())
    }

    pub fn stage_with_filters(
        mut self,
        patterns: Vec<TriplePattern>,
        filters: Vec<ValueFilter>,
    ) -> Self {
        self.stages.push((patterns, filters));
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn StageMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    /// Compiles every stage, spawns the tasks and returns the running
    /// query.
    pub fn run(
        self,
        database: Arc<dyn SqlDatabase>,
        registry: &BridgeRegistry,
    ) -> Result<QueryResults, EngineError> {
        let mut slots = SlotMap::new();
        let mut receiver = source_channel();
        for (patterns, filters) in self.stages {
            let mut stage =
                TripleStage::new(database.clone(), registry, &patterns, &slots, &filters)?;
            if let Some(metrics) = &self.metrics {
                stage = stage.with_metrics(metrics.clone());
            }
            if let Some(capacity) = self.channel_capacity {
                stage = stage.with_channel_capacity(capacity);
            }
            slots = stage.slots().clone();
            receiver = stage.spawn(receiver);
        }
        Ok(QueryResults { receiver, slots })
    }
}

/// A running query: a stream of binding rows plus the slot map naming
/// their variables.
pub struct QueryResults {
    receiver: BindingReceiver,
    slots: SlotMap,
}

impl QueryResults {
    pub async fn next(&mut self) -> Option<BindingResult> {
        self.receiver.recv().await
    }

    pub fn slots(&self) -> &SlotMap {
        &self.slots
    }

    /// Drains the stream into memory. Convenience for callers and tests
    /// that do not need streaming.
    pub async fn collect(mut self) -> Result<Vec<kakehashi_core::BindingRow>, EngineError> {
        let mut rows = Vec::new();
        while let Some(item) = self.next().await {
            rows.push(item?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakehashi_core::{term, var, Term};
    use kakehashi_db::{fixture_row, FixtureDatabase};
    use kakehashi_mapping::{ClassMap, Mapping, PropertyBridge, TranslatorRegistry};
    use kakehashi_sql::ColumnRef;

    fn col(qualified: &str) -> ColumnRef {
        ColumnRef::parse(qualified).unwrap()
    }

    fn registry() -> BridgeRegistry {
        let translators = TranslatorRegistry::new();
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
                .build(&translators)
                .unwrap(),
        );
        mapping.add_bridge(
            PropertyBridge::builder("Employee", "http://example.org/p/dept")
                .table("employees")
                .object_column(col("employees.dept"))
                .build(&translators)
                .unwrap(),
        );
        BridgeRegistry::from_mapping(&mapping).unwrap()
    }

    #[tokio::test]
    async fn test_two_stage_pipeline_extends_bindings() {
        let database = Arc::new(
            FixtureDatabase::new()
                .with_rows(
                    "T0_employees\".\"name",
                    vec![fixture_row(&[
                        ("T0_employees.id", Some("1")),
                        ("T0_employees.name", Some("Alice")),
                    ])],
                )
                .with_rows(
                    "T0_employees\".\"dept",
                    vec![fixture_row(&[
                        ("T0_employees.id", Some("1")),
                        ("T0_employees.dept", Some("Sales")),
                    ])],
                ),
        );
        let results = PipelineBuilder::new()
            .stage(vec![TriplePattern::new(
                var("e"),
                term(Term::iri("http://example.org/p/name")),
                var("n"),
            )])
            .stage(vec![TriplePattern::new(
                var("e"),
                term(Term::iri("http://example.org/p/dept")),
                var("d"),
            )])
            .run(database.clone(), &registry())
            .unwrap();
        let slots = results.slots().clone();
        let rows = results.collect().await.unwrap();
        assert_eq!(rows.len(), 1);
        let by_name = rows[0].to_map(&slots);
        assert_eq!(by_name["e"], Term::iri("http://example.org/emp/1"));
        assert_eq!(by_name["n"], Term::literal("Alice"));
        assert_eq!(by_name["d"], Term::literal("Sales"));
        // The second stage's SQL narrows on the bound employee id.
        let issued = database.issued_sql();
        assert!(issued
            .iter()
            .any(|sql| sql.contains("\"T0_employees\".\"id\" = '1'")));
    }

    #[tokio::test]
    async fn test_dropping_results_cancels_the_pipeline() {
        let rows: Vec<_> = (0..1000)
            .map(|i| {
                fixture_row(&[
                    ("T0_employees.id", Some(&i.to_string())),
                    ("T0_employees.name", Some("x")),
                ])
            })
            .collect();
        let database = Arc::new(FixtureDatabase::new().with_rows("T0_employees", rows));
        let mut results = PipelineBuilder::new()
            .channel_capacity(1)
            .stage(vec![TriplePattern::new(
                var("e"),
                term(Term::iri("http://example.org/p/name")),
                var("n"),
            )])
            .run(database.clone(), &registry())
            .unwrap();
        // Take one row, then walk away.
        assert!(results.next().await.unwrap().is_ok());
        drop(results);

        // The stage task notices the closed channel and drops its cursor.
        for _ in 0..50 {
            if database.open_cursors() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(database.open_cursors(), 0);
    }
}
