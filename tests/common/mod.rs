#![allow(dead_code)]

use std::sync::Arc;
use relcache::analysis::analyzer::Analyzer;
use relcache::cache::controller::Evaluator;
use relcache::cache::partition::Partition;
use relcache::core::config::{ExperimentConfig, RelationConfig};
use relcache::core::error::Result;
use relcache::eval::scorer::EvaluationSummary;
use relcache::relation::store::{MemoryStore, MemoryTuple, RelationStore};

/// Replays a fixed accuracy per iteration, 0 once the script runs out.
pub struct ScriptedEvaluator {
    pub accuracies: Vec<f64>,
    pub calls: usize,
}

impl ScriptedEvaluator {
    pub fn new(accuracies: &[f64]) -> Self {
        ScriptedEvaluator {
            accuracies: accuracies.to_vec(),
            calls: 0,
        }
    }
}

impl Evaluator for ScriptedEvaluator {
    fn evaluate(&mut self, _partitions: &[Partition]) -> Result<EvaluationSummary> {
        let accuracy = self.accuracies.get(self.calls).copied().unwrap_or(0.0);
        self.calls += 1;
        Ok(EvaluationSummary::with_accuracy(accuracy))
    }
}

/// Checks, every time it is consulted, that each partition's index and
/// cache table agree.
pub struct ConsistencyProbe<'s> {
    pub store: &'s dyn RelationStore,
    pub inner: ScriptedEvaluator,
    pub checks: Vec<bool>,
}

impl<'s> Evaluator for ConsistencyProbe<'s> {
    fn evaluate(&mut self, partitions: &[Partition]) -> Result<EvaluationSummary> {
        for partition in partitions {
            self.checks.push(partition.is_consistent(self.store)?);
        }
        self.inner.evaluate(partitions)
    }
}

/// Relation whose tuple `i` (1-based, offset by `first_id`) has popularity
/// `popularities[i]` and text `<name> tuple <id>`.
pub fn relation(store: &mut MemoryStore, name: &str, first_id: i64, popularities: &[f64]) {
    let tuples = popularities
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let id = first_id + i as i64;
            MemoryTuple::new(id, p).with("text", &format!("{} tuple {}", name, id))
        })
        .collect();
    store.add_relation(name, tuples);
}

pub fn relation_config(name: &str, page_size: usize) -> RelationConfig {
    let mut config = RelationConfig::new(name, &["text"]);
    config.page_size = Some(page_size);
    config
}

pub fn config(relations: Vec<RelationConfig>) -> ExperimentConfig {
    ExperimentConfig {
        relations,
        ..ExperimentConfig::default()
    }
}

pub fn analyzer() -> Arc<Analyzer> {
    Arc::new(Analyzer::standard_english())
}
