use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn};
use crate::analysis::analyzer::Analyzer;
use crate::cache::fetcher::PageFetcher;
use crate::cache::partition::Partition;
use crate::cache::report::{CacheReport, IterationRecord, RelationReport, Termination};
use crate::cache::selector::{PopularitySelector, Selection};
use crate::core::config::{EffectivenessMetric, ExperimentConfig};
use crate::core::error::{Error, ErrorKind, Result};
use crate::eval::scorer::EvaluationSummary;
use crate::index::writer::PartitionIndex;
use crate::relation::store::RelationStore;

/// Effectiveness oracle consulted once per iteration, after the commit.
pub trait Evaluator {
    fn evaluate(&mut self, partitions: &[Partition]) -> Result<EvaluationSummary>;
}

/// Loop bookkeeping. Replaced field by field only by the controller, once
/// per iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopState {
    pub offsets: Vec<u64>,
    pub best_offsets: Vec<u64>,
    pub best_accuracy: f64,
    pub iteration: usize,
}

impl LoopState {
    pub fn new(partitions: usize) -> Self {
        LoopState {
            offsets: vec![0; partitions],
            best_offsets: vec![0; partitions],
            best_accuracy: 0.0,
            iteration: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub epsilon: f64,
    pub max_iterations: usize,
    pub metric: EffectivenessMetric,
}

impl ControllerSettings {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        ControllerSettings {
            epsilon: config.epsilon,
            max_iterations: config.max_iterations,
            metric: config.metric,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        ControllerSettings::from_config(&ExperimentConfig::default())
    }
}

/// Grows partitions page by page in popularity order until growing the
/// primary relation (index 0) stops paying off, every relation runs dry, or
/// the iteration bound is hit.
///
/// Only a regression caused by growing the primary relation ends the loop;
/// regressions after growing any other relation are recorded and ignored.
/// Partitions are never shrunk back to the best offsets.
pub struct CacheGrowthController<'a> {
    store: &'a dyn RelationStore,
    partitions: Vec<Partition>,
    selector: PopularitySelector,
    settings: ControllerSettings,
    state: LoopState,
    history: Vec<IterationRecord>,
    finished: bool,
}

impl<'a> CacheGrowthController<'a> {
    pub fn new(store: &'a dyn RelationStore, partitions: Vec<Partition>, settings: ControllerSettings) -> Self {
        let state = LoopState::new(partitions.len());
        CacheGrowthController {
            store,
            partitions,
            selector: PopularitySelector::new(),
            settings,
            state,
            history: Vec::new(),
            finished: false,
        }
    }

    /// Describe every configured relation and create its empty partition.
    pub fn from_config(store: &'a dyn RelationStore, config: &ExperimentConfig, analyzer: Arc<Analyzer>) -> Result<Self> {
        let mut partitions = Vec::with_capacity(config.relations.len());
        for relation in &config.relations {
            let descriptor = store.describe(relation, config.page_divisor)?;
            let table = config.cache_table_name(&relation.name);
            let index = match &config.index_dir {
                Some(dir) => PartitionIndex::create(&relation.name, dir.join(&table), analyzer.clone())?,
                None => PartitionIndex::in_memory(&relation.name, analyzer.clone()),
            };
            info!(
                "Partition {}: {} tuples, popularity mass {}, page size {}, cache table {}",
                descriptor.name, descriptor.total_tuples, descriptor.popularity_mass, descriptor.page_size, table
            );
            partitions.push(Partition::create(store, descriptor, table, index)?);
        }
        Ok(CacheGrowthController::new(store, partitions, ControllerSettings::from_config(config)))
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Run the loop to a terminal state. Any error other than a query parse
    /// failure aborts the run, tagged with partition, iteration and offset.
    pub fn run(&mut self, evaluator: &mut dyn Evaluator) -> Result<CacheReport> {
        if self.finished {
            return Err(Error::new(ErrorKind::InvalidState, "growth loop already ran".to_string()));
        }
        if self.partitions.is_empty() {
            return Err(Error::new(ErrorKind::InvalidArgument, "no partitions to grow".to_string()));
        }
        self.finished = true;
        let started_at = Utc::now();
        let fetcher = PageFetcher::new(self.store);

        for partition in &mut self.partitions {
            fetcher
                .refill(partition)
                .map_err(|e| e.with_context(format!("partition={} iteration=0 offset=0", partition.name())))?;
        }

        let termination = loop {
            let selected = match self.selector.select_partition(&self.partitions) {
                Selection::Partition(index) => index,
                Selection::AllExhausted => {
                    info!("Every relation is exhausted after {} iterations", self.state.iteration);
                    break Termination::Exhausted;
                }
            };
            // exhaustion wins over the bound when both hold
            if self.state.iteration >= self.settings.max_iterations {
                warn!("Iteration bound {} reached, stopping growth", self.settings.max_iterations);
                break Termination::IterationLimit;
            }
            self.state.iteration += 1;
            let iteration = self.state.iteration;

            let record = self.iterate(selected, iteration, evaluator)?;
            let accuracy = record.accuracy;
            self.history.push(record);

            if selected == 0 && self.state.best_accuracy - accuracy > self.settings.epsilon {
                info!(
                    "Primary relation regressed to {:.4} (best {:.4}), stopping",
                    accuracy, self.state.best_accuracy
                );
                break Termination::Stopped;
            }

            let partition = &mut self.partitions[selected];
            fetcher.refill(partition).map_err(|e| {
                e.with_context(format!(
                    "partition={} iteration={} offset={}",
                    partition.name(), iteration, partition.offset()
                ))
            })?;
        };

        self.report(termination, started_at)
    }

    /// GROW, EVALUATE and DECIDE for the selected partition.
    fn iterate(&mut self, selected: usize, iteration: usize, evaluator: &mut dyn Evaluator) -> Result<IterationRecord> {
        let partition = &mut self.partitions[selected];
        let relation = partition.name().to_string();
        let offset = partition.offset();
        let tag = format!("partition={} iteration={} offset={}", relation, iteration, offset);

        let popularity = partition.last_popularity().unwrap_or_default();
        let normalized = partition.normalized_popularity().unwrap_or_default();
        let documents = partition.take_staged();
        let grown = partition.grow(self.store, documents).map_err(|e| e.with_context(&tag))?;
        partition.advance();

        self.state.offsets = self.partitions.iter().map(Partition::offset).collect();

        let summary = evaluator.evaluate(&self.partitions).map_err(|e| e.with_context(&tag))?;
        let accuracy = summary.accuracy(self.settings.metric);

        let improved = accuracy > self.state.best_accuracy;
        if improved {
            self.state.best_accuracy = accuracy;
            self.state.best_offsets = self.state.offsets.clone();
        }

        let sizes: Vec<usize> = self.partitions.iter().map(Partition::committed_documents).collect();
        let limits: Vec<usize> = self.partitions.iter().map(Partition::page_size).collect();
        info!(
            "Iteration {}: grew {} by {} (popularity {} normalized {:.6}), offsets {:?}, limits {:?}, index sizes {:?}, accuracy {:.4} (best {:.4}), parse failures {}",
            iteration, relation, grown, popularity, normalized, self.state.offsets, limits, sizes,
            accuracy, self.state.best_accuracy, summary.parse_failures
        );

        Ok(IterationRecord {
            iteration,
            relation,
            grown,
            offsets: self.state.offsets.clone(),
            accuracy,
            improved,
            summary,
        })
    }

    fn report(&self, termination: Termination, started_at: chrono::DateTime<Utc>) -> Result<CacheReport> {
        let mut relations = Vec::with_capacity(self.partitions.len());
        for (index, partition) in self.partitions.iter().enumerate() {
            let best_offset = self.state.best_offsets[index];
            relations.push(RelationReport {
                name: partition.name().to_string(),
                total_tuples: partition.descriptor.total_tuples,
                page_size: partition.page_size(),
                best_offset,
                best_fraction: partition.descriptor.fraction(best_offset),
                live_offset: partition.offset(),
                live_documents: partition.committed_documents(),
                live_cache_rows: partition.cache_rows(self.store)?,
            });
        }

        for relation in &relations {
            info!(
                "Relation {}: best offset {} ({:.4} of {}), live offset {} with {} documents",
                relation.name, relation.best_offset, relation.best_fraction, relation.total_tuples,
                relation.live_offset, relation.live_documents
            );
        }
        info!("Growth finished ({:?}) after {} iterations, best accuracy {:.4}",
              termination, self.state.iteration, self.state.best_accuracy);

        Ok(CacheReport {
            termination,
            metric: self.settings.metric,
            iterations: self.state.iteration,
            best_accuracy: self.state.best_accuracy,
            relations,
            history: self.history.clone(),
            started_at,
            finished_at: Utc::now(),
        })
    }
}
