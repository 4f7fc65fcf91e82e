use std::sync::Arc;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};
use crate::analysis::analyzer::Analyzer;
use crate::cache::controller::Evaluator;
use crate::cache::partition::Partition;
use crate::core::config::ExperimentConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::eval::join::{JoinEvaluator, SchemaDescription};
use crate::eval::query::ExperimentQuery;
use crate::eval::scorer::{EvaluationSummary, QueryResult};
use crate::index::snapshot::IndexSnapshot;
use crate::query::parser::QueryParser;
use crate::scoring::scorer::BM25Scorer;
use crate::search::results::SearchHit;

/// Read-only view of one partition, opened after the iteration's commit.
pub struct PartitionView {
    pub relation: String,
    pub snapshot: Arc<IndexSnapshot>,
    pub analyzer: Arc<Analyzer>,
}

impl PartitionView {
    pub fn open(partition: &Partition) -> Self {
        PartitionView {
            relation: partition.name().to_string(),
            snapshot: partition.index().open_snapshot(),
            analyzer: partition.index().analyzer().clone(),
        }
    }
}

/// Runs the fixed query sample against committed partition snapshots and
/// the join evaluator, one query per pool task.
pub struct JoinEvaluatorAdapter {
    schema: SchemaDescription,
    evaluator: Box<dyn JoinEvaluator>,
    queries: Vec<ExperimentQuery>,
    parser: QueryParser,
    scorer: BM25Scorer,
    pool: ThreadPool,
    max_hits: usize,
    precision_k: usize,
}

impl JoinEvaluatorAdapter {
    pub fn new(
        schema: SchemaDescription,
        evaluator: Box<dyn JoinEvaluator>,
        queries: Vec<ExperimentQuery>,
        config: &ExperimentConfig,
    ) -> Result<Self> {
        let parser = if config.sanitize_queries {
            QueryParser::sanitizing()?
        } else {
            QueryParser::new()
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads())
            .thread_name(|i| format!("relcache-eval-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::InvalidState, format!("cannot start evaluation pool: {}", e)))?;

        Ok(JoinEvaluatorAdapter {
            schema,
            evaluator,
            queries,
            parser,
            scorer: BM25Scorer::default(),
            pool,
            max_hits: config.max_hits,
            precision_k: config.precision_k,
        })
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    pub fn queries(&self) -> &[ExperimentQuery] {
        &self.queries
    }

    /// Evaluate every query; returns once all of them have finished, in
    /// sample order.
    pub fn evaluate_views(&self, views: &[PartitionView]) -> Result<Vec<QueryResult>> {
        if views.len() != self.schema.relations.len()
            || views.iter().zip(&self.schema.relations).any(|(v, r)| &v.relation != r)
        {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "partitions do not match the schema's relation order".to_string(),
            ));
        }

        let results = self.pool.install(|| {
            self.queries
                .par_iter()
                .map(|query| self.evaluate_query(query, views))
                .collect::<Vec<_>>()
        });
        Ok(results)
    }

    fn evaluate_query(&self, query: &ExperimentQuery, views: &[PartitionView]) -> QueryResult {
        let parsed = match self.parser.parse(&query.text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Query {} skipped: {}", query.id, e);
                return QueryResult::parse_failure(query.id);
            }
        };

        let candidates: Vec<Vec<SearchHit>> = views
            .iter()
            .map(|view| {
                view.snapshot
                    .search(&parsed, &view.analyzer, &self.scorer, self.max_hits)
                    .hits
            })
            .collect();

        let joined = self.evaluator.evaluate(&self.schema, &candidates);
        let result = QueryResult::score(query.id, joined, &query.relevant, self.precision_k);
        debug!(
            "Query {} ({}): rr={:.4} p@{}={:.4} r@{}={:.4}",
            query.id, self.evaluator.name(), result.reciprocal_rank,
            self.precision_k, result.precision, self.precision_k, result.recall
        );
        result
    }
}

impl Evaluator for JoinEvaluatorAdapter {
    fn evaluate(&mut self, partitions: &[Partition]) -> Result<EvaluationSummary> {
        let views: Vec<PartitionView> = partitions.iter().map(PartitionView::open).collect();
        let results = self.evaluate_views(&views)?;
        Ok(EvaluationSummary::from_results(&results))
    }
}
