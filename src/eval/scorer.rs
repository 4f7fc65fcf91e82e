use std::collections::HashSet;
use serde::{Serialize, Deserialize};
use crate::core::config::EffectivenessMetric;
use crate::core::types::TupleRef;
use crate::eval::join::JoinedTuple;

/// Drop repeated joined tuples. The first occurrence keeps its position,
/// later ones are removed, so no tuple ever moves down and applying this
/// twice changes nothing.
pub fn dedup(results: Vec<JoinedTuple>) -> Vec<JoinedTuple> {
    let mut seen: HashSet<Vec<TupleRef>> = HashSet::with_capacity(results.len());
    results
        .into_iter()
        .filter(|tuple| seen.insert(tuple.members.clone()))
        .collect()
}

/// 1-based position of the first tuple containing any relevant target.
pub fn first_relevant_rank(results: &[JoinedTuple], relevant: &[TupleRef]) -> Option<usize> {
    results
        .iter()
        .position(|tuple| relevant.iter().any(|target| tuple.contains(target)))
        .map(|index| index + 1)
}

pub fn reciprocal_rank(results: &[JoinedTuple], relevant: &[TupleRef]) -> f64 {
    match first_relevant_rank(results, relevant) {
        Some(rank) => 1.0 / rank as f64,
        None => 0.0,
    }
}

/// Share of the top `k` slots holding a relevant tuple.
pub fn precision_at(results: &[JoinedTuple], relevant: &[TupleRef], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = results
        .iter()
        .take(k)
        .filter(|tuple| relevant.iter().any(|target| tuple.contains(target)))
        .count();
    hits as f64 / k as f64
}

/// Share of the relevant targets found within the top `k`.
pub fn recall_at(results: &[JoinedTuple], relevant: &[TupleRef], k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let found = relevant
        .iter()
        .filter(|target| results.iter().take(k).any(|tuple| tuple.contains(target)))
        .count();
    found as f64 / relevant.len() as f64
}

/// Effectiveness of one query in one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_id: u64,
    pub reciprocal_rank: f64,
    pub precision: f64,
    pub recall: f64,
    pub result_count: usize,
    pub parse_failed: bool,
}

impl QueryResult {
    /// Score a raw ranked list; it is deduplicated first.
    pub fn score(query_id: u64, results: Vec<JoinedTuple>, relevant: &[TupleRef], k: usize) -> Self {
        let results = dedup(results);
        QueryResult {
            query_id,
            reciprocal_rank: reciprocal_rank(&results, relevant),
            precision: precision_at(&results, relevant, k),
            recall: recall_at(&results, relevant, k),
            result_count: results.len(),
            parse_failed: false,
        }
    }

    /// A query whose text did not parse counts as a miss.
    pub fn parse_failure(query_id: u64) -> Self {
        QueryResult {
            query_id,
            reciprocal_rank: 0.0,
            precision: 0.0,
            recall: 0.0,
            result_count: 0,
            parse_failed: true,
        }
    }
}

/// Aggregate over the whole fixed sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub mean_reciprocal_rank: f64,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub queries: usize,
    pub parse_failures: usize,
}

impl EvaluationSummary {
    pub fn from_results(results: &[QueryResult]) -> Self {
        if results.is_empty() {
            return EvaluationSummary::default();
        }
        let n = results.len() as f64;
        EvaluationSummary {
            mean_reciprocal_rank: results.iter().map(|r| r.reciprocal_rank).sum::<f64>() / n,
            mean_precision: results.iter().map(|r| r.precision).sum::<f64>() / n,
            mean_recall: results.iter().map(|r| r.recall).sum::<f64>() / n,
            queries: results.len(),
            parse_failures: results.iter().filter(|r| r.parse_failed).count(),
        }
    }

    /// Summary carrying only a mean reciprocal rank.
    pub fn with_accuracy(accuracy: f64) -> Self {
        EvaluationSummary {
            mean_reciprocal_rank: accuracy,
            ..EvaluationSummary::default()
        }
    }

    pub fn accuracy(&self, metric: EffectivenessMetric) -> f64 {
        match metric {
            EffectivenessMetric::ReciprocalRank => self.mean_reciprocal_rank,
            EffectivenessMetric::PrecisionAtK => self.mean_precision,
            EffectivenessMetric::RecallAtK => self.mean_recall,
        }
    }
}
