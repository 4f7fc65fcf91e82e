use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use crate::core::config::EffectivenessMetric;
use crate::eval::scorer::EvaluationSummary;

/// How the growth loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Growing the primary relation lost more than epsilon against the best.
    Stopped,
    /// No relation has pages left.
    Exhausted,
    /// The iteration bound was reached first.
    IterationLimit,
}

/// One completed SELECT..DECIDE pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub relation: String,
    pub grown: usize,
    pub offsets: Vec<u64>,
    pub accuracy: f64,
    pub improved: bool,
    pub summary: EvaluationSummary,
}

/// Per relation, the best configuration found next to the cache actually
/// left behind. The two differ whenever growth continued past the best
/// iteration; nothing is rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationReport {
    pub name: String,
    pub total_tuples: u64,
    pub page_size: usize,
    pub best_offset: u64,
    pub best_fraction: f64,
    pub live_offset: u64,
    pub live_documents: usize,
    pub live_cache_rows: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheReport {
    pub termination: Termination,
    pub metric: EffectivenessMetric,
    pub iterations: usize,
    pub best_accuracy: f64,
    pub relations: Vec<RelationReport>,
    pub history: Vec<IterationRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CacheReport {
    pub fn relation(&self, name: &str) -> Option<&RelationReport> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn best_offsets(&self) -> Vec<u64> {
        self.relations.iter().map(|r| r.best_offset).collect()
    }

    pub fn live_offsets(&self) -> Vec<u64> {
        self.relations.iter().map(|r| r.live_offset).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
