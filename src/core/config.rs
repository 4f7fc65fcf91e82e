use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};

/// Settings for one cache-selection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub database_path: PathBuf,
    pub index_dir: Option<PathBuf>,            // None keeps every partition index in memory
    pub cache_table_prefix: String,

    pub relations: Vec<RelationConfig>,        // index 0 is the primary relation
    pub join_edges: Vec<JoinEdgeConfig>,
    pub queries: QuerySampleConfig,

    pub epsilon: f64,                          // tolerated regression on the primary relation
    pub page_divisor: usize,                   // page size = total tuples / page_divisor
    pub max_iterations: usize,
    pub evaluation_threads: usize,             // 0 = one per CPU
    pub max_hits: usize,                       // per-relation candidate bound
    pub max_join_results: usize,
    pub precision_k: usize,
    pub metric: EffectivenessMetric,           // aggregate that drives the stopping rule
    pub sanitize_queries: bool,
    pub stemming: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectivenessMetric {
    ReciprocalRank,
    PrecisionAtK,
    RecallAtK,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationConfig {
    pub name: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_popularity_column")]
    pub popularity_column: String,
    pub text_attributes: Vec<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub total_tuples: Option<u64>,
    #[serde(default)]
    pub popularity_mass: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinEdgeConfig {
    pub table: String,
    pub left: String,
    pub left_column: String,
    pub right: String,
    pub right_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySampleConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub sample_size: Option<usize>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_popularity_column() -> String {
    "popularity".to_string()
}

fn default_seed() -> u64 {
    1
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            database_path: PathBuf::from("./data/relations.db"),
            index_dir: None,
            cache_table_prefix: "tmp_".to_string(),

            relations: Vec::new(),
            join_edges: Vec::new(),
            queries: QuerySampleConfig::default(),

            epsilon: 0.005,
            page_divisor: 20,
            max_iterations: 10_000,
            evaluation_threads: 0,
            max_hits: 200,
            max_join_results: 200,
            precision_k: 20,
            metric: EffectivenessMetric::ReciprocalRank,
            sanitize_queries: false,
            stemming: false,
        }
    }
}

impl Default for QuerySampleConfig {
    fn default() -> Self {
        QuerySampleConfig {
            path: PathBuf::from("./data/queries.json"),
            sample_size: None,
            seed: default_seed(),
        }
    }
}

impl RelationConfig {
    pub fn new(name: &str, text_attributes: &[&str]) -> Self {
        RelationConfig {
            name: name.to_string(),
            id_column: default_id_column(),
            popularity_column: default_popularity_column(),
            text_attributes: text_attributes.iter().map(|a| a.to_string()).collect(),
            page_size: None,
            total_tuples: None,
            popularity_mass: None,
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: ExperimentConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.relations.is_empty() {
            return Err(Error::config("at least one relation is required"));
        }
        if !(self.epsilon >= 0.0) {
            return Err(Error::config(format!("epsilon must be non-negative, got {}", self.epsilon)));
        }
        if self.page_divisor == 0 {
            return Err(Error::config("page_divisor must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(Error::config("max_iterations must be positive"));
        }
        if self.max_hits == 0 || self.max_join_results == 0 || self.precision_k == 0 {
            return Err(Error::config("max_hits, max_join_results and precision_k must be positive"));
        }

        let mut names = HashSet::new();
        for relation in &self.relations {
            if !names.insert(relation.name.as_str()) {
                return Err(Error::config(format!("relation '{}' listed twice", relation.name)));
            }
            if relation.text_attributes.is_empty() {
                return Err(Error::config(format!("relation '{}' has no text attributes", relation.name)));
            }
            if relation.page_size == Some(0) {
                return Err(Error::config(format!("relation '{}' has a zero page size", relation.name)));
            }
        }
        for edge in &self.join_edges {
            for end in [&edge.left, &edge.right] {
                if !names.contains(end.as_str()) {
                    return Err(Error::config(format!(
                        "join edge '{}' references unknown relation '{}'", edge.table, end
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn cache_table_name(&self, relation: &str) -> String {
        format!("{}{}", self.cache_table_prefix, relation)
    }

    pub fn worker_threads(&self) -> usize {
        if self.evaluation_threads == 0 {
            num_cpus::get()
        } else {
            self.evaluation_threads
        }
    }
}
