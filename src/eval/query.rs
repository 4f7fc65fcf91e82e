use std::fs;
use std::path::Path;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Serialize, Deserialize};
use crate::core::config::QuerySampleConfig;
use crate::core::error::{Error, Result};
use crate::core::types::TupleRef;

/// A keyword query with the join targets known to answer it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentQuery {
    pub id: u64,
    pub text: String,
    pub relevant: Vec<TupleRef>,
}

impl ExperimentQuery {
    pub fn new(id: u64, text: &str, relevant: Vec<TupleRef>) -> Self {
        ExperimentQuery {
            id,
            text: text.to_string(),
            relevant,
        }
    }
}

/// Load every query of a JSON array file.
pub fn load_queries(path: &Path) -> Result<Vec<ExperimentQuery>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("cannot read queries {}: {}", path.display(), e)))?;
    let queries: Vec<ExperimentQuery> = serde_json::from_str(&raw)?;
    Ok(queries)
}

/// Deterministic sample: shuffle with the configured seed, keep the first
/// `sample_size`. The same seed always yields the same sample.
pub fn sample_queries(mut queries: Vec<ExperimentQuery>, config: &QuerySampleConfig) -> Vec<ExperimentQuery> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    queries.shuffle(&mut rng);
    if let Some(size) = config.sample_size {
        queries.truncate(size);
    }
    queries
}

/// Load and sample the fixed query set of a run.
pub fn load_sample(config: &QuerySampleConfig) -> Result<Vec<ExperimentQuery>> {
    let queries = load_queries(&config.path)?;
    let sample = sample_queries(queries, config);
    if sample.is_empty() {
        return Err(Error::config(format!("query file {} yields an empty sample", config.path.display())));
    }
    Ok(sample)
}
