use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::core::config::ExperimentConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{TupleId, TupleRef};
use crate::relation::store::RelationStore;
use crate::search::results::SearchHit;

/// One join edge, materialized as `left id -> right ids`.
#[derive(Debug, Clone)]
pub struct JoinEdge {
    pub table: String,
    pub left: usize,
    pub right: usize,
    adjacency: HashMap<TupleId, Vec<TupleId>>,
    pair_count: usize,
}

impl JoinEdge {
    pub fn new(table: &str, left: usize, right: usize, pairs: &[(TupleId, TupleId)]) -> Self {
        let mut adjacency: HashMap<TupleId, Vec<TupleId>> = HashMap::new();
        for &(l, r) in pairs {
            adjacency.entry(l).or_default().push(r);
        }
        JoinEdge {
            table: table.to_string(),
            left,
            right,
            adjacency,
            pair_count: pairs.len(),
        }
    }

    pub fn neighbours(&self, left: TupleId) -> &[TupleId] {
        self.adjacency.get(&left).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of `(left, right)` pairs, i.e. the edge's cardinality.
    pub fn cardinality(&self) -> usize {
        self.pair_count
    }
}

/// Relations and join edges of the schema, built once per run.
#[derive(Debug, Clone, Default)]
pub struct SchemaDescription {
    pub relations: Vec<String>,
    pub edges: Vec<JoinEdge>,
}

impl SchemaDescription {
    pub fn new(relations: Vec<String>) -> Self {
        SchemaDescription {
            relations,
            edges: Vec::new(),
        }
    }

    pub fn relation_index(&self, name: &str) -> Option<usize> {
        self.relations.iter().position(|r| r == name)
    }

    pub fn add_edge(&mut self, table: &str, left: &str, right: &str, pairs: &[(TupleId, TupleId)]) -> Result<()> {
        let index = |name: &str| {
            self.relation_index(name).ok_or_else(|| {
                Error::new(ErrorKind::NotFound, format!("join edge {} references unknown relation {}", table, name))
            })
        };
        let edge = JoinEdge::new(table, index(left)?, index(right)?, pairs);
        self.edges.push(edge);
        Ok(())
    }

    /// Load every configured join table from the store.
    pub fn load(store: &dyn RelationStore, config: &ExperimentConfig) -> Result<Self> {
        let mut schema = SchemaDescription::new(config.relations.iter().map(|r| r.name.clone()).collect());
        for edge in &config.join_edges {
            let pairs = store.load_join_pairs(edge)?;
            schema.add_edge(&edge.table, &edge.left, &edge.right, &pairs)?;
        }
        Ok(schema)
    }

    /// One-line rendering: `article, image | article_image(article-image: 12)`.
    pub fn describe(&self) -> String {
        let edges: Vec<String> = self
            .edges
            .iter()
            .map(|e| format!("{}({}-{}: {})", e.table, self.relations[e.left], self.relations[e.right], e.cardinality()))
            .collect();
        format!("{} | {}", self.relations.join(", "), edges.join(", "))
    }
}

/// A ranked joined tuple. `members` identify it; two results with the same
/// members are the same answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedTuple {
    pub members: Vec<TupleRef>,
    pub score: f32,
}

impl JoinedTuple {
    pub fn contains(&self, target: &TupleRef) -> bool {
        self.members.iter().any(|m| m == target)
    }
}

/// Keyword-search join evaluator: combines per-relation matches of one query
/// into ranked joined tuples. `candidates[i]` are the hits of relation `i`.
pub trait JoinEvaluator: Send + Sync {
    fn evaluate(&self, schema: &SchemaDescription, candidates: &[Vec<SearchHit>]) -> Vec<JoinedTuple>;

    fn name(&self) -> &str;
}

/// Candidate network of size at most two: every matching tuple on its own,
/// plus every pair connected by a join edge where both ends matched. A pair
/// scores the sum of its members' scores.
#[derive(Debug, Clone)]
pub struct EdgeJoinEvaluator {
    pub max_results: usize,
}

impl EdgeJoinEvaluator {
    pub fn new(max_results: usize) -> Self {
        EdgeJoinEvaluator { max_results }
    }
}

impl JoinEvaluator for EdgeJoinEvaluator {
    fn evaluate(&self, schema: &SchemaDescription, candidates: &[Vec<SearchHit>]) -> Vec<JoinedTuple> {
        let mut joined = Vec::new();

        for (relation, hits) in schema.relations.iter().zip(candidates) {
            for hit in hits {
                joined.push(JoinedTuple {
                    members: vec![TupleRef::new(relation.as_str(), hit.id)],
                    score: hit.score,
                });
            }
        }

        for edge in &schema.edges {
            let (Some(left_hits), Some(right_hits)) = (candidates.get(edge.left), candidates.get(edge.right)) else {
                continue;
            };
            let right_scores: HashMap<TupleId, f32> = right_hits.iter().map(|h| (h.id, h.score)).collect();

            for left in left_hits {
                for right in edge.neighbours(left.id) {
                    if let Some(right_score) = right_scores.get(right) {
                        joined.push(JoinedTuple {
                            members: vec![
                                TupleRef::new(schema.relations[edge.left].as_str(), left.id),
                                TupleRef::new(schema.relations[edge.right].as_str(), *right),
                            ],
                            score: left.score + right_score,
                        });
                    }
                }
            }
        }

        // stable: equal scores keep generation order
        joined.sort_by(|a, b| b.score.total_cmp(&a.score));
        joined.truncate(self.max_results);
        joined
    }

    fn name(&self) -> &str {
        "edge-join"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: i64, score: f32) -> SearchHit {
        SearchHit { id: TupleId(id), score }
    }

    fn schema() -> SchemaDescription {
        let mut schema = SchemaDescription::new(vec!["article".to_string(), "image".to_string()]);
        schema
            .add_edge("article_image", "article", "image", &[(TupleId(1), TupleId(10)), (TupleId(2), TupleId(20))])
            .unwrap();
        schema
    }

    #[test]
    fn test_pairs_rank_above_members() {
        let candidates = vec![vec![hit(1, 2.0), hit(2, 1.0)], vec![hit(10, 1.5)]];
        let joined = EdgeJoinEvaluator::new(10).evaluate(&schema(), &candidates);

        assert_eq!(joined.len(), 4);
        assert_eq!(
            joined[0].members,
            vec![TupleRef::new("article", TupleId(1)), TupleRef::new("image", TupleId(10))]
        );
        assert_eq!(joined[0].score, 3.5);
        assert_eq!(joined[1].members, vec![TupleRef::new("article", TupleId(1))]);
    }

    #[test]
    fn test_bounded_results() {
        let candidates = vec![vec![hit(1, 2.0), hit(2, 1.0)], vec![hit(10, 1.5), hit(20, 0.5)]];
        let joined = EdgeJoinEvaluator::new(3).evaluate(&schema(), &candidates);
        assert_eq!(joined.len(), 3);
    }

    #[test]
    fn test_unknown_relation_in_edge() {
        let mut schema = schema();
        let err = schema.add_edge("x", "article", "link", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_describe() {
        assert_eq!(schema().describe(), "article, image | article_image(article-image: 2)");
    }
}
