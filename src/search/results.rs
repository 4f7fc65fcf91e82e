use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use serde::{Serialize, Deserialize};
use crate::core::types::TupleId;

/// One ranked identifier returned by a snapshot search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: TupleId,
    pub score: f32,
}

/// Search results container
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub total_hits: usize,
    pub max_score: f32,
}

impl SearchResults {
    pub fn ids(&self) -> Vec<TupleId> {
        self.hits.iter().map(|h| h.id).collect()
    }
}

/// Heap entry: higher score ranks first, ties go to the earlier-indexed
/// document so rankings are reproducible.
#[derive(Debug, Clone)]
struct Candidate {
    score: f32,
    order: u64,
    id: TupleId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // "greater" means "ranks better"
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    heap: BinaryHeap<Reverse<Candidate>>,
    pub k: usize,
    pub total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
            total_collected: 0,
        }
    }

    /// `order` is the document's global insertion order within the snapshot.
    pub fn collect(&mut self, id: TupleId, score: f32, order: u64) {
        self.total_collected += 1;
        if self.k == 0 {
            return;
        }

        let candidate = Candidate { score, order, id };
        if self.heap.len() < self.k {
            self.heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = self.heap.peek() {
            if candidate > *worst {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
            }
        }
    }

    pub fn into_results(self) -> SearchResults {
        let total_hits = self.total_collected;
        let mut ranked: Vec<Candidate> = self.heap.into_iter().map(|Reverse(c)| c).collect();
        ranked.sort_by(|a, b| b.cmp(a));

        let max_score = ranked.first().map(|c| c.score).unwrap_or(0.0);
        SearchResults {
            hits: ranked.into_iter().map(|c| SearchHit { id: c.id, score: c.score }).collect(),
            total_hits,
            max_score,
        }
    }
}
