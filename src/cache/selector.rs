use crate::cache::partition::Partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Partition(usize),
    AllExhausted,
}

/// Picks the partition whose next page is worth the most relative to its
/// relation's total popularity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PopularitySelector;

impl PopularitySelector {
    pub fn new() -> Self {
        PopularitySelector
    }

    /// `scores[i]` is partition `i`'s normalized popularity, None when
    /// exhausted. Highest score wins; ties go to the lowest index.
    pub fn select(&self, scores: &[Option<f64>]) -> Selection {
        let mut best: Option<(usize, f64)> = None;
        for (index, score) in scores.iter().enumerate() {
            let Some(score) = *score else {
                continue;
            };
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((index, score)),
            }
        }
        match best {
            Some((index, _)) => Selection::Partition(index),
            None => Selection::AllExhausted,
        }
    }

    pub fn select_partition(&self, partitions: &[Partition]) -> Selection {
        let scores: Vec<Option<f64>> = partitions.iter().map(Partition::normalized_popularity).collect();
        self.select(&scores)
    }
}
