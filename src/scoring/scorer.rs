/// Collection-level statistics of one snapshot, aggregated over all of its
/// segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionStats {
    pub total_docs: usize,
    pub avg_doc_length: f32,
}

/// Scorer trait
pub trait Scorer: Send + Sync {
    /// Score of one term occurring `term_freq` times in a document of
    /// `doc_length` tokens, the term appearing in `doc_freq` documents.
    fn score(&self, term_freq: u32, doc_freq: u32, doc_length: u32, stats: &CollectionStats) -> f32;

    fn name(&self) -> &str;
}

/// BM25 Scorer
pub struct BM25Scorer {
    pub k1: f32,  // Term frequency saturation (default: 1.2)
    pub b: f32,   // Length normalization strength (default: 0.75)
}

impl Default for BM25Scorer {
    fn default() -> Self {
        BM25Scorer {
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl BM25Scorer {
    /// Non-negative idf: ln(1 + (N - df + 0.5) / (df + 0.5))
    pub fn idf(doc_freq: u32, total_docs: usize) -> f32 {
        let n = total_docs as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl Scorer for BM25Scorer {
    fn score(&self, term_freq: u32, doc_freq: u32, doc_length: u32, stats: &CollectionStats) -> f32 {
        if term_freq == 0 || stats.total_docs == 0 {
            return 0.0;
        }
        let tf = term_freq as f32;
        let avg_doc_len = if stats.avg_doc_length > 0.0 { stats.avg_doc_length } else { 1.0 };
        let norm = 1.0 - self.b + self.b * (doc_length as f32 / avg_doc_len);

        let idf = Self::idf(doc_freq, stats.total_docs);
        idf * tf * (self.k1 + 1.0) / (tf + self.k1 * norm)
    }

    fn name(&self) -> &str {
        "bm25"
    }
}
