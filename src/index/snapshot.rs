use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use crate::analysis::analyzer::Analyzer;
use crate::analysis::tokenizer::Token;
use crate::index::segment::Segment;
use crate::query::ast::{BoolQuery, Query};
use crate::scoring::scorer::{CollectionStats, Scorer};
use crate::search::results::{SearchResults, TopKCollector};

/// Per-segment matches: segment-local ordinal -> accumulated score.
type Matches = HashMap<u32, f32>;

/// Read-only view of a partition index as of one commit.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub version: u64,
    pub segments: Vec<Arc<Segment>>,
    pub timestamp: DateTime<Utc>,
    pub doc_count: usize,
}

/// Publishes snapshots in commit order and keeps a bounded history of them.
pub struct SnapshotController {
    versions: RwLock<BTreeMap<u64, Arc<IndexSnapshot>>>,
    current_version: AtomicU64,
    max_versions: usize,
}

impl SnapshotController {
    pub fn new() -> Self {
        let mut versions = BTreeMap::new();
        versions.insert(0, Arc::new(IndexSnapshot::empty()));
        SnapshotController {
            versions: RwLock::new(versions),
            current_version: AtomicU64::new(0),
            max_versions: 16,
        }
    }

    /// Start from segments recovered from disk.
    pub fn with_segments(segments: Vec<Arc<Segment>>) -> Self {
        let controller = Self::new();
        if !segments.is_empty() {
            controller.publish(segments);
        }
        controller
    }

    pub fn publish(&self, segments: Vec<Arc<Segment>>) -> Arc<IndexSnapshot> {
        let mut versions = self.versions.write();
        let version = self.current_version.load(Ordering::Acquire) + 1;

        let doc_count = segments.iter().map(|s| s.doc_count()).sum();
        let snapshot = Arc::new(IndexSnapshot {
            version,
            segments,
            timestamp: Utc::now(),
            doc_count,
        });

        versions.insert(version, snapshot.clone());
        // Readers hold their own Arc, dropping history never invalidates them
        while versions.len() > self.max_versions {
            versions.pop_first();
        }
        self.current_version.store(version, Ordering::Release);

        snapshot
    }

    pub fn current_snapshot(&self) -> Arc<IndexSnapshot> {
        let versions = self.versions.read();
        let current = self.current_version.load(Ordering::Acquire);
        versions.get(&current)
            .cloned()
            .unwrap_or_else(|| Arc::new(IndexSnapshot::empty()))
    }

    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::Acquire)
    }
}

impl Default for SnapshotController {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexSnapshot {
    pub fn empty() -> Self {
        IndexSnapshot {
            version: 0,
            segments: Vec::new(),
            timestamp: Utc::now(),
            doc_count: 0,
        }
    }

    pub fn stats(&self) -> CollectionStats {
        let total_tokens: u64 = self.segments.iter().map(|s| s.total_tokens).sum();
        let avg_doc_length = if self.doc_count == 0 {
            0.0
        } else {
            total_tokens as f32 / self.doc_count as f32
        };
        CollectionStats {
            total_docs: self.doc_count,
            avg_doc_length,
        }
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.segments.iter()
            .filter_map(|s| s.term_postings(term))
            .map(|p| p.doc_freq())
            .sum()
    }

    /// Run a parsed query and return at most `limit` identifiers ranked by
    /// score. Ties keep insertion order.
    pub fn search(&self, query: &Query, analyzer: &Analyzer, scorer: &dyn Scorer, limit: usize) -> SearchResults {
        let mut executor = SnapshotSearch {
            snapshot: self,
            analyzer,
            scorer,
            stats: self.stats(),
            doc_freqs: HashMap::new(),
        };

        let mut collector = TopKCollector::new(limit);
        let mut base = 0u64;
        for segment in &self.segments {
            if let Some(matches) = executor.eval(query, segment) {
                for (doc, score) in matches {
                    if let Some(id) = segment.tuple_id(doc) {
                        collector.collect(id, score, base + doc as u64);
                    }
                }
            }
            base += segment.doc_count() as u64;
        }

        collector.into_results()
    }
}

struct SnapshotSearch<'a> {
    snapshot: &'a IndexSnapshot,
    analyzer: &'a Analyzer,
    scorer: &'a dyn Scorer,
    stats: CollectionStats,
    doc_freqs: HashMap<String, u32>,
}

impl<'a> SnapshotSearch<'a> {
    /// `None` means the clause analyzed away entirely (e.g. only stop words)
    /// and places no constraint on the result.
    fn eval(&mut self, query: &Query, segment: &Segment) -> Option<Matches> {
        match query {
            Query::Term(term) => {
                let tokens = self.analyzer.analyze(&term.text);
                self.eval_terms(&tokens, segment)
            }
            Query::Phrase(phrase) => {
                let tokens = self.analyzer.analyze(&phrase.text);
                if tokens.len() <= 1 {
                    self.eval_terms(&tokens, segment)
                } else {
                    Some(self.eval_phrase(&tokens, segment))
                }
            }
            Query::Bool(bool_query) => self.eval_bool(bool_query, segment),
        }
    }

    fn doc_freq(&mut self, term: &str) -> u32 {
        if let Some(df) = self.doc_freqs.get(term) {
            return *df;
        }
        let df = self.snapshot.doc_freq(term);
        self.doc_freqs.insert(term.to_string(), df);
        df
    }

    fn term_score(&mut self, term: &str, term_freq: u32, segment: &Segment, doc: u32) -> f32 {
        let df = self.doc_freq(term);
        self.scorer.score(term_freq, df, segment.doc_length(doc), &self.stats)
    }

    fn eval_terms(&mut self, tokens: &[Token], segment: &Segment) -> Option<Matches> {
        if tokens.is_empty() {
            return None;
        }
        let mut matches = Matches::new();
        for token in tokens {
            let Some(list) = segment.term_postings(&token.text) else {
                continue;
            };
            for posting in &list.postings {
                let score = self.term_score(&token.text, posting.term_freq, segment, posting.doc);
                *matches.entry(posting.doc).or_insert(0.0) += score;
            }
        }
        Some(matches)
    }

    fn eval_phrase(&mut self, tokens: &[Token], segment: &Segment) -> Matches {
        let mut matches = Matches::new();
        let Some(first) = segment.term_postings(&tokens[0].text) else {
            return matches;
        };
        let base_position = tokens[0].position;

        'docs: for posting in &first.postings {
            let mut others = Vec::with_capacity(tokens.len() - 1);
            for token in &tokens[1..] {
                match segment.term_postings(&token.text).and_then(|l| l.get(posting.doc)) {
                    Some(p) => others.push((token.position - base_position, p)),
                    None => continue 'docs,
                }
            }

            let aligned = posting.positions.iter().any(|start| {
                others.iter().all(|(gap, p)| p.positions.binary_search(&(start + gap)).is_ok())
            });
            if !aligned {
                continue;
            }

            let mut score = self.term_score(&tokens[0].text, posting.term_freq, segment, posting.doc);
            for (token, (_, p)) in tokens[1..].iter().zip(&others) {
                score += self.term_score(&token.text, p.term_freq, segment, posting.doc);
            }
            matches.insert(posting.doc, score);
        }

        matches
    }

    fn eval_bool(&mut self, query: &BoolQuery, segment: &Segment) -> Option<Matches> {
        let musts: Vec<Matches> = query.must.iter().filter_map(|q| self.eval(q, segment)).collect();
        let shoulds: Vec<Matches> = query.should.iter().filter_map(|q| self.eval(q, segment)).collect();
        let nots: Vec<Matches> = query.must_not.iter().filter_map(|q| self.eval(q, segment)).collect();

        if musts.is_empty() && shoulds.is_empty() {
            // a purely negative query matches nothing
            return if nots.is_empty() { None } else { Some(Matches::new()) };
        }

        let mut result = if let Some((first, rest)) = musts.split_first() {
            let mut required = first.clone();
            required.retain(|doc, _| rest.iter().all(|m| m.contains_key(doc)));
            for (doc, score) in required.iter_mut() {
                for m in rest {
                    *score += m[doc];
                }
                for m in &shoulds {
                    if let Some(extra) = m.get(doc) {
                        *score += extra;
                    }
                }
            }
            required
        } else {
            let mut union = Matches::new();
            for m in &shoulds {
                for (doc, score) in m {
                    *union.entry(*doc).or_insert(0.0) += score;
                }
            }
            union
        };

        result.retain(|doc, _| !nots.iter().any(|m| m.contains_key(doc)));
        Some(result)
    }
}
