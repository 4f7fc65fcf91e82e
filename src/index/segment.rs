use std::collections::HashMap;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::analysis::analyzer::Analyzer;
use crate::core::types::{Document, TupleId};
use crate::index::posting::{Posting, PostingList};

/// Pages smaller than this are analyzed on the calling thread.
const PARALLEL_ANALYSIS_THRESHOLD: usize = 256;

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable batch of documents sealed by one commit.
///
/// Documents are addressed by their ordinal inside the segment; only the
/// tuple identifier is stored, the text is indexed but not kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub created_at: DateTime<Utc>,
    pub ids: Vec<TupleId>,
    pub doc_lengths: Vec<u32>,
    pub total_tokens: u64,
    pub postings: HashMap<String, PostingList>,
}

impl Segment {
    pub fn build(docs: &[Document], analyzer: &Analyzer) -> Self {
        let analyzed: Vec<_> = if docs.len() >= PARALLEL_ANALYSIS_THRESHOLD {
            docs.par_iter().map(|doc| analyzer.analyze(&doc.text)).collect()
        } else {
            docs.iter().map(|doc| analyzer.analyze(&doc.text)).collect()
        };

        let mut postings: HashMap<String, PostingList> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(docs.len());
        let mut total_tokens = 0u64;

        for (ordinal, tokens) in analyzed.into_iter().enumerate() {
            let mut term_positions: HashMap<String, Vec<u32>> = HashMap::new();
            for token in &tokens {
                term_positions.entry(token.text.clone())
                    .or_default()
                    .push(token.position);
            }

            for (term, positions) in term_positions {
                // ordinals only grow, so this is an append
                postings.entry(term)
                    .or_default()
                    .add_posting(Posting {
                        doc: ordinal as u32,
                        term_freq: positions.len() as u32,
                        positions,
                    });
            }

            doc_lengths.push(tokens.len() as u32);
            total_tokens += tokens.len() as u64;
        }

        Segment {
            id: SegmentId::new(),
            created_at: Utc::now(),
            ids: docs.iter().map(|d| d.id).collect(),
            doc_lengths,
            total_tokens,
            postings,
        }
    }

    pub fn doc_count(&self) -> usize {
        self.ids.len()
    }

    pub fn term_postings(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    pub fn doc_length(&self, doc: u32) -> u32 {
        self.doc_lengths.get(doc as usize).copied().unwrap_or(0)
    }

    pub fn tuple_id(&self, doc: u32) -> Option<TupleId> {
        self.ids.get(doc as usize).copied()
    }
}
