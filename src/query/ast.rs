use serde::{Serialize, Deserialize};

/// Parsed keyword query. Texts are raw here; analysis happens when the
/// query is executed against a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),
    Phrase(PhraseQuery),
    Bool(BoolQuery),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub text: String,
}

/// Exact phrase; analyzed terms must sit at adjacent positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub text: String,
}

/// Boolean query with must/should/must_not clauses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<Query>,      // All must match (AND)
    pub should: Vec<Query>,    // At least one must match when there is no must clause
    pub must_not: Vec<Query>,  // None may match (NOT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

impl Query {
    pub fn term(text: &str) -> Self {
        Query::Term(TermQuery { text: text.to_string() })
    }

    pub fn phrase(text: &str) -> Self {
        Query::Phrase(PhraseQuery { text: text.to_string() })
    }
}

impl BoolQuery {
    pub fn new() -> Self {
        BoolQuery {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
        }
    }

    pub fn add(&mut self, occur: Occur, query: Query) {
        match occur {
            Occur::Must => self.must.push(query),
            Occur::Should => self.should.push(query),
            Occur::MustNot => self.must_not.push(query),
        }
    }

    pub fn clause_count(&self) -> usize {
        self.must.len() + self.should.len() + self.must_not.len()
    }
}

impl Default for BoolQuery {
    fn default() -> Self {
        Self::new()
    }
}
