use serde::{Serialize, Deserialize};
use std::fmt;

/// Primary-key value of a tuple in some relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TupleId(pub i64);

impl TupleId {
    pub fn new(id: i64) -> Self {
        TupleId(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TupleId {
    fn from(id: i64) -> Self {
        TupleId(id)
    }
}

impl fmt::Display for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tuple qualified by the relation it lives in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TupleRef {
    pub relation: String,
    pub id: TupleId,
}

impl TupleRef {
    pub fn new(relation: impl Into<String>, id: impl Into<TupleId>) -> Self {
        TupleRef {
            relation: relation.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for TupleRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.relation, self.id)
    }
}

/// Raw row as returned by a popularity-ordered page read. `text_values`
/// follows the relation's configured attribute order.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleRow {
    pub id: TupleId,
    pub text_values: Vec<Option<String>>,
    pub popularity: f64,
}

/// One indexable tuple. Built fresh per page and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: TupleId,
    pub text: String,
    pub popularity: f64,
}

impl Document {
    pub fn new(id: TupleId, text: String, popularity: f64) -> Self {
        Document { id, text, popularity }
    }
}
