use serde::{Serialize, Deserialize};
use crate::core::types::{Document, TupleRow};

/// Static metadata of one relation, resolved once at start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub name: String,
    pub id_column: String,
    pub popularity_column: String,
    pub text_attributes: Vec<String>,
    pub total_tuples: u64,
    pub popularity_mass: f64,
    pub page_size: usize,
}

impl RelationDescriptor {
    /// Page size as a fixed share of the relation, never below one tuple.
    pub fn derive_page_size(total_tuples: u64, divisor: usize) -> usize {
        let divisor = divisor.max(1) as u64;
        ((total_tuples / divisor) as usize).max(1)
    }

    /// Indexable text of a tuple: its configured attributes in order,
    /// separated by a space. NULL attributes are skipped.
    pub fn build_text(&self, row: &TupleRow) -> String {
        let mut text = String::new();
        for value in row.text_values.iter().flatten() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(value);
        }
        text
    }

    pub fn build_document(&self, row: &TupleRow) -> Document {
        Document::new(row.id, self.build_text(row), row.popularity)
    }

    /// Normalized score of a popularity value, in [0, 1] for a well formed
    /// relation. A relation without mass scores 0, so it is only selected
    /// once every other candidate is exhausted or also scores 0.
    pub fn normalize(&self, popularity: f64) -> f64 {
        if self.popularity_mass > 0.0 {
            popularity / self.popularity_mass
        } else {
            0.0
        }
    }

    pub fn fraction(&self, offset: u64) -> f64 {
        if self.total_tuples == 0 {
            0.0
        } else {
            offset as f64 / self.total_tuples as f64
        }
    }
}
