use std::collections::HashMap;
use parking_lot::RwLock;
use crate::core::config::{JoinEdgeConfig, RelationConfig};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{TupleId, TupleRow};
use crate::relation::descriptor::RelationDescriptor;

/// Relational collaborator: popularity-ordered paging over source relations,
/// the mirrored cache tables, and join-edge tables.
///
/// All calls are blocking. The growth loop is sequential, so nothing here is
/// called concurrently with a write.
pub trait RelationStore: Send + Sync {
    /// `(COUNT(*), TOTAL(popularity))` of a relation.
    fn relation_totals(&self, relation: &RelationConfig) -> Result<(u64, f64)>;

    /// Rows `[offset, offset + limit)` ordered by descending popularity
    /// (ties by ascending id). `text_values` follow `text_attributes`.
    fn fetch_page(&self, descriptor: &RelationDescriptor, offset: u64, limit: usize) -> Result<Vec<TupleRow>>;

    /// Drop and recreate an empty identifier table with an index on `id`.
    fn create_cache_table(&self, table: &str) -> Result<()>;

    /// Insert every id in one transaction; on error nothing is inserted.
    fn insert_cache_ids(&self, table: &str, ids: &[TupleId]) -> Result<()>;

    fn count_cache_rows(&self, table: &str) -> Result<u64>;

    /// `(left id, right id)` pairs of a join-edge table.
    fn load_join_pairs(&self, edge: &JoinEdgeConfig) -> Result<Vec<(TupleId, TupleId)>>;

    /// Resolve a configured relation into its descriptor. Totals given in the
    /// configuration win over the store's own counts.
    fn describe(&self, relation: &RelationConfig, page_divisor: usize) -> Result<RelationDescriptor> {
        validate_identifier(&relation.name)?;
        validate_identifier(&relation.id_column)?;
        validate_identifier(&relation.popularity_column)?;
        for attribute in &relation.text_attributes {
            validate_identifier(attribute)?;
        }

        let (total_tuples, popularity_mass) = match (relation.total_tuples, relation.popularity_mass) {
            (Some(total), Some(mass)) => (total, mass),
            (total, mass) => {
                let (counted, summed) = self.relation_totals(relation)?;
                (total.unwrap_or(counted), mass.unwrap_or(summed))
            }
        };
        let page_size = relation
            .page_size
            .unwrap_or_else(|| RelationDescriptor::derive_page_size(total_tuples, page_divisor));

        Ok(RelationDescriptor {
            name: relation.name.clone(),
            id_column: relation.id_column.clone(),
            popularity_column: relation.popularity_column.clone(),
            text_attributes: relation.text_attributes.clone(),
            total_tuples,
            popularity_mass,
            page_size,
        })
    }
}

/// Table and column names are spliced into SQL text, so only plain
/// identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(Error::new(ErrorKind::InvalidArgument, format!("'{}' is not a valid SQL identifier", name)))
    }
}

/// One tuple of an in-memory relation.
#[derive(Debug, Clone)]
pub struct MemoryTuple {
    pub id: TupleId,
    pub popularity: f64,
    pub attributes: HashMap<String, String>,
}

impl MemoryTuple {
    pub fn new(id: i64, popularity: f64) -> Self {
        MemoryTuple {
            id: TupleId(id),
            popularity,
            attributes: HashMap::new(),
        }
    }

    pub fn with(mut self, attribute: &str, value: &str) -> Self {
        self.attributes.insert(attribute.to_string(), value.to_string());
        self
    }
}

/// Store held entirely in memory, for tests and small demos.
#[derive(Default)]
pub struct MemoryStore {
    relations: HashMap<String, Vec<MemoryTuple>>,
    join_tables: HashMap<String, Vec<(TupleId, TupleId)>>,
    cache_tables: RwLock<HashMap<String, Vec<TupleId>>>,
    failing_tables: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation; tuples are kept in page order.
    pub fn add_relation(&mut self, name: &str, mut tuples: Vec<MemoryTuple>) {
        tuples.sort_by(|a, b| b.popularity.total_cmp(&a.popularity).then(a.id.cmp(&b.id)));
        self.relations.insert(name.to_string(), tuples);
    }

    pub fn add_join_table(&mut self, name: &str, pairs: &[(i64, i64)]) {
        let pairs = pairs.iter().map(|&(l, r)| (TupleId(l), TupleId(r))).collect();
        self.join_tables.insert(name.to_string(), pairs);
    }

    /// Make every insert into `table` fail, as a broken connection would.
    pub fn fail_inserts_into(&mut self, table: &str) {
        self.failing_tables.push(table.to_string());
    }

    pub fn cache_ids(&self, table: &str) -> Vec<TupleId> {
        self.cache_tables.read().get(table).cloned().unwrap_or_default()
    }

    fn relation(&self, name: &str) -> Result<&Vec<MemoryTuple>> {
        self.relations
            .get(name)
            .ok_or_else(|| Error::database(format!("no such table: {}", name)))
    }
}

impl RelationStore for MemoryStore {
    fn relation_totals(&self, relation: &RelationConfig) -> Result<(u64, f64)> {
        let tuples = self.relation(&relation.name)?;
        let mass = tuples.iter().map(|t| t.popularity).sum();
        Ok((tuples.len() as u64, mass))
    }

    fn fetch_page(&self, descriptor: &RelationDescriptor, offset: u64, limit: usize) -> Result<Vec<TupleRow>> {
        let tuples = self.relation(&descriptor.name)?;
        let rows = tuples
            .iter()
            .skip(offset as usize)
            .take(limit)
            .map(|tuple| TupleRow {
                id: tuple.id,
                text_values: descriptor
                    .text_attributes
                    .iter()
                    .map(|a| tuple.attributes.get(a).cloned())
                    .collect(),
                popularity: tuple.popularity,
            })
            .collect();
        Ok(rows)
    }

    fn create_cache_table(&self, table: &str) -> Result<()> {
        validate_identifier(table)?;
        self.cache_tables.write().insert(table.to_string(), Vec::new());
        Ok(())
    }

    fn insert_cache_ids(&self, table: &str, ids: &[TupleId]) -> Result<()> {
        if self.failing_tables.iter().any(|t| t == table) {
            return Err(Error::database(format!("insert into {} failed", table)));
        }
        let mut tables = self.cache_tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| Error::database(format!("no such table: {}", table)))?;
        rows.extend_from_slice(ids);
        Ok(())
    }

    fn count_cache_rows(&self, table: &str) -> Result<u64> {
        self.cache_tables
            .read()
            .get(table)
            .map(|rows| rows.len() as u64)
            .ok_or_else(|| Error::database(format!("no such table: {}", table)))
    }

    fn load_join_pairs(&self, edge: &JoinEdgeConfig) -> Result<Vec<(TupleId, TupleId)>> {
        self.join_tables
            .get(&edge.table)
            .cloned()
            .ok_or_else(|| Error::database(format!("no such table: {}", edge.table)))
    }
}
