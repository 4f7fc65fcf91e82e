use std::mem;
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, TupleId};
use crate::index::writer::PartitionIndex;
use crate::relation::descriptor::RelationDescriptor;
use crate::relation::store::RelationStore;

/// One relation's growing cache: an incremental index plus the mirrored
/// identifier table, both holding exactly the tuples grown so far.
pub struct Partition {
    pub descriptor: RelationDescriptor,
    pub cache_table: String,
    index: PartitionIndex,
    offset: u64,
    last_popularity: Option<f64>,   // None once the relation has no more pages
    staged: Vec<Document>,          // next page, fetched but not yet grown
}

impl Partition {
    /// Empty partition. The cache table is (re)created empty.
    pub fn create(
        store: &dyn RelationStore,
        descriptor: RelationDescriptor,
        cache_table: String,
        index: PartitionIndex,
    ) -> Result<Self> {
        if index.committed_doc_count() != 0 {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("partition {} must start from an empty index", descriptor.name),
            ));
        }
        store.create_cache_table(&cache_table)?;

        Ok(Partition {
            descriptor,
            cache_table,
            index,
            offset: 0,
            last_popularity: None,
            staged: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.descriptor.page_size
    }

    pub fn last_popularity(&self) -> Option<f64> {
        self.last_popularity
    }

    /// `last_popularity / popularity_mass`, or None when exhausted.
    pub fn normalized_popularity(&self) -> Option<f64> {
        self.last_popularity.map(|p| self.descriptor.normalize(p))
    }

    pub fn is_exhausted(&self) -> bool {
        self.last_popularity.is_none()
    }

    pub fn index(&self) -> &PartitionIndex {
        &self.index
    }

    /// Remember the page to grow next and its last popularity.
    pub fn stage(&mut self, documents: Vec<Document>, last_popularity: Option<f64>) {
        self.staged = documents;
        self.last_popularity = last_popularity;
    }

    pub fn take_staged(&mut self) -> Vec<Document> {
        mem::take(&mut self.staged)
    }

    /// Add one page: batch insert into the cache table, then append and
    /// commit the index. Either step failing leaves the partition unusable.
    pub fn grow(&mut self, store: &dyn RelationStore, documents: Vec<Document>) -> Result<usize> {
        let ids: Vec<TupleId> = documents.iter().map(|d| d.id).collect();
        store.insert_cache_ids(&self.cache_table, &ids)?;

        let added = documents.len();
        self.index.append(documents);
        let snapshot = self.index.commit()?;
        debug!(
            "Partition {} grew by {} documents (index version {}, {} documents)",
            self.descriptor.name, added, snapshot.version, snapshot.doc_count
        );
        Ok(added)
    }

    /// Move the cursor one full page, whatever the page actually held.
    pub fn advance(&mut self) {
        self.offset += self.descriptor.page_size as u64;
    }

    pub fn committed_documents(&self) -> usize {
        self.index.committed_doc_count()
    }

    pub fn cache_rows(&self, store: &dyn RelationStore) -> Result<u64> {
        store.count_cache_rows(&self.cache_table)
    }

    /// Index and cache table hold the same number of tuples.
    pub fn is_consistent(&self, store: &dyn RelationStore) -> Result<bool> {
        Ok(self.cache_rows(store)? == self.committed_documents() as u64)
    }
}
