use crate::cache::partition::Partition;
use crate::core::error::Result;
use crate::core::types::Document;
use crate::relation::store::RelationStore;

/// One popularity-ordered page, ready to grow.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub documents: Vec<Document>,
    /// Popularity of the page's last tuple; None when the page is empty.
    pub last_popularity: Option<f64>,
}

/// Pages through a relation in descending popularity, one page per call,
/// starting at the partition's current offset.
pub struct PageFetcher<'a> {
    store: &'a dyn RelationStore,
}

impl<'a> PageFetcher<'a> {
    pub fn new(store: &'a dyn RelationStore) -> Self {
        PageFetcher { store }
    }

    pub fn fetch(&self, partition: &Partition) -> Result<FetchedPage> {
        let descriptor = &partition.descriptor;
        let rows = self.store.fetch_page(descriptor, partition.offset(), partition.page_size())?;

        let last_popularity = rows.last().map(|row| row.popularity);
        let documents = rows.iter().map(|row| descriptor.build_document(row)).collect();
        Ok(FetchedPage {
            documents,
            last_popularity,
        })
    }

    /// Fetch the page at the partition's offset and stage it.
    pub fn refill(&self, partition: &mut Partition) -> Result<()> {
        let page = self.fetch(partition)?;
        partition.stage(page.documents, page.last_popularity);
        Ok(())
    }
}
