use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use chrono::Utc;
use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Document;
use crate::index::segment::Segment;
use crate::index::snapshot::{IndexSnapshot, SnapshotController};
use crate::storage::checkpoint::Checkpoint;
use crate::storage::layout::PartitionLayout;
use crate::storage::segment_file::{read_segment, write_segment};

/// Incremental index of one partition.
///
/// `append` only buffers; `commit` seals the buffer into a segment, persists
/// it when a directory is attached, and publishes a new snapshot. Readers
/// never observe uncommitted documents.
pub struct PartitionIndex {
    pub name: String,
    analyzer: Arc<Analyzer>,
    pending: Vec<Document>,
    snapshots: SnapshotController,
    layout: Option<PartitionLayout>,
}

impl PartitionIndex {
    /// Purely in-memory index.
    pub fn in_memory(name: &str, analyzer: Arc<Analyzer>) -> Self {
        PartitionIndex {
            name: name.to_string(),
            analyzer,
            pending: Vec::new(),
            snapshots: SnapshotController::new(),
            layout: None,
        }
    }

    /// Fresh, empty on-disk index. Anything previously stored under `dir` is
    /// discarded.
    pub fn create(name: &str, dir: PathBuf, analyzer: Arc<Analyzer>) -> Result<Self> {
        let layout = PartitionLayout::new(dir, true)
            .map_err(|e| e.with_context(format!("index '{}'", name)))?;

        let index = PartitionIndex {
            name: name.to_string(),
            analyzer,
            pending: Vec::new(),
            snapshots: SnapshotController::new(),
            layout: Some(layout),
        };
        index.save_checkpoint(&index.snapshots.current_snapshot())?;
        Ok(index)
    }

    /// Reopen the last committed state of an on-disk index.
    pub fn reopen(name: &str, dir: PathBuf, analyzer: Arc<Analyzer>) -> Result<Self> {
        let layout = PartitionLayout::new(dir, false)?;
        let checkpoint = Checkpoint::load(&layout)?
            .ok_or_else(|| Error::index_io(format!("index '{}' has no checkpoint", name)))?;

        let mut segments = Vec::with_capacity(checkpoint.segments.len());
        for id in &checkpoint.segments {
            segments.push(Arc::new(read_segment(&layout, id)?));
        }
        let recovered: usize = segments.iter().map(|s| s.doc_count()).sum();
        if recovered != checkpoint.doc_count {
            return Err(Error::new(
                ErrorKind::Corrupted,
                format!("index '{}': checkpoint lists {} documents, segments hold {}",
                        name, checkpoint.doc_count, recovered),
            ));
        }

        Ok(PartitionIndex {
            name: name.to_string(),
            analyzer,
            pending: Vec::new(),
            snapshots: SnapshotController::with_segments(segments),
            layout: Some(layout),
        })
    }

    pub fn append(&mut self, docs: impl IntoIterator<Item = Document>) {
        self.pending.extend(docs);
    }

    /// Make every appended document visible to snapshots opened afterwards.
    pub fn commit(&mut self) -> Result<Arc<IndexSnapshot>> {
        let docs = mem::take(&mut self.pending);
        let mut segments = self.snapshots.current_snapshot().segments.clone();

        if !docs.is_empty() {
            let segment = Segment::build(&docs, &self.analyzer);
            if let Some(layout) = &self.layout {
                write_segment(layout, &segment)
                    .map_err(|e| e.with_context(format!("index '{}'", self.name)))?;
            }
            segments.push(Arc::new(segment));
        }

        let snapshot = self.snapshots.publish(segments);
        self.save_checkpoint(&snapshot)?;
        Ok(snapshot)
    }

    fn save_checkpoint(&self, snapshot: &IndexSnapshot) -> Result<()> {
        let Some(layout) = &self.layout else {
            return Ok(());
        };
        Checkpoint {
            version: snapshot.version,
            segments: snapshot.segments.iter().map(|s| s.id).collect(),
            timestamp: Utc::now(),
            doc_count: snapshot.doc_count,
        }
        .save(layout)
        .map_err(|e| e.with_context(format!("index '{}'", self.name)))
    }

    /// Read-only view as of the latest commit.
    pub fn open_snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshots.current_snapshot()
    }

    pub fn committed_doc_count(&self) -> usize {
        self.snapshots.current_snapshot().doc_count
    }

    pub fn pending_doc_count(&self) -> usize {
        self.pending.len()
    }

    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    pub fn is_persistent(&self) -> bool {
        self.layout.is_some()
    }
}
