use std::fs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::index::segment::SegmentId;
use crate::storage::layout::PartitionLayout;
use crate::storage::segment_file::write_synced;

/// Last committed state of a partition index: which segments are live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u64,
    pub segments: Vec<SegmentId>,
    pub timestamp: DateTime<Utc>,
    pub doc_count: usize,
}

impl Checkpoint {
    /// Load checkpoint from disk
    pub fn load(layout: &PartitionLayout) -> Result<Option<Self>> {
        let path = layout.checkpoint_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path)
            .map_err(|e| Error::index_io(format!("cannot read {}: {}", path.display(), e)))?;
        let checkpoint = bincode::deserialize(&data)?;
        Ok(Some(checkpoint))
    }

    /// Replace the checkpoint atomically (write aside, then rename).
    pub fn save(&self, layout: &PartitionLayout) -> Result<()> {
        let data = bincode::serialize(self)
            .map_err(|e| Error::index_io(format!("cannot encode checkpoint: {}", e)))?;
        let path = layout.checkpoint_path();
        let tmp = path.with_extension("bin.tmp");

        write_synced(&tmp, &[&data])?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::index_io(format!("cannot publish {}: {}", path.display(), e)))?;
        Ok(())
    }
}
