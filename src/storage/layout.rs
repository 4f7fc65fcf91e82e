use std::fs;
use std::path::PathBuf;
use crate::core::error::{Error, Result};
use crate::index::segment::SegmentId;

/// Directory structure of one persisted partition index
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    pub base_dir: PathBuf,      // <index_dir>/<cache table>
    pub segments_dir: PathBuf,  // Sealed segments (.seg files)
    pub meta_dir: PathBuf,      // Checkpoint
}

impl PartitionLayout {
    /// Create the directory tree, or wipe and recreate it when `recreate` is
    /// set (a fresh run always starts from an empty cache).
    pub fn new(base_dir: PathBuf, recreate: bool) -> Result<Self> {
        let segments_dir = base_dir.join("segments");
        let meta_dir = base_dir.join("meta");

        if recreate && base_dir.exists() {
            fs::remove_dir_all(&base_dir)
                .map_err(|e| Error::index_io(format!("cannot clear {}: {}", base_dir.display(), e)))?;
        }
        for dir in [&segments_dir, &meta_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| Error::index_io(format!("cannot create {}: {}", dir.display(), e)))?;
        }

        Ok(PartitionLayout {
            base_dir,
            segments_dir,
            meta_dir,
        })
    }

    pub fn segment_path(&self, id: &SegmentId) -> PathBuf {
        self.segments_dir.join(format!("{}.seg", id.0))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.meta_dir.join("checkpoint.bin")
    }
}
