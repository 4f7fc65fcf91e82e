use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use crc32fast::Hasher;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::segment::{Segment, SegmentId};
use crate::storage::layout::PartitionLayout;

/// Segment file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub version: u32,      // Format version
    pub doc_count: u32,    // Number of documents
    pub checksum: u32,     // CRC32 of the compressed body
    pub raw_len: u64,      // Body size before compression
}

impl SegmentHeader {
    pub const MAGIC: [u8; 4] = *b"RCSG";
    pub const VERSION: u32 = 1;
    pub const SIZE: usize = 24;

    fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&Self::MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.doc_count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..24].copy_from_slice(&self.raw_len.to_le_bytes());
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE || buf[0..4] != Self::MAGIC {
            return Err(Error::new(ErrorKind::Corrupted, "not a segment file".to_string()));
        }
        let word = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let mut raw_len = [0u8; 8];
        raw_len.copy_from_slice(&buf[16..24]);

        Ok(SegmentHeader {
            version: word(4),
            doc_count: word(8),
            checksum: word(12),
            raw_len: u64::from_le_bytes(raw_len),
        })
    }
}

// [ HEADER (magic, version, doc_count, checksum, raw_len) ] <- byte 0
// [ LZ4 BLOCK (bincode Segment) ]
pub fn write_segment(layout: &PartitionLayout, segment: &Segment) -> Result<u64> {
    let raw = bincode::serialize(segment)
        .map_err(|e| Error::index_io(format!("cannot encode segment {}: {}", segment.id.0, e)))?;
    let body = lz4_flex::block::compress(&raw);

    let mut hasher = Hasher::new();
    hasher.update(&body);
    let header = SegmentHeader {
        version: SegmentHeader::VERSION,
        doc_count: segment.doc_count() as u32,
        checksum: hasher.finalize(),
        raw_len: raw.len() as u64,
    };

    let path = layout.segment_path(&segment.id);
    let tmp = path.with_extension("seg.tmp");
    write_synced(&tmp, &[&header.encode(), &body])?;
    fs::rename(&tmp, &path)
        .map_err(|e| Error::index_io(format!("cannot publish {}: {}", path.display(), e)))?;

    Ok((SegmentHeader::SIZE + body.len()) as u64)
}

pub fn read_segment(layout: &PartitionLayout, id: &SegmentId) -> Result<Segment> {
    let path = layout.segment_path(id);
    let data = fs::read(&path)
        .map_err(|e| Error::index_io(format!("cannot read {}: {}", path.display(), e)))?;

    let header = SegmentHeader::decode(&data)?;
    if header.version != SegmentHeader::VERSION {
        return Err(Error::new(
            ErrorKind::Corrupted,
            format!("{}: unsupported segment version {}", path.display(), header.version),
        ));
    }

    let body = &data[SegmentHeader::SIZE..];
    let mut hasher = Hasher::new();
    hasher.update(body);
    if hasher.finalize() != header.checksum {
        return Err(Error::new(ErrorKind::Corrupted, format!("{}: checksum mismatch", path.display())));
    }

    let raw = lz4_flex::block::decompress(body, header.raw_len as usize)
        .map_err(|e| Error::new(ErrorKind::Corrupted, format!("{}: {}", path.display(), e)))?;
    let segment: Segment = bincode::deserialize(&raw)?;

    if segment.doc_count() != header.doc_count as usize {
        return Err(Error::new(ErrorKind::Corrupted, format!("{}: document count mismatch", path.display())));
    }
    Ok(segment)
}

pub(crate) fn write_synced(path: &Path, parts: &[&[u8]]) -> Result<()> {
    let io_err = |e: std::io::Error| Error::index_io(format!("cannot write {}: {}", path.display(), e));

    let mut file = File::create(path).map_err(io_err)?;
    for part in parts {
        file.write_all(part).map_err(io_err)?;
    }
    file.sync_all().map_err(io_err)?;
    Ok(())
}
