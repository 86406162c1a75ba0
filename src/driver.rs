//! Block-granular disk access.
//!
//! The engine core never touches files directly; everything goes through
//! [`StorageDriver`]. The trait is the seam test doubles and alternative
//! backends plug into, [`FileDriver`] is the production implementation over
//! one edge file and one walk-queue file per block.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{Bid, Walker, WALKER_RECORD_LEN};

/// Result of one chunked walk-queue read.
pub struct WalkQueueChunk {
    /// Records that decoded and passed their CRC.
    pub walkers: Vec<Walker>,
    /// Records consumed but dropped as corrupt.
    pub dropped: u64,
    /// Total records consumed from the queue, valid or not.
    pub read: u64,
}

/// Disk collaborator: block edge data plus per-block walk queues.
///
/// Walk queues are append-only streams of fixed-size walker records
/// ([`WALKER_RECORD_LEN`] bytes each); `write_walk_queue` replaces a queue
/// wholesale, which the walk manager uses to truncate drained backlogs.
pub trait StorageDriver: Send + Sync {
    /// Reads block `b`'s entire edge buffer into `buf`, replacing its
    /// contents.
    fn read_block_edges(&self, b: Bid, buf: &mut Vec<u8>) -> Result<()>;

    /// Writes block `b`'s edge buffer; used by ingestion and fixtures.
    fn write_block_edges(&self, b: Bid, data: &[u8]) -> Result<()>;

    /// Reads up to `limit` walker records starting at record `offset`.
    /// Corrupt records are counted, not returned, and never fail the read.
    fn read_walk_queue(&self, b: Bid, offset: u64, limit: usize) -> Result<WalkQueueChunk>;

    /// Replaces block `b`'s walk queue with `walkers`.
    fn write_walk_queue(&self, b: Bid, walkers: &[Walker]) -> Result<()>;

    /// Appends `walkers` to block `b`'s walk queue.
    fn append_walk_queue(&self, b: Bid, walkers: &[Walker]) -> Result<()>;

    /// Number of whole records currently in block `b`'s walk queue.
    fn walk_queue_len(&self, b: Bid) -> Result<u64>;
}

/// Per-block files under one base directory: `block_<b>.adj` for edge data,
/// `walk_<b>.q` for the walk queue.
pub struct FileDriver {
    base: PathBuf,
}

impl FileDriver {
    pub fn new(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        std::fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn block_path(&self, b: Bid) -> PathBuf {
        self.base.join(format!("block_{b}.adj"))
    }

    fn walk_path(&self, b: Bid) -> PathBuf {
        self.base.join(format!("walk_{b}.q"))
    }
}

fn encode_all(walkers: &[Walker]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(walkers.len() * WALKER_RECORD_LEN);
    for w in walkers {
        w.encode_into(&mut buf);
    }
    buf
}

impl StorageDriver for FileDriver {
    fn read_block_edges(&self, b: Bid, buf: &mut Vec<u8>) -> Result<()> {
        let mut file = File::open(self.block_path(b))?;
        buf.clear();
        file.read_to_end(buf)?;
        Ok(())
    }

    fn write_block_edges(&self, b: Bid, data: &[u8]) -> Result<()> {
        std::fs::write(self.block_path(b), data)?;
        Ok(())
    }

    fn read_walk_queue(&self, b: Bid, offset: u64, limit: usize) -> Result<WalkQueueChunk> {
        let mut file = File::open(self.walk_path(b))?;
        let total = file.metadata()?.len() / WALKER_RECORD_LEN as u64;
        let avail = total.saturating_sub(offset).min(limit as u64);
        let mut chunk = WalkQueueChunk {
            walkers: Vec::with_capacity(avail as usize),
            dropped: 0,
            read: avail,
        };
        if avail == 0 {
            return Ok(chunk);
        }
        file.seek(SeekFrom::Start(offset * WALKER_RECORD_LEN as u64))?;
        let mut raw = vec![0u8; avail as usize * WALKER_RECORD_LEN];
        file.read_exact(&mut raw)?;
        for rec in raw.chunks_exact(WALKER_RECORD_LEN) {
            match Walker::decode(rec) {
                Ok(w) => chunk.walkers.push(w),
                Err(_) => chunk.dropped += 1,
            }
        }
        Ok(chunk)
    }

    fn write_walk_queue(&self, b: Bid, walkers: &[Walker]) -> Result<()> {
        std::fs::write(self.walk_path(b), encode_all(walkers))?;
        Ok(())
    }

    fn append_walk_queue(&self, b: Bid, walkers: &[Walker]) -> Result<()> {
        if walkers.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.walk_path(b))?;
        file.write_all(&encode_all(walkers))?;
        Ok(())
    }

    fn walk_queue_len(&self, b: Bid) -> Result<u64> {
        match std::fs::metadata(self.walk_path(b)) {
            Ok(meta) => Ok(meta.len() / WALKER_RECORD_LEN as u64),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
