//! Core identifiers and the walker record.

use crate::error::{Result, WalkError};

/// Vertex id.
pub type Vid = u32;
/// Block id.
pub type Bid = u32;
/// Walker id.
pub type Wid = u64;
/// Hop (step) count.
pub type Hid = u16;

/// Size in bytes of one persisted walker record.
pub const WALKER_RECORD_LEN: usize = 36;

const CRC_OFFSET: usize = WALKER_RECORD_LEN - 4;

/// One random walk's mutable state.
///
/// A walker lives in exactly one block queue (memory-resident or on disk)
/// until it terminates; it is never duplicated. `prev` and `source_block`
/// carry the one-hop history that multi-hop transition policies consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walker {
    pub id: Wid,
    /// Vertex the walk was seeded at.
    pub source: Vid,
    /// Vertex visited immediately before `cur`.
    pub prev: Vid,
    /// Current position.
    pub cur: Vid,
    pub step: Hid,
    /// Block that last emitted this walker.
    pub source_block: Bid,
    /// Block owning `cur`.
    pub cur_block: Bid,
}

impl Walker {
    /// Fresh walker seeded at `vertex` inside `block`.
    pub fn seeded(id: Wid, vertex: Vid, block: Bid) -> Self {
        Self {
            id,
            source: vertex,
            prev: vertex,
            cur: vertex,
            step: 0,
            source_block: block,
            cur_block: block,
        }
    }

    /// Appends the fixed-size record, trailing CRC included, to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.source.to_le_bytes());
        buf.extend_from_slice(&self.prev.to_le_bytes());
        buf.extend_from_slice(&self.cur.to_le_bytes());
        buf.extend_from_slice(&(self.step as u32).to_le_bytes());
        buf.extend_from_slice(&self.source_block.to_le_bytes());
        buf.extend_from_slice(&self.cur_block.to_le_bytes());
        let crc = crc32fast::hash(&buf[start..start + CRC_OFFSET]);
        buf.extend_from_slice(&crc.to_le_bytes());
    }

    /// Decodes one record, verifying length and CRC.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != WALKER_RECORD_LEN {
            return Err(WalkError::Corruption(format!(
                "walker record length {} != {}",
                bytes.len(),
                WALKER_RECORD_LEN
            )));
        }
        let stored = u32::from_le_bytes(bytes[CRC_OFFSET..].try_into().expect("4 bytes"));
        let actual = crc32fast::hash(&bytes[..CRC_OFFSET]);
        if stored != actual {
            return Err(WalkError::Corruption(format!(
                "walker record CRC mismatch: stored {stored:#010x}, computed {actual:#010x}"
            )));
        }
        let step = u32::from_le_bytes(bytes[20..24].try_into().expect("4 bytes"));
        if step > Hid::MAX as u32 {
            return Err(WalkError::Corruption(format!(
                "walker step count {step} out of range"
            )));
        }
        Ok(Self {
            id: u64::from_le_bytes(bytes[0..8].try_into().expect("8 bytes")),
            source: u32::from_le_bytes(bytes[8..12].try_into().expect("4 bytes")),
            prev: u32::from_le_bytes(bytes[12..16].try_into().expect("4 bytes")),
            cur: u32::from_le_bytes(bytes[16..20].try_into().expect("4 bytes")),
            step: step as Hid,
            source_block: u32::from_le_bytes(bytes[24..28].try_into().expect("4 bytes")),
            cur_block: u32::from_le_bytes(bytes[28..32].try_into().expect("4 bytes")),
        })
    }
}
