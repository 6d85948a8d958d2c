// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of a physical log container
//!
//! ```text
//! [0, 4096)                      header page (fixed geometry, CRC)
//! [4096, 4096 + slot)            metadata slot 0
//! [4096 + slot, 4096 + 2*slot)   metadata slot 1
//! [data_offset, ...)             chunk_count chunks of chunk_size bytes
//! ```
//!
//! The superblock (stream table, chunk chains, aliases) is stored as JSON
//! in the two metadata slots alternately; the valid slot with the highest
//! generation wins on open.

use crate::record::HEADER_LEN;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use sl_core::settings::PAGE_SIZE;
use sl_core::{LogError, LogId, StreamId, WritePath};
use std::collections::BTreeMap;
use std::path::PathBuf;

const CONTAINER_MAGIC: u32 = 0x534c_5043;
const SLOT_MAGIC: u32 = 0x534c_4d53;
const LAYOUT_VERSION: u32 = 1;

/// Header bytes covered by the header CRC
const HEADER_BODY_LEN: usize = 64;
pub(crate) const SLOT_HEADER_LEN: usize = 24;

/// Metadata budget reserved per stream and per chunk when sizing a slot
const SLOT_BYTES_PER_STREAM: u64 = 2048;
const SLOT_BYTES_PER_CHUNK: u64 = 128;

/// Fixed geometry of a container, written once at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ContainerLayout {
    pub id: LogId,
    pub capacity: u64,
    pub max_streams: u32,
    pub chunk_size: u32,
    pub slot_size: u64,
    pub data_offset: u64,
    pub chunk_count: u64,
}

impl ContainerLayout {
    pub fn compute(
        id: LogId,
        capacity: u64,
        max_streams: u32,
        max_block_size: u32,
    ) -> Result<Self, LogError> {
        let chunk = u64::from(max_block_size);
        if chunk < PAGE_SIZE || chunk % PAGE_SIZE != 0 {
            return Err(LogError::InvalidArgument(format!(
                "maximum block size must be a non-zero multiple of {PAGE_SIZE}, got {chunk}"
            )));
        }
        if max_streams == 0 {
            return Err(LogError::InvalidArgument(
                "maximum stream count must be at least 1".into(),
            ));
        }

        let estimated_chunks = capacity / chunk;
        let slot_size = round_up(
            PAGE_SIZE
                + u64::from(max_streams) * SLOT_BYTES_PER_STREAM
                + estimated_chunks * SLOT_BYTES_PER_CHUNK,
            PAGE_SIZE,
        );
        let data_offset = PAGE_SIZE + 2 * slot_size;
        let chunk_count = capacity.saturating_sub(data_offset) / chunk;
        if chunk_count == 0 {
            return Err(LogError::InvalidArgument(format!(
                "capacity {capacity} leaves no room for data after {data_offset} bytes of metadata"
            )));
        }

        Ok(Self {
            id,
            capacity,
            max_streams,
            chunk_size: max_block_size,
            slot_size,
            data_offset,
            chunk_count,
        })
    }

    /// Bytes available for stream data
    pub fn data_capacity(&self) -> u64 {
        self.chunk_count * u64::from(self.chunk_size)
    }

    pub fn chunk_offset(&self, index: u64) -> u64 {
        self.data_offset + index * u64::from(self.chunk_size)
    }

    pub fn slot_offset(&self, slot: u64) -> u64 {
        PAGE_SIZE + (slot % 2) * self.slot_size
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PAGE_SIZE as usize);
        let _ = buf.write_u32::<LittleEndian>(CONTAINER_MAGIC);
        let _ = buf.write_u32::<LittleEndian>(LAYOUT_VERSION);
        buf.extend_from_slice(self.id.as_bytes());
        let _ = buf.write_u64::<LittleEndian>(self.capacity);
        let _ = buf.write_u32::<LittleEndian>(self.max_streams);
        let _ = buf.write_u32::<LittleEndian>(self.chunk_size);
        let _ = buf.write_u64::<LittleEndian>(self.slot_size);
        let _ = buf.write_u64::<LittleEndian>(self.data_offset);
        let _ = buf.write_u64::<LittleEndian>(self.chunk_count);
        let crc = crc32fast::hash(&buf[..HEADER_BODY_LEN]);
        let _ = buf.write_u32::<LittleEndian>(crc);
        buf.resize(PAGE_SIZE as usize, 0);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, LogError> {
        if buf.len() < HEADER_BODY_LEN + 4 {
            return Err(LogError::Metadata("container header truncated".into()));
        }
        let magic = LittleEndian::read_u32(&buf[0..4]);
        if magic != CONTAINER_MAGIC {
            return Err(LogError::Metadata(format!(
                "not a shared log container (magic {magic:#010x})"
            )));
        }
        let stored = LittleEndian::read_u32(&buf[HEADER_BODY_LEN..HEADER_BODY_LEN + 4]);
        if stored != crc32fast::hash(&buf[..HEADER_BODY_LEN]) {
            return Err(LogError::Metadata("container header checksum mismatch".into()));
        }
        let version = LittleEndian::read_u32(&buf[4..8]);
        if version != LAYOUT_VERSION {
            return Err(LogError::Metadata(format!(
                "unsupported container version {version}"
            )));
        }
        let mut id = [0u8; 16];
        id.copy_from_slice(&buf[8..24]);
        Ok(Self {
            id: LogId::from_bytes(id),
            capacity: LittleEndian::read_u64(&buf[24..32]),
            max_streams: LittleEndian::read_u32(&buf[32..36]),
            chunk_size: LittleEndian::read_u32(&buf[36..40]),
            slot_size: LittleEndian::read_u64(&buf[40..48]),
            data_offset: LittleEndian::read_u64(&buf[48..56]),
            chunk_count: LittleEndian::read_u64(&buf[56..64]),
        })
    }
}

/// One chunk in a stream's chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChunkEntry {
    pub index: u64,
    /// Stream position of the first payload byte stored in the chunk
    pub base: u64,
    /// Allocation epoch; frames in the chunk carry the same value
    pub epoch: u64,
    /// Positions at or beyond the limit were cut by a tail truncation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// Persistent description of one logical log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StreamMeta {
    pub id: StreamId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub max_size: u64,
    pub max_block_size: u32,
    pub head: u64,
    pub write_path: WritePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedicated_path: Option<PathBuf>,
    #[serde(default)]
    pub chain: Vec<ChunkEntry>,
}

/// Mutable container metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Superblock {
    pub next_epoch: u64,
    pub streams: BTreeMap<StreamId, StreamMeta>,
}

impl Superblock {
    pub fn stream_by_alias(&self, alias: &str) -> Option<&StreamMeta> {
        self.streams
            .values()
            .find(|s| s.alias.as_deref() == Some(alias))
    }

    pub fn reserved_bytes(&self) -> u64 {
        self.streams.values().map(|s| s.max_size).sum()
    }

    /// Chunks set aside for the quotas of every stream
    pub fn reserved_chunks(&self, chunk_size: u32) -> u64 {
        self.streams
            .values()
            .map(|s| chunk_quota(s.max_size, chunk_size))
            .sum()
    }
}

/// Most chunks a stream of `max_size` bytes may hold at once
///
/// Every chunk between the first and the last of a chain carries at least
/// `chunk_size - 2 * HEADER_LEN` live bytes; one more is held while the
/// last chunk is being compacted.
pub(crate) fn chunk_quota(max_size: u64, chunk_size: u32) -> u64 {
    let per_chunk = u64::from(chunk_size) - 2 * HEADER_LEN as u64;
    max_size / per_chunk + 3
}

/// Encode a metadata slot; fails if the superblock outgrew the slot
pub(crate) fn encode_slot(
    generation: u64,
    superblock: &Superblock,
    slot_size: u64,
) -> Result<Vec<u8>, LogError> {
    let json = serde_json::to_vec(superblock)?;
    if (SLOT_HEADER_LEN + json.len()) as u64 > slot_size {
        return Err(LogError::Metadata(format!(
            "superblock of {} bytes exceeds metadata slot of {} bytes",
            json.len(),
            slot_size
        )));
    }
    let mut buf = Vec::with_capacity(SLOT_HEADER_LEN + json.len());
    let _ = buf.write_u32::<LittleEndian>(SLOT_MAGIC);
    let _ = buf.write_u32::<LittleEndian>(0);
    let _ = buf.write_u64::<LittleEndian>(generation);
    let _ = buf.write_u32::<LittleEndian>(json.len() as u32);
    let _ = buf.write_u32::<LittleEndian>(0);
    buf.extend_from_slice(&json);
    let crc = crc32fast::hash(&buf[8..]);
    LittleEndian::write_u32(&mut buf[4..8], crc);
    Ok(buf)
}

/// Decode a metadata slot; `None` for empty, torn or corrupt slots
pub(crate) fn decode_slot(buf: &[u8]) -> Option<(u64, Superblock)> {
    if buf.len() < SLOT_HEADER_LEN || LittleEndian::read_u32(&buf[0..4]) != SLOT_MAGIC {
        return None;
    }
    let stored = LittleEndian::read_u32(&buf[4..8]);
    let generation = LittleEndian::read_u64(&buf[8..16]);
    let len = LittleEndian::read_u32(&buf[16..20]) as usize;
    let end = SLOT_HEADER_LEN.checked_add(len)?;
    if end > buf.len() || crc32fast::hash(&buf[8..end]) != stored {
        return None;
    }
    let superblock = serde_json::from_slice(&buf[SLOT_HEADER_LEN..end]).ok()?;
    Some((generation, superblock))
}

/// Pick the newest valid superblock from the two slots
pub(crate) fn newest_slot(slot0: &[u8], slot1: &[u8]) -> Option<(u64, Superblock)> {
    match (decode_slot(slot0), decode_slot(slot1)) {
        (Some(a), Some(b)) => Some(if a.0 >= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

pub(crate) fn round_up(value: u64, to: u64) -> u64 {
    value.div_ceil(to) * to
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
