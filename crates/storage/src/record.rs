// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record framing for data written into the shared container
//!
//! Every frame is a fixed 48-byte little-endian header followed by the
//! payload:
//!
//! ```text
//! 0   magic        u32
//! 4   crc32        u32   over bytes 8..48 and the payload
//! 8   stream_id    [u8; 16]
//! 24  epoch        u64   allocation epoch of the chunk holding the frame
//! 32  position     u64   stream offset of the first payload byte
//! 40  payload_len  u32
//! 44  flags        u32
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use sl_core::StreamId;
use thiserror::Error;

pub const RECORD_MAGIC: u32 = 0x534c_5244;
pub const HEADER_LEN: usize = 48;

/// Set on the last record sealed by a flush
pub const FLAG_BARRIER: u32 = 1;

/// Errors decoding a frame
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("bad magic {0:#010x}")]
    BadMagic(u32),
    #[error("frame truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub stream_id: StreamId,
    pub epoch: u64,
    pub position: u64,
    pub payload_len: u32,
    pub flags: u32,
}

impl RecordHeader {
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.payload_len as usize
    }

    pub fn end(&self) -> u64 {
        self.position + u64::from(self.payload_len)
    }

    pub fn is_barrier(&self) -> bool {
        self.flags & FLAG_BARRIER != 0
    }
}

/// Encode a frame for `payload`; `header.payload_len` is taken from the payload
pub fn encode(header: &RecordHeader, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    // Writes into a Vec cannot fail
    let _ = buf.write_u32::<LittleEndian>(RECORD_MAGIC);
    let _ = buf.write_u32::<LittleEndian>(0);
    buf.extend_from_slice(header.stream_id.as_bytes());
    let _ = buf.write_u64::<LittleEndian>(header.epoch);
    let _ = buf.write_u64::<LittleEndian>(header.position);
    let _ = buf.write_u32::<LittleEndian>(payload.len() as u32);
    let _ = buf.write_u32::<LittleEndian>(header.flags);
    buf.extend_from_slice(payload);

    let crc = checksum(&buf[8..HEADER_LEN], payload);
    LittleEndian::write_u32(&mut buf[4..8], crc);
    buf
}

/// Decode the header of the frame at the start of `buf`
///
/// Only the magic is checked; use [`decode`] to verify the payload.
pub fn decode_header(buf: &[u8]) -> Result<RecordHeader, RecordError> {
    if buf.len() < HEADER_LEN {
        return Err(RecordError::Truncated {
            need: HEADER_LEN,
            have: buf.len(),
        });
    }
    let magic = LittleEndian::read_u32(&buf[0..4]);
    if magic != RECORD_MAGIC {
        return Err(RecordError::BadMagic(magic));
    }
    let mut id = [0u8; 16];
    id.copy_from_slice(&buf[8..24]);
    Ok(RecordHeader {
        stream_id: StreamId::from_bytes(id),
        epoch: LittleEndian::read_u64(&buf[24..32]),
        position: LittleEndian::read_u64(&buf[32..40]),
        payload_len: LittleEndian::read_u32(&buf[40..44]),
        flags: LittleEndian::read_u32(&buf[44..48]),
    })
}

/// Decode and verify the frame at the start of `buf`
pub fn decode(buf: &[u8]) -> Result<(RecordHeader, &[u8]), RecordError> {
    let header = decode_header(buf)?;
    let need = header.frame_len();
    if buf.len() < need {
        return Err(RecordError::Truncated {
            need,
            have: buf.len(),
        });
    }
    let payload = &buf[HEADER_LEN..need];
    let stored = LittleEndian::read_u32(&buf[4..8]);
    let computed = checksum(&buf[8..HEADER_LEN], payload);
    if stored != computed {
        return Err(RecordError::ChecksumMismatch { stored, computed });
    }
    Ok((header, payload))
}

fn checksum(header_tail: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(header_tail);
    hasher.update(payload);
    hasher.finalize()
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
