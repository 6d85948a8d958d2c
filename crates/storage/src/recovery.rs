// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rebuilding a stream's state when it is opened
//!
//! The chunk chain is scanned in order. A frame is accepted only if its
//! checksum holds and it carries the stream's id, the chunk's epoch and the
//! next expected position; the first frame that fails ends the chunk. A
//! chunk whose base does not continue the scanned data ends the chain,
//! unless the missing range lies below the head.

use crate::container::ContainerShared;
use crate::dedicated::{FileLogHeader, SparseFileStore};
use crate::index::{RecordIndex, RecordRef};
use crate::io::{blocking, check_cancel};
use crate::layout::{ChunkEntry, StreamMeta};
use crate::record::{self, HEADER_LEN};
use crate::stream::{ChunkTail, LogicalLog, StreamShared, StreamState};
use sl_adapters::FileAdapter;
use sl_core::{LogError, StreamId, WritePath};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of scanning a chain
#[derive(Debug, Default)]
pub(crate) struct ChainScan {
    pub index: RecordIndex,
    /// Position after the last accepted byte
    pub end: u64,
    pub tail: Option<ChunkTail>,
    /// Leading chain entries that hold usable data
    pub valid_entries: usize,
}

/// Frames accepted from one chunk
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ChunkScan {
    pub records: Vec<RecordRef>,
    /// Bytes of the chunk occupied by accepted frames
    pub used: u64,
    /// Position after the last accepted byte
    pub end: u64,
}

/// Accept frames from `chunk` starting at `start`
pub(crate) fn scan_chunk(
    chunk: &[u8],
    chunk_offset: u64,
    stream: StreamId,
    entry: &ChunkEntry,
    start: u64,
) -> ChunkScan {
    let mut records = Vec::new();
    let mut offset = 0usize;
    let mut position = start;
    while offset + HEADER_LEN <= chunk.len() {
        if entry.limit.is_some_and(|limit| position >= limit) {
            break;
        }
        let header = match record::decode(&chunk[offset..]) {
            Ok((header, _)) => header,
            Err(_) => break,
        };
        if header.stream_id != stream || header.epoch != entry.epoch || header.position != position {
            break;
        }
        let visible = match entry.limit {
            Some(limit) => u64::from(header.payload_len).min(limit - position),
            None => u64::from(header.payload_len),
        };
        records.push(RecordRef {
            position,
            len: visible as u32,
            payload_len: header.payload_len,
            offset: chunk_offset + offset as u64,
            epoch: entry.epoch,
        });
        position += visible;
        offset += header.frame_len();
    }
    ChunkScan {
        records,
        used: offset as u64,
        end: position,
    }
}

/// Scan every chunk of `meta`'s chain
pub(crate) async fn scan_chain(
    container: &ContainerShared,
    meta: &StreamMeta,
    cancel: &CancellationToken,
) -> Result<ChainScan, LogError> {
    let chunk_size = container.layout.chunk_size as usize;
    let mut scan = ChainScan::default();
    let mut expected: Option<u64> = None;

    for entry in &meta.chain {
        check_cancel(cancel)?;
        let start = match expected {
            None => entry.base,
            Some(e) if entry.base == e => e,
            Some(e) if entry.base > e && entry.base <= meta.head => entry.base,
            Some(e) => {
                tracing::warn!(
                    stream = %meta.id,
                    chunk = entry.index,
                    expected = e,
                    base = entry.base,
                    "chunk chain is discontinuous, ignoring later chunks"
                );
                break;
            }
        };

        let chunk_offset = container.layout.chunk_offset(entry.index);
        let chunk = container.read_at(chunk_size, chunk_offset).await?;
        let found = scan_chunk(&chunk, chunk_offset, meta.id, entry, start);
        let records = found.records.len() as u32;
        for record in found.records {
            scan.index.push(record);
        }
        scan.valid_entries += 1;
        scan.end = found.end;
        expected = Some(found.end);
        scan.tail = match entry.limit {
            None => Some(ChunkTail {
                index: entry.index,
                epoch: entry.epoch,
                used: found.used,
                records,
            }),
            Some(_) => None,
        };
        if entry.limit.is_some_and(|limit| found.end < limit) {
            tracing::warn!(
                stream = %meta.id,
                chunk = entry.index,
                end = found.end,
                "chunk ends before its truncation limit, ignoring later chunks"
            );
            break;
        }
    }
    Ok(scan)
}

/// Open the dedicated file of a stream, recreating it when allowed
async fn open_dedicated<F: FileAdapter>(
    meta: &StreamMeta,
    read_only: bool,
    files: &F,
) -> Result<Option<(SparseFileStore, FileLogHeader)>, LogError> {
    let Some(path) = meta.dedicated_path.clone() else {
        return Ok(None);
    };
    let opener = path.clone();
    match blocking(move || SparseFileStore::open(&opener, read_only)).await {
        Ok((store, header)) => {
            if header.stream_id != meta.id {
                return Err(LogError::Metadata(format!(
                    "{} belongs to stream {}, not {}",
                    path.display(),
                    header.stream_id,
                    meta.id
                )));
            }
            Ok(Some((store, header)))
        }
        Err(LogError::NotFound(_)) if meta.write_path == WritePath::SharedAndDedicated => {
            if read_only {
                tracing::warn!(stream = %meta.id, path = %path.display(), "dedicated log missing, reading from container");
                return Ok(None);
            }
            tracing::warn!(stream = %meta.id, path = %path.display(), "dedicated log missing, recreating");
            let header = FileLogHeader {
                stream_id: meta.id,
                max_size: meta.max_size,
                max_block_size: meta.max_block_size,
                head: meta.head,
                length: meta.head,
            };
            let store = blocking(move || SparseFileStore::create(&path, &header)).await?;
            files.mark_sparse(store.file()).await?;
            Ok(Some((store, header)))
        }
        Err(e) => Err(e),
    }
}

/// Rebuild and open the stream described by `meta`
pub(crate) async fn recover<F: FileAdapter>(
    container: &Arc<ContainerShared>,
    meta: StreamMeta,
    files: &F,
    cancel: &CancellationToken,
) -> Result<LogicalLog, LogError> {
    let read_only = container.read_only;
    let mut scan = scan_chain(container, &meta, cancel).await?;
    let dedicated = open_dedicated(&meta, read_only, files).await?;

    let head = meta.head;
    let dedicated_len = dedicated.as_ref().map_or(0, |(_, h)| h.length);
    let length = scan.end.max(dedicated_len).max(head);
    let dedicated_end = dedicated_len.clamp(head, length);
    scan.index.trim_below(head);
    let tail = if scan.end == length { scan.tail } else { None };

    if !read_only && scan.valid_entries < meta.chain.len() {
        container.drop_chain_from(meta.id, scan.valid_entries);
        container.persist().await?;
    }

    let state = StreamState {
        head,
        sealed: length,
        pending: Vec::new(),
        index: scan.index,
        dedicated_end,
        write_path: meta.write_path,
        closed: false,
    };
    let shared = StreamShared::new(
        meta.id,
        read_only,
        meta.max_size,
        meta.max_block_size,
        Some(Arc::clone(container)),
        dedicated.map(|(store, _)| Arc::new(store)),
        state,
    );
    let mut log = LogicalLog::from_parts(Arc::new(shared), tail);

    if !read_only && dedicated_end < scan.end {
        log.destage_behind().await?;
    }
    Ok(log)
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
