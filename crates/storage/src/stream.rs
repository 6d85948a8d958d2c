// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logical log streams
//!
//! Appends are staged in a pending buffer and sealed into records of at
//! most `max_block_size` bytes. Depending on the write path a sealed block
//! goes to the container as framed records, to the dedicated file at its
//! stream position, or both. Reads plan their segments under the stream
//! lock and perform the I/O outside it.

use crate::container::ContainerShared;
use crate::cursor::{seek_target, ReadAhead, ReadCursor};
use crate::dedicated::{FileLogHeader, SparseFileStore};
use crate::index::{RecordIndex, RecordRef};
use crate::io::{blocking, check_cancel, read_fill_at};
use crate::layout::StreamMeta;
use crate::record::{self, RecordHeader, FLAG_BARRIER, HEADER_LEN};
use sl_core::{FlushMarker, LogError, SeekOrigin, StreamId, WritePath};
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

pub(crate) struct StreamState {
    pub head: u64,
    /// End of the sealed bytes; pending bytes follow it
    pub sealed: u64,
    pub pending: Vec<u8>,
    pub index: RecordIndex,
    /// Sealed bytes below this position are present in the dedicated file
    pub dedicated_end: u64,
    pub write_path: WritePath,
    pub closed: bool,
}

impl StreamState {
    pub fn length(&self) -> u64 {
        self.sealed + self.pending.len() as u64
    }
}

/// State shared by a stream handle and its read cursors
pub(crate) struct StreamShared {
    pub(crate) id: StreamId,
    pub(crate) read_only: bool,
    pub(crate) max_size: u64,
    pub(crate) max_block_size: u32,
    pub(crate) container: Option<Arc<ContainerShared>>,
    pub(crate) dedicated: Option<Arc<SparseFileStore>>,
    state: Mutex<StreamState>,
    /// Bumped whenever stored bytes are discarded or moved
    invalidations: AtomicU64,
}

/// Times a read is planned again after its records moved
const MAX_REPLANS: u32 = 3;

enum Segment {
    Dedicated { position: u64, len: usize },
    Record { record: RecordRef, skip: usize, take: usize },
    Pending(Vec<u8>),
}

impl StreamShared {
    pub(crate) fn new(
        id: StreamId,
        read_only: bool,
        max_size: u64,
        max_block_size: u32,
        container: Option<Arc<ContainerShared>>,
        dedicated: Option<Arc<SparseFileStore>>,
        state: StreamState,
    ) -> Self {
        Self {
            id,
            read_only,
            max_size,
            max_block_size,
            container,
            dedicated,
            state: Mutex::new(state),
            invalidations: AtomicU64::new(0),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn generation(&self) -> u64 {
        self.invalidations.load(Ordering::Acquire)
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn ensure_open(&self) -> Result<(), LogError> {
        if self.lock().closed {
            return Err(LogError::Closed(format!("logical log {}", self.id)));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), LogError> {
        self.ensure_open()?;
        if self.read_only {
            return Err(LogError::ReadOnly(format!("logical log {}", self.id)));
        }
        Ok(())
    }

    /// Close without flushing; pending bytes are discarded
    pub(crate) fn mark_closed(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.pending.clear();
    }

    /// Read up to `buf.len()` bytes at `position`, serving from and refilling `ahead`
    ///
    /// At least `fetch_hint` bytes are fetched from storage when the
    /// read-ahead buffer cannot satisfy the request.
    pub(crate) async fn read_buffered(
        &self,
        ahead: &mut ReadAhead,
        position: u64,
        buf: &mut [u8],
        fetch_hint: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, LogError> {
        check_cancel(cancel)?;
        let generation = self.generation();
        let (head, length) = {
            let state = self.lock();
            if state.closed {
                return Err(LogError::Closed(format!("logical log {}", self.id)));
            }
            (state.head, state.length())
        };
        if position < head {
            tracing::debug!(stream = %self.id, position, head, "read below head truncation point");
            return Ok(0);
        }
        if position >= length || buf.is_empty() {
            return Ok(0);
        }

        let want = (buf.len() as u64).min(length - position) as usize;
        let mut copied = ahead.take(position, generation, &mut buf[..want]);
        if copied == want {
            return Ok(copied);
        }

        let from = position + copied as u64;
        let fetch = ((want - copied).max(fetch_hint) as u64).min(length - from) as usize;
        let data = self.read_range(from, fetch, generation).await?;
        let n = data.len().min(want - copied);
        buf[copied..copied + n].copy_from_slice(&data[..n]);
        copied += n;
        if data.len() > n {
            ahead.fill(from + n as u64, data[n..].to_vec(), generation);
        } else {
            ahead.clear();
        }
        Ok(copied)
    }

    /// Read `[position, position + len)` clipped to the live range
    ///
    /// If a record fails verification because a concurrent truncation
    /// moved the data, the bytes read so far are returned instead of an
    /// error. A read that got nothing because a record was rewritten
    /// elsewhere is planned again.
    pub(crate) async fn read_range(
        &self,
        position: u64,
        len: usize,
        generation: u64,
    ) -> Result<Vec<u8>, LogError> {
        let mut generation = generation;
        let mut replans = 0;
        loop {
            let segments = {
                let state = self.lock();
                if state.closed {
                    return Err(LogError::Closed(format!("logical log {}", self.id)));
                }
                let end = (position + len as u64).min(state.length());
                if position < state.head || position >= end {
                    return Ok(Vec::new());
                }
                self.plan(&state, position, end)?
            };

            let container = self.container.as_ref().map(|c| Arc::clone(&c.file));
            let dedicated = self.dedicated.clone();
            let id = self.id;
            let (data, failure) =
                blocking(move || Ok(execute(&segments, container, dedicated, id))).await?;

            let (at, reason) = match failure {
                None => return Ok(data),
                Some(LogError::CorruptRecord { position, reason }) => (position, reason),
                Some(e) => return Err(e),
            };
            let current = self.generation();
            if self.lock().head > at {
                tracing::debug!(stream = %self.id, position = at, "record truncated during read");
                return Ok(data);
            }
            if current == generation {
                tracing::warn!(stream = %self.id, position = at, %reason, "corrupt record");
                return Err(LogError::CorruptRecord { position: at, reason });
            }
            if !data.is_empty() || replans == MAX_REPLANS {
                tracing::debug!(stream = %self.id, position = at, "record moved during read");
                return Ok(data);
            }
            generation = current;
            replans += 1;
        }
    }

    fn plan(&self, state: &StreamState, position: u64, end: u64) -> Result<Vec<Segment>, LogError> {
        let mut segments = Vec::new();
        let mut p = position;
        let sealed_end = end.min(state.sealed);

        if self.dedicated.is_some() {
            let dedicated_end = sealed_end.min(state.dedicated_end);
            if p < dedicated_end {
                segments.push(Segment::Dedicated {
                    position: p,
                    len: (dedicated_end - p) as usize,
                });
                p = dedicated_end;
            }
        }

        if p < sealed_end {
            for record in state.index.covering(p, sealed_end) {
                if record.position > p {
                    break;
                }
                let take = record.end().min(sealed_end) - p;
                segments.push(Segment::Record {
                    record,
                    skip: (p - record.position) as usize,
                    take: take as usize,
                });
                p += take;
            }
            if p < sealed_end {
                return Err(LogError::corrupt(p, "no record covers position"));
            }
        }

        if p < end {
            let from = (p - state.sealed) as usize;
            let to = (end - state.sealed) as usize;
            segments.push(Segment::Pending(state.pending[from..to].to_vec()));
        }
        Ok(segments)
    }
}

/// Run a read plan; stops at the first record that fails verification
fn execute(
    segments: &[Segment],
    container: Option<Arc<File>>,
    dedicated: Option<Arc<SparseFileStore>>,
    id: StreamId,
) -> (Vec<u8>, Option<LogError>) {
    let mut out = Vec::new();
    for segment in segments {
        match segment {
            Segment::Dedicated { position, len } => {
                let Some(store) = &dedicated else {
                    return (out, Some(LogError::Metadata("dedicated file missing".into())));
                };
                let start = out.len();
                out.resize(start + len, 0);
                if let Err(e) = store.read_at(*position, &mut out[start..]) {
                    out.truncate(start);
                    return (out, Some(e));
                }
            }
            Segment::Record { record, skip, take } => {
                let Some(file) = &container else {
                    return (out, Some(LogError::Metadata("container missing".into())));
                };
                let mut frame = vec![0u8; HEADER_LEN + record.payload_len as usize];
                if let Err(e) = read_fill_at(file, &mut frame, record.offset) {
                    return (out, Some(e.into()));
                }
                match record::decode(&frame) {
                    Ok((header, payload))
                        if header.stream_id == id
                            && header.epoch == record.epoch
                            && header.position == record.position =>
                    {
                        out.extend_from_slice(&payload[*skip..*skip + *take]);
                    }
                    Ok(_) => {
                        return (
                            out,
                            Some(LogError::corrupt(
                                record.position,
                                "frame belongs to another stream or epoch",
                            )),
                        )
                    }
                    Err(e) => return (out, Some(LogError::corrupt(record.position, e.to_string()))),
                }
            }
            Segment::Pending(bytes) => out.extend_from_slice(bytes),
        }
    }
    (out, None)
}

/// Current write chunk of a container-backed stream
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkTail {
    pub index: u64,
    pub epoch: u64,
    /// Bytes of the chunk already holding frames
    pub used: u64,
    pub records: u32,
}

/// Handle to an open logical log
///
/// Only one writable handle exists per stream. Appends, flushes and
/// truncations take `&mut self`; read cursors created from the handle
/// share its state and may run concurrently with it.
pub struct LogicalLog {
    shared: Arc<StreamShared>,
    tail: Option<ChunkTail>,
    read_position: u64,
    read_ahead: ReadAhead,
    container_unsynced: bool,
    dedicated_unsynced: bool,
    header_dirty: bool,
}

impl std::fmt::Debug for LogicalLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalLog")
            .field("id", &self.shared.id)
            .field("read_only", &self.shared.read_only)
            .finish_non_exhaustive()
    }
}

impl LogicalLog {
    pub(crate) fn from_parts(shared: Arc<StreamShared>, tail: Option<ChunkTail>) -> Self {
        let read_position = shared.lock().head;
        Self {
            shared,
            tail,
            read_position,
            read_ahead: ReadAhead::default(),
            container_unsynced: false,
            dedicated_unsynced: false,
            header_dirty: false,
        }
    }

    /// A freshly created, empty container stream
    pub(crate) fn create(
        container: Arc<ContainerShared>,
        meta: &StreamMeta,
        dedicated: Option<SparseFileStore>,
    ) -> Self {
        let state = StreamState {
            head: 0,
            sealed: 0,
            pending: Vec::new(),
            index: RecordIndex::default(),
            dedicated_end: 0,
            write_path: meta.write_path,
            closed: false,
        };
        let shared = StreamShared::new(
            meta.id,
            false,
            meta.max_size,
            meta.max_block_size,
            Some(container),
            dedicated.map(Arc::new),
            state,
        );
        Self::from_parts(Arc::new(shared), None)
    }

    /// A stand-alone file log
    pub(crate) fn from_file(store: SparseFileStore, header: FileLogHeader, read_only: bool) -> Self {
        let length = header.length.max(header.head);
        let state = StreamState {
            head: header.head,
            sealed: length,
            pending: Vec::new(),
            index: RecordIndex::default(),
            dedicated_end: length,
            write_path: WritePath::File,
            closed: false,
        };
        let shared = StreamShared::new(
            header.stream_id,
            read_only,
            header.max_size,
            header.max_block_size,
            None,
            Some(Arc::new(store)),
            state,
        );
        Self::from_parts(Arc::new(shared), None)
    }

    pub(crate) fn shared(&self) -> &Arc<StreamShared> {
        &self.shared
    }

    pub fn id(&self) -> StreamId {
        self.shared.id
    }

    pub fn alias(&self) -> Option<String> {
        self.shared
            .container
            .as_ref()
            .and_then(|c| c.alias_of(self.shared.id))
    }

    /// Bytes ever appended and not cut by a tail truncation
    pub fn length(&self) -> u64 {
        self.shared.lock().length()
    }

    pub fn head_truncation_position(&self) -> u64 {
        self.shared.lock().head
    }

    pub fn maximum_size(&self) -> u64 {
        self.shared.max_size
    }

    pub fn maximum_block_size(&self) -> u32 {
        self.shared.max_block_size
    }

    /// Stream storage never materializes truncated or unwritten ranges
    pub fn is_sparse(&self) -> bool {
        true
    }

    pub fn is_read_only(&self) -> bool {
        self.shared.read_only
    }

    pub fn write_path(&self) -> WritePath {
        self.shared.lock().write_path
    }

    pub fn read_position(&self) -> u64 {
        self.read_position
    }

    /// Live bytes as a share of the maximum size, 0-100
    pub fn usage_percent(&self) -> u32 {
        if self.shared.max_size == 0 {
            return 0;
        }
        let state = self.shared.lock();
        let live = state.length() - state.head.min(state.length());
        (live * 100 / self.shared.max_size) as u32
    }

    /// Stage `data` at the end of the stream
    ///
    /// Full blocks are sealed as they fill. If sealing fails, everything this
    /// call added is discarded again, sealed or not.
    pub async fn append(&mut self, data: &[u8], cancel: &CancellationToken) -> Result<(), LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_writable()?;
        let block = self.shared.max_block_size as usize;

        let length_before = {
            let state = self.shared.lock();
            let length = state.length();
            if length + data.len() as u64 > self.shared.max_size {
                return Err(LogError::CapacityExceeded(format!(
                    "logical log {}: appending {} bytes at {} exceeds maximum size {}",
                    self.shared.id,
                    data.len(),
                    length,
                    self.shared.max_size
                )));
            }
            length
        };

        let mut rest = data;
        let result = loop {
            let pending = self.shared.lock().pending.len();
            if pending >= block {
                if let Err(e) = self.seal(block, false).await {
                    break Err(e);
                }
                continue;
            }
            if rest.is_empty() {
                break Ok(());
            }
            let n = (block - pending).min(rest.len());
            self.shared.lock().pending.extend_from_slice(&rest[..n]);
            rest = &rest[n..];
        };

        if let Err(e) = result {
            self.undo_append(length_before).await;
            return Err(e);
        }
        Ok(())
    }

    /// Return the stream to `length` after a failed append
    async fn undo_append(&mut self, length: u64) {
        let sealed_past = {
            let mut state = self.shared.lock();
            if state.sealed <= length {
                let keep = (length - state.sealed) as usize;
                state.pending.truncate(keep);
                false
            } else {
                true
            }
        };
        if sealed_past {
            if let Err(e) = self.cut_sealed(length).await {
                tracing::warn!(stream = %self.shared.id, length, error = %e, "could not undo partial append");
            }
        }
    }

    /// Seal the first `n` pending bytes, one record at a time
    async fn seal(&mut self, n: usize, barrier: bool) -> Result<(), LogError> {
        let write_path = self.shared.lock().write_path;
        let mut remaining = n;
        while remaining > 0 {
            let (base, take, frame_at) = if write_path.writes_shared() {
                let sealed = self.shared.lock().sealed;
                let tail = self.ensure_tail(sealed).await?;
                let room = self.chunk_size() - tail.used as usize - HEADER_LEN;
                (sealed, room.min(remaining), Some(tail))
            } else {
                (self.shared.lock().sealed, remaining, None)
            };
            let data = self.shared.lock().pending[..take].to_vec();
            let last = take == remaining;

            let record = match frame_at {
                Some(tail) => Some(self.write_frame(tail, base, &data, last && barrier).await?),
                None => None,
            };

            let mut dedicated_result = Ok(());
            if write_path.writes_dedicated() {
                if let Some(store) = self.shared.dedicated.clone() {
                    dedicated_result = blocking(move || store.write_at(base, &data)).await;
                }
            }

            if record.is_none() && dedicated_result.is_err() {
                return dedicated_result;
            }
            let mut state = self.shared.lock();
            state.pending.drain(..take);
            state.sealed += take as u64;
            if let Some(record) = record {
                state.index.push(record);
            }
            if dedicated_result.is_ok() && state.dedicated_end == base {
                state.dedicated_end = state.sealed;
            }
            drop(state);

            if write_path.writes_dedicated() && self.shared.dedicated.is_some() {
                self.dedicated_unsynced = true;
            }
            dedicated_result?;
            remaining -= take;
        }
        Ok(())
    }

    fn chunk_size(&self) -> usize {
        self.shared
            .container
            .as_ref()
            .map_or(0, |c| c.layout.chunk_size as usize)
    }

    fn container(&self) -> Result<&Arc<ContainerShared>, LogError> {
        self.shared
            .container
            .as_ref()
            .ok_or_else(|| LogError::Metadata(format!("logical log {} has no container", self.shared.id)))
    }

    /// Current write chunk
    ///
    /// A full chunk holding several records, or a chunk cut by a tail
    /// truncation, is compacted first; a new chunk is allocated and
    /// persisted only when compaction would not make room.
    async fn ensure_tail(&mut self, base: u64) -> Result<ChunkTail, LogError> {
        let chunk_size = self.chunk_size() as u64;
        match self.tail {
            Some(tail) if chunk_size - tail.used > HEADER_LEN as u64 => return Ok(tail),
            Some(tail) if tail.records <= 1 => {}
            _ => {
                if let Some(tail) = self.compact_tail().await? {
                    self.tail = Some(tail);
                    return Ok(tail);
                }
            }
        }
        self.tail = None;
        let container = Arc::clone(self.container()?);
        let entry = container.allocate_chunk(self.shared.id, base)?;
        container.persist().await?;
        let tail = ChunkTail {
            index: entry.index,
            epoch: entry.epoch,
            used: 0,
            records: 0,
        };
        self.tail = Some(tail);
        Ok(tail)
    }

    /// Rewrite the live bytes of the last chunk as one record in a fresh chunk
    ///
    /// The new chunk is written and synced before the chain points at it.
    /// Returns `None` when the rewritten chunk would have no room left.
    async fn compact_tail(&mut self) -> Result<Option<ChunkTail>, LogError> {
        let container = Arc::clone(self.container()?);
        let Some(last) = container.last_chunk(self.shared.id) else {
            return Ok(None);
        };
        let (from, to) = {
            let state = self.shared.lock();
            (last.base.max(state.head), state.sealed)
        };
        let header_len = HEADER_LEN as u64;
        if to < from || (to - from) + 2 * header_len >= u64::from(container.layout.chunk_size) {
            return Ok(None);
        }

        let len = (to - from) as usize;
        let data = self
            .shared
            .read_range(from, len, self.shared.generation())
            .await?;
        if data.len() != len {
            return Err(LogError::corrupt(from + data.len() as u64, "short read while compacting"));
        }

        let entry = container.allocate_replacement(self.shared.id, from)?;
        let offset = container.layout.chunk_offset(entry.index);
        let mut tail = ChunkTail {
            index: entry.index,
            epoch: entry.epoch,
            used: 0,
            records: 0,
        };
        let mut record = None;
        if len > 0 {
            let header = RecordHeader {
                stream_id: self.shared.id,
                epoch: entry.epoch,
                position: from,
                payload_len: len as u32,
                flags: FLAG_BARRIER,
            };
            let frame = record::encode(&header, &data);
            tail.used = frame.len() as u64;
            tail.records = 1;
            let written = match container.write_at(frame, offset).await {
                Ok(()) => container.sync().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                container.release_replacement(entry);
                return Err(e);
            }
            record = Some(RecordRef {
                position: from,
                len: len as u32,
                payload_len: len as u32,
                offset,
                epoch: entry.epoch,
            });
        }

        // Readers must see the new record before the old chunk can be reused
        {
            let mut state = self.shared.lock();
            state.index.trim_above(from);
            let head = state.head;
            state.index.trim_below(head);
            if let Some(record) = record {
                state.index.push(record);
            }
        }
        self.shared.invalidate();
        container.replace_last_chunk(self.shared.id, last.index, entry)?;
        container.persist().await?;
        tracing::debug!(
            stream = %self.shared.id,
            from,
            to,
            old = last.index,
            chunk = entry.index,
            "compacted tail chunk"
        );
        Ok(Some(tail))
    }

    async fn write_frame(
        &mut self,
        tail: ChunkTail,
        position: u64,
        payload: &[u8],
        barrier: bool,
    ) -> Result<RecordRef, LogError> {
        let container = Arc::clone(self.container()?);
        let header = RecordHeader {
            stream_id: self.shared.id,
            epoch: tail.epoch,
            position,
            payload_len: payload.len() as u32,
            flags: if barrier { FLAG_BARRIER } else { 0 },
        };
        let frame = record::encode(&header, payload);
        let offset = container.layout.chunk_offset(tail.index) + tail.used;
        let frame_len = frame.len() as u64;
        container.write_at(frame, offset).await?;
        self.container_unsynced = true;
        if let Some(t) = self.tail.as_mut() {
            t.used += frame_len;
            t.records += 1;
        }
        Ok(RecordRef {
            position,
            len: header.payload_len,
            payload_len: header.payload_len,
            offset,
            epoch: tail.epoch,
        })
    }

    fn dedicated_header(&self) -> FileLogHeader {
        let state = self.shared.lock();
        FileLogHeader {
            stream_id: self.shared.id,
            max_size: self.shared.max_size,
            max_block_size: self.shared.max_block_size,
            head: state.head,
            length: state.dedicated_end.max(state.head),
        }
    }

    /// Make every sealed byte durable and record it in metadata
    async fn sync_backing(&mut self) -> Result<(), LogError> {
        if self.container_unsynced {
            self.container()?.sync().await?;
            self.container_unsynced = false;
        }
        if let Some(store) = self.shared.dedicated.clone() {
            if self.dedicated_unsynced || self.header_dirty {
                let header = self.dedicated_header();
                blocking(move || {
                    store.sync()?;
                    store.write_header(&header)
                })
                .await?;
                self.dedicated_unsynced = false;
                self.header_dirty = false;
            }
        }
        if let Some(container) = &self.shared.container {
            container.persist_if_dirty().await?;
        }
        Ok(())
    }

    /// Seal all pending bytes and make them durable
    pub async fn flush_with_marker(&mut self, cancel: &CancellationToken) -> Result<FlushMarker, LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_open()?;
        if !self.shared.read_only {
            let pending = self.shared.lock().pending.len();
            if pending > 0 {
                self.seal(pending, true).await?;
            }
            self.sync_backing().await?;
        }
        Ok(FlushMarker {
            position: self.length(),
            acknowledged: true,
        })
    }

    pub async fn flush(&mut self, cancel: &CancellationToken) -> Result<(), LogError> {
        self.flush_with_marker(cancel).await.map(|_| ())
    }

    /// Stop writing records to the container; the dedicated file becomes the only copy
    pub async fn configure_writes_to_only_dedicated_log(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_writable()?;
        if self.shared.dedicated.is_none() || self.shared.container.is_none() {
            return Err(LogError::InvalidArgument(format!(
                "logical log {} has no dedicated log",
                self.shared.id
            )));
        }
        if self.write_path() == WritePath::DedicatedOnly {
            return Ok(());
        }

        self.flush(cancel).await?;
        self.destage_behind().await?;

        {
            let mut state = self.shared.lock();
            state.write_path = WritePath::DedicatedOnly;
            state.index.clear();
        }
        self.shared.invalidate();
        self.read_ahead.clear();
        self.tail = None;

        let container = Arc::clone(self.container()?);
        container.detach_to_dedicated(self.shared.id);
        container.persist().await?;
        tracing::info!(stream = %self.shared.id, "writes now go only to the dedicated log");
        Ok(())
    }

    /// Copy sealed bytes the dedicated file is missing from the container
    pub(crate) async fn destage_behind(&mut self) -> Result<(), LogError> {
        let Some(store) = self.shared.dedicated.clone() else {
            return Ok(());
        };
        let (from, to) = {
            let state = self.shared.lock();
            (state.dedicated_end.max(state.head), state.sealed)
        };
        if from >= to {
            return Ok(());
        }

        let block = self.shared.max_block_size as u64;
        let mut position = from;
        while position < to {
            let len = block.min(to - position) as usize;
            let data = self
                .shared
                .read_range(position, len, self.shared.generation())
                .await?;
            if data.len() != len {
                return Err(LogError::corrupt(position + data.len() as u64, "short read while destaging"));
            }
            let writer = Arc::clone(&store);
            blocking(move || writer.write_at(position, &data)).await?;
            position += len as u64;
            self.shared.lock().dedicated_end = position;
        }

        let header = self.dedicated_header();
        blocking(move || {
            store.sync()?;
            store.write_header(&header)
        })
        .await?;
        tracing::info!(stream = %self.shared.id, from, to, "destaged records to dedicated log");
        Ok(())
    }

    /// Discard bytes below `new_head`
    pub fn truncate_head(&mut self, new_head: u64) -> Result<(), LogError> {
        self.shared.ensure_writable()?;
        {
            let mut state = self.shared.lock();
            if new_head < state.head || new_head > state.length() {
                return Err(LogError::InvalidArgument(format!(
                    "head {} outside [{}, {}]",
                    new_head,
                    state.head,
                    state.length()
                )));
            }
            if new_head == state.head {
                return Ok(());
            }
            state.head = new_head;
            state.index.trim_below(new_head);
        }
        if let Some(container) = &self.shared.container {
            container.release_below(self.shared.id, new_head);
        }
        self.header_dirty = true;
        tracing::debug!(stream = %self.shared.id, head = new_head, "truncated head");
        Ok(())
    }

    /// Discard bytes at and beyond `new_length`
    pub async fn truncate_tail(&mut self, new_length: u64, cancel: &CancellationToken) -> Result<(), LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_writable()?;
        let cut_sealed = {
            let mut state = self.shared.lock();
            if new_length < state.head || new_length > state.length() {
                return Err(LogError::InvalidArgument(format!(
                    "length {} outside [{}, {}]",
                    new_length,
                    state.head,
                    state.length()
                )));
            }
            if new_length >= state.sealed {
                let keep = (new_length - state.sealed) as usize;
                state.pending.truncate(keep);
                false
            } else {
                true
            }
        };

        if cut_sealed {
            self.cut_sealed(new_length).await?;
        } else {
            self.shared.invalidate();
            self.read_ahead.clear();
        }
        tracing::debug!(stream = %self.shared.id, length = new_length, "truncated tail");
        Ok(())
    }

    /// Discard sealed bytes at and beyond `new_length` along with all pending bytes
    async fn cut_sealed(&mut self, new_length: u64) -> Result<(), LogError> {
        {
            let mut state = self.shared.lock();
            state.pending.clear();
            state.sealed = new_length;
            state.index.trim_above(new_length);
            state.dedicated_end = state.dedicated_end.min(new_length);
        }
        self.shared.invalidate();
        self.read_ahead.clear();
        self.tail = None;

        if let Some(container) = &self.shared.container {
            container.cut_chain(self.shared.id, new_length);
        }
        if let Some(store) = self.shared.dedicated.clone() {
            let header = self.dedicated_header();
            blocking(move || {
                store.set_length(new_length)?;
                store.write_header(&header)
            })
            .await?;
            self.header_dirty = false;
        }
        if let Some(container) = &self.shared.container {
            container.persist().await?;
        }
        Ok(())
    }

    /// Move the read position; returns the new position
    pub fn seek_for_read(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64, LogError> {
        self.shared.ensure_open()?;
        self.read_position = seek_target(self.read_position, self.length(), offset, origin)?;
        Ok(self.read_position)
    }

    /// Read at the read position, fetching at least `minimum_bytes` from storage
    ///
    /// Returns 0 at or past the end and below the head truncation point.
    pub async fn read(
        &mut self,
        buf: &mut [u8],
        minimum_bytes: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, LogError> {
        let n = self
            .shared
            .read_buffered(&mut self.read_ahead, self.read_position, buf, minimum_bytes, cancel)
            .await?;
        self.read_position += n as u64;
        Ok(n)
    }

    /// Sequential reader starting at the head; 0 picks the block size as record size
    pub fn create_read_stream(&self, max_record_size: usize) -> Result<ReadCursor, LogError> {
        self.shared.ensure_open()?;
        let record_size = if max_record_size == 0 {
            self.shared.max_block_size as usize
        } else {
            max_record_size
        };
        let start = self.head_truncation_position();
        Ok(ReadCursor::new(Arc::clone(&self.shared), record_size, start))
    }

    /// Close the handle; unflushed appends are discarded
    pub async fn close(&mut self, cancel: &CancellationToken) -> Result<(), LogError> {
        if self.shared.lock().closed {
            return Ok(());
        }
        check_cancel(cancel)?;
        self.shared.mark_closed();

        let mut result = Ok(());
        if !self.shared.read_only {
            if let Some(store) = self.shared.dedicated.clone() {
                if self.dedicated_unsynced || self.header_dirty {
                    let header = self.dedicated_header();
                    result = blocking(move || {
                        store.sync()?;
                        store.write_header(&header)
                    })
                    .await;
                }
            }
            if let Some(container) = &self.shared.container {
                if result.is_ok() {
                    result = container.persist_if_dirty().await;
                }
            }
        }

        match &self.shared.container {
            Some(container) => container.unregister_stream(self.shared.id),
            None => {
                if let (false, Some(store)) = (self.shared.read_only, &self.shared.dedicated) {
                    store.unlock();
                }
            }
        }
        tracing::debug!(stream = %self.shared.id, "closed logical log");
        result
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
