// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Physical log container
//!
//! A container is one preallocated file holding the metadata of every
//! logical log it hosts and the chunks their records live in. Metadata
//! changes go to memory first and are written to the alternate superblock
//! slot by [`ContainerShared::persist`]; a newly allocated chunk is always
//! persisted before any record is written into it.

use crate::allocator::ChunkAllocator;
use crate::dedicated::{FileLogHeader, SparseFileStore};
use crate::io::{blocking, check_cancel, read_fill_at, write_all_at};
use crate::layout::{
    chunk_quota, encode_slot, newest_slot, ChunkEntry, ContainerLayout, StreamMeta, Superblock,
};
use crate::stream::{LogicalLog, StreamShared};
use fs2::FileExt;
use sl_adapters::{FileAdapter, NativeFileAdapter};
use sl_core::settings::PAGE_SIZE;
use sl_core::{LogError, LogId, LogicalLogSettings, StreamId, WritePath};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio_util::sync::CancellationToken;

/// Registration state of a container in its manager
pub(crate) enum Registration {
    Opening,
    Open(Weak<ContainerShared>),
}

pub(crate) type Registry = Arc<Mutex<HashMap<LogId, Registration>>>;

/// Space accounting for a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerUsage {
    /// Size of the container file
    pub capacity_bytes: u64,
    /// Bytes of the data region
    pub data_bytes: u64,
    /// Bytes in chunks owned by streams
    pub allocated_bytes: u64,
    pub free_bytes: u64,
    /// Sum of the maximum sizes of all streams
    pub reserved_bytes: u64,
    /// Chunks set aside for the streams' quotas
    pub reserved_chunks: u64,
    pub stream_count: u32,
    pub max_streams: u32,
}

impl ContainerUsage {
    /// Allocated share of the data region, 0-100
    pub fn percent_used(&self) -> u32 {
        if self.data_bytes == 0 {
            return 0;
        }
        (self.allocated_bytes * 100 / self.data_bytes) as u32
    }
}

struct ContainerState {
    superblock: Superblock,
    allocator: ChunkAllocator,
    open_streams: HashMap<StreamId, Weak<StreamShared>>,
    opening: HashSet<StreamId>,
    dirty: bool,
    closed: bool,
}

/// State shared by a container handle and the streams opened from it
pub(crate) struct ContainerShared {
    pub(crate) layout: ContainerLayout,
    pub(crate) path: PathBuf,
    pub(crate) file: Arc<File>,
    pub(crate) read_only: bool,
    state: Mutex<ContainerState>,
    /// Generation of the last written superblock; held while writing one
    generation: tokio::sync::Mutex<u64>,
    registry: Registry,
}

impl ContainerShared {
    fn state(&self) -> MutexGuard<'_, ContainerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn id(&self) -> LogId {
        self.layout.id
    }

    pub(crate) fn ensure_open(&self) -> Result<(), LogError> {
        if self.state().closed {
            return Err(LogError::Closed(format!("physical log {}", self.id())));
        }
        Ok(())
    }

    pub(crate) fn ensure_writable(&self) -> Result<(), LogError> {
        self.ensure_open()?;
        if self.read_only {
            return Err(LogError::ReadOnly(format!("physical log {}", self.id())));
        }
        Ok(())
    }

    /// Take a free chunk for `stream` without linking it into the chain
    ///
    /// Fails once the chain holds as many chunks as the stream's quota.
    fn reserve_chunk(&self, state: &mut ContainerState, stream: StreamId, base: u64) -> Result<ChunkEntry, LogError> {
        let meta = state
            .superblock
            .streams
            .get(&stream)
            .ok_or_else(|| LogError::NotFound(format!("logical log {stream}")))?;
        let quota = chunk_quota(meta.max_size, self.layout.chunk_size);
        if meta.chain.len() as u64 >= quota {
            return Err(LogError::CapacityExceeded(format!(
                "logical log {stream} already holds its quota of {quota} chunks"
            )));
        }
        let index = state.allocator.allocate().ok_or_else(|| {
            LogError::CapacityExceeded(format!("physical log {} has no free chunks", self.layout.id))
        })?;
        let entry = ChunkEntry {
            index,
            base,
            epoch: state.superblock.next_epoch,
            limit: None,
        };
        state.superblock.next_epoch += 1;
        Ok(entry)
    }

    /// Append a fresh chunk to `stream`'s chain, starting at stream position `base`
    pub(crate) fn allocate_chunk(&self, stream: StreamId, base: u64) -> Result<ChunkEntry, LogError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let entry = self.reserve_chunk(state, stream, base)?;
        if let Some(meta) = state.superblock.streams.get_mut(&stream) {
            meta.chain.push(entry);
        }
        state.dirty = true;
        tracing::trace!(stream = %stream, chunk = entry.index, base, "allocated chunk");
        Ok(entry)
    }

    /// Take a chunk that will replace the last one of `stream`'s chain
    pub(crate) fn allocate_replacement(&self, stream: StreamId, base: u64) -> Result<ChunkEntry, LogError> {
        let mut guard = self.state();
        self.reserve_chunk(&mut guard, stream, base)
    }

    /// Hand back a chunk from [`Self::allocate_replacement`] that was never linked
    pub(crate) fn release_replacement(&self, entry: ChunkEntry) {
        self.state().allocator.release(entry.index);
    }

    /// Swap the last chunk of `stream`'s chain for `entry` and free the old one
    pub(crate) fn replace_last_chunk(
        &self,
        stream: StreamId,
        old: u64,
        entry: ChunkEntry,
    ) -> Result<(), LogError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let last = state
            .superblock
            .streams
            .get_mut(&stream)
            .and_then(|meta| meta.chain.last_mut())
            .filter(|last| last.index == old);
        let Some(last) = last else {
            state.allocator.release(entry.index);
            return Err(LogError::Metadata(format!(
                "logical log {stream} no longer ends with chunk {old}"
            )));
        };
        *last = entry;
        state.allocator.release(old);
        state.dirty = true;
        tracing::trace!(stream = %stream, old, chunk = entry.index, "replaced last chunk");
        Ok(())
    }

    pub(crate) fn last_chunk(&self, stream: StreamId) -> Option<ChunkEntry> {
        self.state()
            .superblock
            .streams
            .get(&stream)
            .and_then(|meta| meta.chain.last().copied())
    }

    /// Take every free chunk, leaving nothing to allocate
    #[cfg(test)]
    pub(crate) fn exhaust_free_chunks(&self) -> u64 {
        let mut state = self.state();
        let mut taken = 0;
        while state.allocator.allocate().is_some() {
            taken += 1;
        }
        taken
    }

    /// Record a new head and free chunks whose data lies entirely below it
    pub(crate) fn release_below(&self, stream: StreamId, head: u64) {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(meta) = state.superblock.streams.get_mut(&stream) else {
            return;
        };
        meta.head = head;
        let mut freed = 0;
        while meta.chain.len() > 1 && meta.chain[1].base <= head {
            let entry = meta.chain.remove(0);
            state.allocator.release(entry.index);
            freed += 1;
        }
        state.dirty = true;
        if freed > 0 {
            tracing::debug!(stream = %stream, head, freed, "released chunks below head");
        }
    }

    /// Cut `stream`'s chain so no chunk holds data at or beyond `length`
    pub(crate) fn cut_chain(&self, stream: StreamId, length: u64) {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(meta) = state.superblock.streams.get_mut(&stream) else {
            return;
        };
        let keep = meta
            .chain
            .iter()
            .take_while(|e| e.base < length)
            .count()
            .max(1)
            .min(meta.chain.len());
        for entry in meta.chain.drain(keep..) {
            state.allocator.release(entry.index);
        }
        if let Some(last) = meta.chain.last_mut() {
            last.limit = Some(last.limit.map_or(length, |l| l.min(length)));
        }
        state.dirty = true;
    }

    /// Drop chain entries from position `keep` on
    pub(crate) fn drop_chain_from(&self, stream: StreamId, keep: usize) {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(meta) = state.superblock.streams.get_mut(&stream) else {
            return;
        };
        if keep >= meta.chain.len() {
            return;
        }
        for entry in meta.chain.drain(keep..) {
            state.allocator.release(entry.index);
        }
        state.dirty = true;
    }

    /// Switch a stream to dedicated-only writes and free its chunks
    pub(crate) fn detach_to_dedicated(&self, stream: StreamId) {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(meta) = state.superblock.streams.get_mut(&stream) else {
            return;
        };
        meta.write_path = WritePath::DedicatedOnly;
        for entry in meta.chain.drain(..) {
            state.allocator.release(entry.index);
        }
        state.dirty = true;
    }

    pub(crate) fn alias_of(&self, stream: StreamId) -> Option<String> {
        self.state()
            .superblock
            .streams
            .get(&stream)
            .and_then(|m| m.alias.clone())
    }

    /// Reserve the right to open `stream`; fails if it is open or being opened
    pub(crate) fn begin_open(&self, stream: StreamId) -> Result<(), LogError> {
        let mut state = self.state();
        let live = state
            .open_streams
            .get(&stream)
            .is_some_and(|w| w.strong_count() > 0);
        if live || state.opening.contains(&stream) {
            return Err(LogError::AlreadyOpen(format!("logical log {stream}")));
        }
        state.opening.insert(stream);
        Ok(())
    }

    pub(crate) fn finish_open(&self, stream: StreamId, opened: Option<&Arc<StreamShared>>) {
        let mut state = self.state();
        state.opening.remove(&stream);
        if let Some(shared) = opened {
            state.open_streams.insert(stream, Arc::downgrade(shared));
        }
    }

    pub(crate) fn unregister_stream(&self, stream: StreamId) {
        self.state().open_streams.remove(&stream);
    }

    fn is_stream_open(state: &ContainerState, stream: StreamId) -> bool {
        state.opening.contains(&stream)
            || state
                .open_streams
                .get(&stream)
                .is_some_and(|w| w.strong_count() > 0)
    }

    /// Write the in-memory superblock to the alternate slot
    pub(crate) async fn persist(&self) -> Result<(), LogError> {
        if self.read_only {
            return Ok(());
        }
        let mut generation = self.generation.lock().await;
        let next = *generation + 1;
        let bytes = {
            let mut state = self.state();
            let bytes = encode_slot(next, &state.superblock, self.layout.slot_size)?;
            state.dirty = false;
            bytes
        };
        let offset = self.layout.slot_offset(next);
        let file = Arc::clone(&self.file);
        let written = blocking(move || {
            write_all_at(&file, &bytes, offset)?;
            file.sync_data()?;
            Ok(())
        })
        .await;
        if let Err(e) = written {
            self.state().dirty = true;
            return Err(e);
        }
        *generation = next;
        tracing::trace!(log = %self.id(), generation = next, "persisted superblock");
        Ok(())
    }

    pub(crate) async fn persist_if_dirty(&self) -> Result<(), LogError> {
        if self.read_only || !self.state().dirty {
            return Ok(());
        }
        self.persist().await
    }

    pub(crate) async fn write_at(&self, data: Vec<u8>, offset: u64) -> Result<(), LogError> {
        let file = Arc::clone(&self.file);
        blocking(move || Ok(write_all_at(&file, &data, offset)?)).await
    }

    pub(crate) async fn read_at(&self, len: usize, offset: u64) -> Result<Vec<u8>, LogError> {
        let file = Arc::clone(&self.file);
        blocking(move || {
            let mut buf = vec![0u8; len];
            read_fill_at(&file, &mut buf, offset)?;
            Ok(buf)
        })
        .await
    }

    pub(crate) async fn sync(&self) -> Result<(), LogError> {
        let file = Arc::clone(&self.file);
        blocking(move || Ok(file.sync_data()?)).await
    }

    fn deregister(&self) {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let ours = matches!(
            registry.get(&self.id()),
            Some(Registration::Open(w)) if std::ptr::eq(w.as_ptr(), self)
        );
        if ours {
            registry.remove(&self.id());
        }
    }
}

/// Handle to an open physical log
pub struct PhysicalLog<F: FileAdapter = NativeFileAdapter> {
    shared: Arc<ContainerShared>,
    files: F,
}

impl<F: FileAdapter> PhysicalLog<F> {
    /// Create and initialize a new container file at `path`
    pub(crate) async fn create(
        path: &Path,
        layout: ContainerLayout,
        files: F,
        registry: Registry,
    ) -> Result<Self, LogError> {
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(f) => Arc::new(f),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LogError::AlreadyExists(format!(
                    "physical log file {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        match Self::initialize(&file, layout, &files).await {
            Ok(()) => {}
            Err(e) => {
                drop(file);
                let _ = std::fs::remove_file(path);
                return Err(e);
            }
        }

        tracing::info!(
            log = %layout.id,
            path = %path.display(),
            capacity = layout.capacity,
            chunks = layout.chunk_count,
            "created physical log"
        );

        Ok(Self::assemble(
            path,
            layout,
            file,
            false,
            Superblock::default(),
            1,
            files,
            registry,
        ))
    }

    async fn initialize(file: &Arc<File>, layout: ContainerLayout, files: &F) -> Result<(), LogError> {
        file.try_lock_exclusive()
            .map_err(|_| LogError::AlreadyOpen(format!("physical log {}", layout.id)))?;
        files.preallocate(file, layout.capacity).await?;

        let header = layout.encode();
        let slot = encode_slot(1, &Superblock::default(), layout.slot_size)?;
        let empty_slot = vec![0u8; PAGE_SIZE as usize];
        let file = Arc::clone(file);
        blocking(move || {
            write_all_at(&file, &header, 0)?;
            write_all_at(&file, &empty_slot, layout.slot_offset(0))?;
            write_all_at(&file, &slot, layout.slot_offset(1))?;
            file.sync_all()?;
            Ok(())
        })
        .await
    }

    /// Open an existing container file
    pub(crate) async fn open(
        path: &Path,
        id: LogId,
        read_only: bool,
        files: F,
        registry: Registry,
    ) -> Result<Self, LogError> {
        let file = match OpenOptions::new().read(true).write(!read_only).open(path) {
            Ok(f) => Arc::new(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LogError::NotFound(format!(
                    "physical log file {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if !read_only {
            file.try_lock_exclusive()
                .map_err(|_| LogError::AlreadyOpen(format!("physical log {id}")))?;
        }

        let reader = Arc::clone(&file);
        let (layout, generation, superblock) = blocking(move || {
            let mut page = vec![0u8; PAGE_SIZE as usize];
            read_fill_at(&reader, &mut page, 0)?;
            let layout = ContainerLayout::decode(&page)?;

            let mut slot0 = vec![0u8; layout.slot_size as usize];
            let mut slot1 = vec![0u8; layout.slot_size as usize];
            read_fill_at(&reader, &mut slot0, layout.slot_offset(0))?;
            read_fill_at(&reader, &mut slot1, layout.slot_offset(1))?;
            let (generation, superblock) = newest_slot(&slot0, &slot1)
                .ok_or_else(|| LogError::Metadata("no valid superblock".into()))?;
            Ok((layout, generation, superblock))
        })
        .await?;

        if layout.id != id {
            return Err(LogError::InvalidArgument(format!(
                "{} holds physical log {}, not {}",
                path.display(),
                layout.id,
                id
            )));
        }

        tracing::info!(
            log = %id,
            path = %path.display(),
            read_only,
            streams = superblock.streams.len(),
            generation,
            "opened physical log"
        );

        Ok(Self::assemble(
            path, layout, file, read_only, superblock, generation, files, registry,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        path: &Path,
        layout: ContainerLayout,
        file: Arc<File>,
        read_only: bool,
        superblock: Superblock,
        generation: u64,
        files: F,
        registry: Registry,
    ) -> Self {
        let allocator = ChunkAllocator::from_superblock(layout.chunk_count, &superblock);
        let shared = Arc::new(ContainerShared {
            layout,
            path: path.to_path_buf(),
            file,
            read_only,
            state: Mutex::new(ContainerState {
                superblock,
                allocator,
                open_streams: HashMap::new(),
                opening: HashSet::new(),
                dirty: false,
                closed: false,
            }),
            generation: tokio::sync::Mutex::new(generation),
            registry,
        });
        Self { shared, files }
    }

    pub(crate) fn shared(&self) -> &Arc<ContainerShared> {
        &self.shared
    }

    pub fn id(&self) -> LogId {
        self.shared.id()
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn is_read_only(&self) -> bool {
        self.shared.read_only
    }

    /// Largest block size a stream in this container may use
    pub fn max_block_size(&self) -> u32 {
        self.shared.layout.chunk_size
    }

    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.shared.state().superblock.streams.keys().copied().collect()
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.shared.state().superblock.streams.contains_key(&id)
    }

    pub fn usage(&self) -> ContainerUsage {
        let state = self.shared.state();
        let chunk = u64::from(self.shared.layout.chunk_size);
        let allocated_bytes = state.allocator.used_count() * chunk;
        ContainerUsage {
            capacity_bytes: self.shared.layout.capacity,
            data_bytes: self.shared.layout.data_capacity(),
            allocated_bytes,
            free_bytes: state.allocator.free_count() * chunk,
            reserved_bytes: state.superblock.reserved_bytes(),
            reserved_chunks: state.superblock.reserved_chunks(self.shared.layout.chunk_size),
            stream_count: state.superblock.streams.len() as u32,
            max_streams: self.shared.layout.max_streams,
        }
    }

    /// Create a logical log and return it open
    ///
    /// With a `dedicated_path` the stream also destages its records into a
    /// sparse file at that path.
    pub async fn create_logical_log(
        &self,
        id: StreamId,
        alias: Option<&str>,
        dedicated_path: Option<&Path>,
        settings: LogicalLogSettings,
        cancel: &CancellationToken,
    ) -> Result<LogicalLog, LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_writable()?;
        if id.is_nil() {
            return Err(LogError::InvalidArgument("stream id must not be nil".into()));
        }
        if settings.max_size == 0 {
            return Err(LogError::InvalidArgument("maximum size must be positive".into()));
        }
        if settings.max_block_size == 0 || settings.max_block_size > self.max_block_size() {
            return Err(LogError::InvalidArgument(format!(
                "maximum block size {} must be in 1..={}",
                settings.max_block_size,
                self.max_block_size()
            )));
        }

        let meta = StreamMeta {
            id,
            alias: alias.map(str::to_string),
            max_size: settings.max_size,
            max_block_size: settings.max_block_size,
            head: 0,
            write_path: if dedicated_path.is_some() {
                WritePath::SharedAndDedicated
            } else {
                WritePath::Shared
            },
            dedicated_path: dedicated_path.map(Path::to_path_buf),
            chain: Vec::new(),
        };

        {
            let mut state = self.shared.state();
            if state.superblock.streams.contains_key(&id) {
                return Err(LogError::AlreadyExists(format!("logical log {id}")));
            }
            if let Some(alias) = alias {
                if state.superblock.stream_by_alias(alias).is_some() {
                    return Err(LogError::AlreadyExists(format!("alias {alias:?}")));
                }
            }
            if state.superblock.streams.len() >= self.shared.layout.max_streams as usize {
                return Err(LogError::CapacityExceeded(format!(
                    "physical log {} already hosts {} streams",
                    self.id(),
                    self.shared.layout.max_streams
                )));
            }
            let chunk_size = self.shared.layout.chunk_size;
            let reserved = state.superblock.reserved_chunks(chunk_size);
            let quota = chunk_quota(settings.max_size, chunk_size);
            if reserved + quota > self.shared.layout.chunk_count {
                return Err(LogError::CapacityExceeded(format!(
                    "maximum size {} needs {} chunks: {} of {} already reserved",
                    settings.max_size,
                    quota,
                    reserved,
                    self.shared.layout.chunk_count
                )));
            }
            state.superblock.streams.insert(id, meta.clone());
            state.opening.insert(id);
            state.dirty = true;
        }

        let created = self.create_backing(&meta).await;
        let dedicated = match created {
            Ok(d) => d,
            Err(e) => {
                let mut state = self.shared.state();
                state.superblock.streams.remove(&id);
                state.opening.remove(&id);
                return Err(e);
            }
        };

        if let Err(e) = self.shared.persist().await {
            let mut state = self.shared.state();
            state.superblock.streams.remove(&id);
            state.opening.remove(&id);
            state.dirty = true;
            return Err(e);
        }

        let log = LogicalLog::create(Arc::clone(&self.shared), &meta, dedicated);
        self.shared.finish_open(id, Some(log.shared()));
        tracing::info!(
            log = %self.id(),
            stream = %id,
            alias,
            max_size = settings.max_size,
            dedicated = dedicated_path.is_some(),
            "created logical log"
        );
        Ok(log)
    }

    async fn create_backing(&self, meta: &StreamMeta) -> Result<Option<SparseFileStore>, LogError> {
        let Some(path) = meta.dedicated_path.clone() else {
            return Ok(None);
        };
        let header = FileLogHeader {
            stream_id: meta.id,
            max_size: meta.max_size,
            max_block_size: meta.max_block_size,
            head: 0,
            length: 0,
        };
        let store = blocking(move || SparseFileStore::create(&path, &header)).await?;
        self.files.mark_sparse(store.file()).await?;
        Ok(Some(store))
    }

    /// Open a logical log by id, or by alias when `id` is nil
    pub async fn open_logical_log(
        &self,
        id: StreamId,
        alias: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<LogicalLog, LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_open()?;

        let meta = {
            let state = self.shared.state();
            let found = if !id.is_nil() {
                state.superblock.streams.get(&id)
            } else if let Some(alias) = alias {
                state.superblock.stream_by_alias(alias)
            } else {
                None
            };
            found.cloned().ok_or_else(|| {
                LogError::NotFound(match alias {
                    Some(a) if id.is_nil() => format!("logical log with alias {a:?}"),
                    _ => format!("logical log {id}"),
                })
            })?
        };

        self.shared.begin_open(meta.id)?;
        let result = crate::recovery::recover(&self.shared, meta.clone(), &self.files, cancel).await;
        match result {
            Ok(log) => {
                self.shared.finish_open(meta.id, Some(log.shared()));
                tracing::info!(
                    log = %self.id(),
                    stream = %meta.id,
                    head = log.head_truncation_position(),
                    length = log.length(),
                    "opened logical log"
                );
                Ok(log)
            }
            Err(e) => {
                self.shared.finish_open(meta.id, None);
                Err(e)
            }
        }
    }

    /// Remove a logical log, its chunks and its dedicated file
    pub async fn delete_logical_log(
        &self,
        id: StreamId,
        cancel: &CancellationToken,
    ) -> Result<(), LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_writable()?;

        let meta = {
            let mut guard = self.shared.state();
            let state = &mut *guard;
            if ContainerShared::is_stream_open(state, id) {
                return Err(LogError::AlreadyOpen(format!("logical log {id}")));
            }
            let meta = state
                .superblock
                .streams
                .remove(&id)
                .ok_or_else(|| LogError::NotFound(format!("logical log {id}")))?;
            for entry in &meta.chain {
                state.allocator.release(entry.index);
            }
            state.dirty = true;
            meta
        };

        self.shared.persist().await?;

        if let Some(path) = meta.dedicated_path {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::info!(log = %self.id(), stream = %id, "deleted logical log");
        Ok(())
    }

    /// Give `id` the alias `alias`, replacing any alias it had
    pub async fn assign_alias(
        &self,
        id: StreamId,
        alias: &str,
        cancel: &CancellationToken,
    ) -> Result<(), LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_writable()?;
        {
            let mut state = self.shared.state();
            if let Some(other) = state.superblock.stream_by_alias(alias) {
                if other.id == id {
                    return Ok(());
                }
                return Err(LogError::AlreadyExists(format!("alias {alias:?}")));
            }
            let meta = state
                .superblock
                .streams
                .get_mut(&id)
                .ok_or_else(|| LogError::NotFound(format!("logical log {id}")))?;
            meta.alias = Some(alias.to_string());
            state.dirty = true;
        }
        self.shared.persist().await
    }

    pub fn resolve_alias(&self, alias: &str) -> Result<StreamId, LogError> {
        self.shared
            .state()
            .superblock
            .stream_by_alias(alias)
            .map(|m| m.id)
            .ok_or_else(|| LogError::NotFound(format!("alias {alias:?}")))
    }

    pub async fn remove_alias(&self, alias: &str, cancel: &CancellationToken) -> Result<(), LogError> {
        check_cancel(cancel)?;
        self.shared.ensure_writable()?;
        {
            let mut state = self.shared.state();
            let meta = state
                .superblock
                .streams
                .values_mut()
                .find(|m| m.alias.as_deref() == Some(alias))
                .ok_or_else(|| LogError::NotFound(format!("alias {alias:?}")))?;
            meta.alias = None;
            state.dirty = true;
        }
        self.shared.persist().await
    }

    /// Close the container and every stream still open in it
    ///
    /// Unflushed appends of those streams are discarded.
    pub async fn close(self, cancel: &CancellationToken) -> Result<(), LogError> {
        check_cancel(cancel)?;
        let streams: Vec<Arc<StreamShared>> = {
            let mut state = self.shared.state();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state
                .open_streams
                .drain()
                .filter_map(|(_, w)| w.upgrade())
                .collect()
        };
        for stream in &streams {
            stream.mark_closed();
        }

        let result = self.shared.persist_if_dirty().await;
        if !self.shared.read_only {
            let _ = FileExt::unlock(&*self.shared.file);
        }
        self.shared.deregister();
        tracing::info!(log = %self.id(), closed_streams = streams.len(), "closed physical log");
        result
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
