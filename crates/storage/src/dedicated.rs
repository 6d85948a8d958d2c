// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sparse single-stream files
//!
//! Used for a stream's dedicated log (`.sflog`) and for stand-alone file
//! logs (`.filelog`). One header page is followed by the stream bytes at
//! `4096 + position`; truncated and unwritten ranges stay as holes.

use crate::io::{read_fill_at, write_all_at};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use fs2::FileExt;
use sl_core::settings::PAGE_SIZE;
use sl_core::{LogError, StreamId};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FILE_LOG_MAGIC: u32 = 0x534c_464c;
const FILE_LOG_VERSION: u32 = 1;
const HEADER_BODY_LEN: usize = 56;

/// Header page of a sparse stream file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileLogHeader {
    pub stream_id: StreamId,
    pub max_size: u64,
    pub max_block_size: u32,
    pub head: u64,
    /// Bytes made durable by the last flush
    pub length: u64,
}

impl FileLogHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PAGE_SIZE as usize);
        let _ = buf.write_u32::<LittleEndian>(FILE_LOG_MAGIC);
        let _ = buf.write_u32::<LittleEndian>(FILE_LOG_VERSION);
        buf.extend_from_slice(self.stream_id.as_bytes());
        let _ = buf.write_u64::<LittleEndian>(self.max_size);
        let _ = buf.write_u32::<LittleEndian>(self.max_block_size);
        let _ = buf.write_u32::<LittleEndian>(0);
        let _ = buf.write_u64::<LittleEndian>(self.head);
        let _ = buf.write_u64::<LittleEndian>(self.length);
        let crc = crc32fast::hash(&buf[..HEADER_BODY_LEN]);
        let _ = buf.write_u32::<LittleEndian>(crc);
        buf.resize(PAGE_SIZE as usize, 0);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, LogError> {
        if buf.len() < HEADER_BODY_LEN + 4 || LittleEndian::read_u32(&buf[0..4]) != FILE_LOG_MAGIC
        {
            return Err(LogError::Metadata("not a shared log stream file".into()));
        }
        let stored = LittleEndian::read_u32(&buf[HEADER_BODY_LEN..HEADER_BODY_LEN + 4]);
        if stored != crc32fast::hash(&buf[..HEADER_BODY_LEN]) {
            return Err(LogError::Metadata("stream file header checksum mismatch".into()));
        }
        let mut id = [0u8; 16];
        id.copy_from_slice(&buf[8..24]);
        Ok(Self {
            stream_id: StreamId::from_bytes(id),
            max_size: LittleEndian::read_u64(&buf[24..32]),
            max_block_size: LittleEndian::read_u32(&buf[32..36]),
            head: LittleEndian::read_u64(&buf[40..48]),
            length: LittleEndian::read_u64(&buf[48..56]),
        })
    }
}

/// An open sparse stream file
#[derive(Debug)]
pub(crate) struct SparseFileStore {
    path: PathBuf,
    file: Arc<File>,
}

impl SparseFileStore {
    /// Create (or replace) the file and write its header
    pub fn create(path: &Path, header: &FileLogHeader) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::initialize(path, file, header)
    }

    /// Create a file that must not exist yet
    pub fn create_new(path: &Path, header: &FileLogHeader) -> Result<Self, LogError> {
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LogError::AlreadyExists(format!(
                    "stream file {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        Self::initialize(path, file, header)
    }

    fn initialize(path: &Path, file: File, header: &FileLogHeader) -> Result<Self, LogError> {
        write_all_at(&file, &header.encode(), 0)?;
        file.sync_all()?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(file),
        })
    }

    pub fn open(path: &Path, read_only: bool) -> Result<(Self, FileLogHeader), LogError> {
        let file = match OpenOptions::new().read(true).write(!read_only).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LogError::NotFound(format!(
                    "stream file {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let mut page = vec![0u8; PAGE_SIZE as usize];
        read_fill_at(&file, &mut page, 0)?;
        let header = FileLogHeader::decode(&page)?;
        Ok((
            Self {
                path: path.to_path_buf(),
                file: Arc::new(file),
            },
            header,
        ))
    }

    /// Take the cross-process exclusive lock
    pub fn lock_exclusive(&self) -> Result<(), LogError> {
        self.file.try_lock_exclusive().map_err(|_| {
            LogError::AlreadyOpen(format!("stream file {}", self.path.display()))
        })
    }

    pub fn unlock(&self) {
        let _ = FileExt::unlock(&*self.file);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> &Arc<File> {
        &self.file
    }

    pub fn write_header(&self, header: &FileLogHeader) -> Result<(), LogError> {
        write_all_at(&self.file, &header.encode(), 0)?;
        self.file.sync_data()?;
        Ok(())
    }

    pub fn write_at(&self, position: u64, data: &[u8]) -> Result<(), LogError> {
        write_all_at(&self.file, data, PAGE_SIZE + position)?;
        Ok(())
    }

    pub fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<(), LogError> {
        read_fill_at(&self.file, buf, PAGE_SIZE + position)?;
        Ok(())
    }

    /// Cut the data region at `length`
    pub fn set_length(&self, length: u64) -> Result<(), LogError> {
        self.file.set_len(PAGE_SIZE + length)?;
        Ok(())
    }

    pub fn sync(&self) -> Result<(), LogError> {
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "dedicated_tests.rs"]
mod tests;
