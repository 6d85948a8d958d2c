// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform file primitives used by the log engine and the extractor

mod native;

pub use native::NativeFileAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeFileAdapter, FileCall};

use async_trait::async_trait;
use sl_core::LogError;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors from file primitives
#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{op} failed: {reason}")]
    Failed { op: &'static str, reason: String },
    #[error("blocking task failed: {0}")]
    Task(String),
}

impl From<FileError> for LogError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::Io(e) => LogError::Io(e),
            other => LogError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// Adapter for OS-specific file operations
///
/// Implementations take an already-open handle so the caller keeps control
/// of open modes and locking.
#[async_trait]
pub trait FileAdapter: Clone + Send + Sync + 'static {
    /// Mark a file sparse so unwritten ranges consume no storage
    async fn mark_sparse(&self, file: &Arc<File>) -> Result<(), FileError>;

    /// Reserve `len` bytes of storage; the file is at least `len` long afterwards
    async fn preallocate(&self, file: &Arc<File>, len: u64) -> Result<(), FileError>;

    /// Make `[offset, offset + len)` read as zeros
    ///
    /// Ranges past the end of the file may be left as holes.
    async fn zero_range(&self, file: &Arc<File>, offset: u64, len: u64)
        -> Result<(), FileError>;

    /// Atomically replace `to` with `from`
    async fn replace_file(&self, from: &Path, to: &Path) -> Result<(), FileError>;
}

/// Run a blocking file operation on the blocking pool
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, FileError>
where
    F: FnOnce() -> Result<T, FileError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FileError::Task(e.to_string()))?
}

/// Write zeros over `[offset, offset + len)` one page-sized buffer at a time
pub(crate) fn write_zeros(file: &File, offset: u64, len: u64) -> Result<(), FileError> {
    use std::io::{Seek, SeekFrom, Write};

    const ZEROS: [u8; 4096] = [0u8; 4096];
    let mut handle = file;
    handle.seek(SeekFrom::Start(offset))?;
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(ZEROS.len() as u64) as usize;
        handle.write_all(&ZEROS[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Sync the directory holding `path` so a rename survives a crash
#[cfg(unix)]
pub(crate) fn sync_parent(path: &Path) -> Result<(), FileError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn sync_parent(_path: &Path) -> Result<(), FileError> {
    Ok(())
}
