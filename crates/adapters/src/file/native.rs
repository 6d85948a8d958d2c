// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native file adapter

use super::{blocking, sync_parent, write_zeros, FileAdapter, FileError};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// File adapter backed by the host filesystem
///
/// Files on Unix filesystems are sparse without any marking, so
/// `mark_sparse` only records intent there. Zeroing a range that lies past
/// the end of the file extends the file instead of writing, which leaves a
/// hole.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeFileAdapter;

impl NativeFileAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileAdapter for NativeFileAdapter {
    async fn mark_sparse(&self, _file: &Arc<File>) -> Result<(), FileError> {
        Ok(())
    }

    async fn preallocate(&self, file: &Arc<File>, len: u64) -> Result<(), FileError> {
        let file = Arc::clone(file);
        blocking(move || {
            file.allocate(len)?;
            if file.metadata()?.len() < len {
                file.set_len(len)?;
            }
            Ok(())
        })
        .await
    }

    async fn zero_range(
        &self,
        file: &Arc<File>,
        offset: u64,
        len: u64,
    ) -> Result<(), FileError> {
        if len == 0 {
            return Ok(());
        }
        let file = Arc::clone(file);
        blocking(move || {
            let end = offset
                .checked_add(len)
                .ok_or_else(|| FileError::Failed {
                    op: "zero_range",
                    reason: "range overflows".into(),
                })?;
            let current = file.metadata()?.len();
            if offset >= current {
                // Entirely past EOF: extend and leave a hole
                file.set_len(end)?;
                return Ok(());
            }
            let written_end = end.min(current);
            write_zeros(&file, offset, written_end - offset)?;
            if end > current {
                file.set_len(end)?;
            }
            Ok(())
        })
        .await
    }

    async fn replace_file(&self, from: &Path, to: &Path) -> Result<(), FileError> {
        let from = from.to_path_buf();
        let to = to.to_path_buf();
        blocking(move || {
            std::fs::rename(&from, &to)?;
            sync_parent(&to)
        })
        .await
    }
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
