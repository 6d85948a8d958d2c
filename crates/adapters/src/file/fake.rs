// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake file adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{blocking, write_zeros, FileAdapter, FileError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Recorded file call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCall {
    MarkSparse,
    Preallocate { len: u64 },
    ZeroRange { offset: u64, len: u64 },
    ReplaceFile { from: PathBuf, to: PathBuf },
}

impl FileCall {
    fn op(&self) -> &'static str {
        match self {
            FileCall::MarkSparse => "mark_sparse",
            FileCall::Preallocate { .. } => "preallocate",
            FileCall::ZeroRange { .. } => "zero_range",
            FileCall::ReplaceFile { .. } => "replace_file",
        }
    }
}

/// Fake file adapter for testing
///
/// Performs portable equivalents of each primitive (zeros are always
/// written, never elided) and records every call. Operations named with
/// `fail_on` return an error instead.
#[derive(Clone, Default)]
pub struct FakeFileAdapter {
    calls: Arc<Mutex<Vec<FileCall>>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
}

impl FakeFileAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<FileCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Make every later call of `op` fail (e.g. `"replace_file"`)
    pub fn fail_on(&self, op: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(op);
    }

    fn record(&self, call: FileCall) -> Result<(), FileError> {
        let op = call.op();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);

        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(op)
        {
            return Err(FileError::Failed {
                op,
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FileAdapter for FakeFileAdapter {
    async fn mark_sparse(&self, _file: &Arc<File>) -> Result<(), FileError> {
        self.record(FileCall::MarkSparse)
    }

    async fn preallocate(&self, file: &Arc<File>, len: u64) -> Result<(), FileError> {
        self.record(FileCall::Preallocate { len })?;
        let file = Arc::clone(file);
        blocking(move || {
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
        self.record(FileCall::ZeroRange { offset, len })?;
        let file = Arc::clone(file);
        blocking(move || write_zeros(&file, offset, len)).await
    }

    async fn replace_file(&self, from: &Path, to: &Path) -> Result<(), FileError> {
        self.record(FileCall::ReplaceFile {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        })?;
        std::fs::rename(from, to)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
