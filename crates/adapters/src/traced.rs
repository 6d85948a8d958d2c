// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::file::{FileAdapter, FileError};
use async_trait::async_trait;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

/// Wrapper that adds tracing to any FileAdapter
#[derive(Clone)]
pub struct TracedFileAdapter<F> {
    inner: F,
}

impl<F> TracedFileAdapter<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<F: FileAdapter> FileAdapter for TracedFileAdapter<F> {
    async fn mark_sparse(&self, file: &Arc<File>) -> Result<(), FileError> {
        let result = self.inner.mark_sparse(file).await;
        match &result {
            Ok(()) => tracing::debug!("marked sparse"),
            Err(e) => tracing::warn!(error = %e, "mark sparse failed"),
        }
        result
    }

    async fn preallocate(&self, file: &Arc<File>, len: u64) -> Result<(), FileError> {
        let span = tracing::info_span!("file.preallocate", len);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.preallocate(file, len).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "preallocated"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "preallocate failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn zero_range(
        &self,
        file: &Arc<File>,
        offset: u64,
        len: u64,
    ) -> Result<(), FileError> {
        let result = self.inner.zero_range(file, offset, len).await;
        match &result {
            Ok(()) => tracing::trace!(offset, len, "zeroed"),
            Err(e) => tracing::error!(offset, len, error = %e, "zero range failed"),
        }
        result
    }

    async fn replace_file(&self, from: &Path, to: &Path) -> Result<(), FileError> {
        let span = tracing::info_span!(
            "file.replace",
            from = %from.display(),
            to = %to.display()
        );
        async {
            // Precondition: source must exist
            if !from.exists() {
                tracing::error!("source file does not exist");
                return Err(FileError::Failed {
                    op: "replace_file",
                    reason: format!("source does not exist: {}", from.display()),
                });
            }

            let start = std::time::Instant::now();
            let result = self.inner.replace_file(from, to).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "replaced"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "replace failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
