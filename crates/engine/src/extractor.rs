// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Export of a logical log into a flat sparse file
//!
//! The output is exactly `length` bytes long: `[0, head)` reads as zeros and
//! `[head, length)` holds the live content. It is built in a `.partial`
//! sibling and moved into place once complete, so a rerun replaces the
//! previous export atomically.

use crate::error::ExtractError;
use sl_adapters::FileAdapter;
use sl_core::{LogError, SeekOrigin};
use sl_storage::LogicalLog;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BLOCK_SIZE: u32 = 64 * 1024;

/// Outcome of one extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractReport {
    pub head: u64,
    pub length: u64,
    pub block_size: u32,
    /// Blocks of live content visited
    pub blocks: u64,
    pub bytes_copied: u64,
    /// Blocks that came back short and were left partly zero
    pub short_reads: u64,
}

/// Copies logical logs out through a file adapter
#[derive(Clone)]
pub struct Extractor<F: FileAdapter> {
    files: F,
    block_size: u32,
}

impl<F: FileAdapter> Extractor<F> {
    pub fn new(files: F) -> Self {
        Self {
            files,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Export `log` into `output`
    pub async fn extract(
        &self,
        log: &mut LogicalLog,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<ExtractReport, ExtractError> {
        if cancel.is_cancelled() {
            return Err(LogError::Cancelled.into());
        }
        let start = Instant::now();
        let head = log.head_truncation_position();
        let length = log.length();
        let block = u64::from(self.block_size);
        let partial = partial_path(output);

        let create = partial.clone();
        let file = Arc::new(
            blocking(move || {
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&create)
            })
            .await?,
        );
        self.files.mark_sparse(&file).await?;

        let mut offset = 0;
        while offset < head {
            let len = block.min(head - offset);
            self.files.zero_range(&file, offset, len).await?;
            offset += len;
        }

        let live = length - head;
        let full_blocks = live / block;
        let last_block = live - full_blocks * block;
        let mut report = ExtractReport {
            head,
            length,
            block_size: self.block_size,
            blocks: 0,
            bytes_copied: 0,
            short_reads: 0,
        };

        let mut buf = vec![0u8; self.block_size as usize];
        for index in 0..=full_blocks {
            let expected = (if index < full_blocks { block } else { last_block }) as usize;
            if expected == 0 {
                continue;
            }
            let position = head + index * block;
            log.seek_for_read(position as i64, SeekOrigin::Begin)?;
            let got = read_block(log, &mut buf[..expected], cancel).await?;
            if got < expected {
                tracing::warn!(
                    stream = %log.id(),
                    position,
                    expected,
                    got,
                    "short read, leaving the rest of the block zero"
                );
                buf[got..expected].fill(0);
                report.short_reads += 1;
            }
            let data = buf[..expected].to_vec();
            let writer = Arc::clone(&file);
            blocking(move || write_block(&writer, position, &data)).await?;
            report.blocks += 1;
            report.bytes_copied += got as u64;
        }

        let finisher = Arc::clone(&file);
        blocking(move || {
            finisher.set_len(length)?;
            finisher.sync_all()
        })
        .await?;
        drop(file);
        self.files.replace_file(&partial, output).await?;

        tracing::info!(
            stream = %log.id(),
            output = %output.display(),
            head,
            length,
            blocks = report.blocks,
            short_reads = report.short_reads,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "extracted logical log"
        );
        Ok(report)
    }
}

/// Fill `buf` from the log's read position until it is full or the log has no more
///
/// A corrupt record ends the block early; the caller zero-fills the rest.
async fn read_block(
    log: &mut LogicalLog,
    buf: &mut [u8],
    cancel: &CancellationToken,
) -> Result<usize, LogError> {
    let mut filled = 0;
    while filled < buf.len() {
        let minimum = buf.len() - filled;
        match log.read(&mut buf[filled..], minimum, cancel).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(LogError::CorruptRecord { position, reason }) => {
                tracing::warn!(stream = %log.id(), position, %reason, "skipping corrupt record");
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn write_block(file: &File, offset: u64, data: &[u8]) -> io::Result<()> {
    let mut file = file;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    output.with_file_name(name)
}

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(io::Error::other)?
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
