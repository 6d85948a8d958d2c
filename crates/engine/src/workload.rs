// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-tool workloads
//!
//! The write workload appends the same records to a container-backed
//! stream (with a dedicated log) and to a stand-alone file log. The read
//! workload reads both back through a read cursor and through direct reads
//! and checks them against each other and against the record pattern.

use crate::error::WorkloadError;
use sl_adapters::FileAdapter;
use sl_core::{LogId, SeekOrigin, StreamId};
use sl_storage::{LogManager, LogicalLog, ReadCursor};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Byte stored at `position` of every workload stream
pub fn pattern_byte(position: u64) -> u8 {
    (position % 251) as u8
}

/// Record of `size` bytes starting at stream position `position`
pub fn record_at(position: u64, size: usize) -> Vec<u8> {
    (position..position + size as u64).map(pattern_byte).collect()
}

/// Files used by a workload on one drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadPaths {
    pub shared_log: PathBuf,
    pub dedicated_log: PathBuf,
    pub file_log: PathBuf,
}

impl WorkloadPaths {
    pub fn new(drive: &Path, shared_log_id: LogId, stream_id: StreamId) -> Self {
        Self {
            shared_log: drive.join(format!("{shared_log_id}.log")),
            dedicated_log: drive.join(format!("{stream_id}.sflog")),
            file_log: drive.join(format!("{stream_id}.filelog")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub records: u64,
    pub record_size: u32,
    /// Length of both logs after the workload
    pub length: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReport {
    pub head: u64,
    pub length: u64,
    /// Bytes compared through the read cursors
    pub streamed_bytes: u64,
    /// Bytes compared through direct reads
    pub direct_bytes: u64,
}

/// Append `records` records to both logs, creating whatever is missing
pub async fn run_write<F: FileAdapter>(
    manager: &LogManager<F>,
    drive: &Path,
    shared_log_id: LogId,
    stream_id: StreamId,
    records: u64,
    cancel: &CancellationToken,
) -> Result<WriteReport, WorkloadError> {
    let paths = WorkloadPaths::new(drive, shared_log_id, stream_id);
    let settings = manager.settings();
    let record_size = settings.record_size;

    let opened = if paths.shared_log.exists() {
        manager
            .open_physical_log(&paths.shared_log, shared_log_id, false, cancel)
            .await
    } else {
        manager
            .create_physical_log_with_settings(&paths.shared_log, shared_log_id, cancel)
            .await
    };
    let physical = opened.map_err(WorkloadError::Open)?;

    let opened = if physical.contains(stream_id) {
        physical.open_logical_log(stream_id, None, cancel).await
    } else {
        physical
            .create_logical_log(
                stream_id,
                None,
                Some(&paths.dedicated_log),
                settings.logical_log(),
                cancel,
            )
            .await
    };
    let mut stream = opened.map_err(WorkloadError::Open)?;

    let opened = if paths.file_log.exists() {
        manager.open_file_log(&paths.file_log, stream_id, false, cancel).await
    } else {
        manager
            .create_file_log(&paths.file_log, stream_id, settings.logical_log(), cancel)
            .await
    };
    let mut file_log = opened.map_err(WorkloadError::Open)?;

    for _ in 0..records {
        let record = record_at(stream.length(), record_size as usize);
        stream.append(&record, cancel).await?;
        let record = record_at(file_log.length(), record_size as usize);
        file_log.append(&record, cancel).await?;
    }
    stream.flush(cancel).await?;
    file_log.flush(cancel).await?;

    let length = stream.length();
    tracing::info!(
        stream = %stream_id,
        records,
        record_size,
        length,
        "write workload complete"
    );

    stream.close(cancel).await?;
    file_log.close(cancel).await?;
    physical.close(cancel).await?;
    Ok(WriteReport {
        records,
        record_size,
        length,
    })
}

/// Read both logs back with `buffer_size` reads and compare them
pub async fn run_read<F: FileAdapter>(
    manager: &LogManager<F>,
    drive: &Path,
    shared_log_id: LogId,
    stream_id: StreamId,
    buffer_size: usize,
    cancel: &CancellationToken,
) -> Result<ReadReport, WorkloadError> {
    let paths = WorkloadPaths::new(drive, shared_log_id, stream_id);

    let physical = manager
        .open_physical_log(&paths.shared_log, shared_log_id, true, cancel)
        .await
        .map_err(WorkloadError::Open)?;
    let mut stream = physical
        .open_logical_log(stream_id, None, cancel)
        .await
        .map_err(WorkloadError::Open)?;
    let mut file_log = manager
        .open_file_log(&paths.file_log, stream_id, true, cancel)
        .await
        .map_err(WorkloadError::Open)?;

    let head = stream.head_truncation_position();
    let length = stream.length();
    // Larger buffers than the live range only cost memory
    let live = usize::try_from(length - head).unwrap_or(usize::MAX);
    let buffer_size = buffer_size.clamp(1, live.max(1));
    if file_log.length() != length || file_log.head_truncation_position() != head {
        return Err(WorkloadError::Mismatch {
            position: length.min(file_log.length()),
            detail: format!(
                "shared log holds [{}, {}), file log holds [{}, {})",
                head,
                length,
                file_log.head_truncation_position(),
                file_log.length()
            ),
        });
    }

    let mut shared_cursor = stream.create_read_stream(buffer_size)?;
    let mut file_cursor = file_log.create_read_stream(buffer_size)?;
    let streamed_bytes =
        compare_cursors(&mut shared_cursor, &mut file_cursor, buffer_size, cancel).await?;
    let direct_bytes = compare_direct(&mut stream, &mut file_log, buffer_size, cancel).await?;

    if streamed_bytes != length - head || direct_bytes != length - head {
        return Err(WorkloadError::Mismatch {
            position: head + streamed_bytes.min(direct_bytes),
            detail: format!(
                "expected {} bytes, streamed {} and read {}",
                length - head,
                streamed_bytes,
                direct_bytes
            ),
        });
    }

    tracing::info!(stream = %stream_id, head, length, buffer_size, "read workload complete");
    stream.close(cancel).await?;
    file_log.close(cancel).await?;
    physical.close(cancel).await?;
    Ok(ReadReport {
        head,
        length,
        streamed_bytes,
        direct_bytes,
    })
}

async fn compare_cursors(
    shared: &mut ReadCursor,
    file: &mut ReadCursor,
    buffer_size: usize,
    cancel: &CancellationToken,
) -> Result<u64, WorkloadError> {
    let mut left = vec![0u8; buffer_size];
    let mut right = vec![0u8; buffer_size];
    let mut total = 0;
    loop {
        let position = shared.position();
        let a = shared.read(&mut left, cancel).await?;
        let b = file.read(&mut right, cancel).await?;
        check_chunk(position, &left[..a], &right[..b])?;
        if a == 0 {
            return Ok(total);
        }
        total += a as u64;
    }
}

async fn compare_direct(
    shared: &mut LogicalLog,
    file: &mut LogicalLog,
    buffer_size: usize,
    cancel: &CancellationToken,
) -> Result<u64, WorkloadError> {
    let head = shared.head_truncation_position();
    shared.seek_for_read(head as i64, SeekOrigin::Begin)?;
    file.seek_for_read(head as i64, SeekOrigin::Begin)?;

    let mut left = vec![0u8; buffer_size];
    let mut right = vec![0u8; buffer_size];
    let mut total = 0;
    loop {
        let position = shared.read_position();
        let a = shared.read(&mut left, buffer_size, cancel).await?;
        let b = file.read(&mut right, buffer_size, cancel).await?;
        check_chunk(position, &left[..a], &right[..b])?;
        if a == 0 {
            return Ok(total);
        }
        total += a as u64;
    }
}

/// Both sides must agree with each other and with the record pattern
fn check_chunk(position: u64, shared: &[u8], file: &[u8]) -> Result<(), WorkloadError> {
    if shared.len() != file.len() {
        return Err(WorkloadError::Mismatch {
            position,
            detail: format!("shared read {} bytes, file read {}", shared.len(), file.len()),
        });
    }
    let offset = shared
        .iter()
        .zip(file)
        .enumerate()
        .position(|(i, (a, b))| a != b || *a != pattern_byte(position + i as u64));
    match offset {
        None => Ok(()),
        Some(i) => {
            let at = position + i as u64;
            Err(WorkloadError::Mismatch {
                position: at,
                detail: format!(
                    "shared {:#04x}, file {:#04x}, expected {:#04x}",
                    shared[i],
                    file[i],
                    pattern_byte(at)
                ),
            })
        }
    }
}

#[cfg(test)]
#[path = "workload_tests.rs"]
mod tests;
