// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-ahead buffering and sequential read cursors

use crate::stream::StreamShared;
use sl_core::{LogError, SeekOrigin};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Bytes fetched beyond the last read, valid while no truncation intervenes
#[derive(Debug, Default)]
pub(crate) struct ReadAhead {
    base: u64,
    data: Vec<u8>,
    generation: u64,
}

impl ReadAhead {
    /// Copy buffered bytes starting at `position` into `out`
    pub fn take(&self, position: u64, generation: u64, out: &mut [u8]) -> usize {
        if generation != self.generation || position < self.base {
            return 0;
        }
        let offset = position - self.base;
        if offset >= self.data.len() as u64 {
            return 0;
        }
        let available = &self.data[offset as usize..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        n
    }

    pub fn fill(&mut self, base: u64, data: Vec<u8>, generation: u64) {
        self.base = base;
        self.data = data;
        self.generation = generation;
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Resolve a seek against the current position and stream length
pub(crate) fn seek_target(
    current: u64,
    length: u64,
    offset: i64,
    origin: SeekOrigin,
) -> Result<u64, LogError> {
    let base = match origin {
        SeekOrigin::Begin => 0,
        SeekOrigin::Current => i128::from(current),
        SeekOrigin::End => i128::from(length),
    };
    let target = base + i128::from(offset);
    if target < 0 {
        return Err(LogError::InvalidArgument(format!(
            "seek to negative position {target}"
        )));
    }
    u64::try_from(target)
        .map_err(|_| LogError::InvalidArgument(format!("seek position {target} out of range")))
}

/// Sequential reader over a logical log
///
/// Each storage fetch reads at least one record size ahead, so small
/// reads are served from memory.
pub struct ReadCursor {
    shared: Arc<StreamShared>,
    position: u64,
    record_size: usize,
    ahead: ReadAhead,
}

impl std::fmt::Debug for ReadCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadCursor")
            .field("stream", &self.shared.id)
            .field("position", &self.position)
            .field("record_size", &self.record_size)
            .finish_non_exhaustive()
    }
}

impl ReadCursor {
    pub(crate) fn new(shared: Arc<StreamShared>, record_size: usize, position: u64) -> Self {
        Self {
            shared,
            position,
            record_size: record_size.max(1),
            ahead: ReadAhead::default(),
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn length(&self) -> u64 {
        self.shared.lock().length()
    }

    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64, LogError> {
        self.shared.ensure_open()?;
        self.position = seek_target(self.position, self.length(), offset, origin)?;
        Ok(self.position)
    }

    pub async fn read(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize, LogError> {
        let n = self
            .shared
            .read_buffered(&mut self.ahead, self.position, buf, self.record_size, cancel)
            .await?;
        self.position += n as u64;
        Ok(n)
    }

    /// Read until the end of the stream, appending to `out`
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>, cancel: &CancellationToken) -> Result<usize, LogError> {
        let mut buf = vec![0u8; self.record_size];
        let mut total = 0;
        loop {
            let n = self.read(&mut buf, cancel).await?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&buf[..n]);
            total += n;
        }
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
