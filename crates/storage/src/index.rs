// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory index of a stream's records in the container

/// Location of one record frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordRef {
    /// Stream position of the first payload byte
    pub position: u64,
    /// Visible payload bytes; less than `payload_len` after a tail cut
    pub len: u32,
    /// Payload length stored in the frame
    pub payload_len: u32,
    /// File offset of the frame header
    pub offset: u64,
    pub epoch: u64,
}

impl RecordRef {
    pub fn end(&self) -> u64 {
        self.position + u64::from(self.len)
    }
}

/// Records ordered by position, contiguous from the first to the last
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordIndex {
    records: Vec<RecordRef>,
}

impl RecordIndex {
    pub fn push(&mut self, record: RecordRef) {
        self.records.push(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records overlapping `[start, end)`, in order
    pub fn covering(&self, start: u64, end: u64) -> Vec<RecordRef> {
        let first = self.records.partition_point(|r| r.end() <= start);
        self.records[first..]
            .iter()
            .take_while(|r| r.position < end)
            .copied()
            .collect()
    }

    /// Drop records that lie entirely below `head`
    pub fn trim_below(&mut self, head: u64) {
        let keep_from = self.records.partition_point(|r| r.end() <= head);
        self.records.drain(..keep_from);
    }

    /// Drop or clip records so nothing extends past `length`
    pub fn trim_above(&mut self, length: u64) {
        let keep = self.records.partition_point(|r| r.position < length);
        self.records.truncate(keep);
        if let Some(last) = self.records.last_mut() {
            if last.end() > length {
                last.len = (length - last.position) as u32;
            }
        }
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
