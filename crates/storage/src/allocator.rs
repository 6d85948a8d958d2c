// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chunk allocation within a container's data region

use crate::layout::Superblock;
use std::collections::BTreeSet;

/// Free set over the container's chunks; lowest index is handed out first
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkAllocator {
    free: BTreeSet<u64>,
    total: u64,
}

impl ChunkAllocator {
    /// All chunks free
    pub fn new(total: u64) -> Self {
        Self {
            free: (0..total).collect(),
            total,
        }
    }

    /// Rebuild the free set from the chains recorded in `superblock`
    pub fn from_superblock(total: u64, superblock: &Superblock) -> Self {
        let mut allocator = Self::new(total);
        for entry in superblock.streams.values().flat_map(|s| s.chain.iter()) {
            allocator.free.remove(&entry.index);
        }
        allocator
    }

    pub fn allocate(&mut self) -> Option<u64> {
        self.free.pop_first()
    }

    pub fn release(&mut self, index: u64) {
        if index < self.total {
            self.free.insert(index);
        }
    }

    pub fn free_count(&self) -> u64 {
        self.free.len() as u64
    }

    pub fn used_count(&self) -> u64 {
        self.total - self.free_count()
    }
}

#[cfg(test)]
#[path = "allocator_tests.rs"]
mod tests;
