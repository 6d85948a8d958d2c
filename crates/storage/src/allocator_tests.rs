// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::layout::{ChunkEntry, StreamMeta};
use sl_core::{StreamId, WritePath};

#[test]
fn allocates_lowest_first_and_reuses_released() {
    let mut alloc = ChunkAllocator::new(4);
    assert_eq!(alloc.allocate(), Some(0));
    assert_eq!(alloc.allocate(), Some(1));
    alloc.release(0);
    assert_eq!(alloc.allocate(), Some(0));
    assert_eq!(alloc.allocate(), Some(2));
    assert_eq!(alloc.allocate(), Some(3));
    assert_eq!(alloc.allocate(), None);
    assert_eq!(alloc.used_count(), 4);
}

#[test]
fn release_out_of_range_is_ignored() {
    let mut alloc = ChunkAllocator::new(2);
    alloc.release(99);
    assert_eq!(alloc.free_count(), 2);
}

#[test]
fn rebuild_skips_chained_chunks() {
    let id = StreamId::new_v4();
    let mut sb = Superblock::default();
    sb.streams.insert(
        id,
        StreamMeta {
            id,
            alias: None,
            max_size: 1024,
            max_block_size: 4096,
            head: 0,
            write_path: WritePath::Shared,
            dedicated_path: None,
            chain: vec![
                ChunkEntry {
                    index: 0,
                    base: 0,
                    epoch: 0,
                    limit: None,
                },
                ChunkEntry {
                    index: 2,
                    base: 4000,
                    epoch: 1,
                    limit: None,
                },
            ],
        },
    );

    let mut alloc = ChunkAllocator::from_superblock(4, &sb);
    assert_eq!(alloc.free_count(), 2);
    assert_eq!(alloc.allocate(), Some(1));
    assert_eq!(alloc.allocate(), Some(3));
}
