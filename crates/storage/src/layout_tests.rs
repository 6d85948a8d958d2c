// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const MIB: u64 = 1024 * 1024;

fn sample_superblock() -> Superblock {
    let id = StreamId::new_v4();
    let mut sb = Superblock {
        next_epoch: 3,
        ..Superblock::default()
    };
    sb.streams.insert(
        id,
        StreamMeta {
            id,
            alias: Some("primary".into()),
            max_size: 8 * MIB,
            max_block_size: 65536,
            head: 100,
            write_path: WritePath::SharedAndDedicated,
            dedicated_path: Some(PathBuf::from("/logs/a.sflog")),
            chain: vec![
                ChunkEntry {
                    index: 4,
                    base: 0,
                    epoch: 1,
                    limit: None,
                },
                ChunkEntry {
                    index: 9,
                    base: 65000,
                    epoch: 2,
                    limit: Some(70000),
                },
            ],
        },
    );
    sb
}

#[test]
fn layout_of_64_mib_container() {
    let layout = ContainerLayout::compute(LogId::new_v4(), 64 * MIB, 8, 65536).unwrap();

    assert_eq!(layout.data_offset % PAGE_SIZE, 0);
    assert!(layout.data_offset + layout.data_capacity() <= 64 * MIB);
    assert!(layout.data_capacity() >= 60 * MIB);
    assert_eq!(layout.chunk_offset(0), layout.data_offset);
    assert_eq!(layout.chunk_offset(2), layout.data_offset + 2 * 65536);
    assert_eq!(layout.slot_offset(0), PAGE_SIZE);
    assert_eq!(layout.slot_offset(3), PAGE_SIZE + layout.slot_size);
}

#[parameterized(
    zero_block = { MIB, 4, 0 },
    unaligned_block = { MIB, 4, 5000 },
    zero_streams = { MIB, 0, 4096 },
    no_data_room = { 16384, 4, 4096 },
)]
fn rejects_unusable_geometry(capacity: u64, max_streams: u32, block: u32) {
    let err = ContainerLayout::compute(LogId::new_v4(), capacity, max_streams, block).unwrap_err();
    assert!(matches!(err, LogError::InvalidArgument(_)), "{err}");
}

#[test]
fn header_encodes_to_one_page_and_decodes() {
    let layout = ContainerLayout::compute(LogId::new_v4(), 64 * MIB, 8, 65536).unwrap();
    let page = layout.encode();
    assert_eq!(page.len(), PAGE_SIZE as usize);
    assert_eq!(ContainerLayout::decode(&page).unwrap(), layout);
}

#[test]
fn header_corruption_is_metadata_error() {
    let layout = ContainerLayout::compute(LogId::new_v4(), 64 * MIB, 8, 65536).unwrap();
    let mut page = layout.encode();
    page[30] ^= 1;
    assert!(matches!(
        ContainerLayout::decode(&page),
        Err(LogError::Metadata(_))
    ));
    assert!(matches!(
        ContainerLayout::decode(&[0u8; 4096]),
        Err(LogError::Metadata(_))
    ));
}

#[test]
fn slot_roundtrip_keeps_superblock() {
    let sb = sample_superblock();
    let slot = encode_slot(12, &sb, 65536).unwrap();
    let (generation, decoded) = decode_slot(&slot).unwrap();
    assert_eq!(generation, 12);
    assert_eq!(decoded, sb);
    assert_eq!(decoded.stream_by_alias("primary").map(|s| s.head), Some(100));
    assert_eq!(decoded.reserved_bytes(), 8 * MIB);
    assert_eq!(decoded.reserved_chunks(65536), 131);
}

#[test]
fn oversized_superblock_is_rejected() {
    let err = encode_slot(1, &sample_superblock(), 64).unwrap_err();
    assert!(matches!(err, LogError::Metadata(_)));
}

#[test]
fn newest_valid_slot_wins() {
    let mut older = sample_superblock();
    older.next_epoch = 1;
    let newer = sample_superblock();

    let a = encode_slot(4, &older, 65536).unwrap();
    let b = encode_slot(5, &newer, 65536).unwrap();
    assert_eq!(newest_slot(&a, &b).unwrap().0, 5);
    assert_eq!(newest_slot(&b, &a).unwrap().0, 5);

    // A torn newer slot falls back to the older one
    let mut torn = b.clone();
    let last = torn.len() - 1;
    torn[last] ^= 0xFF;
    assert_eq!(newest_slot(&a, &torn).unwrap().0, 4);

    assert!(newest_slot(&[0u8; 64], &[0u8; 64]).is_none());
}

#[parameterized(
    tiny = { 1, 4096, 3 },
    one_chunk_of_payload = { 4000, 4096, 4 },
    just_below = { 3999, 4096, 3 },
    eight_mib = { 8 * MIB, 65536, 131 },
)]
fn quota_covers_first_last_and_spare_chunks(max_size: u64, chunk_size: u32, expected: u64) {
    assert_eq!(chunk_quota(max_size, chunk_size), expected);
}
