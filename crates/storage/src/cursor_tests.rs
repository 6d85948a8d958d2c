// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn read_ahead_serves_buffered_range() {
    let mut ahead = ReadAhead::default();
    ahead.fill(100, vec![1, 2, 3, 4], 7);

    let mut out = [0u8; 3];
    assert_eq!(ahead.take(101, 7, &mut out), 3);
    assert_eq!(out, [2, 3, 4]);

    assert_eq!(ahead.take(103, 7, &mut out), 1);
    assert_eq!(ahead.take(104, 7, &mut out), 0);
    assert_eq!(ahead.take(99, 7, &mut out), 0);
}

#[test]
fn read_ahead_ignores_stale_generation() {
    let mut ahead = ReadAhead::default();
    ahead.fill(0, vec![9; 16], 1);
    let mut out = [0u8; 4];
    assert_eq!(ahead.take(0, 2, &mut out), 0);

    ahead.clear();
    assert_eq!(ahead.take(0, 1, &mut out), 0);
}

#[parameterized(
    begin = { 10, 100, 5, SeekOrigin::Begin, 5 },
    current_forward = { 10, 100, 5, SeekOrigin::Current, 15 },
    current_back = { 10, 100, -10, SeekOrigin::Current, 0 },
    end_back = { 10, 100, -1, SeekOrigin::End, 99 },
    past_end = { 10, 100, 50, SeekOrigin::End, 150 },
)]
fn seek_targets(current: u64, length: u64, offset: i64, origin: SeekOrigin, expected: u64) {
    assert_eq!(seek_target(current, length, offset, origin).unwrap(), expected);
}

#[parameterized(
    begin = { -1, SeekOrigin::Begin },
    current = { -11, SeekOrigin::Current },
    end = { -101, SeekOrigin::End },
)]
fn negative_seek_is_rejected(offset: i64, origin: SeekOrigin) {
    assert!(matches!(
        seek_target(10, 100, offset, origin),
        Err(LogError::InvalidArgument(_))
    ));
}
