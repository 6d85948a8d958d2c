// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::workload::record_at;
use sl_adapters::{FakeFileAdapter, FileCall, NativeFileAdapter};
use sl_core::{LogId, LoggerKind, LogicalLogSettings, SharedLogSettings, StreamId};
use sl_storage::record::{HEADER_LEN, RECORD_MAGIC};
use sl_storage::{LogManager, PhysicalLog};
use tempfile::TempDir;

const MIB: u64 = 1024 * 1024;

struct Setup {
    dir: TempDir,
    container: PathBuf,
    // Keeps the container open for the stream
    _physical: PhysicalLog<FakeFileAdapter>,
    stream: LogicalLog,
    cancel: CancellationToken,
}

/// A stream holding `length` pattern bytes with its head at `head`
async fn stream_with(length: u64, head: u64) -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let manager = LogManager::open(
        LoggerKind::InProc,
        SharedLogSettings::for_testing(dir.path()),
        FakeFileAdapter::new(),
        &cancel,
    )
    .await
    .unwrap();
    let container = dir.path().join("shared.log");
    let physical = manager
        .create_physical_log(&container, LogId::new_v4(), 64 * MIB, 8, 65536, &cancel)
        .await
        .unwrap();
    let mut stream = physical
        .create_logical_log(
            StreamId::new_v4(),
            None,
            None,
            LogicalLogSettings {
                max_size: 8 * MIB,
                max_block_size: 65536,
            },
            &cancel,
        )
        .await
        .unwrap();
    stream
        .append(&record_at(0, length as usize), &cancel)
        .await
        .unwrap();
    stream.truncate_head(head).unwrap();
    stream.flush(&cancel).await.unwrap();
    Setup {
        dir,
        container,
        _physical: physical,
        stream,
        cancel,
    }
}

fn expected_export(length: u64, head: u64) -> Vec<u8> {
    let mut out = vec![0u8; head as usize];
    out.extend_from_slice(&record_at(head, (length - head) as usize));
    out
}

#[tokio::test]
async fn export_zeroes_below_head_and_copies_the_rest() {
    let mut s = stream_with(196_608, 65_536).await;
    let output = s.dir.path().join("out.bin");
    let files = FakeFileAdapter::new();

    let report = Extractor::new(files.clone())
        .extract(&mut s.stream, &output, &s.cancel)
        .await
        .unwrap();

    assert_eq!(
        report,
        ExtractReport {
            head: 65_536,
            length: 196_608,
            block_size: 65_536,
            blocks: 2,
            bytes_copied: 131_072,
            short_reads: 0,
        }
    );
    let data = std::fs::read(&output).unwrap();
    assert_eq!(data.len(), 196_608);
    assert_eq!(data, expected_export(196_608, 65_536));
    assert!(!partial_path(&output).exists());

    let calls = files.calls();
    assert_eq!(calls[0], FileCall::MarkSparse);
    assert_eq!(calls[1], FileCall::ZeroRange { offset: 0, len: 65_536 });
    assert!(matches!(calls.last(), Some(FileCall::ReplaceFile { .. })));
}

#[tokio::test]
async fn partial_last_block_is_sized_to_the_remainder() {
    let mut s = stream_with(100_000, 30_000).await;
    let output = s.dir.path().join("out.bin");

    let report = Extractor::new(FakeFileAdapter::new())
        .with_block_size(16_384)
        .extract(&mut s.stream, &output, &s.cancel)
        .await
        .unwrap();

    assert_eq!(report.blocks, 5);
    assert_eq!(report.bytes_copied, 70_000);
    assert_eq!(std::fs::read(&output).unwrap(), expected_export(100_000, 30_000));
}

#[tokio::test]
async fn extraction_is_idempotent() {
    let mut s = stream_with(150_000, 10_000).await;
    let output = s.dir.path().join("out.bin");
    let extractor = Extractor::new(NativeFileAdapter::new());

    extractor.extract(&mut s.stream, &output, &s.cancel).await.unwrap();
    let first = std::fs::read(&output).unwrap();
    extractor.extract(&mut s.stream, &output, &s.cancel).await.unwrap();
    let second = std::fs::read(&output).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, expected_export(150_000, 10_000));
}

#[tokio::test]
async fn empty_stream_exports_empty_file() {
    let mut s = stream_with(0, 0).await;
    let output = s.dir.path().join("out.bin");

    let report = Extractor::new(FakeFileAdapter::new())
        .extract(&mut s.stream, &output, &s.cancel)
        .await
        .unwrap();

    assert_eq!(report.blocks, 0);
    assert_eq!(std::fs::metadata(&output).unwrap().len(), 0);
}

#[tokio::test]
async fn corrupt_record_becomes_zeros() {
    let mut s = stream_with(100_000, 0).await;

    let raw = std::fs::read(&s.container).unwrap();
    let magic = RECORD_MAGIC.to_le_bytes();
    let first_frame = (4096..raw.len())
        .step_by(4096)
        .find(|&at| raw[at..at + 4] == magic)
        .unwrap();
    let file = OpenOptions::new().write(true).open(&s.container).unwrap();
    write_block(&file, (first_frame + HEADER_LEN + 10) as u64, &[0xFF; 4]).unwrap();

    let output = s.dir.path().join("out.bin");
    let report = Extractor::new(FakeFileAdapter::new())
        .extract(&mut s.stream, &output, &s.cancel)
        .await
        .unwrap();

    assert!(report.short_reads >= 1);
    let data = std::fs::read(&output).unwrap();
    assert_eq!(data.len(), 100_000);
    assert!(data[..1000].iter().all(|b| *b == 0));
}

#[tokio::test]
async fn failed_replace_leaves_no_output() {
    let mut s = stream_with(10_000, 0).await;
    let output = s.dir.path().join("out.bin");
    let files = FakeFileAdapter::new();
    files.fail_on("replace_file");

    let result = Extractor::new(files)
        .extract(&mut s.stream, &output, &s.cancel)
        .await;

    assert!(matches!(result, Err(ExtractError::File(_))));
    assert!(!output.exists());
}

#[tokio::test]
async fn cancelled_extraction_creates_nothing() {
    let mut s = stream_with(10_000, 0).await;
    let output = s.dir.path().join("out.bin");
    let cancelled = CancellationToken::new();
    cancelled.cancel();

    let result = Extractor::new(FakeFileAdapter::new())
        .extract(&mut s.stream, &output, &cancelled)
        .await;

    assert!(matches!(result, Err(ExtractError::Log(LogError::Cancelled))));
    assert!(!partial_path(&output).exists());
}

#[test]
fn partial_path_appends_suffix() {
    assert_eq!(
        partial_path(Path::new("/tmp/out.bin")),
        PathBuf::from("/tmp/out.bin.partial")
    );
}
