// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sl_adapters::{FakeFileAdapter, FileCall};
use tempfile::TempDir;

const MIB: u64 = 1024 * 1024;

async fn manager(dir: &TempDir) -> LogManager<FakeFileAdapter> {
    LogManager::open(
        LoggerKind::InProc,
        SharedLogSettings::for_testing(dir.path()),
        FakeFileAdapter::new(),
        &CancellationToken::new(),
    )
    .await
    .unwrap()
}

fn small() -> LogicalLogSettings {
    LogicalLogSettings {
        max_size: MIB,
        max_block_size: 65536,
    }
}

#[tokio::test]
async fn open_creates_work_directory_and_falls_back_to_in_proc() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("nested/work");
    let manager = LogManager::open(
        LoggerKind::OutOfProc,
        SharedLogSettings::for_testing(&work),
        FakeFileAdapter::new(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(work.is_dir());
    assert_eq!(manager.logger_kind(), LoggerKind::InProc);
}

#[tokio::test]
async fn open_rejects_invalid_settings() {
    let dir = tempfile::tempdir().unwrap();
    let settings = SharedLogSettings {
        max_block_size: 1000,
        ..SharedLogSettings::for_testing(dir.path())
    };
    let result = LogManager::open(
        LoggerKind::InProc,
        settings,
        FakeFileAdapter::new(),
        &CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(LogError::Initialization(_))));
}

#[tokio::test]
async fn relative_paths_resolve_against_work_directory() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;
    let cancel = CancellationToken::new();

    let log = manager
        .create_physical_log_with_settings(Path::new("rel.log"), LogId::new_v4(), &cancel)
        .await
        .unwrap();
    assert_eq!(log.path(), dir.path().join("rel.log"));
    assert!(dir.path().join("rel.log").exists());
}

#[tokio::test]
async fn create_refuses_existing_path_and_live_id() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;
    let cancel = CancellationToken::new();
    let path = dir.path().join("a.log");
    let id = LogId::new_v4();
    let _log = manager
        .create_physical_log(&path, id, 16 * MIB, 4, 65536, &cancel)
        .await
        .unwrap();

    let same_path = manager
        .create_physical_log(&path, LogId::new_v4(), 16 * MIB, 4, 65536, &cancel)
        .await;
    assert!(matches!(same_path, Err(LogError::AlreadyExists(_))));

    let same_id = manager
        .create_physical_log(&dir.path().join("b.log"), id, 16 * MIB, 4, 65536, &cancel)
        .await;
    assert!(matches!(same_id, Err(LogError::AlreadyExists(_))));
}

#[tokio::test]
async fn failed_preallocation_removes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let files = FakeFileAdapter::new();
    files.fail_on("preallocate");
    let manager = LogManager::open(
        LoggerKind::InProc,
        SharedLogSettings::for_testing(dir.path()),
        files,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    let path = dir.path().join("a.log");

    let result = manager
        .create_physical_log(&path, LogId::new_v4(), 16 * MIB, 4, 65536, &CancellationToken::new())
        .await;
    assert!(result.is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn open_checks_presence_id_and_exclusivity() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;
    let cancel = CancellationToken::new();
    let path = dir.path().join("a.log");
    let id = LogId::new_v4();

    let missing = manager.open_physical_log(&path, id, false, &cancel).await;
    assert!(matches!(missing, Err(LogError::NotFound(_))));

    let log = manager
        .create_physical_log(&path, id, 16 * MIB, 4, 65536, &cancel)
        .await
        .unwrap();

    let twice = manager.open_physical_log(&path, id, false, &cancel).await;
    assert!(matches!(twice, Err(LogError::AlreadyOpen(_))));

    let reader = manager.open_physical_log(&path, id, true, &cancel).await.unwrap();
    assert!(reader.is_read_only());

    log.close(&cancel).await.unwrap();
    let wrong_id = manager.open_physical_log(&path, LogId::new_v4(), false, &cancel).await;
    assert!(matches!(wrong_id, Err(LogError::InvalidArgument(_))));

    let again = manager.open_physical_log(&path, id, false, &cancel).await.unwrap();
    assert_eq!(again.id(), id);
}

#[tokio::test]
async fn delete_refuses_open_log() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;
    let cancel = CancellationToken::new();
    let path = dir.path().join("a.log");
    let id = LogId::new_v4();
    let log = manager
        .create_physical_log(&path, id, 16 * MIB, 4, 65536, &cancel)
        .await
        .unwrap();

    let busy = manager.delete_physical_log(&path, id, &cancel).await;
    assert!(matches!(busy, Err(LogError::AlreadyOpen(_))));

    log.close(&cancel).await.unwrap();
    manager.delete_physical_log(&path, id, &cancel).await.unwrap();
    assert!(!path.exists());

    let gone = manager.delete_physical_log(&path, id, &cancel).await;
    assert!(matches!(gone, Err(LogError::NotFound(_))));
}

#[tokio::test]
async fn file_log_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;
    let cancel = CancellationToken::new();
    let path = dir.path().join("s.filelog");
    let id = StreamId::new_v4();

    let mut log = manager.create_file_log(&path, id, small(), &cancel).await.unwrap();
    assert_eq!(log.write_path(), sl_core::WritePath::File);
    log.append(&[3u8; 100_000], &cancel).await.unwrap();
    log.truncate_head(1000).unwrap();
    log.flush(&cancel).await.unwrap();
    log.close(&cancel).await.unwrap();

    let mut log = manager.open_file_log(&path, id, true, &cancel).await.unwrap();
    assert_eq!(log.length(), 100_000);
    assert_eq!(log.head_truncation_position(), 1000);
    log.seek_for_read(1000, sl_core::SeekOrigin::Begin).unwrap();
    let mut buf = vec![0u8; 200_000];
    let n = log.read(&mut buf, 0, &cancel).await.unwrap();
    assert_eq!(n, 99_000);
    assert!(buf[..n].iter().all(|b| *b == 3));
}

#[tokio::test]
async fn file_log_is_exclusive_and_checked() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;
    let cancel = CancellationToken::new();
    let path = dir.path().join("s.filelog");
    let id = StreamId::new_v4();

    let _writer = manager.create_file_log(&path, id, small(), &cancel).await.unwrap();
    assert!(matches!(
        manager.create_file_log(&path, id, small(), &cancel).await,
        Err(LogError::AlreadyExists(_))
    ));
    assert!(matches!(
        manager.open_file_log(&path, id, false, &cancel).await,
        Err(LogError::AlreadyOpen(_))
    ));
    assert!(matches!(
        manager.open_file_log(&path, StreamId::new_v4(), true, &cancel).await,
        Err(LogError::InvalidArgument(_))
    ));
    manager.open_file_log(&path, id, true, &cancel).await.unwrap();
}

#[tokio::test]
async fn file_log_marks_sparse() {
    let dir = tempfile::tempdir().unwrap();
    let files = FakeFileAdapter::new();
    let manager = LogManager::open(
        LoggerKind::InProc,
        SharedLogSettings::for_testing(dir.path()),
        files.clone(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    manager
        .create_file_log(&dir.path().join("s.filelog"), StreamId::new_v4(), small(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(files.calls(), vec![FileCall::MarkSparse]);
}

#[tokio::test]
async fn closed_manager_refuses_work() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;
    manager.close();
    let result = manager
        .create_physical_log_with_settings(Path::new("x.log"), LogId::new_v4(), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(LogError::Closed(_))));
}
