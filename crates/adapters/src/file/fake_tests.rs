// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn open_rw(path: &Path) -> Arc<File> {
    Arc::new(
        std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .unwrap(),
    )
}

#[tokio::test]
async fn records_calls_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let file = open_rw(&dir.path().join("a"));
    let fake = FakeFileAdapter::new();

    fake.mark_sparse(&file).await.unwrap();
    fake.preallocate(&file, 8192).await.unwrap();
    fake.zero_range(&file, 0, 100).await.unwrap();

    assert_eq!(
        fake.calls(),
        vec![
            FileCall::MarkSparse,
            FileCall::Preallocate { len: 8192 },
            FileCall::ZeroRange {
                offset: 0,
                len: 100
            },
        ]
    );
}

#[tokio::test]
async fn zero_range_writes_zeros_past_eof() {
    let dir = tempfile::tempdir().unwrap();
    let file = open_rw(&dir.path().join("a"));
    let fake = FakeFileAdapter::new();

    fake.zero_range(&file, 10, 5000).await.unwrap();

    assert_eq!(file.metadata().unwrap().len(), 5010);
}

#[tokio::test]
async fn injected_failure_is_reported_and_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let from = dir.path().join("from");
    let to = dir.path().join("to");
    std::fs::write(&from, b"x").unwrap();

    let fake = FakeFileAdapter::new();
    fake.fail_on("replace_file");

    let err = fake.replace_file(&from, &to).await.unwrap_err();
    assert!(matches!(err, FileError::Failed { op: "replace_file", .. }));
    assert!(from.exists());
    assert!(!to.exists());
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn replace_file_renames() {
    let dir = tempfile::tempdir().unwrap();
    let from = dir.path().join("from");
    let to = dir.path().join("to");
    std::fs::write(&from, b"new").unwrap();
    std::fs::write(&to, b"old").unwrap();

    FakeFileAdapter::new().replace_file(&from, &to).await.unwrap();

    assert_eq!(std::fs::read(&to).unwrap(), b"new");
    assert!(!from.exists());
}
