// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn defaults_are_valid() {
    SharedLogSettings::default().validate().unwrap();
    let dir = tempfile::tempdir().unwrap();
    SharedLogSettings::for_testing(dir.path()).validate().unwrap();
}

#[test]
fn toml_overrides_only_given_keys() {
    let settings = SharedLogSettings::from_toml_str(
        r#"
        work_directory = "/tmp/sl"
        logger_kind = "out_of_proc"
        max_block_size = 8192
        "#,
    )
    .unwrap();

    assert_eq!(settings.work_directory, PathBuf::from("/tmp/sl"));
    assert_eq!(settings.logger_kind, LoggerKind::OutOfProc);
    assert_eq!(settings.max_block_size, 8192);
    assert_eq!(
        settings.container_capacity,
        SharedLogSettings::default().container_capacity
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let err = SharedLogSettings::from_toml_str("bogus = 1").unwrap_err();
    assert!(matches!(err, LogError::Config(_)));
}

#[parameterized(
    unaligned_block = { "max_block_size = 5000" },
    zero_streams = { "max_streams = 0" },
    tiny_container = { "container_capacity = 4096" },
    zero_log_size = { "logical_log_max_size = 0" },
    zero_extract_block = { "extract_block_size = 0" },
)]
fn invalid_values_fail_validation(text: &str) {
    let err = SharedLogSettings::from_toml_str(text).unwrap_err();
    assert!(matches!(err, LogError::Config(_)), "{err}");
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sl.toml");
    std::fs::write(&path, "max_streams = 3\n").unwrap();

    let settings = SharedLogSettings::load(&path).unwrap();
    assert_eq!(settings.max_streams, 3);
}

#[test]
fn load_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SharedLogSettings::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, LogError::Config(_)));
}

#[cfg(unix)]
#[test]
fn resolve_joins_relative_paths() {
    let settings = SharedLogSettings {
        work_directory: PathBuf::from("/work"),
        ..SharedLogSettings::default()
    };
    assert_eq!(
        settings.resolve(Path::new("a.log")),
        PathBuf::from("/work/a.log")
    );
    assert_eq!(
        settings.resolve(Path::new("/abs/a.log")),
        PathBuf::from("/abs/a.log")
    );
}
