// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sl_core::{LogError, LogId};
use yare::parameterized;

#[derive(Parser, Debug)]
#[command(name = "demo", version)]
struct Demo {
    id: LogId,
    count: u64,
}

const GUID: &str = "7d444840-9dc0-11d1-b245-5ffdce74fad2";

#[parameterized(
    help = { &["demo", "--help"], exit::SUCCESS },
    version = { &["demo", "--version"], exit::SUCCESS },
    missing_argument = { &["demo", GUID], exit::ARGUMENTS },
    extra_argument = { &["demo", GUID, "3", "4"], exit::ARGUMENTS },
    bad_guid = { &["demo", "not-a-guid", "3"], exit::ARGUMENTS },
    bad_number = { &["demo", GUID, "three"], exit::ARGUMENTS },
)]
fn parse_failures_map_to_exit_codes(args: &[&str], code: i32) {
    assert_eq!(parse_args::<Demo, _, _>(args.iter().copied()).unwrap_err(), code);
}

#[test]
fn parse_accepts_guid_and_count() {
    let demo = parse_args::<Demo, _, _>(["demo", GUID, "25"]).unwrap();
    assert_eq!(demo.id, GUID.parse().unwrap());
    assert_eq!(demo.count, 25);
}

#[test]
fn exit_with_keeps_code_and_error() {
    let result: Result<(), LogError> = Err(LogError::Cancelled);
    let failure = result.exit_with(exit::OPEN).unwrap_err();
    assert_eq!(failure.code, exit::OPEN);
    assert!(failure.error.downcast_ref::<LogError>().is_some());
}

#[test]
fn report_returns_the_failure_code() {
    assert_eq!(report(Ok(())), exit::SUCCESS);
    let failure = Failure {
        code: exit::FAILURE,
        error: anyhow::anyhow!("mismatch"),
    };
    assert_eq!(report(Err(failure)), exit::FAILURE);
}

#[test]
fn settings_default_to_the_work_directory() {
    let dir = tempfile::tempdir().unwrap();
    let settings = load_settings(None, dir.path()).unwrap();
    assert_eq!(settings.work_directory, dir.path());
    assert_eq!(settings.record_size, SharedLogSettings::default().record_size);
}

#[test]
fn settings_load_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("sl.toml");
    std::fs::write(&config, "container_capacity = 16777216\nrecord_size = 512\n").unwrap();

    let settings = load_settings(Some(&config), dir.path()).unwrap();
    assert_eq!(settings.container_capacity, 16 * 1024 * 1024);
    assert_eq!(settings.record_size, 512);
}

#[test]
fn missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_settings(Some(&dir.path().join("absent.toml")), dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("absent.toml"));
}
