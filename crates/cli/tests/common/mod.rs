// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use sl_core::{LogId, StreamId};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Exit status as the parent sees it; unix keeps only the low 8 bits
pub fn status(code: i32) -> i32 {
    if cfg!(unix) {
        code & 0xff
    } else {
        code
    }
}

/// Byte the read tool writes at stream position `position`
pub fn pattern_byte(position: u64) -> u8 {
    (position % 251) as u8
}

/// A scratch drive with a small settings file and fresh log ids
pub struct TestDrive {
    pub temp: TempDir,
    pub config: PathBuf,
    pub log: LogId,
    pub stream: StreamId,
}

impl TestDrive {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let config = temp.path().join("sl.toml");
        std::fs::write(
            &config,
            format!(
                "work_directory = '{}'\n\
                 container_capacity = 16777216\n\
                 max_block_size = 65536\n\
                 logical_log_max_size = 4194304\n",
                temp.path().display()
            ),
        )
        .expect("Failed to write settings");
        Self {
            temp,
            config,
            log: LogId::new_v4(),
            stream: StreamId::new_v4(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn shared_log(&self) -> PathBuf {
        self.path().join(format!("{}.log", self.log))
    }

    pub fn file_log(&self) -> PathBuf {
        self.path().join(format!("{}.filelog", self.stream))
    }

    /// Arguments for `log-read-tool <mode>` against this drive
    pub fn read_tool_args(&self, mode: &str, count: u64) -> Vec<String> {
        vec![
            mode.to_string(),
            self.path().display().to_string(),
            self.log.to_string(),
            self.stream.to_string(),
            count.to_string(),
            "--config".to_string(),
            self.config.display().to_string(),
        ]
    }
}
