// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings for the log manager, containers and tools
//!
//! Every field has a default, so a TOML file only needs the keys it
//! overrides:
//!
//! ```toml
//! work_directory = "/var/lib/shared-log"
//! container_capacity = 268435456
//! max_block_size = 262144
//! ```

use crate::error::LogError;
use crate::types::LoggerKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Smallest I/O unit of the container and dedicated files
pub const PAGE_SIZE: u64 = 4096;

/// Settings for the log manager and the physical logs it creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharedLogSettings {
    /// Directory the manager may use for scratch state; relative log paths resolve against it
    pub work_directory: PathBuf,
    pub logger_kind: LoggerKind,
    /// Size of a newly created container file, including its metadata area
    pub container_capacity: u64,
    pub max_streams: u32,
    /// Largest record payload; also the container's allocation unit
    pub max_block_size: u32,
    /// Default `maximum_size` of a new logical log
    pub logical_log_max_size: u64,
    /// Block size used when exporting a stream
    pub extract_block_size: u32,
    /// Record size used by the read tool's write workload
    pub record_size: u32,
}

impl Default for SharedLogSettings {
    fn default() -> Self {
        Self {
            work_directory: std::env::temp_dir().join("shared-log"),
            logger_kind: LoggerKind::InProc,
            container_capacity: 256 * MIB,
            max_streams: 64,
            max_block_size: (256 * KIB) as u32,
            logical_log_max_size: 64 * MIB,
            extract_block_size: (64 * KIB) as u32,
            record_size: PAGE_SIZE as u32,
        }
    }
}

impl SharedLogSettings {
    /// Settings suitable for tests: small containers rooted in `dir`
    pub fn for_testing(dir: &Path) -> Self {
        Self {
            work_directory: dir.to_path_buf(),
            container_capacity: 64 * MIB,
            max_streams: 8,
            max_block_size: (64 * KIB) as u32,
            logical_log_max_size: 8 * MIB,
            ..Self::default()
        }
    }

    /// Parse settings from TOML text and validate them
    pub fn from_toml_str(text: &str) -> Result<Self, LogError> {
        let settings: Self = toml::from_str(text).map_err(|e| LogError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, LogError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LogError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), LogError> {
        let block = u64::from(self.max_block_size);
        if block < PAGE_SIZE || block % PAGE_SIZE != 0 {
            return Err(LogError::Config(format!(
                "max_block_size must be a non-zero multiple of {PAGE_SIZE}, got {block}"
            )));
        }
        if self.max_streams == 0 {
            return Err(LogError::Config("max_streams must be at least 1".into()));
        }
        if self.container_capacity < 4 * block {
            return Err(LogError::Config(format!(
                "container_capacity {} is too small for max_block_size {}",
                self.container_capacity, block
            )));
        }
        if self.logical_log_max_size == 0 {
            return Err(LogError::Config("logical_log_max_size must be positive".into()));
        }
        if self.extract_block_size == 0 || self.record_size == 0 {
            return Err(LogError::Config(
                "extract_block_size and record_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Per-stream limits derived from these settings
    pub fn logical_log(&self) -> LogicalLogSettings {
        LogicalLogSettings {
            max_size: self.logical_log_max_size,
            max_block_size: self.max_block_size,
        }
    }

    /// Resolve `path` against the work directory when it is relative
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_directory.join(path)
        }
    }
}

/// Limits for a single logical log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalLogSettings {
    pub max_size: u64,
    pub max_block_size: u32,
}

impl Default for LogicalLogSettings {
    fn default() -> Self {
        SharedLogSettings::default().logical_log()
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
