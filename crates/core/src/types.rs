// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small value types shared across the engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference point for `seek_for_read`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

/// Where the log manager hosts its loggers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggerKind {
    /// Loggers run inside the calling process
    #[default]
    InProc,
    /// Loggers run in a separate driver; falls back to `InProc` when unavailable
    OutOfProc,
}

impl fmt::Display for LoggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerKind::InProc => f.write_str("in-proc"),
            LoggerKind::OutOfProc => f.write_str("out-of-proc"),
        }
    }
}

/// Which backing stores receive a stream's sealed records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePath {
    /// Records live in the shared container only
    #[default]
    Shared,
    /// Records are written to the container and destaged to a dedicated file
    SharedAndDedicated,
    /// Records are written to the dedicated file only; the container keeps metadata
    DedicatedOnly,
    /// A stand-alone file log with no container
    File,
}

impl WritePath {
    pub fn writes_shared(self) -> bool {
        matches!(self, WritePath::Shared | WritePath::SharedAndDedicated)
    }

    pub fn writes_dedicated(self) -> bool {
        !matches!(self, WritePath::Shared)
    }
}

/// Result of `flush_with_marker`
///
/// When `acknowledged` is true every byte below `position` is durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushMarker {
    pub position: u64,
    pub acknowledged: bool,
}
