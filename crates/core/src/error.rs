// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for shared log operations

use thiserror::Error;

/// Errors reported by the log manager, containers and streams
#[derive(Debug, Error)]
pub enum LogError {
    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("already open: {0}")]
    AlreadyOpen(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corrupt record at position {position}: {reason}")]
    CorruptRecord { position: u64, reason: String },

    #[error("read-only: {0}")]
    ReadOnly(String),

    #[error("closed: {0}")]
    Closed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// Build a `CorruptRecord` error
    pub fn corrupt(position: u64, reason: impl Into<String>) -> Self {
        LogError::CorruptRecord {
            position,
            reason: reason.into(),
        }
    }
}
