// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for extraction and the read-tool workloads

use sl_adapters::FileError;
use sl_core::LogError;
use thiserror::Error;

/// Errors that can occur while exporting a logical log
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("log error: {0}")]
    Log(#[from] LogError),
    #[error("file error: {0}")]
    File(#[from] FileError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while running a read-tool workload
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// A log could not be created or opened
    #[error("open failed: {0}")]
    Open(LogError),
    #[error("log error: {0}")]
    Log(#[from] LogError),
    #[error("content mismatch at {position}: {detail}")]
    Mismatch { position: u64, detail: String },
}
