// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sl-engine: logical log export and the read-tool workloads

mod error;
mod extractor;
pub mod workload;

pub use error::{ExtractError, WorkloadError};
pub use extractor::{ExtractReport, Extractor, DEFAULT_BLOCK_SIZE};
pub use workload::{run_read, run_write, ReadReport, WorkloadPaths, WriteReport};
