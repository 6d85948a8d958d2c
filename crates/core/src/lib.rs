// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sl-core: shared vocabulary of the shared log engine
//!
//! This crate provides:
//! - 128-bit identifiers for physical logs and logical log streams
//! - The error taxonomy every layer reports through
//! - Settings (with TOML loading) and small value types

pub mod error;
pub mod id;
pub mod settings;
pub mod types;

pub use error::LogError;
pub use id::{LogId, StreamId};
pub use settings::{LogicalLogSettings, SharedLogSettings};
pub use types::{FlushMarker, LoggerKind, SeekOrigin, WritePath};
