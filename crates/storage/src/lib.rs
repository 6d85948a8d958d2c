// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sl-storage: the shared log container and its logical logs
//!
//! A physical log is one preallocated file divided into fixed-size chunks.
//! Each logical log owns a chain of chunks holding checksummed record
//! frames, optionally mirrored into a sparse dedicated file. Stand-alone
//! file logs use the dedicated file format without a container.

mod allocator;
mod container;
mod cursor;
mod dedicated;
mod index;
mod io;
mod layout;
mod manager;
pub mod record;
mod recovery;
mod stream;

pub use container::{ContainerUsage, PhysicalLog};
pub use cursor::ReadCursor;
pub use manager::LogManager;
pub use stream::LogicalLog;
