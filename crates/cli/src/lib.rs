// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sl: shared plumbing for the `extract-logical-log` and `log-read-tool` binaries

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use sl_core::SharedLogSettings;
use std::ffi::OsString;
use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Process exit codes shared by both tools
pub mod exit {
    pub const SUCCESS: i32 = 0;
    /// Bad argument count, unparsable GUID or number
    pub const ARGUMENTS: i32 = -1;
    /// The log manager (or its settings) could not be brought up
    pub const MANAGER: i32 = 1;
    /// A physical, logical or file log could not be opened
    pub const OPEN: i32 = -2;
    /// The extraction or workload itself failed
    pub const FAILURE: i32 = 2;
}

/// An error paired with the exit code it maps to
#[derive(Debug)]
pub struct Failure {
    pub code: i32,
    pub error: anyhow::Error,
}

pub trait ExitWith<T> {
    fn exit_with(self, code: i32) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> ExitWith<T> for Result<T, E> {
    fn exit_with(self, code: i32) -> Result<T, Failure> {
        self.map_err(|e| Failure {
            code,
            error: e.into(),
        })
    }
}

/// Parse command-line arguments, printing clap's message on failure
///
/// Help and version requests exit successfully; anything else is an
/// argument error.
pub fn parse_args<P, I, A>(args: I) -> Result<P, i32>
where
    P: Parser,
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    P::try_parse_from(args).map_err(|e| {
        // Nothing useful to do if the terminal is gone
        let _ = e.print();
        match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => exit::SUCCESS,
            _ => exit::ARGUMENTS,
        }
    })
}

/// Install the stderr subscriber (`RUST_LOG`, default `warn`)
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false),
        )
        .try_init();
}

/// Settings from `config` when given, otherwise defaults rooted in `work_directory`
pub fn load_settings(
    config: Option<&Path>,
    work_directory: &Path,
) -> anyhow::Result<SharedLogSettings> {
    match config {
        Some(path) => SharedLogSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(SharedLogSettings {
            work_directory: work_directory.to_path_buf(),
            ..SharedLogSettings::default()
        }),
    }
}

/// Make `path` absolute against the current directory
pub fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("invalid path {}", path.display()))
}

/// A token cancelled when the process is interrupted
pub fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            child.cancel();
        }
    });
    token
}

/// Run `work` to completion on a fresh runtime and turn its outcome into an exit code
pub fn run_to_exit<F>(work: F) -> i32
where
    F: Future<Output = Result<(), Failure>>,
{
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return exit::MANAGER;
        }
    };
    report(runtime.block_on(work))
}

/// Log a failure and return its exit code
pub fn report(outcome: Result<(), Failure>) -> i32 {
    match outcome {
        Ok(()) => exit::SUCCESS,
        Err(failure) => {
            tracing::error!(code = failure.code, "{:#}", failure.error);
            failure.code
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
