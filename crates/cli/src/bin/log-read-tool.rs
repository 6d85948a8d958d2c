// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! log-read-tool: write a patterned workload into a shared log stream and a
//! file log, or read both back and compare them

use anyhow::Context;
use clap::{Parser, ValueEnum};
use sl_adapters::NativeFileAdapter;
use sl_cli::{exit, ExitWith, Failure};
use sl_core::{LogId, StreamId};
use sl_engine::{run_read, run_write, WorkloadError};
use sl_storage::LogManager;
use std::path::PathBuf;

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Append records to both logs
    Write,
    /// Read both logs back and compare
    Read,
}

#[derive(Parser)]
#[command(
    name = "log-read-tool",
    version,
    about = "Exercise the shared log write and read paths"
)]
struct Args {
    mode: Mode,
    /// Directory holding the logs
    drive_path: PathBuf,
    /// Id of the shared log container (`{guid}.log`)
    shared_log_guid: LogId,
    /// Id of the logical log; also names `{guid}.sflog` and `{guid}.filelog`
    dedicated_log_guid: StreamId,
    /// Records to append (write) or read buffer size in bytes (read)
    record_count_or_size: u64,
    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let args = match sl_cli::parse_args::<Args, _, _>(std::env::args_os()) {
        Ok(args) => args,
        Err(code) => return code,
    };
    sl_cli::init_logging();
    sl_cli::run_to_exit(workload(args))
}

async fn workload(args: Args) -> Result<(), Failure> {
    let cancel = sl_cli::cancel_on_interrupt();
    let drive = sl_cli::absolute(&args.drive_path).exit_with(exit::ARGUMENTS)?;
    let settings = sl_cli::load_settings(args.config.as_deref(), &drive).exit_with(exit::MANAGER)?;
    let manager = LogManager::open(
        settings.logger_kind,
        settings,
        NativeFileAdapter::new(),
        &cancel,
    )
    .await
    .context("failed to open the log manager")
    .exit_with(exit::MANAGER)?;

    let outcome = match args.mode {
        Mode::Write => run_write(
            &manager,
            &drive,
            args.shared_log_guid,
            args.dedicated_log_guid,
            args.record_count_or_size,
            &cancel,
        )
        .await
        .map(|report| {
            println!(
                "Wrote {} records of {} bytes, length {}",
                report.records, report.record_size, report.length
            );
        }),
        Mode::Read => run_read(
            &manager,
            &drive,
            args.shared_log_guid,
            args.dedicated_log_guid,
            usize::try_from(args.record_count_or_size).unwrap_or(usize::MAX),
            &cancel,
        )
        .await
        .map(|report| {
            println!(
                "Read [{}, {}): {} bytes streamed, {} bytes read directly, all matching",
                report.head, report.length, report.streamed_bytes, report.direct_bytes
            );
        }),
    };
    manager.close();

    outcome.map_err(|e| {
        let code = match e {
            WorkloadError::Open(_) => exit::OPEN,
            _ => exit::FAILURE,
        };
        Failure {
            code,
            error: anyhow::Error::new(e).context("workload failed"),
        }
    })
}
