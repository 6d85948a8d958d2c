// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! extract-logical-log: export one logical log of a shared log container
//! into a flat sparse file

use anyhow::Context;
use clap::Parser;
use sl_adapters::{NativeFileAdapter, TracedFileAdapter};
use sl_cli::{exit, ExitWith, Failure};
use sl_core::{LogId, StreamId};
use sl_engine::Extractor;
use sl_storage::LogManager;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "extract-logical-log",
    version,
    about = "Export a logical log to a flat sparse file"
)]
struct Args {
    /// Path of the shared log container
    shared_log_file_path: PathBuf,
    /// Id of the shared log container
    shared_log_guid: LogId,
    /// Id of the logical log to export
    stream_guid: StreamId,
    /// File to write; replaced if it exists
    output_file: PathBuf,
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
    sl_cli::run_to_exit(extract(args))
}

async fn extract(args: Args) -> Result<(), Failure> {
    let cancel = sl_cli::cancel_on_interrupt();
    let container = sl_cli::absolute(&args.shared_log_file_path).exit_with(exit::ARGUMENTS)?;
    let work_directory = container
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);

    let settings =
        sl_cli::load_settings(args.config.as_deref(), &work_directory).exit_with(exit::MANAGER)?;
    let block_size = settings.extract_block_size;
    let manager = LogManager::open(
        settings.logger_kind,
        settings,
        NativeFileAdapter::new(),
        &cancel,
    )
    .await
    .context("failed to open the log manager")
    .exit_with(exit::MANAGER)?;

    let physical = manager
        .open_physical_log(&container, args.shared_log_guid, true, &cancel)
        .await
        .with_context(|| format!("failed to open shared log {}", container.display()))
        .exit_with(exit::OPEN)?;
    let mut stream = physical
        .open_logical_log(args.stream_guid, None, &cancel)
        .await
        .with_context(|| format!("failed to open logical log {}", args.stream_guid))
        .exit_with(exit::OPEN)?;

    let extractor =
        Extractor::new(TracedFileAdapter::new(NativeFileAdapter::new())).with_block_size(block_size);
    let report = extractor
        .extract(&mut stream, &args.output_file, &cancel)
        .await
        .with_context(|| format!("failed to extract into {}", args.output_file.display()))
        .exit_with(exit::FAILURE)?;

    stream.close(&cancel).await.exit_with(exit::FAILURE)?;
    physical.close(&cancel).await.exit_with(exit::FAILURE)?;
    manager.close();

    println!(
        "Extracted {} to {}: head {}, length {}, {} blocks copied",
        args.stream_guid,
        args.output_file.display(),
        report.head,
        report.length,
        report.blocks
    );
    if report.short_reads > 0 {
        println!("  {} blocks were short and left zero-filled", report.short_reads);
    }
    Ok(())
}
