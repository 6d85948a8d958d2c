// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log manager
//!
//! Entry point for creating, opening and deleting physical logs and
//! stand-alone file logs. Within a process a container id may be open for
//! writing through one handle only; across processes the container file
//! lock enforces the same.

use crate::container::{PhysicalLog, Registration, Registry};
use crate::dedicated::{FileLogHeader, SparseFileStore};
use crate::io::{blocking, check_cancel};
use crate::layout::ContainerLayout;
use crate::stream::LogicalLog;
use sl_adapters::{FileAdapter, NativeFileAdapter};
use sl_core::{LogError, LogId, LoggerKind, LogicalLogSettings, SharedLogSettings, StreamId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub struct LogManager<F: FileAdapter = NativeFileAdapter> {
    settings: SharedLogSettings,
    kind: LoggerKind,
    files: F,
    registry: Registry,
    closed: AtomicBool,
}

impl<F: FileAdapter> LogManager<F> {
    /// Open the manager, creating the work directory if needed
    pub async fn open(
        kind: LoggerKind,
        settings: SharedLogSettings,
        files: F,
        cancel: &CancellationToken,
    ) -> Result<Self, LogError> {
        check_cancel(cancel)?;
        settings
            .validate()
            .map_err(|e| LogError::Initialization(e.to_string()))?;
        tokio::fs::create_dir_all(&settings.work_directory)
            .await
            .map_err(|e| {
                LogError::Initialization(format!(
                    "cannot create work directory {}: {e}",
                    settings.work_directory.display()
                ))
            })?;

        let kind = match kind {
            LoggerKind::InProc => LoggerKind::InProc,
            LoggerKind::OutOfProc => {
                tracing::warn!("out-of-proc logger is not available, using in-proc");
                LoggerKind::InProc
            }
        };
        tracing::info!(
            work_directory = %settings.work_directory.display(),
            logger = %kind,
            "log manager opened"
        );

        Ok(Self {
            settings,
            kind,
            files,
            registry: Arc::new(Mutex::new(HashMap::new())),
            closed: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &SharedLogSettings {
        &self.settings
    }

    pub fn logger_kind(&self) -> LoggerKind {
        self.kind
    }

    fn ensure_open(&self) -> Result<(), LogError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LogError::Closed("log manager".into()));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.settings.resolve(path)
    }

    /// Claim `id` in the registry for an open in progress
    fn claim(&self, id: LogId, conflict: impl FnOnce(String) -> LogError) -> Result<(), LogError> {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let busy = match registry.get(&id) {
            Some(Registration::Opening) => true,
            Some(Registration::Open(w)) => w.strong_count() > 0,
            None => false,
        };
        if busy {
            return Err(conflict(format!("physical log {id}")));
        }
        registry.insert(id, Registration::Opening);
        Ok(())
    }

    fn settle(&self, id: LogId, result: Result<PhysicalLog<F>, LogError>) -> Result<PhysicalLog<F>, LogError> {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        match &result {
            Ok(log) => {
                registry.insert(id, Registration::Open(Arc::downgrade(log.shared())));
            }
            Err(_) => {
                registry.remove(&id);
            }
        }
        result
    }

    /// Create a container with the given geometry
    pub async fn create_physical_log(
        &self,
        path: &Path,
        id: LogId,
        capacity: u64,
        max_streams: u32,
        max_block_size: u32,
        cancel: &CancellationToken,
    ) -> Result<PhysicalLog<F>, LogError> {
        check_cancel(cancel)?;
        self.ensure_open()?;
        if id.is_nil() {
            return Err(LogError::InvalidArgument("physical log id must not be nil".into()));
        }
        let path = self.resolve(path);
        let layout = ContainerLayout::compute(id, capacity, max_streams, max_block_size)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(LogError::AlreadyExists(format!(
                "physical log file {}",
                path.display()
            )));
        }

        self.claim(id, LogError::AlreadyExists)?;
        let result = PhysicalLog::create(&path, layout, self.files.clone(), Arc::clone(&self.registry)).await;
        self.settle(id, result)
    }

    /// Create a container sized by the manager settings
    pub async fn create_physical_log_with_settings(
        &self,
        path: &Path,
        id: LogId,
        cancel: &CancellationToken,
    ) -> Result<PhysicalLog<F>, LogError> {
        self.create_physical_log(
            path,
            id,
            self.settings.container_capacity,
            self.settings.max_streams,
            self.settings.max_block_size,
            cancel,
        )
        .await
    }

    /// Open an existing container
    ///
    /// Read-only opens take no lock and may coexist with a writer.
    pub async fn open_physical_log(
        &self,
        path: &Path,
        id: LogId,
        read_only: bool,
        cancel: &CancellationToken,
    ) -> Result<PhysicalLog<F>, LogError> {
        check_cancel(cancel)?;
        self.ensure_open()?;
        let path = self.resolve(path);
        if read_only {
            return PhysicalLog::open(&path, id, true, self.files.clone(), Arc::clone(&self.registry))
                .await;
        }
        self.claim(id, LogError::AlreadyOpen)?;
        let result =
            PhysicalLog::open(&path, id, false, self.files.clone(), Arc::clone(&self.registry)).await;
        self.settle(id, result)
    }

    /// Delete a container file that is not open
    pub async fn delete_physical_log(
        &self,
        path: &Path,
        id: LogId,
        cancel: &CancellationToken,
    ) -> Result<(), LogError> {
        check_cancel(cancel)?;
        self.ensure_open()?;
        let path = self.resolve(path);

        // Opening writable verifies the id and that nobody else holds it
        self.claim(id, LogError::AlreadyOpen)?;
        let opened =
            PhysicalLog::open(&path, id, false, self.files.clone(), Arc::clone(&self.registry)).await;
        let result = match opened {
            Ok(log) => {
                drop(log);
                tokio::fs::remove_file(&path).await.map_err(LogError::from)
            }
            Err(e) => Err(e),
        };
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        if result.is_ok() {
            tracing::info!(log = %id, path = %path.display(), "deleted physical log");
        }
        result
    }

    /// Create a stand-alone sparse file log
    pub async fn create_file_log(
        &self,
        path: &Path,
        id: StreamId,
        settings: LogicalLogSettings,
        cancel: &CancellationToken,
    ) -> Result<LogicalLog, LogError> {
        check_cancel(cancel)?;
        self.ensure_open()?;
        if id.is_nil() {
            return Err(LogError::InvalidArgument("stream id must not be nil".into()));
        }
        if settings.max_size == 0 || settings.max_block_size == 0 {
            return Err(LogError::InvalidArgument(
                "maximum size and block size must be positive".into(),
            ));
        }
        let path = self.resolve(path);
        let header = FileLogHeader {
            stream_id: id,
            max_size: settings.max_size,
            max_block_size: settings.max_block_size,
            head: 0,
            length: 0,
        };
        let store = blocking(move || {
            let store = SparseFileStore::create_new(&path, &header)?;
            store.lock_exclusive()?;
            Ok(store)
        })
        .await?;
        self.files.mark_sparse(store.file()).await?;
        tracing::info!(stream = %id, path = %store.path().display(), "created file log");
        Ok(LogicalLog::from_file(store, header, false))
    }

    /// Open a stand-alone file log
    pub async fn open_file_log(
        &self,
        path: &Path,
        id: StreamId,
        read_only: bool,
        cancel: &CancellationToken,
    ) -> Result<LogicalLog, LogError> {
        check_cancel(cancel)?;
        self.ensure_open()?;
        let path = self.resolve(path);
        let (store, header) = blocking(move || {
            let (store, header) = SparseFileStore::open(&path, read_only)?;
            if header.stream_id != id {
                return Err(LogError::InvalidArgument(format!(
                    "{} holds stream {}, not {}",
                    path.display(),
                    header.stream_id,
                    id
                )));
            }
            if !read_only {
                store.lock_exclusive()?;
            }
            Ok((store, header))
        })
        .await?;
        tracing::info!(
            stream = %id,
            path = %store.path().display(),
            read_only,
            length = header.length,
            "opened file log"
        );
        Ok(LogicalLog::from_file(store, header, read_only))
    }

    /// Refuse further operations; open handles stay usable
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!("log manager closed");
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
