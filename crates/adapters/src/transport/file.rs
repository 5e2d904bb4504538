// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON file sink

use super::{TransportAdapter, TransportError};
use async_trait::async_trait;
use aw_core::Log;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Appends one JSON object per line. The file is opened on first send.
#[derive(Clone)]
pub struct FileTransport {
    path: PathBuf,
    writer: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<BufWriter<File>, TransportError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(BufWriter::new(file))
    }
}

impl std::fmt::Debug for FileTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTransport")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransportAdapter for FileTransport {
    fn name(&self) -> &str {
        "file"
    }

    async fn send(&self, log: &Log) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(log)?;
        line.push(b'\n');

        let mut guard = self.writer.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        if let Some(writer) = guard.as_mut() {
            writer.write_all(&line).await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), TransportError> {
        if let Some(writer) = self.writer.lock().await.as_mut() {
            writer.flush().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
