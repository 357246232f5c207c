// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only request log.
//!
//! One line per completed request, written in completion order. The file is
//! opened once at startup and shared by every request; a whole line is
//! written under the lock so concurrent entries never interleave. Each line
//! is mirrored as a structured `tracing` event.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{StorageError, StorageResult};

/// Everything recorded about one completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Only carried on the structured event; the file line keeps its fixed
    /// template.
    pub request_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub source_ip: String,
    pub status_code: u16,
    pub duration: Duration,
    pub request_size: u64,
    pub response_size: usize,
    pub headers_received: String,
    pub auth_success: bool,
}

impl LogEntry {
    /// Render the fixed single-line template (no trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {} {} | IP: {} | Status: {} | Duration: {}ms | ReqSize: {} bytes | RespSize: {} bytes | Headers: {} | Auth: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.method,
            self.path,
            self.source_ip,
            self.status_code,
            self.duration.as_millis(),
            self.request_size,
            self.response_size,
            self.headers_received,
            self.auth_success,
        )
    }
}

/// Process-wide request log file.
pub struct RequestLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl RequestLog {
    /// Open (or create) the log file in append mode, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a full line and flush it to the file.
    pub fn append(&self, entry: &LogEntry) -> StorageResult<()> {
        let line = entry.to_line();

        tracing::info!(
            request_id = %entry.request_id.map(|id| id.to_string()).unwrap_or_default(),
            method = %entry.method,
            path = %entry.path,
            source_ip = %entry.source_ip,
            status = entry.status_code,
            duration_ms = entry.duration.as_millis() as u64,
            request_size = entry.request_size,
            response_size = entry.response_size,
            auth = entry.auth_success,
            "request completed"
        );

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Backend("request log lock poisoned".to_string()))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Flush buffered output. Called on shutdown.
    pub fn flush(&self) -> StorageResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Backend("request log lock poisoned".to_string()))?;
        writer.flush()?;
        Ok(())
    }

    /// Read every line currently in the log.
    pub fn lines(&self) -> StorageResult<Vec<String>> {
        self.flush()?;
        let file = File::open(&self.path)?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}
