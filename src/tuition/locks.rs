// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-student async locks.
//!
//! The ledger only guarantees atomicity per call. Settlement reads a balance
//! and writes it back in a separate call, so two concurrent payments for the
//! same student would otherwise lose one update. Holding the student's lock
//! across the read and both writes serialises them within this process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::ServiceError;
use crate::models::StudentId;

type LockTable = Mutex<HashMap<StudentId, Arc<AsyncMutex<()>>>>;

/// Lock table keyed by student. An entry lives only while someone holds or
/// waits for it.
#[derive(Default)]
pub struct StudentLocks {
    locks: Arc<LockTable>,
}

/// Exclusive access to one student. Dropping it releases the lock and
/// removes table entries nobody holds or waits for.
pub struct StudentGuard {
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<LockTable>,
}

impl StudentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `student`.
    pub async fn acquire(&self, student: &StudentId) -> Result<StudentGuard, ServiceError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| ServiceError::Internal("student lock table poisoned".to_string()))?;
            Arc::clone(locks.entry(student.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        Ok(StudentGuard {
            guard: Some(guard),
            table: Arc::clone(&self.locks),
        })
    }

    /// Number of students with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for StudentGuard {
    fn drop(&mut self) {
        // Waiters clone an entry under the table lock, so a count of one
        // means only the table refers to it. The sweep also clears entries
        // left by acquires cancelled while waiting.
        let Ok(mut locks) = self.table.lock() else {
            return;
        };
        self.guard.take();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
