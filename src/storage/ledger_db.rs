// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: student_no → serialized [`StoredAccount`]
//! - `tuition`: composite key (student_no \0 term) → serialized [`StoredTuition`]
//! - `credentials`: student_no → Argon2 PHC string
//!
//! Each trait method runs in its own redb transaction, which gives per-call
//! atomicity and nothing more.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use super::{CredentialStore, LedgerStore, StorageError, StorageResult};
use crate::models::{Account, Amount, Balance, StudentId, TuitionRecord, UnpaidTuition};

// =============================================================================
// Table Definitions
// =============================================================================

const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Key format: `student_no \0 term`, so a forward scan is ordered by student
/// then term.
const TUITION: TableDefinition<&str, &[u8]> = TableDefinition::new("tuition");

const CREDENTIALS: TableDefinition<&str, &str> = TableDefinition::new("credentials");

#[derive(Debug, Serialize, Deserialize)]
struct StoredAccount {
    balance: Balance,
    daily_limit: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTuition {
    student_no: StudentId,
    term: String,
    total: Balance,
}

fn tuition_key(student: &StudentId, term: &str) -> String {
    format!("{}\0{}", student.as_str(), term)
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Ledger persisted in a single redb file.
pub struct LedgerDatabase {
    db: Database,
    daily_limit: u32,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path, daily_limit: u32) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(TUITION)?;
            let _ = write_txn.open_table(CREDENTIALS)?;
        }
        write_txn.commit()?;

        Ok(Self { db, daily_limit })
    }

    fn read_account(&self, student: &StudentId) -> StorageResult<Option<StoredAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(student.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read-modify-write of one account inside a single write transaction.
    fn modify_account<F, R>(&self, student: &StudentId, mutate: F) -> StorageResult<R>
    where
        F: FnOnce(&mut StoredAccount) -> R,
    {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut table = write_txn.open_table(ACCOUNTS)?;
            let existing_bytes = {
                let existing = table
                    .get(student.as_str())?
                    .ok_or_else(|| StorageError::NotFound(format!("Account {student}")))?;
                existing.value().to_vec()
            };

            let mut account: StoredAccount = serde_json::from_slice(&existing_bytes)?;
            let result = mutate(&mut account);

            let json = serde_json::to_vec(&account)?;
            table.insert(student.as_str(), json.as_slice())?;
            result
        };
        write_txn.commit()?;
        Ok(result)
    }
}

impl LedgerStore for LedgerDatabase {
    fn get_account(&self, student: &StudentId) -> StorageResult<Option<Account>> {
        Ok(self.read_account(student)?.map(|stored| Account {
            student_no: student.clone(),
            balance: stored.balance,
        }))
    }

    fn get_tuition(&self, student: &StudentId, term: &str) -> StorageResult<Option<TuitionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TUITION)?;
        match table.get(tuition_key(student, term).as_str())? {
            Some(value) => {
                let stored: StoredTuition = serde_json::from_slice(value.value())?;
                Ok(Some(TuitionRecord {
                    student_no: stored.student_no,
                    term: stored.term,
                    total: stored.total,
                }))
            }
            None => Ok(None),
        }
    }

    fn update_balance(&self, student: &StudentId, balance: Balance) -> StorageResult<()> {
        self.modify_account(student, |account| account.balance = balance)
    }

    fn reset_tuition_total(&self, student: &StudentId, term: &str) -> StorageResult<()> {
        let key = tuition_key(student, term);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TUITION)?;
            let existing_bytes = {
                let existing = table
                    .get(key.as_str())?
                    .ok_or_else(|| StorageError::NotFound(format!("Tuition {student}/{term}")))?;
                existing.value().to_vec()
            };

            let mut stored: StoredTuition = serde_json::from_slice(&existing_bytes)?;
            stored.total = Balance::ZERO;

            let json = serde_json::to_vec(&stored)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn add_account(&self, student: &StudentId, initial_balance: Balance) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ACCOUNTS)?;
            if table.get(student.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!("Account {student}")));
            }
            let json = serde_json::to_vec(&StoredAccount {
                balance: initial_balance,
                daily_limit: self.daily_limit,
            })?;
            table.insert(student.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn add_tuition(&self, student: &StudentId, term: &str, total: Amount) -> StorageResult<()> {
        let json = serde_json::to_vec(&StoredTuition {
            student_no: student.clone(),
            term: term.to_string(),
            total: total.into(),
        })?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TUITION)?;
            table.insert(tuition_key(student, term).as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_daily_limit(&self, student: &StudentId) -> StorageResult<u32> {
        self.read_account(student)?
            .map(|stored| stored.daily_limit)
            .ok_or_else(|| StorageError::NotFound(format!("Account {student}")))
    }

    fn decrement_daily_limit(&self, student: &StudentId) -> StorageResult<()> {
        self.modify_account(student, |account| {
            account.daily_limit = account.daily_limit.saturating_sub(1)
        })
    }

    fn try_consume_daily_limit(&self, student: &StudentId) -> StorageResult<bool> {
        self.modify_account(student, |account| {
            if account.daily_limit == 0 {
                return false;
            }
            account.daily_limit -= 1;
            true
        })
    }

    fn refund_daily_limit(&self, student: &StudentId) -> StorageResult<()> {
        let cap = self.daily_limit;
        self.modify_account(student, |account| {
            account.daily_limit = account.daily_limit.saturating_add(1).min(cap)
        })
    }

    fn list_unpaid(&self, limit: usize, offset: usize) -> StorageResult<Vec<UnpaidTuition>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TUITION)?;

        let mut results = Vec::with_capacity(limit.min(256));
        let mut skipped = 0;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let stored: StoredTuition = serde_json::from_slice(value.value())?;
            if stored.total <= Balance::ZERO {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            if results.len() >= limit {
                break;
            }
            results.push(UnpaidTuition {
                student_no: stored.student_no,
                term: stored.term,
            });
        }
        Ok(results)
    }

    fn reset_daily_limits(&self, limit: u32) -> StorageResult<usize> {
        let write_txn = self.db.begin_write()?;
        let count;
        {
            let mut table = write_txn.open_table(ACCOUNTS)?;
            let rows: Vec<(String, Vec<u8>)> = table
                .iter()?
                .map(|entry| entry.map(|(k, v)| (k.value().to_string(), v.value().to_vec())))
                .collect::<Result<_, _>>()?;
            count = rows.len();

            for (student_no, bytes) in rows {
                let mut account: StoredAccount = serde_json::from_slice(&bytes)?;
                account.daily_limit = limit;
                let json = serde_json::to_vec(&account)?;
                table.insert(student_no.as_str(), json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(count)
    }
}

impl CredentialStore for LedgerDatabase {
    fn insert_credential(&self, student: &StudentId, password_hash: &str) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CREDENTIALS)?;
            if table.get(student.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!("Credential {student}")));
            }
            table.insert(student.as_str(), password_hash)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn credential_hash(&self, student: &StudentId) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CREDENTIALS)?;
        match table.get(student.as_str())? {
            Some(v) => Ok(Some(v.value().to_string())),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
