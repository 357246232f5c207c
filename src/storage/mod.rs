// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistence boundary for accounts, tuition records, daily rate budgets and
//! login credentials.
//!
//! ## Consistency Model
//!
//! Every trait method is atomic on its own. There are **no** multi-call
//! transactions: a settlement that updates a balance and then resets a
//! tuition total issues two independent calls, and a crash between them
//! leaves the first applied and the second not. Callers serialize per
//! student where ordering matters (see `tuition::StudentLocks`).
//!
//! The daily budget is the exception that needs check-and-act in one step:
//! `try_consume_daily_limit` tests and decrements inside a single call so
//! concurrent requests cannot both spend the last unit.
//!
//! ## Backends
//!
//! - [`InMemoryLedger`] - process-local maps, used in tests and when no
//!   `LEDGER_PATH` is configured
//! - [`LedgerDatabase`] - embedded `redb` file with one write transaction per
//!   call
//!
//! The request log lives here as well since it is the only other on-disk
//! artifact the service writes.

pub mod ledger_db;
pub mod memory;
pub mod request_log;

pub use ledger_db::LedgerDatabase;
pub use memory::InMemoryLedger;
pub use request_log::{LogEntry, RequestLog};

use crate::models::{Account, Amount, Balance, StudentId, TuitionRecord, UnpaidTuition};

/// Error type for ledger and credential storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Accounts, tuition records and daily budgets.
pub trait LedgerStore: Send + Sync {
    /// Fetch an account, `None` when the student is unknown.
    fn get_account(&self, student: &StudentId) -> StorageResult<Option<Account>>;

    /// Fetch the tuition record for one term, `None` when none was set.
    fn get_tuition(&self, student: &StudentId, term: &str) -> StorageResult<Option<TuitionRecord>>;

    fn update_balance(&self, student: &StudentId, balance: Balance) -> StorageResult<()>;

    /// Mark the term settled by setting its total to zero.
    fn reset_tuition_total(&self, student: &StudentId, term: &str) -> StorageResult<()>;

    /// Create an account with a full daily budget.
    ///
    /// # Errors
    /// `StorageError::AlreadyExists` when the student already has an account.
    fn add_account(&self, student: &StudentId, initial_balance: Balance) -> StorageResult<()>;

    /// Insert a tuition record. Does not check for an existing record; the
    /// caller owns the "one record per term" rule.
    fn add_tuition(&self, student: &StudentId, term: &str, total: Amount) -> StorageResult<()>;

    fn get_daily_limit(&self, student: &StudentId) -> StorageResult<u32>;

    /// Decrease the remaining budget by one, saturating at zero.
    fn decrement_daily_limit(&self, student: &StudentId) -> StorageResult<()>;

    /// Check and take one unit of budget in a single call. Returns `false`,
    /// leaving the budget untouched, when none is left.
    fn try_consume_daily_limit(&self, student: &StudentId) -> StorageResult<bool>;

    /// Return one unit taken by `try_consume_daily_limit`, never going above
    /// the configured daily limit.
    fn refund_daily_limit(&self, student: &StudentId) -> StorageResult<()>;

    /// Outstanding (student, term) pairs ordered by student then term.
    fn list_unpaid(&self, limit: usize, offset: usize) -> StorageResult<Vec<UnpaidTuition>>;

    /// Restore every account's budget to `limit`. Returns the number of
    /// accounts touched.
    fn reset_daily_limits(&self, limit: u32) -> StorageResult<usize>;
}

/// Raw credential persistence. Hashing lives in `auth::password`.
pub trait CredentialStore: Send + Sync {
    /// # Errors
    /// `StorageError::AlreadyExists` when the student is already registered.
    fn insert_credential(&self, student: &StudentId, password_hash: &str) -> StorageResult<()>;

    fn credential_hash(&self, student: &StudentId) -> StorageResult<Option<String>>;
}
