// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory ledger backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{CredentialStore, LedgerStore, StorageError, StorageResult};
use crate::models::{Account, Amount, Balance, StudentId, TuitionRecord, UnpaidTuition};

struct AccountRow {
    balance: Balance,
    daily_limit: u32,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<StudentId, AccountRow>,
    // Ordered so unpaid listings page deterministically.
    tuition: BTreeMap<(StudentId, String), Balance>,
    credentials: HashMap<StudentId, String>,
}

/// Ledger held in process memory behind a single lock.
pub struct InMemoryLedger {
    tables: RwLock<Tables>,
    daily_limit: u32,
}

impl InMemoryLedger {
    /// Create an empty ledger whose new accounts start with `daily_limit`.
    pub fn new(daily_limit: u32) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            daily_limit,
        }
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DAILY_LIMIT)
    }
}

impl LedgerStore for InMemoryLedger {
    fn get_account(&self, student: &StudentId) -> StorageResult<Option<Account>> {
        let tables = self.read()?;
        Ok(tables.accounts.get(student).map(|row| Account {
            student_no: student.clone(),
            balance: row.balance,
        }))
    }

    fn get_tuition(&self, student: &StudentId, term: &str) -> StorageResult<Option<TuitionRecord>> {
        let tables = self.read()?;
        Ok(tables
            .tuition
            .get(&(student.clone(), term.to_string()))
            .map(|total| TuitionRecord {
                student_no: student.clone(),
                term: term.to_string(),
                total: *total,
            }))
    }

    fn update_balance(&self, student: &StudentId, balance: Balance) -> StorageResult<()> {
        let mut tables = self.write()?;
        let row = tables
            .accounts
            .get_mut(student)
            .ok_or_else(|| StorageError::NotFound(format!("Account {student}")))?;
        row.balance = balance;
        Ok(())
    }

    fn reset_tuition_total(&self, student: &StudentId, term: &str) -> StorageResult<()> {
        let mut tables = self.write()?;
        let total = tables
            .tuition
            .get_mut(&(student.clone(), term.to_string()))
            .ok_or_else(|| StorageError::NotFound(format!("Tuition {student}/{term}")))?;
        *total = Balance::ZERO;
        Ok(())
    }

    fn add_account(&self, student: &StudentId, initial_balance: Balance) -> StorageResult<()> {
        let mut tables = self.write()?;
        if tables.accounts.contains_key(student) {
            return Err(StorageError::AlreadyExists(format!("Account {student}")));
        }
        tables.accounts.insert(
            student.clone(),
            AccountRow {
                balance: initial_balance,
                daily_limit: self.daily_limit,
            },
        );
        Ok(())
    }

    fn add_tuition(&self, student: &StudentId, term: &str, total: Amount) -> StorageResult<()> {
        let mut tables = self.write()?;
        tables
            .tuition
            .insert((student.clone(), term.to_string()), total.into());
        Ok(())
    }

    fn get_daily_limit(&self, student: &StudentId) -> StorageResult<u32> {
        let tables = self.read()?;
        tables
            .accounts
            .get(student)
            .map(|row| row.daily_limit)
            .ok_or_else(|| StorageError::NotFound(format!("Account {student}")))
    }

    fn decrement_daily_limit(&self, student: &StudentId) -> StorageResult<()> {
        let mut tables = self.write()?;
        let row = tables
            .accounts
            .get_mut(student)
            .ok_or_else(|| StorageError::NotFound(format!("Account {student}")))?;
        row.daily_limit = row.daily_limit.saturating_sub(1);
        Ok(())
    }

    fn try_consume_daily_limit(&self, student: &StudentId) -> StorageResult<bool> {
        let mut tables = self.write()?;
        let row = tables
            .accounts
            .get_mut(student)
            .ok_or_else(|| StorageError::NotFound(format!("Account {student}")))?;
        if row.daily_limit == 0 {
            return Ok(false);
        }
        row.daily_limit -= 1;
        Ok(true)
    }

    fn refund_daily_limit(&self, student: &StudentId) -> StorageResult<()> {
        let mut tables = self.write()?;
        let row = tables
            .accounts
            .get_mut(student)
            .ok_or_else(|| StorageError::NotFound(format!("Account {student}")))?;
        row.daily_limit = row.daily_limit.saturating_add(1).min(self.daily_limit);
        Ok(())
    }

    fn list_unpaid(&self, limit: usize, offset: usize) -> StorageResult<Vec<UnpaidTuition>> {
        let tables = self.read()?;
        Ok(tables
            .tuition
            .iter()
            .filter(|(_, total)| **total > Balance::ZERO)
            .skip(offset)
            .take(limit)
            .map(|((student, term), _)| UnpaidTuition {
                student_no: student.clone(),
                term: term.clone(),
            })
            .collect())
    }

    fn reset_daily_limits(&self, limit: u32) -> StorageResult<usize> {
        let mut tables = self.write()?;
        for row in tables.accounts.values_mut() {
            row.daily_limit = limit;
        }
        Ok(tables.accounts.len())
    }
}

impl CredentialStore for InMemoryLedger {
    fn insert_credential(&self, student: &StudentId, password_hash: &str) -> StorageResult<()> {
        let mut tables = self.write()?;
        if tables.credentials.contains_key(student) {
            return Err(StorageError::AlreadyExists(format!("Credential {student}")));
        }
        tables
            .credentials
            .insert(student.clone(), password_hash.to_string());
        Ok(())
    }

    fn credential_hash(&self, student: &StudentId) -> StorageResult<Option<String>> {
        let tables = self.read()?;
        Ok(tables.credentials.get(student).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn student(id: &str) -> StudentId {
        StudentId::from(id)
    }

    #[test]
    fn add_account_rejects_duplicates() {
        let ledger = InMemoryLedger::new(3);
        ledger.add_account(&student("s1"), Balance::new(dec!(50))).unwrap();
        let err = ledger
            .add_account(&student("s1"), Balance::new(dec!(10)))
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        let account = ledger.get_account(&student("s1")).unwrap().unwrap();
        assert_eq!(account.balance, Balance::new(dec!(50)));
    }

    #[test]
    fn daily_limit_decrements_and_saturates() {
        let ledger = InMemoryLedger::new(1);
        ledger.add_account(&student("s1"), Balance::ZERO).unwrap();
        assert_eq!(ledger.get_daily_limit(&student("s1")).unwrap(), 1);

        ledger.decrement_daily_limit(&student("s1")).unwrap();
        ledger.decrement_daily_limit(&student("s1")).unwrap();
        assert_eq!(ledger.get_daily_limit(&student("s1")).unwrap(), 0);

        assert_eq!(ledger.reset_daily_limits(4).unwrap(), 1);
        assert_eq!(ledger.get_daily_limit(&student("s1")).unwrap(), 4);
    }

    #[test]
    fn consume_stops_at_zero_and_refund_is_capped() {
        let ledger = InMemoryLedger::new(2);
        ledger.add_account(&student("s1"), Balance::ZERO).unwrap();

        assert!(ledger.try_consume_daily_limit(&student("s1")).unwrap());
        assert!(ledger.try_consume_daily_limit(&student("s1")).unwrap());
        assert!(!ledger.try_consume_daily_limit(&student("s1")).unwrap());
        assert_eq!(ledger.get_daily_limit(&student("s1")).unwrap(), 0);

        ledger.refund_daily_limit(&student("s1")).unwrap();
        ledger.refund_daily_limit(&student("s1")).unwrap();
        ledger.refund_daily_limit(&student("s1")).unwrap();
        assert_eq!(ledger.get_daily_limit(&student("s1")).unwrap(), 2);
    }

    #[test]
    fn daily_limit_for_unknown_student_is_not_found() {
        let ledger = InMemoryLedger::new(1);
        assert!(matches!(
            ledger.get_daily_limit(&student("ghost")),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn list_unpaid_skips_settled_and_pages() {
        let ledger = InMemoryLedger::new(1);
        for id in ["a", "b", "c"] {
            ledger.add_account(&student(id), Balance::ZERO).unwrap();
            ledger
                .add_tuition(&student(id), "2025-fall", Amount::new(dec!(100)).unwrap())
                .unwrap();
        }
        ledger.reset_tuition_total(&student("b"), "2025-fall").unwrap();

        let all = ledger.list_unpaid(10, 0).unwrap();
        let ids: Vec<_> = all.iter().map(|u| u.student_no.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let second = ledger.list_unpaid(1, 1).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].student_no.as_str(), "c");
    }

    #[test]
    fn credentials_are_unique_per_student() {
        let ledger = InMemoryLedger::new(1);
        ledger.insert_credential(&student("s1"), "hash-a").unwrap();
        assert!(matches!(
            ledger.insert_credential(&student("s1"), "hash-b"),
            Err(StorageError::AlreadyExists(_))
        ));
        assert_eq!(
            ledger.credential_hash(&student("s1")).unwrap().as_deref(),
            Some("hash-a")
        );
        assert!(ledger.credential_hash(&student("s2")).unwrap().is_none());
    }
}
