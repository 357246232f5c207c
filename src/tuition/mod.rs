// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tuition ledger operations: queries, settlement and provisioning.
//!
//! Every read-check-write sequence on an existing account runs under the
//! student's lock from [`StudentLocks`]. Unknown students are turned away
//! before a lock entry is created.

pub mod locks;
pub mod provisioning;
pub mod settlement;

use std::sync::Arc;

pub use locks::{StudentGuard, StudentLocks};
pub use provisioning::{parse_batch, BatchRow};
pub use settlement::{settle, SettlementOutcome};

use crate::error::{ServiceError, NOT_FOUND_MESSAGE};
use crate::models::{StudentId, TuitionQueryResponse, UnpaidTuition};
use crate::storage::LedgerStore;

/// Largest page the unpaid listing will return.
pub const MAX_PAGE_SIZE: usize = 1000;

pub struct TuitionService {
    ledger: Arc<dyn LedgerStore>,
    locks: StudentLocks,
}

impl TuitionService {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger,
            locks: StudentLocks::new(),
        }
    }

    /// Tuition and balance for `student` in `term`.
    ///
    /// When `caller` is set it must be `student`; a mismatch is reported
    /// exactly like a missing record and the ledger is not consulted.
    pub fn query(
        &self,
        caller: Option<&StudentId>,
        student: &StudentId,
        term: &str,
    ) -> Result<TuitionQueryResponse, ServiceError> {
        if caller.is_some_and(|caller| caller != student) {
            tracing::warn!(requested = %student, "tuition query for another student");
            return Err(ServiceError::Authorization);
        }
        let term = require_term(term)?;

        let not_found = || ServiceError::NotFound(NOT_FOUND_MESSAGE.to_string());
        let account = self.ledger.get_account(student)?.ok_or_else(not_found)?;
        let tuition = self.ledger.get_tuition(student, &term)?.ok_or_else(not_found)?;

        Ok(TuitionQueryResponse {
            student_no: account.student_no,
            term: tuition.term,
            tuition_total: tuition.total,
            balance: account.balance,
        })
    }

    /// Outstanding (student, term) pairs, one page at a time.
    pub fn unpaid(&self, limit: usize, offset: usize) -> Result<Vec<UnpaidTuition>, ServiceError> {
        Ok(self.ledger.list_unpaid(limit.min(MAX_PAGE_SIZE), offset)?)
    }
}

pub(crate) fn require_term(term: &str) -> Result<String, ServiceError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ServiceError::Validation("term is required".to_string()));
    }
    if term.chars().any(char::is_control) {
        return Err(ServiceError::Validation(
            "term must not contain control characters".to_string(),
        ));
    }
    Ok(term.to_string())
}
