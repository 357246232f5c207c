// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account and tuition provisioning (admin operations).
//!
//! Batch uploads are parsed in full before anything is written, then applied
//! row by row. The first bad row stops the batch; rows before it stay
//! written.

use std::io::Read;

use rust_decimal::Decimal;

use crate::error::ServiceError;
use crate::models::{Amount, Balance, StudentId};
use crate::storage::StorageError;

use super::TuitionService;

/// Balances and tuition totals below this are rejected.
const MINIMUM_AMOUNT: Decimal = Decimal::ONE;

/// One data row of a tuition CSV, numbered from 1 after the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    pub row: usize,
    pub student_no: String,
    pub term: String,
    pub amount: String,
}

/// Read every row of a `student_no,term,amount` CSV with a header line.
///
/// Only structure is checked here; field values are validated when the row
/// is applied.
pub fn parse_batch<R: Read>(input: R) -> Result<Vec<BatchRow>, ServiceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| ServiceError::Validation(format!("cannot read csv file: {e}")))?;
        if record.len() != 3 {
            return Err(ServiceError::Validation(format!(
                "cannot read csv file: row {} has {} columns, expected 3",
                index + 1,
                record.len()
            )));
        }
        rows.push(BatchRow {
            row: index + 1,
            student_no: record[0].to_string(),
            term: record[1].to_string(),
            amount: record[2].to_string(),
        });
    }
    Ok(rows)
}

fn at_least_minimum(value: Decimal, what: &str) -> Result<(), ServiceError> {
    if value < MINIMUM_AMOUNT {
        return Err(ServiceError::Validation(format!(
            "{what} must be at least {MINIMUM_AMOUNT}"
        )));
    }
    Ok(())
}

impl TuitionService {
    /// Create an account with an opening balance.
    ///
    /// `add_account` rejects an existing student atomically, so no lock is
    /// taken.
    pub async fn add_student(
        &self,
        student: &StudentId,
        balance: Decimal,
    ) -> Result<(), ServiceError> {
        at_least_minimum(balance, "balance")?;

        self.ledger
            .add_account(student, Balance::new(balance))
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => ServiceError::Duplicate(format!(
                    "Student {student} is already in the tuition system"
                )),
                other => ServiceError::Store(other),
            })?;

        tracing::info!(student = %student, balance = %balance, "student added");
        Ok(())
    }

    /// Set a student's tuition for a term. A term can only be set once.
    pub async fn add_tuition(
        &self,
        student: &StudentId,
        term: &str,
        amount: Amount,
    ) -> Result<(), ServiceError> {
        at_least_minimum(amount.value(), "tuition amount")?;
        let term = super::require_term(term)?;
        if self.ledger.get_account(student)?.is_none() {
            return Err(ServiceError::NotFound(
                "There is no student with this number".to_string(),
            ));
        }
        let _guard = self.locks.acquire(student).await?;

        if self.ledger.get_tuition(student, &term)?.is_some() {
            return Err(ServiceError::Duplicate(
                "This student's tuition for this term is already set".to_string(),
            ));
        }
        self.ledger.add_tuition(student, &term, amount)?;

        tracing::info!(student = %student, term = %term, amount = %amount, "tuition added");
        Ok(())
    }

    /// Apply parsed rows in order, stopping at the first failure.
    ///
    /// Returns the number of rows applied.
    pub async fn add_tuition_batch(&self, rows: &[BatchRow]) -> Result<usize, ServiceError> {
        for (applied, row) in rows.iter().enumerate() {
            if let Err(e) = self.apply_row(row).await {
                tracing::warn!(row = row.row, applied, error = %e, "tuition batch aborted");
                return Err(batch_failure(e, row.row, applied));
            }
        }
        tracing::info!(applied = rows.len(), "tuition batch applied");
        Ok(rows.len())
    }

    async fn apply_row(&self, row: &BatchRow) -> Result<(), ServiceError> {
        let student = StudentId::parse(&row.student_no)?;
        let amount = Amount::parse(&row.amount)?;
        self.add_tuition(&student, &row.term, amount).await
    }
}

/// Re-word a row error so the caller sees where the batch stopped, keeping
/// its class (and so its status code).
fn batch_failure(error: ServiceError, row: usize, applied: usize) -> ServiceError {
    let describe =
        |msg: String| format!("row {row}: {msg} ({applied} row(s) applied before the failure)");
    match error {
        ServiceError::Validation(msg) => ServiceError::Validation(describe(msg)),
        ServiceError::NotFound(msg) => ServiceError::NotFound(describe(msg)),
        ServiceError::Duplicate(msg) => ServiceError::Duplicate(describe(msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryLedger, LedgerStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn service() -> (TuitionService, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new(10));
        (TuitionService::new(ledger.clone()), ledger)
    }

    #[tokio::test]
    async fn add_student_rejects_small_balance_and_duplicates() {
        let (service, ledger) = service();
        let student = StudentId::from("s1");

        assert!(matches!(
            service.add_student(&student, dec!(0.5)).await,
            Err(ServiceError::Validation(_))
        ));
        service.add_student(&student, dec!(100)).await.unwrap();
        assert!(matches!(
            service.add_student(&student, dec!(5)).await,
            Err(ServiceError::Duplicate(_))
        ));
        assert_eq!(
            ledger.get_account(&student).unwrap().unwrap().balance,
            Balance::new(dec!(100))
        );
    }

    #[tokio::test]
    async fn duplicate_tuition_keeps_the_existing_record() {
        let (service, ledger) = service();
        let student = StudentId::from("s1");
        service.add_student(&student, dec!(10)).await.unwrap();

        service
            .add_tuition(&student, "2025-fall", Amount::new(dec!(300)).unwrap())
            .await
            .unwrap();
        let err = service
            .add_tuition(&student, "2025-fall", Amount::new(dec!(999)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));

        let record = ledger.get_tuition(&student, "2025-fall").unwrap().unwrap();
        assert_eq!(record.total, Balance::new(dec!(300)));
    }

    #[tokio::test]
    async fn rejected_calls_leave_no_lock_entries() {
        let (service, _) = service();
        for i in 0..500 {
            let err = service
                .add_tuition(
                    &StudentId::from(format!("ghost-{i}")),
                    "2025-fall",
                    Amount::new(dec!(10)).unwrap(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::NotFound(_)));
        }
        assert!(service.locks.is_empty());

        service.add_student(&StudentId::from("s1"), dec!(10)).await.unwrap();
        service
            .add_tuition(&StudentId::from("s1"), "2025-fall", Amount::new(dec!(10)).unwrap())
            .await
            .unwrap();
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn tuition_for_unknown_student_is_not_found() {
        let (service, _) = service();
        let err = service
            .add_tuition(&StudentId::from("ghost"), "2025-fall", Amount::new(dec!(10)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn parse_skips_header_and_numbers_rows() {
        let csv = "student_no,term,amount\ns1, 2025-fall ,100\ns2,2025-fall,250.50\n";
        let rows = parse_batch(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[0].term, "2025-fall");
        assert_eq!(rows[1].amount, "250.50");
    }

    #[test]
    fn parse_rejects_ragged_csv() {
        let csv = "student_no,term,amount\ns1,2025-fall,100\ns2,2025-fall\n";
        assert!(matches!(parse_batch(csv.as_bytes()), Err(ServiceError::Validation(_))));

        let csv = "student_no,term\ns1,2025-fall\n";
        assert!(matches!(parse_batch(csv.as_bytes()), Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn batch_aborts_at_first_bad_row_and_keeps_earlier_rows() {
        let (service, ledger) = service();
        for id in ["s1", "s2", "s4"] {
            service.add_student(&StudentId::from(id), dec!(10)).await.unwrap();
        }

        let csv = concat!(
            "student_no,term,amount\n",
            "s1,2025-fall,100\n",
            "s2,2025-fall,200\n",
            "unknown,2025-fall,300\n",
            "s4,2025-fall,400\n",
        );
        let rows = parse_batch(csv.as_bytes()).unwrap();
        let err = service.add_tuition_batch(&rows).await.unwrap_err();

        match err {
            ServiceError::NotFound(msg) => {
                assert!(msg.starts_with("row 3:"), "{msg}");
                assert!(msg.contains("2 row(s) applied"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ledger.get_tuition(&StudentId::from("s1"), "2025-fall").unwrap().is_some());
        assert!(ledger.get_tuition(&StudentId::from("s2"), "2025-fall").unwrap().is_some());
        assert!(ledger.get_tuition(&StudentId::from("s4"), "2025-fall").unwrap().is_none());
    }

    #[tokio::test]
    async fn batch_bad_amount_is_a_validation_error() {
        let (service, _) = service();
        service.add_student(&StudentId::from("s1"), dec!(10)).await.unwrap();

        let rows = parse_batch("student_no,term,amount\ns1,2025-fall,abc\n".as_bytes()).unwrap();
        let err = service.add_tuition_batch(&rows).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("0 row(s) applied")));
    }

    #[tokio::test]
    async fn clean_batch_applies_every_row() {
        let (service, ledger) = service();
        service.add_student(&StudentId::from("s1"), dec!(10)).await.unwrap();

        let csv = "student_no,term,amount\ns1,2025-fall,100\ns1,2026-spring,120\n";
        let rows = parse_batch(csv.as_bytes()).unwrap();
        assert_eq!(service.add_tuition_batch(&rows).await.unwrap(), 2);
        assert_eq!(ledger.list_unpaid(10, 0).unwrap().len(), 2);
    }
}
