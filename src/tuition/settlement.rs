// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment settlement.
//!
//! A payment is added to the student's balance. If the result covers the
//! term's outstanding total, the total is deducted, the term is reset to
//! zero and the remainder stays as credit. Otherwise the payment is simply
//! banked.
//!
//! The balance write and the term reset are two independent ledger calls.
//! They run under the student's lock, but a crash between them leaves the
//! balance reduced with the term still outstanding.

use crate::error::ServiceError;
use crate::models::{Amount, Balance, PaymentResponse, StudentId};

use super::TuitionService;

/// What a payment did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Balance raised; term still outstanding.
    AddedToBalance { balance: Balance },
    /// Term settled; any excess kept as balance.
    TuitionPaid { balance: Balance },
}

impl SettlementOutcome {
    pub fn balance(&self) -> Balance {
        match self {
            SettlementOutcome::AddedToBalance { balance }
            | SettlementOutcome::TuitionPaid { balance } => *balance,
        }
    }

    pub fn settled(&self) -> bool {
        matches!(self, SettlementOutcome::TuitionPaid { .. })
    }
}

impl From<SettlementOutcome> for PaymentResponse {
    fn from(outcome: SettlementOutcome) -> Self {
        let message = match outcome {
            SettlementOutcome::AddedToBalance { balance } => {
                format!("Entered amount added to balance. Balance: {balance}")
            }
            SettlementOutcome::TuitionPaid { balance } => format!(
                "You paid this term's tuition. Any excess amount added to balance. Balance: {balance}"
            ),
        };
        PaymentResponse {
            status: "Successful".to_string(),
            message,
            balance: outcome.balance(),
            term_settled: outcome.settled(),
        }
    }
}

/// Compute the outcome of paying `amount` against `term_total`.
pub fn settle(
    balance: Balance,
    term_total: Balance,
    amount: Amount,
) -> Result<SettlementOutcome, ServiceError> {
    let combined = balance + Balance::from(amount);

    let outcome = if combined < term_total {
        SettlementOutcome::AddedToBalance { balance: combined }
    } else {
        SettlementOutcome::TuitionPaid {
            balance: combined - term_total,
        }
    };

    if outcome.balance().is_negative() {
        return Err(ServiceError::Internal(format!(
            "settlement would leave a negative balance ({})",
            outcome.balance()
        )));
    }
    Ok(outcome)
}

impl TuitionService {
    /// Apply a payment for `student` against `term`.
    pub async fn pay(
        &self,
        student: &StudentId,
        term: &str,
        amount: Amount,
    ) -> Result<SettlementOutcome, ServiceError> {
        let term = super::require_term(term)?;
        let missing_student =
            || ServiceError::NotFound("Student with this number does not exist".to_string());
        if self.ledger.get_account(student)?.is_none() {
            return Err(missing_student());
        }
        let _guard = self.locks.acquire(student).await?;

        let account = self.ledger.get_account(student)?.ok_or_else(missing_student)?;
        let tuition = self
            .ledger
            .get_tuition(student, &term)?
            .ok_or_else(|| {
                ServiceError::NotFound("There is no tuition set for this term".to_string())
            })?;

        let outcome = settle(account.balance, tuition.total, amount)?;

        self.ledger.update_balance(student, outcome.balance())?;
        if outcome.settled() {
            self.ledger.reset_tuition_total(student, &term)?;
        }

        tracing::info!(
            student = %student,
            term = %term,
            amount = %amount,
            balance = %outcome.balance(),
            settled = outcome.settled(),
            "payment applied"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryLedger, LedgerStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn amount(value: rust_decimal::Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn partial_payment_is_banked() {
        let outcome =
            settle(Balance::new(dec!(50)), Balance::new(dec!(200)), amount(dec!(100))).unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::AddedToBalance {
                balance: Balance::new(dec!(150))
            }
        );
    }

    #[test]
    fn exact_payment_settles_with_zero_balance() {
        let outcome = settle(Balance::ZERO, Balance::new(dec!(200)), amount(dec!(200))).unwrap();
        assert_eq!(outcome, SettlementOutcome::TuitionPaid { balance: Balance::ZERO });
    }

    #[test]
    fn negative_result_is_an_internal_error() {
        let result = settle(Balance::ZERO, Balance::new(dec!(500)), amount(dec!(1)));
        assert!(result.is_ok());
        let result = settle(Balance::new(dec!(-10)), Balance::new(dec!(0)), amount(dec!(1)));
        assert!(matches!(result, Err(ServiceError::Internal(_))));
    }

    fn service_with(
        balance: rust_decimal::Decimal,
        total: Option<rust_decimal::Decimal>,
    ) -> (TuitionService, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new(10));
        let student = StudentId::from("2021001");
        ledger.add_account(&student, Balance::new(balance)).unwrap();
        if let Some(total) = total {
            ledger.add_tuition(&student, "2025-fall", amount(total)).unwrap();
        }
        (TuitionService::new(ledger.clone()), ledger)
    }

    #[tokio::test]
    async fn two_payments_settle_the_term() {
        let (service, ledger) = service_with(dec!(50), Some(dec!(200)));
        let student = StudentId::from("2021001");

        let first = service.pay(&student, "2025-fall", amount(dec!(100))).await.unwrap();
        assert_eq!(first.balance(), Balance::new(dec!(150)));
        assert!(!first.settled());
        let term = ledger.get_tuition(&student, "2025-fall").unwrap().unwrap();
        assert_eq!(term.total, Balance::new(dec!(200)));

        let second = service.pay(&student, "2025-fall", amount(dec!(100))).await.unwrap();
        assert_eq!(second.balance(), Balance::new(dec!(50)));
        assert!(second.settled());
        let term = ledger.get_tuition(&student, "2025-fall").unwrap().unwrap();
        assert!(term.is_settled());
        assert_eq!(
            ledger.get_account(&student).unwrap().unwrap().balance,
            Balance::new(dec!(50))
        );
    }

    #[tokio::test]
    async fn missing_term_is_rejected_without_mutation() {
        let (service, ledger) = service_with(dec!(50), None);
        let student = StudentId::from("2021001");

        let err = service.pay(&student, "2025-fall", amount(dec!(100))).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::NotFound(ref m) if m == "There is no tuition set for this term"
        ));
        assert_eq!(
            ledger.get_account(&student).unwrap().unwrap().balance,
            Balance::new(dec!(50))
        );
    }

    #[tokio::test]
    async fn unknown_student_is_not_found() {
        let (service, _) = service_with(dec!(50), Some(dec!(200)));
        let err = service
            .pay(&StudentId::from("nobody"), "2025-fall", amount(dec!(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn concurrent_payments_do_not_lose_updates() {
        let (service, ledger) = service_with(dec!(0), Some(dec!(1000000)));
        let service = Arc::new(service);
        let student = StudentId::from("2021001");

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                let student = student.clone();
                tokio::spawn(
                    async move { service.pay(&student, "2025-fall", amount(dec!(5))).await },
                )
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(service.locks.is_empty());

        assert_eq!(
            ledger.get_account(&student).unwrap().unwrap().balance,
            Balance::new(dec!(100))
        );
    }

    #[test]
    fn response_messages() {
        let response = PaymentResponse::from(SettlementOutcome::AddedToBalance {
            balance: Balance::new(dec!(150)),
        });
        assert_eq!(response.message, "Entered amount added to balance. Balance: 150.00");
        assert!(!response.term_settled);
    }
}
