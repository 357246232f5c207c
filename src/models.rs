// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the domain values and the request/response data
//! structures used by the REST API. Wire types derive `Serialize`,
//! `Deserialize`, and `ToSchema` for JSON handling and OpenAPI documentation.
//!
//! ## Money
//!
//! Currency is carried as [`rust_decimal::Decimal`]. [`Balance`] is a signed
//! value used for arithmetic; [`Amount`] is a strictly positive value that
//! can only be constructed through validation, so a payment or tuition total
//! that reaches the ledger is always positive.
//!
//! ## Model Categories
//!
//! - **Accounts**: Student balances
//! - **Tuition**: Per-term tuition records and unpaid listings
//! - **Status**: Operation outcome bodies

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};
use utoipa::ToSchema;

use crate::error::ServiceError;

// =============================================================================
// Student Identifier
// =============================================================================

/// Student number, the identity key for accounts, tuition and tokens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl StudentId {
    /// Parse a student number from request input, rejecting blanks and
    /// control characters (the storage key uses `\0` as a separator).
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::Validation(
                "student_no is required".to_string(),
            ));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ServiceError::Validation(
                "student_no must not contain control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        StudentId(value.to_string())
    }
}

impl From<String> for StudentId {
    fn from(value: String) -> Self {
        StudentId(value)
    }
}

// =============================================================================
// Money
// =============================================================================

/// A signed monetary value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl std::fmt::Display for Balance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A strictly positive monetary amount (payments, tuition totals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, ToSchema)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ServiceError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ServiceError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    /// Parse an amount from a query or CSV field.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let value: Decimal = raw
            .trim()
            .parse()
            .map_err(|_| ServiceError::Validation(format!("invalid amount '{raw}'")))?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// =============================================================================
// Ledger Records
// =============================================================================

/// A student account as held by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub student_no: StudentId,
    pub balance: Balance,
}

/// Tuition owed by one student for one term.
///
/// A total of zero means the term has been settled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TuitionRecord {
    pub student_no: StudentId,
    pub term: String,
    pub total: Balance,
}

impl TuitionRecord {
    pub fn is_settled(&self) -> bool {
        self.total.0.is_zero()
    }
}

/// A (student, term) pair whose tuition is still outstanding.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UnpaidTuition {
    /// Student number.
    pub student_no: StudentId,
    /// Term identifier.
    pub term: String,
}

// =============================================================================
// Request / Response Models
// =============================================================================

/// Credentials submitted to register or log in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    /// Student number.
    #[serde(default)]
    pub student_no: String,
    /// Raw password (hashed before storage, never logged).
    #[serde(default)]
    pub password: String,
}

/// Generic outcome body for operations that do not return data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TransactionStatus {
    /// `Success` or `Error`.
    pub status: String,
    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TransactionStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "Success".to_string(),
            message: Some(message.into()),
        }
    }
}

/// Response to a successful register or login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// `Success`.
    pub status: String,
    /// Human-readable detail.
    pub message: String,
    /// Bearer token (also set as the `jwt` cookie).
    pub token: String,
    /// Token expiry as a Unix timestamp.
    pub expires_at: i64,
}

/// Tuition and balance for one student and term.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TuitionQueryResponse {
    pub student_no: StudentId,
    pub term: String,
    /// Outstanding tuition for the term (zero once settled).
    pub tuition_total: Balance,
    /// Current account balance.
    pub balance: Balance,
}

/// Result of applying a payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PaymentResponse {
    /// `Successful`.
    pub status: String,
    /// Human-readable detail.
    pub message: String,
    /// Account balance after the payment.
    pub balance: Balance,
    /// Whether this payment settled the term.
    pub term_settled: bool,
}

/// Result of a batch tuition upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BatchUploadResponse {
    /// `Success`.
    pub status: String,
    /// Number of rows inserted.
    pub applied: usize,
}
