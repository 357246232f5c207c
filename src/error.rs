// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{AuthError, CredentialError};
use crate::storage::StorageError;

/// Message shared by "not found" and "not yours" so that an unauthorized
/// caller cannot tell whether a student number exists.
pub const NOT_FOUND_MESSAGE: &str = "Student or tuition record not found";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Failure classes surfaced by the service. None are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Unknown student or term.
    #[error("{0}")]
    NotFound(String),

    /// Missing, invalid or expired bearer credential.
    #[error(transparent)]
    Authentication(#[from] AuthError),

    /// Verified identity does not own the requested resource.
    #[error("Student or tuition record not found")]
    Authorization,

    /// Daily transaction budget exhausted.
    #[error("Daily transaction limit reached")]
    BudgetExceeded,

    /// Tuition already set for the term, or account already exists.
    #[error("{0}")]
    Duplicate(String),

    /// Underlying persistence failure.
    #[error("storage failure: {0}")]
    Store(#[from] StorageError),

    /// Broken middleware composition or other server-side fault.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Authentication(auth) => auth.into_response(),
            other => ApiError::from(other).into_response(),
        }
    }
}

impl From<CredentialError> for ServiceError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::InvalidCredentials => AuthError::InvalidCredentials.into(),
            CredentialError::AlreadyRegistered(_) => ServiceError::Duplicate(error.to_string()),
            CredentialError::EmptyPassword => ServiceError::Validation(error.to_string()),
            CredentialError::Hashing(msg) => ServiceError::Internal(msg),
            CredentialError::Store(e) => ServiceError::Store(e),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(msg) => ApiError::bad_request(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Authentication(auth) => {
                ApiError::new(auth.status_code(), auth.to_string())
            }
            ServiceError::Authorization => ApiError::not_found(NOT_FOUND_MESSAGE),
            ServiceError::BudgetExceeded => {
                ApiError::too_many_requests("You've reached your daily limit.")
            }
            ServiceError::Duplicate(msg) => ApiError::conflict(msg),
            ServiceError::Store(e) => {
                tracing::error!(error = %e, "Ledger store call failed");
                ApiError::internal("Internal storage error")
            }
            ServiceError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal service error");
                ApiError::internal("Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let dup = ApiError::conflict("dup");
        assert_eq!(dup.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[tokio::test]
    async fn authorization_failure_is_indistinguishable_from_not_found() {
        let denied = ServiceError::Authorization.into_response();
        let missing = ServiceError::NotFound(NOT_FOUND_MESSAGE.to_string()).into_response();
        assert_eq!(denied.status(), missing.status());

        let denied_body = to_bytes(denied.into_body(), usize::MAX).await.unwrap();
        let missing_body = to_bytes(missing.into_body(), usize::MAX).await.unwrap();
        assert_eq!(denied_body, missing_body);
    }

    #[test]
    fn store_errors_hide_detail() {
        let api: ApiError =
            ServiceError::Store(StorageError::Backend("disk on fire".into())).into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("disk"));
    }

    #[test]
    fn credential_errors_map_to_auth_and_conflict() {
        let wrong: ServiceError = CredentialError::InvalidCredentials.into();
        assert!(matches!(wrong, ServiceError::Authentication(AuthError::InvalidCredentials)));

        let dup: ApiError =
            ServiceError::from(CredentialError::AlreadyRegistered("s1".into())).into();
        assert_eq!(dup.status, StatusCode::CONFLICT);
    }

    #[test]
    fn budget_exceeded_maps_to_429() {
        let api: ApiError = ServiceError::BudgetExceeded.into();
        assert_eq!(api.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
