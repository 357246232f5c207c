// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Daily budget interceptor.
//!
//! Must run inside authentication. One unit is reserved in a single ledger
//! call before the handler runs, so concurrent requests cannot both pass on
//! the last unit. A student with none left is rejected without reaching the
//! handler. The unit is refunded when the handler answers with anything but
//! a success status. No lock is held while the handler runs.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::RequestContext;
use crate::error::{ServiceError, NOT_FOUND_MESSAGE};
use crate::storage::{LedgerStore, StorageError};

pub async fn enforce_daily_limit(
    State(ledger): State<Arc<dyn LedgerStore>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(student) = request
        .extensions()
        .get::<RequestContext>()
        .and_then(|ctx| ctx.identity.clone())
    else {
        return ServiceError::Internal("rate limiter reached without a verified identity".into())
            .into_response();
    };

    let reserved = match ledger.try_consume_daily_limit(&student) {
        Ok(reserved) => reserved,
        Err(StorageError::NotFound(_)) => {
            return ServiceError::NotFound(NOT_FOUND_MESSAGE.to_string()).into_response();
        }
        Err(e) => return ServiceError::Store(e).into_response(),
    };

    if !reserved {
        tracing::warn!(student = %student, "daily limit exhausted");
        return ServiceError::BudgetExceeded.into_response();
    }

    let response = next.run(request).await;

    if !response.status().is_success() {
        if let Err(e) = ledger.refund_daily_limit(&student) {
            tracing::error!(student = %student, error = %e, "failed to refund daily limit");
        }
    }
    response
}
