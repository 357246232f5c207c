// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{Credentials, TokenService};
use crate::storage::{CredentialStore, LedgerStore, RequestLog};
use crate::tuition::TuitionService;

/// Process-wide collaborators shared by every handler and interceptor.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerStore>,
    pub credentials: Credentials,
    pub tokens: Arc<TokenService>,
    pub request_log: Arc<RequestLog>,
    pub tuition: Arc<TuitionService>,
}

impl AppState {
    /// Wire state around one backend that holds both ledger and credentials.
    pub fn new<S>(store: Arc<S>, tokens: TokenService, request_log: RequestLog) -> Self
    where
        S: LedgerStore + CredentialStore + 'static,
    {
        let ledger: Arc<dyn LedgerStore> = store.clone();
        Self {
            credentials: Credentials::new(store),
            tuition: Arc::new(TuitionService::new(ledger.clone())),
            ledger,
            tokens: Arc::new(tokens),
            request_log: Arc::new(request_log),
        }
    }
}
