// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request context shared between interceptors and handlers.

use uuid::Uuid;

use crate::models::StudentId;

/// Request-scoped context attached by the routing interceptor.
///
/// The auth interceptor fills in `identity`; handlers read it through the
/// extractors in [`crate::auth::extractor`].
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub identity: Option<StudentId>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            identity: None,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Marker placed on responses by the auth interceptor so the logging
/// interceptor (which runs outside it) can report the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Rejected,
}

/// Request id copied onto the response so the logging interceptor can
/// correlate its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);
