// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the verified caller.
//!
//! Both read the [`RequestContext`] filled in by the authentication
//! interceptor; neither verifies tokens itself.
//!
//! ```rust,ignore
//! async fn pay(Identity(student): Identity, ...) -> ... { }
//! async fn query(Caller(maybe_student): Caller, ...) -> ... { }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::AuthError;
use crate::middleware::RequestContext;
use crate::models::StudentId;

/// Requires a verified identity.
///
/// Rejects with an internal error when used on a route that is not behind
/// the authentication interceptor.
pub struct Identity(pub StudentId);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(|ctx| ctx.identity.clone())
            .map(Identity)
            .ok_or_else(|| AuthError::InternalError("no verified identity on request".into()))
    }
}

/// The verified identity if the route is authenticated, `None` otherwise.
pub struct Caller(pub Option<StudentId>);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(
            parts
                .extensions
                .get::<RequestContext>()
                .and_then(|ctx| ctx.identity.clone()),
        ))
    }
}
