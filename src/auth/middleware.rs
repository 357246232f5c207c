// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication interceptor for Axum.
//!
//! The bearer token is taken from the `jwt` cookie, falling back to an
//! `Authorization: Bearer <token>` header. On success the student number is
//! written into the [`RequestContext`] seeded by the routing interceptor.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/banking/pay", post(pay))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         state.tokens.clone(),
//!         authenticate,
//!     ));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, TokenService};
use crate::middleware::{AuthOutcome, RequestContext};

/// Name of the session cookie carrying the identity token.
pub const SESSION_COOKIE: &str = "jwt";

/// Authentication middleware function.
pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let verified = extract_token(request.headers()).and_then(|token| tokens.verify(&token));

    let claims = match verified {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error_code = e.error_code(), "authentication rejected");
            let mut response = e.into_response();
            response.extensions_mut().insert(AuthOutcome::Rejected);
            return response;
        }
    };

    let Some(context) = request.extensions_mut().get_mut::<RequestContext>() else {
        return AuthError::InternalError("request context missing".into()).into_response();
    };
    context.identity = Some(claims.subject());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(AuthOutcome::Authenticated);
    response
}

/// Pull the raw token out of the request headers. The cookie wins over the
/// Authorization header when both are present.
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(token) = session_cookie_value(headers) {
        return Ok(token);
    }

    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token.to_string())
}

fn session_cookie_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a freshly issued token.
pub fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}"
    ))
    .map_err(|e| AuthError::InternalError(format!("invalid cookie value: {e}")))
}
