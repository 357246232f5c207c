// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Routing interceptor: attaches a fresh [`RequestContext`].

use axum::{extract::Request, middleware::Next, response::Response};

use super::{RequestContext, RequestId};

pub async fn attach_context(mut request: Request, next: Next) -> Response {
    let context = RequestContext::new();
    tracing::debug!(
        request_id = %context.request_id,
        method = %request.method(),
        path = %request.uri().path(),
        "routing request"
    );
    let request_id = context.request_id;
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    response.extensions_mut().insert(RequestId(request_id));
    response
}
