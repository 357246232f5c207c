// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Logging interceptor.
//!
//! Outermost layer. Writes exactly one [`LogEntry`] per request, including
//! requests rejected further in. The response body is buffered once so its
//! size can be counted; the rebuilt response carries the same status,
//! headers and bytes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, OriginalUri, Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::{AuthOutcome, RequestId};
use crate::error::ApiError;
use crate::storage::{LogEntry, RequestLog};

pub async fn log_request(
    State(log): State<Arc<RequestLog>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let timestamp = Utc::now();

    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let source_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let request_size = content_length(request.headers());
    let headers_received = header_names(request.headers());

    let response = next.run(request).await;

    let auth_success =
        response.extensions().get::<AuthOutcome>() != Some(&AuthOutcome::Rejected);
    let request_id = response.extensions().get::<RequestId>().map(|RequestId(id)| *id);
    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, %path, "failed to buffer response body");
            let fallback = ApiError::internal("Failed to read response").into_response();
            record(
                &log,
                LogEntry {
                    request_id,
                    timestamp,
                    method,
                    path,
                    source_ip,
                    status_code: fallback.status().as_u16(),
                    duration: started.elapsed(),
                    request_size,
                    response_size: 0,
                    headers_received,
                    auth_success,
                },
            );
            return fallback;
        }
    };

    record(
        &log,
        LogEntry {
            request_id,
            timestamp,
            method,
            path,
            source_ip,
            status_code: parts.status.as_u16(),
            duration: started.elapsed(),
            request_size,
            response_size: bytes.len(),
            headers_received,
            auth_success,
        },
    );

    Response::from_parts(parts, Body::from(bytes))
}

fn record(log: &RequestLog, entry: LogEntry) {
    if let Err(e) = log.append(&entry) {
        tracing::error!(error = %e, "failed to write request log entry");
    }
}

fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn header_names(headers: &HeaderMap) -> String {
    headers
        .keys()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
