// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Student registration and login.
//!
//! Both return a fresh session token in the body and as the `jwt` cookie.
//! Password hashing runs on the blocking pool.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Json,
};

use crate::{
    auth::{session_cookie, CredentialError, Credentials},
    error::ServiceError,
    models::{CredentialsRequest, SessionResponse, StudentId},
    state::AppState,
};

fn read_credentials(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StudentId, String), ServiceError> {
    let Json(request) = payload
        .map_err(|e| ServiceError::Validation(format!("invalid json: {}", e.body_text())))?;
    if request.password.is_empty() {
        return Err(ServiceError::Validation(
            "student_no and password are required".to_string(),
        ));
    }
    let student = StudentId::parse(&request.student_no)
        .map_err(|_| ServiceError::Validation("student_no and password are required".to_string()))?;
    Ok((student, request.password))
}

async fn run_blocking<F>(credentials: Credentials, op: F) -> Result<(), ServiceError>
where
    F: FnOnce(&Credentials) -> Result<(), CredentialError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&credentials))
        .await
        .map_err(|e| ServiceError::Internal(format!("credential task failed: {e}")))?
        .map_err(ServiceError::from)
}

fn start_session(
    state: &AppState,
    student: &StudentId,
    message: &str,
) -> Result<impl IntoResponse, ServiceError> {
    let issued = state.tokens.issue(student)?;
    let cookie = session_cookie(&issued.token, state.tokens.validity_secs())?;
    let body = SessionResponse {
        status: "Success".to_string(),
        message: message.to_string(),
        token: issued.token,
        expires_at: issued.claims.exp,
    };
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/v2/register",
    request_body = CredentialsRequest,
    tag = "Accounts",
    responses(
        (status = 200, description = "Registered; session cookie set", body = SessionResponse),
        (status = 400, description = "Missing student number or password"),
        (status = 409, description = "Student already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let (student, password) = read_credentials(payload)?;

    let who = student.clone();
    run_blocking(state.credentials.clone(), move |creds| creds.register(&who, &password)).await?;

    tracing::info!(student = %student, "student registered");
    start_session(&state, &student, "You've successfully registered to system.")
}

#[utoipa::path(
    post,
    path = "/api/v2/login",
    request_body = CredentialsRequest,
    tag = "Accounts",
    responses(
        (status = 200, description = "Logged in; session cookie set", body = SessionResponse),
        (status = 400, description = "Missing student number or password"),
        (status = 401, description = "Unknown student or wrong password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let (student, password) = read_credentials(payload)?;

    let who = student.clone();
    run_blocking(state.credentials.clone(), move |creds| {
        creds.verify_login(&who, &password)
    })
    .await?;

    tracing::info!(student = %student, "student logged in");
    start_session(&state, &student, "You've successfully logged into system.")
}
