// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{Caller, Identity},
    error::ServiceError,
    models::{Amount, PaymentResponse, StudentId, TuitionQueryResponse},
    state::AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TuitionParams {
    /// Student number.
    pub student_no: Option<String>,
    /// Term to report on.
    pub active_term: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentParams {
    /// Student whose tuition is paid.
    pub student_no: Option<String>,
    pub term: Option<String>,
    /// Positive decimal amount.
    pub amount: Option<String>,
}

/// Non-blank query value or a validation error naming what is required.
pub(crate) fn required<'a>(
    value: &'a Option<String>,
    message: &str,
) -> Result<&'a str, ServiceError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::Validation(message.to_string()))
}

/// Tuition query, shared by the mobile and banking surfaces.
///
/// On authenticated routes a student may only see their own record.
#[utoipa::path(
    get,
    path = "/api/v2/mobile/tuition",
    params(TuitionParams),
    tag = "Tuition",
    responses(
        (status = 200, body = TuitionQueryResponse),
        (status = 400, description = "Missing parameters"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such student or term, or not the caller's"),
        (status = 429, description = "Daily limit reached")
    )
)]
pub async fn query_tuition(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(params): Query<TuitionParams>,
) -> Result<Json<TuitionQueryResponse>, ServiceError> {
    const REQUIRED: &str = "student_no and active_term parameters are required";
    let student = StudentId::parse(required(&params.student_no, REQUIRED)?)?;
    let term = required(&params.active_term, REQUIRED)?;

    let response = state.tuition.query(caller.as_ref(), &student, term)?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v2/banking/pay",
    params(PaymentParams),
    tag = "Tuition",
    responses(
        (status = 200, body = PaymentResponse),
        (status = 400, description = "Missing parameters or non-positive amount"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Unknown student or no tuition set for the term"),
        (status = 429, description = "Daily limit reached")
    )
)]
pub async fn pay_tuition(
    State(state): State<AppState>,
    Identity(payer): Identity,
    Query(params): Query<PaymentParams>,
) -> Result<Json<PaymentResponse>, ServiceError> {
    const REQUIRED: &str = "student_no and term are required";
    let student = StudentId::parse(required(&params.student_no, REQUIRED)?)?;
    let term = required(&params.term, REQUIRED)?;
    let amount = Amount::parse(required(&params.amount, "You must enter an amount first")?)?;

    let outcome = state.tuition.pay(&student, term, amount).await?;
    tracing::info!(
        payer = %payer,
        student = %student,
        term,
        settled = outcome.settled(),
        "tuition payment applied"
    );
    Ok(Json(outcome.into()))
}
