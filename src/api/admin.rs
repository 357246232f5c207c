// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrative endpoints: provisioning, reporting and log export.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;

use super::tuition::required;
use crate::{
    error::ServiceError,
    models::{Amount, BatchUploadResponse, StudentId, TransactionStatus, UnpaidTuition},
    state::AppState,
    tuition::parse_batch,
};

/// Multipart field carrying the CSV upload.
const BATCH_FILE_FIELD: &str = "file";

const DEFAULT_PAGE_LIMIT: usize = 10;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AddStudentParams {
    pub student_no: Option<String>,
    /// Opening balance, at least 1.
    pub balance: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AddTuitionParams {
    pub student_no: Option<String>,
    pub term: Option<String>,
    /// Tuition total for the term, at least 1.
    pub tuition_amount: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page size (default 10, capped at 1000).
    pub limit: Option<String>,
    /// Rows to skip (default 0).
    pub offset: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v2/admin/add-student",
    params(AddStudentParams),
    tag = "Admin",
    responses(
        (status = 200, body = TransactionStatus),
        (status = 400, description = "Missing student number or balance below 1"),
        (status = 409, description = "Student already exists")
    )
)]
pub async fn add_student(
    State(state): State<AppState>,
    Query(params): Query<AddStudentParams>,
) -> Result<Json<TransactionStatus>, ServiceError> {
    const REQUIRED: &str = "student_no and balance(must be at least 1) are required";
    let student = StudentId::parse(required(&params.student_no, REQUIRED)?)?;
    let balance: Decimal = required(&params.balance, REQUIRED)?
        .parse()
        .map_err(|_| ServiceError::Validation("Invalid balance".to_string()))?;

    state.tuition.add_student(&student, balance).await?;
    Ok(Json(TransactionStatus::success(format!(
        "Student {student} with balance of {balance:.2} added to tuition system"
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v2/admin/add-tuition",
    params(AddTuitionParams),
    tag = "Admin",
    responses(
        (status = 200, body = TransactionStatus),
        (status = 400, description = "Missing parameters or amount below 1"),
        (status = 404, description = "Unknown student"),
        (status = 409, description = "Tuition already set for the term")
    )
)]
pub async fn add_tuition(
    State(state): State<AppState>,
    Query(params): Query<AddTuitionParams>,
) -> Result<Json<TransactionStatus>, ServiceError> {
    const REQUIRED: &str = "student_no, term, and valid tuition amount are required";
    let student = StudentId::parse(required(&params.student_no, REQUIRED)?)?;
    let term = required(&params.term, REQUIRED)?;
    let amount = Amount::parse(required(&params.tuition_amount, REQUIRED)?)?;

    state.tuition.add_tuition(&student, term, amount).await?;
    Ok(Json(TransactionStatus::success(format!(
        "Tuition of {amount} added for student {student}, term {term}"
    ))))
}

/// Upload a `student_no,term,amount` CSV (header row first).
///
/// Rows are applied in order; the first bad row stops the upload and earlier
/// rows stay applied.
#[utoipa::path(
    post,
    path = "/api/v2/admin/add-tuition-batch",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "CSV file in field `file`"
    ),
    tag = "Admin",
    responses(
        (status = 200, body = BatchUploadResponse),
        (status = 400, description = "Unreadable CSV or invalid row"),
        (status = 404, description = "Row references an unknown student"),
        (status = 409, description = "Row duplicates an existing term")
    )
)]
pub async fn add_tuition_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchUploadResponse>, ServiceError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::Validation(format!("Error reading file: {e}")))?
    {
        if field.name() == Some(BATCH_FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::Validation(format!("Error reading file: {e}")))?;
            upload = Some(bytes);
            break;
        }
    }
    let upload = upload.ok_or_else(|| {
        ServiceError::Validation(format!("Error reading file: missing '{BATCH_FILE_FIELD}' field"))
    })?;

    let rows = parse_batch(&upload[..])?;
    let applied = state.tuition.add_tuition_batch(&rows).await?;
    Ok(Json(BatchUploadResponse {
        status: "Success".to_string(),
        applied,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v2/admin/unpaid-status",
    params(PageParams),
    tag = "Admin",
    responses(
        (status = 200, body = [UnpaidTuition]),
        (status = 400, description = "Non-numeric limit or offset")
    )
)]
pub async fn unpaid_status(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<UnpaidTuition>>, ServiceError> {
    let limit = parse_page_value(&params.limit, DEFAULT_PAGE_LIMIT, "Limit must be a number")?;
    let offset = parse_page_value(&params.offset, 0, "Offset must be a number")?;
    Ok(Json(state.tuition.unpaid(limit, offset)?))
}

fn parse_page_value(
    value: &Option<String>,
    default: usize,
    message: &str,
) -> Result<usize, ServiceError> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ServiceError::Validation(message.to_string())),
        None => Ok(default),
    }
}

/// Export the request log, one string per line.
#[utoipa::path(
    get,
    path = "/api/v2/admin/logs",
    tag = "Admin",
    responses((status = 200, body = [String]))
)]
pub async fn request_logs(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ServiceError> {
    Ok(Json(state.request_log.lines()?))
}
