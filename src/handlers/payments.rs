// src/handlers/payments.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermEarnings, PermWithdrawalManage, RequirePermission},
    models::payment::{
        ApproveWithdrawalPayload, CompleteWithdrawalPayload, EarningsSummary, Withdrawal,
        WithdrawalListQuery, WithdrawalReasonPayload, WithdrawalRequestPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/payment/earnings",
    tag = "Payment",
    responses((status = 200, description = "Extrato de ganhos do prestador", body = EarningsSummary)),
    security(("api_jwt" = []))
)]
pub async fn get_earnings(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermEarnings>,
) -> Result<Json<EarningsSummary>, AppError> {
    let summary = app_state.payment_service.earnings(guard.actor().id).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/payment/withdraw",
    tag = "Payment",
    request_body = WithdrawalRequestPayload,
    responses(
        (status = 201, description = "Saque solicitado", body = Withdrawal),
        (status = 409, description = "Saldo insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_withdrawal(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermEarnings>,
    Json(payload): Json<WithdrawalRequestPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let withdrawal = app_state
        .payment_service
        .request_withdrawal(guard.actor().id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

#[utoipa::path(
    get,
    path = "/api/payment/withdrawals",
    tag = "Payment",
    responses((status = 200, description = "Saques do prestador", body = Vec<Withdrawal>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_withdrawals(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermEarnings>,
) -> Result<Json<Vec<Withdrawal>>, AppError> {
    let withdrawals = app_state.payment_service.list_for_provider(guard.actor().id).await?;
    Ok(Json(withdrawals))
}

// ---
// Admin
// ---

#[utoipa::path(
    get,
    path = "/api/payment/admin/withdrawal-requests",
    tag = "Payment",
    params(("status" = Option<String>, Query, description = "requested | processing | completed | failed | rejected")),
    responses((status = 200, description = "Pedidos de saque", body = Vec<Withdrawal>)),
    security(("api_jwt" = []))
)]
pub async fn list_withdrawal_requests(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermWithdrawalManage>,
    Query(query): Query<WithdrawalListQuery>,
) -> Result<Json<Vec<Withdrawal>>, AppError> {
    let withdrawals = app_state.payment_service.list_requests(query.status).await?;
    Ok(Json(withdrawals))
}

#[utoipa::path(
    put,
    path = "/api/payment/admin/withdrawal-request/{id}/approve",
    tag = "Payment",
    request_body = ApproveWithdrawalPayload,
    params(("id" = Uuid, Path, description = "ID do saque")),
    responses(
        (status = 200, description = "Saque aprovado (ou concluído, com referência)", body = Withdrawal),
        (status = 409, description = "Saque já processado")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_withdrawal(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermWithdrawalManage>,
    Path(withdrawal_id): Path<Uuid>,
    payload: Option<Json<ApproveWithdrawalPayload>>,
) -> Result<Json<Withdrawal>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;

    let withdrawal = app_state
        .payment_service
        .approve(withdrawal_id, payload.transaction_reference.as_deref())
        .await?;
    Ok(Json(withdrawal))
}

#[utoipa::path(
    put,
    path = "/api/payment/admin/withdrawal-request/{id}/complete",
    tag = "Payment",
    request_body = CompleteWithdrawalPayload,
    params(("id" = Uuid, Path, description = "ID do saque")),
    responses(
        (status = 200, description = "Saque concluído", body = Withdrawal),
        (status = 409, description = "Saque não está em processamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_withdrawal(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermWithdrawalManage>,
    Path(withdrawal_id): Path<Uuid>,
    Json(payload): Json<CompleteWithdrawalPayload>,
) -> Result<Json<Withdrawal>, AppError> {
    payload.validate()?;

    let withdrawal = app_state
        .payment_service
        .complete(withdrawal_id, payload.transaction_reference.trim())
        .await?;
    Ok(Json(withdrawal))
}

#[utoipa::path(
    put,
    path = "/api/payment/admin/withdrawal-request/{id}/fail",
    tag = "Payment",
    request_body = WithdrawalReasonPayload,
    params(("id" = Uuid, Path, description = "ID do saque")),
    responses(
        (status = 200, description = "Saque marcado como falho", body = Withdrawal),
        (status = 409, description = "Saque não está em processamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn fail_withdrawal(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermWithdrawalManage>,
    Path(withdrawal_id): Path<Uuid>,
    Json(payload): Json<WithdrawalReasonPayload>,
) -> Result<Json<Withdrawal>, AppError> {
    payload.validate()?;

    let withdrawal = app_state
        .payment_service
        .fail(withdrawal_id, payload.reason.trim())
        .await?;
    Ok(Json(withdrawal))
}

#[utoipa::path(
    put,
    path = "/api/payment/admin/withdrawal-request/{id}/reject",
    tag = "Payment",
    request_body = WithdrawalReasonPayload,
    params(("id" = Uuid, Path, description = "ID do saque")),
    responses(
        (status = 200, description = "Saque recusado, valor devolvido ao saldo", body = Withdrawal),
        (status = 409, description = "Saque já processado")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_withdrawal(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermWithdrawalManage>,
    Path(withdrawal_id): Path<Uuid>,
    Json(payload): Json<WithdrawalReasonPayload>,
) -> Result<Json<Withdrawal>, AppError> {
    payload.validate()?;

    let withdrawal = app_state
        .payment_service
        .reject(withdrawal_id, payload.reason.trim())
        .await?;
    Ok(Json(withdrawal))
}
