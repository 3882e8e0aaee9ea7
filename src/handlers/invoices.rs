// src/handlers/invoices.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermInvoicePayment, PermInvoiceProducts, PermInvoiceRead, RequirePermission},
    models::invoice::{
        Invoice, InvoiceDetail, ProductLineInput, ReplaceProductsPayload, UpdateInvoicePaymentPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/invoice/{id}",
    tag = "Invoice",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura com serviços e produtos", body = InvoiceDetail),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermInvoiceRead>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let detail = app_state.invoice_service.get_invoice(guard.actor(), invoice_id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    get,
    path = "/api/invoice/booking/{booking_id}",
    tag = "Invoice",
    params(("booking_id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Fatura da reserva", body = InvoiceDetail),
        (status = 404, description = "Reserva ainda sem fatura")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice_by_booking(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermInvoiceRead>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let detail = app_state.invoice_service.get_by_booking(guard.actor(), booking_id).await?;
    Ok(Json(detail))
}

// customer, provider e admin usam o mesmo handler; a política decide o recorte
#[utoipa::path(
    get,
    path = "/api/invoice/{scope}",
    tag = "Invoice",
    params(("scope" = String, Path, description = "customer | provider | admin")),
    responses((status = 200, description = "Faturas visíveis ao usuário", body = Vec<Invoice>)),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermInvoiceRead>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let invoices = app_state.invoice_service.list_for_actor(guard.actor()).await?;
    Ok(Json(invoices))
}

#[utoipa::path(
    post,
    path = "/api/invoice/{id}/products",
    tag = "Invoice",
    request_body = ProductLineInput,
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 201, description = "Produto adicionado, totais recalculados", body = InvoiceDetail),
        (status = 409, description = "Fatura paga ou saldo negativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_product(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermInvoiceProducts>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<ProductLineInput>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let detail = app_state
        .invoice_service
        .add_product(guard.actor(), invoice_id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    put,
    path = "/api/invoice/{id}/products",
    tag = "Invoice",
    request_body = ReplaceProductsPayload,
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Produtos substituídos", body = InvoiceDetail),
        (status = 409, description = "Fatura paga ou saldo negativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_products(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermInvoiceProducts>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<ReplaceProductsPayload>,
) -> Result<Json<InvoiceDetail>, AppError> {
    payload.validate()?;

    let detail = app_state
        .invoice_service
        .replace_products(guard.actor(), invoice_id, &payload.products)
        .await?;

    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/invoice/{id}/products/{product_id}",
    tag = "Invoice",
    request_body = ProductLineInput,
    params(
        ("id" = Uuid, Path, description = "ID da fatura"),
        ("product_id" = Uuid, Path, description = "ID do produto")
    ),
    responses(
        (status = 200, description = "Produto atualizado", body = InvoiceDetail),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermInvoiceProducts>,
    Path((invoice_id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ProductLineInput>,
) -> Result<Json<InvoiceDetail>, AppError> {
    payload.validate()?;

    let detail = app_state
        .invoice_service
        .update_product(guard.actor(), invoice_id, product_id, &payload)
        .await?;

    Ok(Json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/invoice/{id}/products/{product_id}",
    tag = "Invoice",
    params(
        ("id" = Uuid, Path, description = "ID da fatura"),
        ("product_id" = Uuid, Path, description = "ID do produto")
    ),
    responses(
        (status = 200, description = "Produto removido", body = InvoiceDetail),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermInvoiceProducts>,
    Path((invoice_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let detail = app_state
        .invoice_service
        .delete_product(guard.actor(), invoice_id, product_id)
        .await?;

    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/invoice/admin/{id}/payment",
    tag = "Invoice",
    request_body = UpdateInvoicePaymentPayload,
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Pagamento atualizado", body = InvoiceDetail),
        (status = 409, description = "Adiantamento maior que o total")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_payment(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermInvoicePayment>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoicePaymentPayload>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let detail = app_state.invoice_service.update_payment(invoice_id, &payload).await?;
    Ok(Json(detail))
}
