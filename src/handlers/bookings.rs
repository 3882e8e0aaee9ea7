// src/handlers/bookings.rs

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
    middleware::rbac::{
        PermBookingCreate, PermBookingManage, PermBookingOwn, PermBookingRead, PermBookingWork,
        RequirePermission,
    },
    models::booking::{
        AssignProviderPayload, Booking, BookingAction, BookingDetail, BookingListQuery,
        BookingStatus, CancelBookingPayload, CreateBookingPayload, RejectBookingPayload,
        RescheduleBookingPayload,
    },
};

// ---
// Cliente
// ---

#[utoipa::path(
    post,
    path = "/api/booking",
    tag = "Booking",
    request_body = CreateBookingPayload,
    responses(
        (status = 201, description = "Reserva criada", body = BookingDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Serviço não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_booking(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingCreate>,
    Json(payload): Json<CreateBookingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let detail = app_state
        .booking_service
        .create_booking(guard.actor().id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/booking/customer",
    tag = "Booking",
    responses((status = 200, description = "Reservas do cliente", body = Vec<Booking>)),
    security(("api_jwt" = []))
)]
pub async fn list_customer_bookings(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingOwn>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = app_state.booking_service.list_for_customer(guard.actor().id).await?;
    Ok(Json(bookings))
}

#[utoipa::path(
    patch,
    path = "/api/booking/customer/{id}/cancel",
    tag = "Booking",
    request_body = CancelBookingPayload,
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva cancelada", body = Booking),
        (status = 409, description = "Status não permite cancelamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_by_customer(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingOwn>,
    Path(booking_id): Path<Uuid>,
    payload: Option<Json<CancelBookingPayload>>,
) -> Result<Json<Booking>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;

    let booking = app_state
        .booking_service
        .cancel_by_customer(guard.actor().id, booking_id, payload.reason.as_deref())
        .await?;

    Ok(Json(booking))
}

#[utoipa::path(
    get,
    path = "/api/booking/{id}",
    tag = "Booking",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Detalhe da reserva", body = BookingDetail),
        (status = 403, description = "Reserva de outro usuário"),
        (status = 404, description = "Reserva não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_booking(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingRead>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingDetail>, AppError> {
    let detail = app_state.booking_service.get_booking(guard.actor(), booking_id).await?;
    Ok(Json(detail))
}

// ---
// Prestador
// ---

#[utoipa::path(
    patch,
    path = "/api/booking/provider/{id}/accept",
    tag = "Booking",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva aceita", body = Booking),
        (status = 409, description = "Reserva já aceita ou fora de ordem")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_booking(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingWork>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = app_state
        .booking_service
        .provider_transition(guard.actor(), booking_id, BookingAction::Accept, None)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    patch,
    path = "/api/booking/provider/{id}/reject",
    tag = "Booking",
    request_body = RejectBookingPayload,
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva recusada", body = Booking),
        (status = 409, description = "Status não permite recusa")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_booking(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingWork>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<RejectBookingPayload>,
) -> Result<Json<Booking>, AppError> {
    payload.validate()?;

    let booking = app_state
        .booking_service
        .provider_transition(guard.actor(), booking_id, BookingAction::Reject, Some(payload.reason.trim()))
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    patch,
    path = "/api/booking/provider/{id}/start",
    tag = "Booking",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Atendimento iniciado", body = Booking),
        (status = 409, description = "Reserva não está aceita")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_booking(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingWork>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = app_state
        .booking_service
        .provider_transition(guard.actor(), booking_id, BookingAction::Start, None)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    patch,
    path = "/api/booking/provider/{id}/complete",
    tag = "Booking",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva concluída e fatura gerada", body = Booking),
        (status = 409, description = "Reserva não está em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_booking(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingWork>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = app_state
        .booking_service
        .complete_booking(guard.actor(), booking_id)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    get,
    path = "/api/booking/provider/status/{status}",
    tag = "Booking",
    params(("status" = BookingStatus, Path, description = "Status das reservas")),
    responses((status = 200, description = "Reservas do prestador", body = Vec<Booking>)),
    security(("api_jwt" = []))
)]
pub async fn list_provider_bookings(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermBookingWork>,
    Path(status): Path<BookingStatus>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = app_state
        .booking_service
        .list_for_provider(guard.actor().id, status)
        .await?;
    Ok(Json(bookings))
}

// ---
// Admin
// ---

#[utoipa::path(
    get,
    path = "/api/booking/admin",
    tag = "Booking",
    params(("status" = Option<BookingStatus>, Query, description = "Filtro opcional por status")),
    responses((status = 200, description = "Todas as reservas", body = Vec<Booking>)),
    security(("api_jwt" = []))
)]
pub async fn list_all_bookings(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBookingManage>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = app_state.booking_service.list_all(query.status).await?;
    Ok(Json(bookings))
}

#[utoipa::path(
    patch,
    path = "/api/booking/admin/{id}/assign",
    tag = "Booking",
    request_body = AssignProviderPayload,
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Prestador atribuído", body = Booking),
        (status = 409, description = "Reserva já atribuída ou fora de pending")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_provider(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBookingManage>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<AssignProviderPayload>,
) -> Result<Json<Booking>, AppError> {
    let booking = app_state
        .booking_service
        .assign_provider(booking_id, payload.provider_id)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    patch,
    path = "/api/booking/admin/{id}/reschedule",
    tag = "Booking",
    request_body = RescheduleBookingPayload,
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva reagendada", body = Booking),
        (status = 409, description = "Reserva encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn reschedule_booking(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBookingManage>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<RescheduleBookingPayload>,
) -> Result<Json<Booking>, AppError> {
    let booking = app_state
        .booking_service
        .reschedule(booking_id, payload.scheduled_date, payload.scheduled_time)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    patch,
    path = "/api/booking/admin/{id}/cancel",
    tag = "Booking",
    request_body = CancelBookingPayload,
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Reserva cancelada", body = Booking),
        (status = 409, description = "Reserva encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_by_admin(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBookingManage>,
    Path(booking_id): Path<Uuid>,
    payload: Option<Json<CancelBookingPayload>>,
) -> Result<Json<Booking>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;

    let booking = app_state
        .booking_service
        .cancel_by_admin(booking_id, payload.reason.as_deref())
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    delete,
    path = "/api/booking/admin/{id}",
    tag = "Booking",
    params(("id" = Uuid, Path, description = "ID da reserva")),
    responses(
        (status = 204, description = "Reserva removida"),
        (status = 409, description = "Reserva concluída não pode ser removida")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_booking(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBookingManage>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.booking_service.delete_booking(booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
