// src/handlers/complaints.rs

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
    middleware::rbac::{
        PermComplaintClose, PermComplaintCreate, PermComplaintRead, PermComplaintReopen,
        PermComplaintTriage, RequirePermission,
    },
    models::complaint::{
        Complaint, ComplaintDetail, ComplaintNotePayload, CreateComplaintPayload,
        ReopenComplaintPayload, ResolveComplaintPayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/complaint/complaints",
    tag = "Complaint",
    request_body = CreateComplaintPayload,
    responses(
        (status = 201, description = "Reclamação aberta", body = ComplaintDetail),
        (status = 403, description = "Reserva de outro cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_complaint(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermComplaintCreate>,
    Json(payload): Json<CreateComplaintPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let detail = app_state
        .complaint_service
        .create_complaint(guard.actor().id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/complaint/complaints",
    tag = "Complaint",
    responses((status = 200, description = "Reclamações visíveis ao usuário", body = Vec<Complaint>)),
    security(("api_jwt" = []))
)]
pub async fn list_complaints(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermComplaintRead>,
) -> Result<Json<Vec<Complaint>>, AppError> {
    let complaints = app_state.complaint_service.list_for_actor(guard.actor()).await?;
    Ok(Json(complaints))
}

#[utoipa::path(
    get,
    path = "/api/complaint/complaints/{id}",
    tag = "Complaint",
    params(("id" = Uuid, Path, description = "ID da reclamação")),
    responses(
        (status = 200, description = "Reclamação com histórico", body = ComplaintDetail),
        (status = 404, description = "Reclamação não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_complaint(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermComplaintRead>,
    Path(complaint_id): Path<Uuid>,
) -> Result<Json<ComplaintDetail>, AppError> {
    let detail = app_state.complaint_service.get_complaint(guard.actor(), complaint_id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/complaint/complaints/{id}/in-progress",
    tag = "Complaint",
    request_body = ComplaintNotePayload,
    params(("id" = Uuid, Path, description = "ID da reclamação")),
    responses(
        (status = 200, description = "Reclamação em atendimento", body = ComplaintDetail),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_in_progress(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermComplaintTriage>,
    Path(complaint_id): Path<Uuid>,
    payload: Option<Json<ComplaintNotePayload>>,
) -> Result<Json<ComplaintDetail>, AppError> {
    let payload = payload.map(|Json(p)| p);
    if let Some(p) = &payload {
        p.validate()?;
    }
    let note = payload.and_then(|p| p.note);

    let detail = app_state
        .complaint_service
        .mark_in_progress(guard.actor(), complaint_id, note.as_deref())
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/complaint/complaints/{id}/resolve",
    tag = "Complaint",
    request_body = ResolveComplaintPayload,
    params(("id" = Uuid, Path, description = "ID da reclamação")),
    responses(
        (status = 200, description = "Reclamação resolvida", body = ComplaintDetail),
        (status = 400, description = "Resposta curta demais"),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn resolve_complaint(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermComplaintTriage>,
    Path(complaint_id): Path<Uuid>,
    Json(payload): Json<ResolveComplaintPayload>,
) -> Result<Json<ComplaintDetail>, AppError> {
    payload.validate()?;

    let detail = app_state
        .complaint_service
        .resolve(guard.actor(), complaint_id, &payload.response)
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/complaint/complaints/{id}/reopen",
    tag = "Complaint",
    request_body = ReopenComplaintPayload,
    params(("id" = Uuid, Path, description = "ID da reclamação")),
    responses(
        (status = 200, description = "Reclamação reaberta", body = ComplaintDetail),
        (status = 409, description = "Só reclamações resolvidas podem ser reabertas")
    ),
    security(("api_jwt" = []))
)]
pub async fn reopen_complaint(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermComplaintReopen>,
    Path(complaint_id): Path<Uuid>,
    Json(payload): Json<ReopenComplaintPayload>,
) -> Result<Json<ComplaintDetail>, AppError> {
    payload.validate()?;

    let detail = app_state
        .complaint_service
        .reopen(guard.actor(), complaint_id, &payload.reason)
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/complaint/complaints/{id}/close",
    tag = "Complaint",
    request_body = ComplaintNotePayload,
    params(("id" = Uuid, Path, description = "ID da reclamação")),
    responses(
        (status = 200, description = "Reclamação encerrada", body = ComplaintDetail),
        (status = 409, description = "Reclamação já encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_complaint(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermComplaintClose>,
    Path(complaint_id): Path<Uuid>,
    payload: Option<Json<ComplaintNotePayload>>,
) -> Result<Json<ComplaintDetail>, AppError> {
    let payload = payload.map(|Json(p)| p);
    if let Some(p) = &payload {
        p.validate()?;
    }
    let note = payload.and_then(|p| p.note);

    let detail = app_state
        .complaint_service
        .close(guard.actor(), complaint_id, note.as_deref())
        .await?;
    Ok(Json(detail))
}
