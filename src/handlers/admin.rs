// src/handlers/admin.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermProviderManage, RequirePermission},
    models::provider::{CommissionRule, ProviderProfile, ProviderSummary, UpdateCommissionPayload},
};

#[utoipa::path(
    get,
    path = "/api/admin/providers",
    tag = "Admin",
    responses((status = 200, description = "Prestadores e suas comissões", body = Vec<ProviderSummary>)),
    security(("api_jwt" = []))
)]
pub async fn list_providers(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermProviderManage>,
) -> Result<Json<Vec<ProviderSummary>>, AppError> {
    let providers = app_state.provider_service.list_providers().await?;
    Ok(Json(providers))
}

#[utoipa::path(
    put,
    path = "/api/admin/providers/{id}/commission",
    tag = "Admin",
    request_body = UpdateCommissionPayload,
    params(("id" = Uuid, Path, description = "ID do prestador")),
    responses(
        (status = 200, description = "Comissão atualizada", body = ProviderProfile),
        (status = 400, description = "Taxa inválida"),
        (status = 404, description = "Prestador não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_commission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermProviderManage>,
    Path(provider_id): Path<Uuid>,
    Json(payload): Json<UpdateCommissionPayload>,
) -> Result<Json<ProviderProfile>, AppError> {
    let rule = CommissionRule { kind: payload.commission_type, rate: payload.commission_rate };
    let profile = app_state.provider_service.update_commission(provider_id, rule).await?;
    Ok(Json(profile))
}
