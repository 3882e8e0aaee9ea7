// src/handlers/catalog.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermCatalogManage, PermCatalogRead, RequirePermission},
    models::catalog::{CatalogService, CreateCatalogServicePayload},
};

#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Catalog",
    responses(
        (status = 200, description = "Serviços ativos do catálogo", body = Vec<CatalogService>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_services(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermCatalogRead>,
) -> Result<Json<Vec<CatalogService>>, AppError> {
    let services = app_state.catalog_service.list_active().await?;
    Ok(Json(services))
}

#[utoipa::path(
    post,
    path = "/api/services",
    tag = "Catalog",
    request_body = CreateCatalogServicePayload,
    responses(
        (status = 201, description = "Serviço criado", body = CatalogService),
        (status = 403, description = "Somente administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_service(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermCatalogManage>,
    Json(payload): Json<CreateCatalogServicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let service = app_state.catalog_service.create_service(&payload).await?;

    Ok((StatusCode::CREATED, Json(service)))
}
