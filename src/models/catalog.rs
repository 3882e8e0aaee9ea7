// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Serviço oferecido pela plataforma (ex.: "Limpeza de ar-condicionado")
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogService {
    pub id: Uuid,
    #[schema(example = "Limpeza de ar-condicionado")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "100.00")]
    pub base_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogServicePayload {
    #[validate(length(min = 2, message = "O nome do serviço é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "100.00")]
    pub base_price: Decimal,
}
