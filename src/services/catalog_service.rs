// src/services/catalog_service.rs

use rust_decimal::Decimal;

use crate::{
    common::{
        error::AppError,
        money::{ensure_storable, round_money},
    },
    db::CatalogRepository,
    models::catalog::{CatalogService as CatalogEntry, CreateCatalogServicePayload},
};

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository) -> Self {
        Self { repo }
    }

    pub async fn create_service(&self, payload: &CreateCatalogServicePayload) -> Result<CatalogEntry, AppError> {
        ensure_storable(payload.base_price, "basePrice")?;
        if payload.base_price < Decimal::ZERO {
            return Err(AppError::BadRequest("O preço não pode ser negativo.".to_string()));
        }

        let service = self
            .repo
            .create_service(
                payload.name.trim(),
                payload.description.as_deref(),
                round_money(payload.base_price),
            )
            .await?;

        tracing::info!("🛠️ Serviço '{}' adicionado ao catálogo", service.name);
        Ok(service)
    }

    pub async fn list_active(&self) -> Result<Vec<CatalogEntry>, AppError> {
        self.repo.list_active().await
    }
}
