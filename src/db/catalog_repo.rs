// src/db/catalog_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::catalog::CatalogService};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_service(
        &self,
        name: &str,
        description: Option<&str>,
        base_price: Decimal,
    ) -> Result<CatalogService, AppError> {
        let service = sqlx::query_as::<_, CatalogService>(
            r#"
            INSERT INTO catalog_services (name, description, base_price)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(base_price)
        .fetch_one(&self.pool)
        .await?;

        Ok(service)
    }

    pub async fn list_active(&self) -> Result<Vec<CatalogService>, AppError> {
        let services = sqlx::query_as::<_, CatalogService>(
            "SELECT * FROM catalog_services WHERE is_active = TRUE ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(services)
    }

    // Busca vários serviços de uma vez (linhas de uma nova reserva)
    pub async fn find_by_ids<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<CatalogService>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let services = sqlx::query_as::<_, CatalogService>(
            "SELECT * FROM catalog_services WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(services)
    }
}
