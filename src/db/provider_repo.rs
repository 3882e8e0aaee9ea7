// src/db/provider_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::provider::{CommissionRule, ProviderProfile, ProviderSummary},
};

#[derive(Clone)]
pub struct ProviderRepository {
    pool: PgPool,
}

impl ProviderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        rule: CommissionRule,
    ) -> Result<ProviderProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, ProviderProfile>(
            r#"
            INSERT INTO provider_profiles (user_id, commission_type, commission_rate)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(rule.kind)
        .bind(rule.rate)
        .fetch_one(executor)
        .await?;

        Ok(profile)
    }

    pub async fn find_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<ProviderProfile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, ProviderProfile>(
            "SELECT * FROM provider_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(profile)
    }

    // Trava a linha do prestador até o fim da transação.
    // Serializa pedidos de saque concorrentes do mesmo prestador.
    pub async fn lock_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<ProviderProfile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, ProviderProfile>(
            "SELECT * FROM provider_profiles WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(profile)
    }

    pub async fn list_providers(&self) -> Result<Vec<ProviderSummary>, AppError> {
        let providers = sqlx::query_as::<_, ProviderSummary>(
            r#"
            SELECT
                u.id, u.name, u.email, u.phone, u.email_verified,
                p.commission_type, p.commission_rate, u.created_at
            FROM users u
            JOIN provider_profiles p ON p.user_id = u.id
            WHERE u.role = 'provider'
            ORDER BY u.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(providers)
    }

    pub async fn update_commission(
        &self,
        user_id: Uuid,
        rule: CommissionRule,
    ) -> Result<Option<ProviderProfile>, AppError> {
        let profile = sqlx::query_as::<_, ProviderProfile>(
            r#"
            UPDATE provider_profiles
            SET commission_type = $2, commission_rate = $3, updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(rule.kind)
        .bind(rule.rate)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
