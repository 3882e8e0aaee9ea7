// src/db/payment_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, transition::StatusAction},
    models::payment::{LedgerWithdrawalRow, PayoutMethod, Withdrawal, WithdrawalAction, WithdrawalStatus},
};

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_withdrawal<'e, E>(
        &self,
        executor: E,
        provider_id: Uuid,
        amount: Decimal,
        payment_method: PayoutMethod,
        payout_details: Option<&str>,
    ) -> Result<Withdrawal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // netAmount = amount (nenhuma dedução adicional no saque)
        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (provider_id, amount, net_amount, payment_method, payout_details)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(provider_id)
        .bind(amount)
        .bind(payment_method)
        .bind(payout_details)
        .fetch_one(executor)
        .await?;
        Ok(withdrawal)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Withdrawal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let withdrawal = sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(withdrawal)
    }

    pub async fn list_for_provider(&self, provider_id: Uuid) -> Result<Vec<Withdrawal>, AppError> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            "SELECT * FROM withdrawals WHERE provider_id = $1 ORDER BY created_at DESC",
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(withdrawals)
    }

    pub async fn list_all(&self, status: Option<WithdrawalStatus>) -> Result<Vec<Withdrawal>, AppError> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT * FROM withdrawals
            WHERE ($1::withdrawal_status IS NULL OR status = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(withdrawals)
    }

    pub async fn ledger_rows<'e, E>(
        &self,
        executor: E,
        provider_id: Uuid,
    ) -> Result<Vec<LedgerWithdrawalRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, LedgerWithdrawalRow>(
            "SELECT amount, status FROM withdrawals WHERE provider_id = $1",
        )
        .bind(provider_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Move o saque se (e somente se) ele ainda estiver no status de origem da ação.
    /// Referência e observação só sobrescrevem quando informadas.
    pub async fn apply_transition<'e, E>(
        &self,
        executor: E,
        withdrawal_id: Uuid,
        action: WithdrawalAction,
        transaction_reference: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<Option<Withdrawal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            UPDATE withdrawals
            SET status = $2,
                transaction_reference = COALESCE($4, transaction_reference),
                remarks = COALESCE($5, remarks),
                processed_at = CASE WHEN $2 = 'processing' THEN NOW() ELSE processed_at END,
                completed_at = CASE WHEN $2 = 'completed' THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1 AND status::text = ANY($3)
            RETURNING *
            "#,
        )
        .bind(withdrawal_id)
        .bind(action.target())
        .bind(action.allowed_from_names())
        .bind(transaction_reference)
        .bind(remarks)
        .fetch_optional(executor)
        .await?;
        Ok(withdrawal)
    }
}
