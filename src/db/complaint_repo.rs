// src/db/complaint_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, transition::StatusAction},
    models::complaint::{Complaint, ComplaintAction, ComplaintHistoryEntry, ComplaintStatus},
};

#[derive(Clone)]
pub struct ComplaintRepository {
    pool: PgPool,
}

impl ComplaintRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_complaint<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        provider_id: Option<Uuid>,
        booking_id: Option<Uuid>,
        category: &str,
        subject: &str,
        description: &str,
    ) -> Result<Complaint, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let complaint = sqlx::query_as::<_, Complaint>(
            r#"
            INSERT INTO complaints (customer_id, provider_id, booking_id, category, subject, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(provider_id)
        .bind(booking_id)
        .bind(category)
        .bind(subject)
        .bind(description)
        .fetch_one(executor)
        .await?;
        Ok(complaint)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Complaint>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let complaint = sqlx::query_as::<_, Complaint>("SELECT * FROM complaints WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(complaint)
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Complaint>, AppError> {
        let complaints = sqlx::query_as::<_, Complaint>(
            "SELECT * FROM complaints WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(complaints)
    }

    pub async fn list_for_provider(&self, provider_id: Uuid) -> Result<Vec<Complaint>, AppError> {
        let complaints = sqlx::query_as::<_, Complaint>(
            "SELECT * FROM complaints WHERE provider_id = $1 ORDER BY created_at DESC",
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(complaints)
    }

    pub async fn list_all(&self) -> Result<Vec<Complaint>, AppError> {
        let complaints = sqlx::query_as::<_, Complaint>("SELECT * FROM complaints ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(complaints)
    }

    /// Muda o status se o atual estiver na tabela da ação.
    /// `response` vale para resolve, `reopen_reason` para reopen.
    pub async fn apply_transition<'e, E>(
        &self,
        executor: E,
        complaint_id: Uuid,
        action: ComplaintAction,
        response: Option<&str>,
        reopen_reason: Option<&str>,
    ) -> Result<Option<Complaint>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let complaint = sqlx::query_as::<_, Complaint>(
            r#"
            UPDATE complaints
            SET status = $2,
                response = COALESCE($4, response),
                reopen_reason = COALESCE($5, reopen_reason),
                resolved_at = CASE WHEN $2 = 'Solved' THEN NOW() ELSE resolved_at END,
                updated_at = NOW()
            WHERE id = $1 AND status::text = ANY($3)
            RETURNING *
            "#,
        )
        .bind(complaint_id)
        .bind(action.target())
        .bind(action.allowed_from_names())
        .bind(response)
        .bind(reopen_reason)
        .fetch_optional(executor)
        .await?;
        Ok(complaint)
    }

    pub async fn append_history<'e, E>(
        &self,
        executor: E,
        complaint_id: Uuid,
        status: ComplaintStatus,
        note: Option<&str>,
        changed_by: Uuid,
    ) -> Result<ComplaintHistoryEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, ComplaintHistoryEntry>(
            r#"
            INSERT INTO complaint_status_history (complaint_id, status, note, changed_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(complaint_id)
        .bind(status)
        .bind(note)
        .bind(changed_by)
        .fetch_one(executor)
        .await?;
        Ok(entry)
    }

    pub async fn list_history<'e, E>(
        &self,
        executor: E,
        complaint_id: Uuid,
    ) -> Result<Vec<ComplaintHistoryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let history = sqlx::query_as::<_, ComplaintHistoryEntry>(
            "SELECT * FROM complaint_status_history WHERE complaint_id = $1 ORDER BY changed_at ASC",
        )
        .bind(complaint_id)
        .fetch_all(executor)
        .await?;
        Ok(history)
    }
}
