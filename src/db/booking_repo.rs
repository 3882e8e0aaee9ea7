// src/db/booking_repo.rs

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, transition::StatusAction},
    models::booking::{
        Booking, BookingAction, BookingServiceLine, BookingStatus, NewBooking, NewBookingLine,
        PaymentMethod, PaymentStatus,
    },
};

/// Quem está movendo a reserva. Vira parte do `WHERE` do update condicional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionGuard {
    /// Só o prestador atribuído. No `accept`, também uma reserva ainda sem prestador.
    Provider(Uuid),
    /// Só o cliente dono da reserva.
    Customer(Uuid),
    Admin,
}

impl TransitionGuard {
    /// O cliente não cancela depois que o atendimento começou.
    pub fn may_act_from(&self, status: BookingStatus) -> bool {
        !matches!(self, TransitionGuard::Customer(_)) || status != BookingStatus::InProgress
    }

    /// Status de origem da ação já filtrados para este ator.
    pub fn allowed_from_names(&self, action: BookingAction) -> Vec<String> {
        action
            .allowed_from()
            .iter()
            .filter(|status| self.may_act_from(**status))
            .map(|status| status.to_string())
            .collect()
    }
}

// Coluna de data/hora carimbada ao entrar em cada status
fn timestamp_column(status: BookingStatus) -> Option<&'static str> {
    match status {
        BookingStatus::Accepted => Some("accepted_at"),
        BookingStatus::InProgress => Some("started_at"),
        BookingStatus::Completed => Some("completed_at"),
        BookingStatus::Cancelled => Some("cancelled_at"),
        BookingStatus::Pending => None,
    }
}

#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    // Cabeçalho + linhas. Chamado dentro de uma transação do serviço.
    pub async fn create_booking(
        &self,
        conn: &mut PgConnection,
        new_booking: &NewBooking,
        lines: &[NewBookingLine],
    ) -> Result<(Booking, Vec<BookingServiceLine>), AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                customer_id, address, scheduled_date, scheduled_time,
                notes, payment_method, total_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new_booking.customer_id)
        .bind(&new_booking.address)
        .bind(new_booking.scheduled_date)
        .bind(new_booking.scheduled_time)
        .bind(new_booking.notes.as_deref())
        .bind(new_booking.payment_method)
        .bind(new_booking.total_amount)
        .fetch_one(&mut *conn)
        .await?;

        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let row = sqlx::query_as::<_, BookingServiceLine>(
                r#"
                INSERT INTO booking_services (
                    booking_id, service_id, service_name, price, quantity, discount_amount
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(booking.id)
            .bind(line.service_id)
            .bind(&line.service_name)
            .bind(line.price)
            .bind(line.quantity)
            .bind(line.discount_amount)
            .fetch_one(&mut *conn)
            .await?;
            inserted.push(row);
        }

        Ok((booking, inserted))
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Booking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(booking)
    }

    pub async fn list_services<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
    ) -> Result<Vec<BookingServiceLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, BookingServiceLine>(
            "SELECT * FROM booking_services WHERE booking_id = $1 ORDER BY service_name ASC",
        )
        .bind(booking_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    // "pending" para o prestador inclui as reservas livres que ele pode aceitar
    pub async fn list_for_provider(
        &self,
        provider_id: Uuid,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE status = $2
              AND (provider_id = $1 OR ($2 = 'pending' AND provider_id IS NULL))
            ORDER BY scheduled_date ASC, scheduled_time ASC
            "#,
        )
        .bind(provider_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    pub async fn list_all(&self, status: Option<BookingStatus>) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE ($1::booking_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    // =========================================================================
    //  TRANSIÇÕES (update condicional)
    // =========================================================================

    /// Aplica `action` numa única instrução: só atualiza se o status atual
    /// estiver na tabela de origem da ação e o ator passar no guard.
    /// `None` significa que nenhuma linha casou (o serviço classifica o motivo).
    pub async fn apply_transition<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        action: BookingAction,
        guard: TransitionGuard,
        reason: Option<&str>,
    ) -> Result<Option<Booking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (provider_filter, customer_filter) = match guard {
            TransitionGuard::Provider(id) => (Some(id), None),
            TransitionGuard::Customer(id) => (None, Some(id)),
            TransitionGuard::Admin => (None, None),
        };
        let claims_provider = action == BookingAction::Accept && provider_filter.is_some();

        let stamp = timestamp_column(action.target())
            .map(|column| format!("{column} = NOW(),"))
            .unwrap_or_default();

        let sql = format!(
            r#"
            UPDATE bookings
            SET status = $2,
                provider_id = CASE WHEN $6 THEN COALESCE(provider_id, $4) ELSE provider_id END,
                cancellation_reason = COALESCE($7, cancellation_reason),
                {stamp}
                updated_at = NOW()
            WHERE id = $1
              AND status::text = ANY($3)
              AND ($4::uuid IS NULL OR provider_id = $4 OR ($6 AND provider_id IS NULL))
              AND ($5::uuid IS NULL OR customer_id = $5)
            RETURNING *
            "#
        );

        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(booking_id)
            .bind(action.target())
            .bind(guard.allowed_from_names(action))
            .bind(provider_filter)
            .bind(customer_filter)
            .bind(claims_provider)
            .bind(reason)
            .fetch_optional(executor)
            .await?;

        Ok(booking)
    }

    // O prestador só é definido uma vez
    pub async fn assign_provider(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET provider_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND provider_id IS NULL
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    // Única volta permitida: o status é forçado para accepted/pending
    pub async fn reschedule(
        &self,
        booking_id: Uuid,
        scheduled_date: NaiveDate,
        scheduled_time: NaiveTime,
        allowed_from: Vec<String>,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET scheduled_date = $2,
                scheduled_time = $3,
                status = CASE
                    WHEN provider_id IS NULL THEN 'pending'::booking_status
                    ELSE 'accepted'::booking_status
                END,
                started_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status::text = ANY($4)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(scheduled_date)
        .bind(scheduled_time)
        .bind(allowed_from)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    pub async fn delete_unless_completed(&self, booking_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1 AND status <> 'completed'")
            .bind(booking_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Espelha na reserva os valores da fatura
    #[allow(clippy::too_many_arguments)]
    pub async fn sync_financials<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        total_amount: Decimal,
        commission_rate: Decimal,
        commission_amount: Decimal,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE bookings
            SET total_amount = $2,
                commission_rate = $3,
                commission_amount = $4,
                payment_method = $5,
                payment_status = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .bind(total_amount)
        .bind(commission_rate)
        .bind(commission_amount)
        .bind(payment_method)
        .bind(payment_status)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_target_status_is_stamped() {
        for action in BookingAction::ALL {
            assert!(timestamp_column(action.target()).is_some(), "{}", action.name());
        }
        assert_eq!(timestamp_column(BookingStatus::Pending), None);
    }

    #[test]
    fn customer_cannot_cancel_started_work() {
        let customer = TransitionGuard::Customer(Uuid::new_v4());
        assert_eq!(customer.allowed_from_names(BookingAction::Cancel), vec!["pending", "accepted"]);
        assert_eq!(
            TransitionGuard::Admin.allowed_from_names(BookingAction::Cancel),
            vec!["pending", "accepted", "in-progress"]
        );
    }
}
