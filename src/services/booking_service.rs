// src/services/booking_service.rs

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        money::{ensure_storable, round_money},
        transition::StatusAction,
    },
    db::{BookingRepository, CatalogRepository, TransitionGuard, UserRepository},
    models::{
        auth::{Actor, UserRole},
        booking::{
            Booking, BookingAction, BookingDetail, BookingStatus, CreateBookingPayload, NewBooking,
            NewBookingLine, PaymentMethod,
        },
    },
    services::invoice_service::InvoiceService,
};

/// Motivo de um update condicional que não casou com nenhuma linha.
///
/// Quem não é dono da reserva recebe 403 sem saber o status dela. A exceção
/// é o `accept`: quem perde a corrida recebe conflito e não falta de permissão.
pub fn classify_failure(
    action: BookingAction,
    guard: TransitionGuard,
    status: BookingStatus,
    provider_id: Option<Uuid>,
    customer_id: Uuid,
) -> AppError {
    let actor_matches = match guard {
        TransitionGuard::Admin => true,
        TransitionGuard::Customer(id) => customer_id == id,
        TransitionGuard::Provider(id) => {
            provider_id == Some(id) || (action == BookingAction::Accept && provider_id.is_none())
        }
    };
    let not_owner = || AppError::Forbidden("Esta reserva não pertence a você.".to_string());

    if !actor_matches && action != BookingAction::Accept {
        return not_owner();
    }

    if !action.is_allowed_from(status) || !guard.may_act_from(status) {
        return AppError::InvalidTransition {
            from: status.to_string(),
            action: action.name().to_string(),
        };
    }

    if !actor_matches {
        return not_owner();
    }

    // Linha mudou entre o UPDATE e a releitura
    AppError::Conflict("A reserva foi alterada por outra requisição.".to_string())
}

#[derive(Clone)]
pub struct BookingService {
    pool: PgPool,
    booking_repo: BookingRepository,
    catalog_repo: CatalogRepository,
    user_repo: UserRepository,
    invoice_service: InvoiceService,
}

impl BookingService {
    pub fn new(
        pool: PgPool,
        booking_repo: BookingRepository,
        catalog_repo: CatalogRepository,
        user_repo: UserRepository,
        invoice_service: InvoiceService,
    ) -> Self {
        Self { pool, booking_repo, catalog_repo, user_repo, invoice_service }
    }

    // =========================================================================
    //  CRIAÇÃO (cliente)
    // =========================================================================

    pub async fn create_booking(
        &self,
        customer_id: Uuid,
        payload: &CreateBookingPayload,
    ) -> Result<BookingDetail, AppError> {
        if payload.address.trim().is_empty() {
            return Err(AppError::BadRequest("O endereço é obrigatório.".to_string()));
        }
        if payload.scheduled_date < Utc::now().date_naive() {
            return Err(AppError::BadRequest(
                "A data do agendamento não pode estar no passado.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let ids: Vec<Uuid> = payload.services.iter().map(|s| s.service_id).collect();
        let catalog: HashMap<Uuid, _> = self
            .catalog_repo
            .find_by_ids(&mut *tx, &ids)
            .await?
            .into_iter()
            .map(|service| (service.id, service))
            .collect();

        let mut lines = Vec::with_capacity(payload.services.len());
        for input in &payload.services {
            let service = catalog
                .get(&input.service_id)
                .filter(|service| service.is_active)
                .ok_or_else(|| AppError::ResourceNotFound(format!("Serviço {}", input.service_id)))?;

            let discount = ensure_storable(input.discount_amount.unwrap_or(Decimal::ZERO), "discountAmount")?;
            let gross = service.base_price * Decimal::from(input.quantity);
            if discount < Decimal::ZERO || discount > gross {
                return Err(AppError::BadRequest(format!(
                    "Desconto inválido para o serviço '{}'.",
                    service.name
                )));
            }

            lines.push(NewBookingLine {
                service_id: service.id,
                service_name: service.name.clone(),
                price: service.base_price,
                quantity: input.quantity,
                discount_amount: discount,
            });
        }

        let total_amount = ensure_storable(
            round_money(
                lines
                    .iter()
                    .map(|l| l.price * Decimal::from(l.quantity) - l.discount_amount)
                    .sum(),
            ),
            "totalAmount",
        )?;

        let new_booking = NewBooking {
            customer_id,
            address: payload.address.trim().to_string(),
            scheduled_date: payload.scheduled_date,
            scheduled_time: payload.scheduled_time,
            notes: payload.notes.clone(),
            payment_method: payload.payment_method.unwrap_or(PaymentMethod::Cash),
            total_amount,
        };

        let (booking, services) = self.booking_repo.create_booking(&mut tx, &new_booking, &lines).await?;
        tx.commit().await?;

        tracing::info!("📅 Reserva {} criada pelo cliente {}", booking.id, customer_id);

        Ok(BookingDetail { booking, services })
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    /// Aceite, recusa e início pelo prestador (ou admin).
    pub async fn provider_transition(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        action: BookingAction,
        reason: Option<&str>,
    ) -> Result<Booking, AppError> {
        let guard = provider_guard(actor);

        if action == BookingAction::Accept && guard == TransitionGuard::Admin {
            let booking = self.find_booking(booking_id).await?;
            if booking.provider_id.is_none() {
                return Err(AppError::Conflict(
                    "Atribua um prestador antes de aceitar a reserva.".to_string(),
                ));
            }
        }

        let booking = self
            .transition(&self.pool, booking_id, action, guard, reason)
            .await?;

        tracing::info!(
            "🔄 Reserva {} -> {} ({} por {})",
            booking.id,
            booking.status,
            action.name(),
            actor.id
        );
        Ok(booking)
    }

    /// Conclusão: muda o status e gera a fatura na mesma transação.
    pub async fn complete_booking(&self, actor: &Actor, booking_id: Uuid) -> Result<Booking, AppError> {
        let guard = provider_guard(actor);

        let mut tx = self.pool.begin().await?;

        let booking = self
            .transition(&mut *tx, booking_id, BookingAction::Complete, guard, None)
            .await?;
        let invoice = self.invoice_service.generate_for_booking(&mut tx, &booking).await?;

        // A reserva foi sincronizada com a fatura; relê para devolver os valores finais
        let booking = self
            .booking_repo
            .find_by_id(&mut *tx, booking.id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Reserva".to_string()))?;

        tx.commit().await?;

        tracing::info!("✅ Reserva {} concluída, fatura {}", booking.id, invoice.id);
        Ok(booking)
    }

    pub async fn cancel_by_customer(
        &self,
        customer_id: Uuid,
        booking_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Booking, AppError> {
        let booking = self
            .transition(
                &self.pool,
                booking_id,
                BookingAction::Cancel,
                TransitionGuard::Customer(customer_id),
                reason,
            )
            .await?;

        tracing::info!("❌ Reserva {} cancelada pelo cliente", booking.id);
        Ok(booking)
    }

    pub async fn cancel_by_admin(&self, booking_id: Uuid, reason: Option<&str>) -> Result<Booking, AppError> {
        let booking = self
            .transition(&self.pool, booking_id, BookingAction::Cancel, TransitionGuard::Admin, reason)
            .await?;

        tracing::info!("❌ Reserva {} cancelada pelo administrador", booking.id);
        Ok(booking)
    }

    async fn transition<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        action: BookingAction,
        guard: TransitionGuard,
        reason: Option<&str>,
    ) -> Result<Booking, AppError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        if let Some(booking) = self
            .booking_repo
            .apply_transition(executor, booking_id, action, guard, reason)
            .await?
        {
            return Ok(booking);
        }

        // Nada casou: relê fora da transação para explicar o motivo
        let current = self.find_booking(booking_id).await?;
        Err(classify_failure(
            action,
            guard,
            current.status,
            current.provider_id,
            current.customer_id,
        ))
    }

    // =========================================================================
    //  ADMIN
    // =========================================================================

    pub async fn assign_provider(&self, booking_id: Uuid, provider_id: Uuid) -> Result<Booking, AppError> {
        let provider = self
            .user_repo
            .find_by_id(&self.pool, provider_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        if provider.role != UserRole::Provider {
            return Err(AppError::BadRequest("O usuário informado não é um prestador.".to_string()));
        }

        if let Some(booking) = self.booking_repo.assign_provider(booking_id, provider_id).await? {
            tracing::info!("👷 Prestador {} atribuído à reserva {}", provider_id, booking_id);
            return Ok(booking);
        }

        let current = self.find_booking(booking_id).await?;
        if current.provider_id.is_some() {
            return Err(AppError::Conflict("A reserva já possui prestador atribuído.".to_string()));
        }
        Err(AppError::InvalidTransition {
            from: current.status.to_string(),
            action: "assign".to_string(),
        })
    }

    pub async fn reschedule(
        &self,
        booking_id: Uuid,
        scheduled_date: chrono::NaiveDate,
        scheduled_time: chrono::NaiveTime,
    ) -> Result<Booking, AppError> {
        if scheduled_date < Utc::now().date_naive() {
            return Err(AppError::BadRequest(
                "A nova data não pode estar no passado.".to_string(),
            ));
        }

        // Mesmos status de origem do cancelamento: qualquer um não terminal
        let allowed = BookingAction::Cancel.allowed_from_names();
        if let Some(booking) = self
            .booking_repo
            .reschedule(booking_id, scheduled_date, scheduled_time, allowed)
            .await?
        {
            tracing::info!("📆 Reserva {} reagendada para {} {}", booking.id, scheduled_date, scheduled_time);
            return Ok(booking);
        }

        let current = self.find_booking(booking_id).await?;
        Err(AppError::InvalidTransition {
            from: current.status.to_string(),
            action: "reschedule".to_string(),
        })
    }

    pub async fn delete_booking(&self, booking_id: Uuid) -> Result<(), AppError> {
        if self.booking_repo.delete_unless_completed(booking_id).await? {
            tracing::info!("🗑️ Reserva {} removida", booking_id);
            return Ok(());
        }

        let current = self.find_booking(booking_id).await?;
        Err(AppError::Conflict(format!(
            "Reservas com status '{}' não podem ser removidas.",
            current.status
        )))
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn get_booking(&self, actor: &Actor, booking_id: Uuid) -> Result<BookingDetail, AppError> {
        let booking = self.find_booking(booking_id).await?;

        let visible = match actor.role {
            UserRole::Admin => true,
            UserRole::Customer => booking.customer_id == actor.id,
            // Reserva livre pendente também aparece para quem pode aceitá-la
            UserRole::Provider => {
                booking.provider_id == Some(actor.id)
                    || (booking.provider_id.is_none() && booking.status == BookingStatus::Pending)
            }
        };
        if !visible {
            return Err(AppError::Forbidden("Você não tem acesso a esta reserva.".to_string()));
        }

        let services = self.booking_repo.list_services(&self.pool, booking.id).await?;
        Ok(BookingDetail { booking, services })
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Booking>, AppError> {
        self.booking_repo.list_for_customer(customer_id).await
    }

    pub async fn list_for_provider(
        &self,
        provider_id: Uuid,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, AppError> {
        self.booking_repo.list_for_provider(provider_id, status).await
    }

    pub async fn list_all(&self, status: Option<BookingStatus>) -> Result<Vec<Booking>, AppError> {
        self.booking_repo.list_all(status).await
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Booking, AppError> {
        self.booking_repo
            .find_by_id(&self.pool, booking_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Reserva".to_string()))
    }
}

fn provider_guard(actor: &Actor) -> TransitionGuard {
    if actor.is_admin() {
        TransitionGuard::Admin
    } else {
        TransitionGuard::Provider(actor.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: AppError) -> StatusCode {
        err.status_code()
    }

    #[test]
    fn losing_a_double_accept_is_a_conflict() {
        // O vencedor já gravou accepted + o próprio id
        let winner = Uuid::new_v4();
        let loser = Uuid::new_v4();

        let err = classify_failure(
            BookingAction::Accept,
            TransitionGuard::Provider(loser),
            BookingStatus::Accepted,
            Some(winner),
            Uuid::new_v4(),
        );
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn wrong_provider_on_valid_status_is_forbidden() {
        let err = classify_failure(
            BookingAction::Start,
            TransitionGuard::Provider(Uuid::new_v4()),
            BookingStatus::Accepted,
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
        );
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[test]
    fn another_customer_cannot_cancel() {
        let err = classify_failure(
            BookingAction::Cancel,
            TransitionGuard::Customer(Uuid::new_v4()),
            BookingStatus::Pending,
            None,
            Uuid::new_v4(),
        );
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[test]
    fn customer_cancel_after_start_is_a_conflict() {
        let customer = Uuid::new_v4();
        let err = classify_failure(
            BookingAction::Cancel,
            TransitionGuard::Customer(customer),
            BookingStatus::InProgress,
            Some(Uuid::new_v4()),
            customer,
        );
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn stranger_does_not_learn_the_status() {
        let err = classify_failure(
            BookingAction::Cancel,
            TransitionGuard::Customer(Uuid::new_v4()),
            BookingStatus::InProgress,
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
        );
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);

        let err = classify_failure(
            BookingAction::Complete,
            TransitionGuard::Provider(Uuid::new_v4()),
            BookingStatus::Completed,
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
        );
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[test]
    fn completing_twice_is_a_conflict() {
        let provider = Uuid::new_v4();
        let err = classify_failure(
            BookingAction::Complete,
            TransitionGuard::Provider(provider),
            BookingStatus::Completed,
            Some(provider),
            Uuid::new_v4(),
        );
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn admin_acts_as_any_provider() {
        let admin = Actor { id: Uuid::new_v4(), role: UserRole::Admin };
        let provider = Actor { id: Uuid::new_v4(), role: UserRole::Provider };
        assert_eq!(provider_guard(&admin), TransitionGuard::Admin);
        assert_eq!(provider_guard(&provider), TransitionGuard::Provider(provider.id));
    }
}
