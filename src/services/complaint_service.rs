// src/services/complaint_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, transition::StatusAction},
    db::{BookingRepository, ComplaintRepository},
    models::{
        auth::{Actor, UserRole},
        complaint::{Complaint, ComplaintAction, ComplaintDetail, ComplaintStatus, CreateComplaintPayload},
    },
};

// Quem pode disparar cada ação sobre uma reclamação
fn ensure_actor_may(actor: &Actor, action: ComplaintAction, complaint: &Complaint) -> Result<(), AppError> {
    let owner = actor.role == UserRole::Customer && complaint.customer_id == actor.id;
    let allowed = match action {
        ComplaintAction::MarkInProgress | ComplaintAction::Resolve => actor.is_admin(),
        ComplaintAction::Reopen => owner,
        ComplaintAction::Close => actor.is_admin() || owner,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Você não pode executar '{}' nesta reclamação.",
            action.name()
        )))
    }
}

// Texto sem espaços nas pontas, com um mínimo de caracteres
fn trimmed_text<'a>(text: &'a str, min_chars: usize, message: &str) -> Result<&'a str, AppError> {
    let text = text.trim();
    if text.chars().count() < min_chars {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(text)
}

fn is_visible(actor: &Actor, complaint: &Complaint) -> bool {
    match actor.role {
        UserRole::Admin => true,
        UserRole::Customer => complaint.customer_id == actor.id,
        UserRole::Provider => complaint.provider_id == Some(actor.id),
    }
}

#[derive(Clone)]
pub struct ComplaintService {
    pool: PgPool,
    complaint_repo: ComplaintRepository,
    booking_repo: BookingRepository,
}

impl ComplaintService {
    pub fn new(pool: PgPool, complaint_repo: ComplaintRepository, booking_repo: BookingRepository) -> Self {
        Self { pool, complaint_repo, booking_repo }
    }

    pub async fn create_complaint(
        &self,
        customer_id: Uuid,
        payload: &CreateComplaintPayload,
    ) -> Result<ComplaintDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        // A reserva citada precisa ser do cliente; o prestador dela vai junto
        let provider_id = match payload.booking_id {
            Some(booking_id) => {
                let booking = self
                    .booking_repo
                    .find_by_id(&mut *tx, booking_id)
                    .await?
                    .ok_or_else(|| AppError::ResourceNotFound("Reserva".to_string()))?;
                if booking.customer_id != customer_id {
                    return Err(AppError::Forbidden("Esta reserva não pertence a você.".to_string()));
                }
                booking.provider_id
            }
            None => None,
        };

        let complaint = self
            .complaint_repo
            .create_complaint(
                &mut *tx,
                customer_id,
                provider_id,
                payload.booking_id,
                payload.category.trim(),
                payload.subject.trim(),
                payload.description.trim(),
            )
            .await?;

        let entry = self
            .complaint_repo
            .append_history(&mut *tx, complaint.id, ComplaintStatus::Open, None, customer_id)
            .await?;

        tx.commit().await?;

        tracing::info!("📣 Reclamação {} aberta pelo cliente {}", complaint.id, customer_id);

        Ok(ComplaintDetail { complaint, status_history: vec![entry] })
    }

    pub async fn mark_in_progress(
        &self,
        actor: &Actor,
        complaint_id: Uuid,
        note: Option<&str>,
    ) -> Result<ComplaintDetail, AppError> {
        self.transition(actor, complaint_id, ComplaintAction::MarkInProgress, None, None, note)
            .await
    }

    pub async fn resolve(&self, actor: &Actor, complaint_id: Uuid, response: &str) -> Result<ComplaintDetail, AppError> {
        let response = trimmed_text(response, 10, "A resposta deve ter pelo menos 10 caracteres.")?;
        self.transition(actor, complaint_id, ComplaintAction::Resolve, Some(response), None, Some(response))
            .await
    }

    pub async fn reopen(&self, actor: &Actor, complaint_id: Uuid, reason: &str) -> Result<ComplaintDetail, AppError> {
        let reason = trimmed_text(reason, 5, "Informe o motivo da reabertura.")?;
        self.transition(actor, complaint_id, ComplaintAction::Reopen, None, Some(reason), Some(reason))
            .await
    }

    pub async fn close(&self, actor: &Actor, complaint_id: Uuid, note: Option<&str>) -> Result<ComplaintDetail, AppError> {
        self.transition(actor, complaint_id, ComplaintAction::Close, None, None, note)
            .await
    }

    async fn transition(
        &self,
        actor: &Actor,
        complaint_id: Uuid,
        action: ComplaintAction,
        response: Option<&str>,
        reopen_reason: Option<&str>,
        note: Option<&str>,
    ) -> Result<ComplaintDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.find_complaint(&mut tx, complaint_id).await?;
        ensure_actor_may(actor, action, &current)?;
        action.apply(current.status)?;

        let complaint = match self
            .complaint_repo
            .apply_transition(&mut *tx, complaint_id, action, response, reopen_reason)
            .await?
        {
            Some(complaint) => complaint,
            // Outro pedido mudou o status depois da leitura
            None => {
                let latest = self.find_complaint(&mut tx, complaint_id).await?;
                action.apply(latest.status)?;
                return Err(AppError::Conflict(
                    "A reclamação foi alterada por outra requisição.".to_string(),
                ));
            }
        };

        self.complaint_repo
            .append_history(&mut *tx, complaint.id, complaint.status, note, actor.id)
            .await?;
        let status_history = self.complaint_repo.list_history(&mut *tx, complaint.id).await?;

        tx.commit().await?;

        tracing::info!(
            "📣 Reclamação {} -> {} por {}",
            complaint.id,
            complaint.status,
            actor.id
        );

        Ok(ComplaintDetail { complaint, status_history })
    }

    pub async fn get_complaint(&self, actor: &Actor, complaint_id: Uuid) -> Result<ComplaintDetail, AppError> {
        let mut conn = self.pool.acquire().await?;
        let complaint = self.find_complaint(&mut conn, complaint_id).await?;
        if !is_visible(actor, &complaint) {
            return Err(AppError::Forbidden("Você não tem acesso a esta reclamação.".to_string()));
        }
        let status_history = self.complaint_repo.list_history(&mut *conn, complaint.id).await?;
        Ok(ComplaintDetail { complaint, status_history })
    }

    pub async fn list_for_actor(&self, actor: &Actor) -> Result<Vec<Complaint>, AppError> {
        match actor.role {
            UserRole::Customer => self.complaint_repo.list_for_customer(actor.id).await,
            UserRole::Provider => self.complaint_repo.list_for_provider(actor.id).await,
            UserRole::Admin => self.complaint_repo.list_all().await,
        }
    }

    async fn find_complaint(&self, conn: &mut PgConnection, complaint_id: Uuid) -> Result<Complaint, AppError> {
        self.complaint_repo
            .find_by_id(&mut *conn, complaint_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Reclamação".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn complaint(customer_id: Uuid, provider_id: Option<Uuid>) -> Complaint {
        Complaint {
            id: Uuid::new_v4(),
            customer_id,
            provider_id,
            booking_id: None,
            category: "atendimento".into(),
            subject: "Atraso".into(),
            description: "O prestador chegou duas horas atrasado.".into(),
            response: None,
            reopen_reason: None,
            status: ComplaintStatus::Open,
            resolved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn actor(role: UserRole) -> Actor {
        Actor { id: Uuid::new_v4(), role }
    }

    #[test]
    fn blank_reopen_reason_is_rejected() {
        let err = trimmed_text("     ", 5, "Informe o motivo da reabertura.").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(trimmed_text("  ab  ", 5, "Informe o motivo da reabertura.").is_err());
        assert_eq!(trimmed_text("  Voltou a vazar  ", 5, "motivo").unwrap(), "Voltou a vazar");
    }

    #[test]
    fn only_admin_resolves() {
        let owner = actor(UserRole::Customer);
        let c = complaint(owner.id, None);

        assert!(ensure_actor_may(&actor(UserRole::Admin), ComplaintAction::Resolve, &c).is_ok());
        assert!(ensure_actor_may(&owner, ComplaintAction::Resolve, &c).is_err());
        assert!(ensure_actor_may(&actor(UserRole::Provider), ComplaintAction::MarkInProgress, &c).is_err());
    }

    #[test]
    fn only_owner_reopens() {
        let owner = actor(UserRole::Customer);
        let c = complaint(owner.id, None);

        assert!(ensure_actor_may(&owner, ComplaintAction::Reopen, &c).is_ok());
        assert!(ensure_actor_may(&actor(UserRole::Customer), ComplaintAction::Reopen, &c).is_err());
        assert!(ensure_actor_may(&actor(UserRole::Admin), ComplaintAction::Reopen, &c).is_err());
    }

    #[test]
    fn owner_and_admin_close() {
        let owner = actor(UserRole::Customer);
        let c = complaint(owner.id, None);

        assert!(ensure_actor_may(&owner, ComplaintAction::Close, &c).is_ok());
        assert!(ensure_actor_may(&actor(UserRole::Admin), ComplaintAction::Close, &c).is_ok());
        assert!(ensure_actor_may(&actor(UserRole::Provider), ComplaintAction::Close, &c).is_err());
    }

    #[test]
    fn provider_sees_only_complaints_naming_it() {
        let provider = actor(UserRole::Provider);
        let mine = complaint(Uuid::new_v4(), Some(provider.id));
        let other = complaint(Uuid::new_v4(), Some(Uuid::new_v4()));

        assert!(is_visible(&provider, &mine));
        assert!(!is_visible(&provider, &other));
    }
}
