// src/services/payment_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::ensure_storable, transition::StatusAction},
    db::{InvoiceRepository, PaymentRepository, ProviderRepository},
    models::payment::{
        EarningsSummary, Withdrawal, WithdrawalAction, WithdrawalRequestPayload, WithdrawalStatus,
    },
};

// Saldo suficiente para o saque?
fn ensure_withdrawable(amount: Decimal, available: Decimal) -> Result<(), AppError> {
    ensure_storable(amount, "amount")?;
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest("O valor do saque deve ser positivo.".to_string()));
    }
    if amount > available {
        return Err(AppError::Conflict(format!(
            "Saldo insuficiente: disponível {}, solicitado {}.",
            available, amount
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    payment_repo: PaymentRepository,
    invoice_repo: InvoiceRepository,
    provider_repo: ProviderRepository,
}

impl PaymentService {
    pub fn new(
        pool: PgPool,
        payment_repo: PaymentRepository,
        invoice_repo: InvoiceRepository,
        provider_repo: ProviderRepository,
    ) -> Self {
        Self { pool, payment_repo, invoice_repo, provider_repo }
    }

    pub async fn earnings(&self, provider_id: Uuid) -> Result<EarningsSummary, AppError> {
        let invoices = self.invoice_repo.ledger_rows(&self.pool, provider_id).await?;
        let withdrawals = self.payment_repo.ledger_rows(&self.pool, provider_id).await?;
        Ok(EarningsSummary::from_records(&invoices, &withdrawals))
    }

    /// Pedido de saque. A linha do prestador fica travada até o commit,
    /// então dois pedidos simultâneos não passam do saldo.
    pub async fn request_withdrawal(
        &self,
        provider_id: Uuid,
        payload: &WithdrawalRequestPayload,
    ) -> Result<Withdrawal, AppError> {
        let mut tx = self.pool.begin().await?;

        self.provider_repo
            .lock_profile(&mut *tx, provider_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Perfil do prestador".to_string()))?;

        let invoices = self.invoice_repo.ledger_rows(&mut *tx, provider_id).await?;
        let withdrawals = self.payment_repo.ledger_rows(&mut *tx, provider_id).await?;
        let summary = EarningsSummary::from_records(&invoices, &withdrawals);

        ensure_withdrawable(payload.amount, summary.available_balance)?;

        let withdrawal = self
            .payment_repo
            .create_withdrawal(
                &mut *tx,
                provider_id,
                payload.amount,
                payload.payment_method,
                payload.payout_details.as_deref(),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "💸 Saque {} de {} solicitado pelo prestador {}",
            withdrawal.id,
            withdrawal.amount,
            provider_id
        );
        Ok(withdrawal)
    }

    pub async fn list_for_provider(&self, provider_id: Uuid) -> Result<Vec<Withdrawal>, AppError> {
        self.payment_repo.list_for_provider(provider_id).await
    }

    pub async fn list_requests(&self, status: Option<WithdrawalStatus>) -> Result<Vec<Withdrawal>, AppError> {
        self.payment_repo.list_all(status).await
    }

    // =========================================================================
    //  ADMIN
    // =========================================================================

    /// Aprova o saque. Com a referência da transação, já conclui na mesma transação.
    pub async fn approve(
        &self,
        withdrawal_id: Uuid,
        transaction_reference: Option<&str>,
    ) -> Result<Withdrawal, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut withdrawal = self
            .transition(&mut tx, withdrawal_id, WithdrawalAction::Approve, None, None)
            .await?;

        if let Some(reference) = transaction_reference {
            withdrawal = self
                .transition(&mut tx, withdrawal_id, WithdrawalAction::Complete, Some(reference), None)
                .await?;
        }

        tx.commit().await?;

        tracing::info!("🏦 Saque {} aprovado ({})", withdrawal.id, withdrawal.status);
        Ok(withdrawal)
    }

    pub async fn complete(&self, withdrawal_id: Uuid, transaction_reference: &str) -> Result<Withdrawal, AppError> {
        let mut tx = self.pool.begin().await?;
        let withdrawal = self
            .transition(
                &mut tx,
                withdrawal_id,
                WithdrawalAction::Complete,
                Some(transaction_reference),
                None,
            )
            .await?;
        tx.commit().await?;

        tracing::info!("🏦 Saque {} concluído", withdrawal.id);
        Ok(withdrawal)
    }

    pub async fn fail(&self, withdrawal_id: Uuid, reason: &str) -> Result<Withdrawal, AppError> {
        let mut tx = self.pool.begin().await?;
        let withdrawal = self
            .transition(&mut tx, withdrawal_id, WithdrawalAction::Fail, None, Some(reason))
            .await?;
        tx.commit().await?;

        tracing::warn!("⚠️ Saque {} falhou: {}", withdrawal.id, reason);
        Ok(withdrawal)
    }

    pub async fn reject(&self, withdrawal_id: Uuid, reason: &str) -> Result<Withdrawal, AppError> {
        let mut tx = self.pool.begin().await?;
        let withdrawal = self
            .transition(&mut tx, withdrawal_id, WithdrawalAction::Reject, None, Some(reason))
            .await?;
        tx.commit().await?;

        tracing::info!("🚫 Saque {} recusado", withdrawal.id);
        Ok(withdrawal)
    }

    async fn transition(
        &self,
        conn: &mut sqlx::PgConnection,
        withdrawal_id: Uuid,
        action: WithdrawalAction,
        transaction_reference: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<Withdrawal, AppError> {
        if let Some(withdrawal) = self
            .payment_repo
            .apply_transition(&mut *conn, withdrawal_id, action, transaction_reference, remarks)
            .await?
        {
            return Ok(withdrawal);
        }

        let current = self
            .payment_repo
            .find_by_id(&mut *conn, withdrawal_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Saque".to_string()))?;

        // Já liquidado ou fora de ordem
        Err(action.apply(current.status).err().unwrap_or_else(|| {
            AppError::Conflict("O saque foi alterado por outra requisição.".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn withdrawal_within_balance_is_accepted() {
        assert!(ensure_withdrawable(d("600"), d("600")).is_ok());
        assert!(ensure_withdrawable(d("0.01"), d("600")).is_ok());
    }

    #[test]
    fn overdraw_is_a_conflict() {
        assert!(matches!(ensure_withdrawable(d("600.01"), d("600")), Err(AppError::Conflict(_))));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        assert!(matches!(ensure_withdrawable(d("0"), d("600")), Err(AppError::BadRequest(_))));
        assert!(matches!(ensure_withdrawable(d("-5"), d("600")), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn amount_beyond_column_is_a_bad_request() {
        assert!(matches!(
            ensure_withdrawable(d("10000000000"), d("600")),
            Err(AppError::BadRequest(_))
        ));
    }
}
