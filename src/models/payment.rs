// src/models/payment.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::transition::StatusAction,
    models::booking::{PaymentMethod, PaymentStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "withdrawal_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Requested,
    Processing,
    Completed,
    Failed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Requested => "requested",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    /// Saques nestes status reservam o valor do saldo do prestador.
    /// Recusados e falhos devolvem o valor.
    pub fn holds_funds(&self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Requested | WithdrawalStatus::Processing | WithdrawalStatus::Completed
        )
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// requested -> processing -> completed | failed; requested -> rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalAction {
    Approve,
    Complete,
    Fail,
    Reject,
}

impl StatusAction for WithdrawalAction {
    type Status = WithdrawalStatus;

    fn name(&self) -> &'static str {
        match self {
            WithdrawalAction::Approve => "approve",
            WithdrawalAction::Complete => "complete",
            WithdrawalAction::Fail => "fail",
            WithdrawalAction::Reject => "reject",
        }
    }

    fn allowed_from(&self) -> &'static [WithdrawalStatus] {
        match self {
            WithdrawalAction::Approve | WithdrawalAction::Reject => &[WithdrawalStatus::Requested],
            WithdrawalAction::Complete | WithdrawalAction::Fail => &[WithdrawalStatus::Processing],
        }
    }

    fn target(&self) -> WithdrawalStatus {
        match self {
            WithdrawalAction::Approve => WithdrawalStatus::Processing,
            WithdrawalAction::Complete => WithdrawalStatus::Completed,
            WithdrawalAction::Fail => WithdrawalStatus::Failed,
            WithdrawalAction::Reject => WithdrawalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payout_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    Upi,
}

// Registro de saque (PaymentRecord)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: Uuid,
    pub provider_id: Uuid,
    #[schema(example = "200.00")]
    pub amount: Decimal,
    pub net_amount: Decimal,
    pub payment_method: PayoutMethod,
    pub payout_details: Option<String>,
    pub status: WithdrawalStatus,
    pub transaction_reference: Option<String>,
    /// Motivo da recusa ou da falha
    pub remarks: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Linhas mínimas para o cálculo do saldo
#[derive(Debug, Clone, FromRow)]
pub struct LedgerInvoiceRow {
    pub net_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, FromRow)]
pub struct LedgerWithdrawalRow {
    pub amount: Decimal,
    pub status: WithdrawalStatus,
}

/// Extrato de ganhos do prestador.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    /// Soma do líquido das faturas pagas em dinheiro
    pub total_earnings: Decimal,
    /// Saques concluídos
    pub withdrawn_amount: Decimal,
    /// Saques solicitados ou em processamento
    pub pending_amount: Decimal,
    pub available_balance: Decimal,
}

impl EarningsSummary {
    pub fn from_records(invoices: &[LedgerInvoiceRow], withdrawals: &[LedgerWithdrawalRow]) -> Self {
        let total_earnings: Decimal = invoices
            .iter()
            .filter(|i| i.payment_status == PaymentStatus::Paid && i.payment_method == PaymentMethod::Cash)
            .map(|i| i.net_amount)
            .sum();

        let withdrawn_amount: Decimal = withdrawals
            .iter()
            .filter(|w| w.status == WithdrawalStatus::Completed)
            .map(|w| w.amount)
            .sum();

        let pending_amount: Decimal = withdrawals
            .iter()
            .filter(|w| w.status.holds_funds() && w.status != WithdrawalStatus::Completed)
            .map(|w| w.amount)
            .sum();

        Self {
            total_earnings,
            withdrawn_amount,
            pending_amount,
            available_balance: total_earnings - withdrawn_amount - pending_amount,
        }
    }
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequestPayload {
    #[schema(example = "200.00")]
    pub amount: Decimal,
    pub payment_method: PayoutMethod,
    #[validate(length(max = 255))]
    #[schema(example = "prestador@upi")]
    pub payout_details: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveWithdrawalPayload {
    #[validate(length(min = 3, max = 120))]
    pub transaction_reference: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteWithdrawalPayload {
    #[validate(length(min = 3, max = 120, message = "Informe a referência da transação."))]
    pub transaction_reference: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct WithdrawalReasonPayload {
    #[validate(length(min = 3, message = "Informe o motivo."))]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WithdrawalListQuery {
    pub status: Option<WithdrawalStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn invoice(net: &str, status: PaymentStatus, method: PaymentMethod) -> LedgerInvoiceRow {
        LedgerInvoiceRow { net_amount: d(net), payment_status: status, payment_method: method }
    }

    fn withdrawal(amount: &str, status: WithdrawalStatus) -> LedgerWithdrawalRow {
        LedgerWithdrawalRow { amount: d(amount), status }
    }

    #[test]
    fn available_balance_from_paid_cash_invoices() {
        let invoices = vec![
            invoice("500", PaymentStatus::Paid, PaymentMethod::Cash),
            invoice("300", PaymentStatus::Paid, PaymentMethod::Cash),
        ];
        let withdrawals = vec![withdrawal("200", WithdrawalStatus::Completed)];

        let summary = EarningsSummary::from_records(&invoices, &withdrawals);
        assert_eq!(summary.total_earnings, d("800"));
        assert_eq!(summary.withdrawn_amount, d("200"));
        assert_eq!(summary.available_balance, d("600"));
    }

    #[test]
    fn unpaid_and_online_invoices_do_not_count() {
        let invoices = vec![
            invoice("500", PaymentStatus::Paid, PaymentMethod::Cash),
            invoice("100", PaymentStatus::Pending, PaymentMethod::Cash),
            invoice("250", PaymentStatus::Paid, PaymentMethod::Online),
        ];
        let summary = EarningsSummary::from_records(&invoices, &[]);
        assert_eq!(summary.available_balance, d("500"));
    }

    #[test]
    fn rejected_and_failed_withdrawals_release_funds() {
        let invoices = vec![invoice("1000", PaymentStatus::Paid, PaymentMethod::Cash)];
        let withdrawals = vec![
            withdrawal("100", WithdrawalStatus::Requested),
            withdrawal("150", WithdrawalStatus::Processing),
            withdrawal("300", WithdrawalStatus::Rejected),
            withdrawal("400", WithdrawalStatus::Failed),
        ];
        let summary = EarningsSummary::from_records(&invoices, &withdrawals);
        assert_eq!(summary.pending_amount, d("250"));
        assert_eq!(summary.available_balance, d("750"));
    }

    #[test]
    fn settled_withdrawals_cannot_be_reprocessed() {
        for status in [WithdrawalStatus::Rejected, WithdrawalStatus::Completed, WithdrawalStatus::Failed] {
            assert!(WithdrawalAction::Approve.apply(status).is_err());
            assert!(WithdrawalAction::Reject.apply(status).is_err());
        }
        assert!(WithdrawalAction::Approve.apply(WithdrawalStatus::Processing).is_err());
    }

    #[test]
    fn approval_flow() {
        let status = WithdrawalAction::Approve.apply(WithdrawalStatus::Requested).unwrap();
        assert_eq!(status, WithdrawalStatus::Processing);
        assert_eq!(WithdrawalAction::Complete.apply(status).unwrap(), WithdrawalStatus::Completed);
        assert_eq!(WithdrawalAction::Fail.apply(status).unwrap(), WithdrawalStatus::Failed);
        assert!(WithdrawalAction::Complete.apply(WithdrawalStatus::Requested).is_err());
    }
}
