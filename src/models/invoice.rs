// src/models/invoice.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    booking::{BookingServiceLine, PaymentMethod, PaymentStatus},
    provider::{CommissionRule, CommissionType},
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub customer_name: String,
    pub provider_name: String,
    #[schema(example = "180.00")]
    pub service_amount: Decimal,
    pub products_total: Decimal,
    #[schema(example = "18.00")]
    pub tax_rate: Decimal,
    #[schema(example = "32.40")]
    pub tax: Decimal,
    pub discount: Decimal,
    #[schema(example = "212.40")]
    pub total_amount: Decimal,
    pub advance_payment: Decimal,
    pub balance_due: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub commission_type: CommissionType,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub net_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn commission_rule(&self) -> CommissionRule {
        CommissionRule { kind: self.commission_type, rate: self.commission_rate }
    }
}

// Produto usado no atendimento (quantidade x valor unitário)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceProduct {
    pub id: Uuid,
    pub invoice_id: Uuid,
    #[schema(example = "Gás refrigerante R410")]
    pub name: String,
    #[schema(example = "1.5")]
    pub quantity: Decimal,
    #[schema(example = "40.00")]
    pub rate: Decimal,
    #[schema(example = "60.00")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub services: Vec<BookingServiceLine>,
    pub products: Vec<InvoiceProduct>,
}

/// Valores calculados de uma fatura, prontos para gravar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub service_amount: Decimal,
    pub products_total: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub advance_payment: Decimal,
    pub balance_due: Decimal,
    pub commission_amount: Decimal,
    pub net_amount: Decimal,
}

// Dados para inserir a fatura de uma reserva concluída
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub customer_name: String,
    pub provider_name: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub commission: CommissionRule,
    pub totals: InvoiceTotals,
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProductLineInput {
    #[validate(length(min = 1, message = "O nome do produto é obrigatório."))]
    pub name: String,
    #[schema(example = "2")]
    pub quantity: Decimal,
    #[schema(example = "35.00")]
    pub rate: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReplaceProductsPayload {
    #[validate(nested)]
    pub products: Vec<ProductLineInput>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoicePaymentPayload {
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub advance_payment: Option<Decimal>,
    pub discount: Option<Decimal>,
}
