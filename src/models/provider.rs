// src/models/provider.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::money::{percent_of, round_money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "commission_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommissionType {
    Percentage,
    Flat,
}

/// A taxa base de comissão configurada para um prestador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionRule {
    pub kind: CommissionType,
    pub rate: Decimal,
}

impl CommissionRule {
    pub fn percentage(rate: Decimal) -> Self {
        Self { kind: CommissionType::Percentage, rate }
    }

    pub fn flat(amount: Decimal) -> Self {
        Self { kind: CommissionType::Flat, rate: amount }
    }

    /// Comissão da plataforma sobre o total. Uma taxa fixa nunca passa do total.
    pub fn commission_on(&self, total: Decimal) -> Decimal {
        if total <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match self.kind {
            CommissionType::Percentage => percent_of(total, self.rate),
            CommissionType::Flat => round_money(self.rate.min(total)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    pub user_id: Uuid,
    pub commission_type: CommissionType,
    #[schema(example = "10.00")]
    pub commission_rate: Decimal,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderProfile {
    pub fn commission_rule(&self) -> CommissionRule {
        CommissionRule { kind: self.commission_type, rate: self.commission_rate }
    }
}

// Prestador + configuração de comissão (listagem do admin)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub commission_type: CommissionType,
    pub commission_rate: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommissionPayload {
    pub commission_type: CommissionType,
    #[schema(example = "12.5")]
    pub commission_rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn percentage_commission_is_rounded() {
        let rule = CommissionRule::percentage(d("10"));
        assert_eq!(rule.commission_on(d("212.40")), d("21.24"));
        assert_eq!(rule.commission_on(d("33.35")), d("3.34"));
    }

    #[test]
    fn flat_commission_is_capped_by_total() {
        let rule = CommissionRule::flat(d("50"));
        assert_eq!(rule.commission_on(d("212.40")), d("50"));
        assert_eq!(rule.commission_on(d("30")), d("30"));
    }

    #[test]
    fn no_commission_on_zero_total() {
        assert_eq!(CommissionRule::percentage(d("10")).commission_on(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(CommissionRule::flat(d("10")).commission_on(Decimal::ZERO), Decimal::ZERO);
    }
}
