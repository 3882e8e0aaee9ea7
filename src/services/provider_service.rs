// src/services/provider_service.rs

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::ensure_storable},
    db::ProviderRepository,
    models::provider::{CommissionRule, CommissionType, ProviderProfile, ProviderSummary},
};

pub fn validate_commission(rule: CommissionRule) -> Result<(), AppError> {
    ensure_storable(rule.rate, "rate")?;
    if rule.rate < Decimal::ZERO {
        return Err(AppError::BadRequest("A comissão não pode ser negativa.".to_string()));
    }
    if rule.kind == CommissionType::Percentage && rule.rate > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(
            "A comissão percentual não pode passar de 100%.".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ProviderService {
    repo: ProviderRepository,
}

impl ProviderService {
    pub fn new(repo: ProviderRepository) -> Self {
        Self { repo }
    }

    pub async fn list_providers(&self) -> Result<Vec<ProviderSummary>, AppError> {
        self.repo.list_providers().await
    }

    // Vale para as próximas faturas; as já emitidas guardam a regra da época
    pub async fn update_commission(&self, provider_id: Uuid, rule: CommissionRule) -> Result<ProviderProfile, AppError> {
        validate_commission(rule)?;

        let profile = self
            .repo
            .update_commission(provider_id, rule)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Prestador".to_string()))?;

        tracing::info!(
            "⚙️ Comissão do prestador {} alterada para {:?} {}",
            provider_id,
            rule.kind,
            rule.rate
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn percentage_is_capped_at_one_hundred() {
        assert!(validate_commission(CommissionRule::percentage(d("100"))).is_ok());
        assert!(validate_commission(CommissionRule::percentage(d("100.01"))).is_err());
    }

    #[test]
    fn flat_amount_may_exceed_one_hundred() {
        assert!(validate_commission(CommissionRule::flat(d("250"))).is_ok());
    }

    #[test]
    fn negative_rates_are_rejected() {
        assert!(validate_commission(CommissionRule::percentage(d("-1"))).is_err());
        assert!(validate_commission(CommissionRule::flat(d("-1"))).is_err());
    }
}
