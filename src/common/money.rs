// src/common/money.rs

use rust_decimal::{Decimal, RoundingStrategy};

use crate::common::error::AppError;

/// Limite exclusivo das colunas `NUMERIC(12, 2)`.
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Arredonda um valor monetário para 2 casas (meio para longe do zero).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Aplica uma porcentagem (ex.: 18 => 18%) e arredonda.
pub fn percent_of(value: Decimal, rate: Decimal) -> Decimal {
    round_money(value * rate / Decimal::ONE_HUNDRED)
}

/// Recusa valores que não cabem em `NUMERIC(12, 2)`.
pub fn ensure_storable(value: Decimal, field: &str) -> Result<Decimal, AppError> {
    if value.abs() >= MONEY_LIMIT {
        return Err(AppError::BadRequest(format!(
            "O campo '{}' deve ser menor que {}.",
            field, MONEY_LIMIT
        )));
    }
    Ok(value)
}

/// `quantidade x valor` sem estourar, já arredondado.
pub fn checked_product(quantity: Decimal, rate: Decimal, field: &str) -> Result<Decimal, AppError> {
    let total = quantity
        .checked_mul(rate)
        .ok_or_else(|| AppError::BadRequest(format!("O valor de '{}' é grande demais.", field)))?;
    ensure_storable(round_money(total), field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(d("10.005")), d("10.01"));
        assert_eq!(round_money(d("10.004")), d("10.00"));
        assert_eq!(round_money(d("-2.345")), d("-2.35"));
    }

    #[test]
    fn percent_of_total() {
        assert_eq!(percent_of(d("180"), d("18")), d("32.40"));
        assert_eq!(percent_of(d("99.99"), d("10")), d("10.00"));
    }

    #[test]
    fn column_limit_is_ten_billion() {
        assert_eq!(MONEY_LIMIT, d("10000000000"));
        assert!(ensure_storable(d("9999999999.99"), "rate").is_ok());
        assert!(matches!(ensure_storable(d("10000000000"), "rate"), Err(AppError::BadRequest(_))));
        assert!(matches!(ensure_storable(d("-10000000000"), "rate"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn multiplication_overflow_is_a_bad_request() {
        let huge = Decimal::MAX;
        assert!(matches!(checked_product(huge, d("2"), "total"), Err(AppError::BadRequest(_))));
        assert_eq!(checked_product(d("1.5"), d("40"), "total").unwrap(), d("60.00"));
    }
}
