use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

use super::currency::Currency;
use super::DomainError;

/// Largest magnitude a `NUMERIC(19,4)` money column holds: 999,999,999,999,999.9999.
pub const MAX_STORED_AMOUNT: Decimal = Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, 4);

/// An amount in a specific currency.
///
/// Arithmetic and comparisons between two `Money` values require the same
/// currency and fail with [`DomainError::CurrencyMismatch`] otherwise; nothing
/// is ever converted implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn from_code(amount: Decimal, code: &str) -> Result<Self, DomainError> {
        Ok(Self::new(amount, Currency::from_code(code)?))
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(other)?;
        let amount = self.amount.checked_add(other.amount).ok_or(DomainError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(other)?;
        let amount = self.amount.checked_sub(other.amount).ok_or(DomainError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    pub fn checked_div(&self, divisor: Decimal) -> Result<Money, DomainError> {
        if divisor.is_zero() {
            return Err(DomainError::DivideByZero);
        }
        let amount = self.amount.checked_div(divisor).ok_or(DomainError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Scale by a factor such as an FX rate, failing instead of overflowing.
    pub fn checked_mul(&self, factor: Decimal) -> Result<Money, DomainError> {
        self.amount
            .checked_mul(factor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or(DomainError::Overflow)
    }

    /// Fails when the amount would not fit a money column.
    pub fn ensure_storable(&self) -> Result<(), DomainError> {
        if self.amount.abs() > MAX_STORED_AMOUNT {
            return Err(DomainError::Overflow);
        }
        Ok(())
    }

    /// Ordering between two amounts of the same currency.
    pub fn try_cmp(&self, other: &Money) -> Result<Ordering, DomainError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    pub fn abs(&self) -> Money {
        Money::new(self.amount.abs(), self.currency)
    }

    /// Round with midpoint away from zero (2.345 -> 2.35, -2.345 -> -2.35).
    pub fn round(&self, decimals: u32) -> Money {
        Money::new(
            self.amount
                .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero),
            self.currency,
        )
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Sum amounts that must all share `currency`.
    pub fn sum<'a, I>(currency: Currency, items: I) -> Result<Money, DomainError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money::new(-self.amount, self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let text = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(
            f,
            "{}{}.{} {}",
            if negative { "-" } else { "" },
            grouped,
            frac_part,
            self.currency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn adds_and_subtracts_same_currency() {
        let a = Money::new(dec!(10.50), Currency::USD);
        let b = Money::new(dec!(2.25), Currency::USD);
        assert_eq!(a.checked_add(&b).unwrap().amount, dec!(12.75));
        assert_eq!(a.checked_sub(&b).unwrap().amount, dec!(8.25));
    }

    #[test]
    fn mismatched_currencies_fail() {
        let usd = Money::new(dec!(1), Currency::USD);
        let zar = Money::new(dec!(1), Currency::ZAR);
        assert!(matches!(
            usd.checked_add(&zar),
            Err(DomainError::CurrencyMismatch { left: Currency::USD, right: Currency::ZAR })
        ));
        assert!(usd.checked_sub(&zar).is_err());
        assert!(usd.try_cmp(&zar).is_err());
        assert!(Money::sum(Currency::USD, [usd, zar].iter()).is_err());
    }

    #[test]
    fn divide_by_zero_fails() {
        let m = Money::new(dec!(5), Currency::EUR);
        assert!(matches!(m.checked_div(Decimal::ZERO), Err(DomainError::DivideByZero)));
        assert_eq!(m.checked_div(dec!(2)).unwrap().amount, dec!(2.5));
    }

    #[test]
    fn scalar_ops_keep_currency() {
        let m = Money::new(dec!(3), Currency::GBP);
        assert_eq!(m.checked_mul(dec!(2)).unwrap().amount, dec!(6));
        assert_eq!(m.checked_mul(dec!(2)).unwrap().currency, Currency::GBP);
        assert_eq!((-m).amount, dec!(-3));
        assert!((-m).is_negative());
        assert_eq!((-m).abs(), m);
        assert!(Money::zero(Currency::GBP).is_zero());
    }

    #[test]
    fn rounds_midpoint_away_from_zero() {
        assert_eq!(Money::new(dec!(2.345), Currency::USD).round(2).amount, dec!(2.35));
        assert_eq!(Money::new(dec!(-2.345), Currency::USD).round(2).amount, dec!(-2.35));
    }

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::new(dec!(1234.5), Currency::USD).to_string(), "1,234.50 USD");
        assert_eq!(Money::new(dec!(-1234567.891), Currency::ZAR).to_string(), "-1,234,567.89 ZAR");
        assert_eq!(Money::new(dec!(0), Currency::EUR).to_string(), "0.00 EUR");
    }

    #[test]
    fn compares_same_currency() {
        let a = Money::new(dec!(1), Currency::USD);
        let b = Money::new(dec!(2), Currency::USD);
        assert_eq!(a.try_cmp(&b).unwrap(), Ordering::Less);
    }

    #[test]
    fn oversized_products_fail_instead_of_panicking() {
        let huge = Money::new(dec!(79000000000000000000000000000), Currency::USD);
        assert_eq!(huge.checked_mul(dec!(18.5)), Err(DomainError::Overflow));
        assert_eq!(huge.ensure_storable(), Err(DomainError::Overflow));
        assert_eq!(huge.checked_add(&huge), Err(DomainError::Overflow));
        assert_eq!((-huge).checked_sub(&huge), Err(DomainError::Overflow));
    }

    #[test]
    fn storable_bound_matches_the_money_column() {
        assert_eq!(MAX_STORED_AMOUNT, dec!(999999999999999.9999));
        assert!(Money::new(MAX_STORED_AMOUNT, Currency::ZAR).ensure_storable().is_ok());
        assert!(Money::new(-MAX_STORED_AMOUNT, Currency::ZAR).ensure_storable().is_ok());
        assert!(Money::new(dec!(1000000000000000), Currency::ZAR).ensure_storable().is_err());
    }
}
