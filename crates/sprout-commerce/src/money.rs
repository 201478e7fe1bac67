//! Money type for representing monetary values.
//!
//! Stored amounts are integers in the currency's minor unit. Anything
//! derived from a rate (percentage discounts, tax) is computed with
//! [`Decimal`] and only brought back to minor units through
//! [`round_half_up`].

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    CAD,
    EUR,
    GBP,
}

impl Currency {
    /// Get the currency code (e.g., "USD").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::CAD => "CAD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }

    /// Get the currency symbol (e.g., "$").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::CAD => "CA$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
        }
    }

    /// Number of decimal places in the minor unit.
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "CAD" => Some(Currency::CAD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Round to `dp` decimal places, halves going up.
///
/// All amounts in this crate are non-negative, so away-from-zero and
/// half-up agree.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// A monetary value with currency, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in smallest currency unit (e.g., cents).
    pub amount_cents: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from cents.
    pub fn new(amount_cents: i64, currency: Currency) -> Self {
        Self {
            amount_cents,
            currency,
        }
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Create a Money value from a decimal amount in major units,
    /// rounding half-up to the minor unit.
    ///
    /// Returns `None` if the amount does not fit in an `i64` of cents.
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use sprout_commerce::money::{Currency, Money};
    ///
    /// let tax = Money::from_decimal(Decimal::new(10794, 4), Currency::USD).unwrap();
    /// assert_eq!(tax.amount_cents, 108);
    /// ```
    pub fn from_decimal(amount: Decimal, currency: Currency) -> Option<Self> {
        let places = currency.decimal_places();
        let scaled = round_half_up(amount, places).checked_mul(Decimal::from(10_i64.pow(places)))?;
        Some(Self::new(scaled.to_i64()?, currency))
    }

    /// Convert to a decimal value in major units.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount_cents, self.currency.decimal_places())
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_cents == 0
    }

    /// Check if this is positive.
    pub fn is_positive(&self) -> bool {
        self.amount_cents > 0
    }

    /// Format as a display string (e.g., "$49.99").
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.to_decimal())
    }

    /// Format as a display string without symbol (e.g., "49.99").
    pub fn display_amount(&self) -> String {
        self.to_decimal().to_string()
    }

    /// Add another Money value, returning `None` on currency mismatch or overflow.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        let amount = self.amount_cents.checked_add(other.amount_cents)?;
        Some(Money::new(amount, self.currency))
    }

    /// Subtract another Money value, returning `None` on currency mismatch or overflow.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        let amount = self.amount_cents.checked_sub(other.amount_cents)?;
        Some(Money::new(amount, self.currency))
    }

    /// Multiply by a quantity, returning `None` on overflow.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        let amount = self.amount_cents.checked_mul(factor)?;
        Some(Money::new(amount, self.currency))
    }

    /// Sum Money values that all share `currency`.
    pub fn try_sum<'a>(mut iter: impl Iterator<Item = &'a Money>, currency: Currency) -> Option<Money> {
        iter.try_fold(Money::zero(currency), |acc, m| acc.try_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_decimal_rounds_half_up() {
        let m = Money::from_decimal(Decimal::new(19485, 4), Currency::USD).unwrap();
        assert_eq!(m.amount_cents, 195);

        let m = Money::from_decimal(Decimal::new(1005, 3), Currency::USD).unwrap();
        assert_eq!(m.amount_cents, 101);

        let m = Money::from_decimal(Decimal::new(1004, 3), Currency::USD).unwrap();
        assert_eq!(m.amount_cents, 100);
    }

    #[test]
    fn test_money_to_decimal() {
        let m = Money::new(1299, Currency::USD);
        assert_eq!(m.to_decimal(), Decimal::new(1299, 2));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(4999, Currency::USD).display(), "$49.99");
        assert_eq!(Money::new(1000, Currency::USD).display(), "$10.00");
        assert_eq!(Money::new(5, Currency::GBP).display_amount(), "0.05");
    }

    #[test]
    fn test_money_checked_arithmetic() {
        let a = Money::new(1000, Currency::USD);
        let b = Money::new(300, Currency::USD);
        assert_eq!(a.try_add(&b).unwrap().amount_cents, 1300);
        assert_eq!(a.try_subtract(&b).unwrap().amount_cents, 700);
        assert_eq!(a.try_multiply(3).unwrap().amount_cents, 3000);
        assert!(Money::new(i64::MAX, Currency::USD).try_multiply(2).is_none());
    }

    #[test]
    fn test_money_currency_mismatch() {
        let usd = Money::new(1000, Currency::USD);
        let eur = Money::new(1000, Currency::EUR);
        assert!(usd.try_add(&eur).is_none());
    }

    #[test]
    fn test_money_sum() {
        let values = [Money::new(1299, Currency::USD), Money::new(2598, Currency::USD)];
        let sum = Money::try_sum(values.iter(), Currency::USD).unwrap();
        assert_eq!(sum.amount_cents, 3897);
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_code("eur"), Some(Currency::EUR));
        assert_eq!(Currency::from_code("INVALID"), None);
    }
}
