//! Money type for representing monetary values.
//!
//! Amounts are integer minor units (cents). Every arithmetic operation is
//! checked and reports overflow or currency mismatch as a [`CommerceError`].

use crate::error::CommerceError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    INR,
    JPY,
    CAD,
    AUD,
}

impl Currency {
    /// Get the currency code (e.g., "USD").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::INR => "INR",
            Currency::JPY => "JPY",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
        }
    }

    /// Get the currency symbol (e.g., "$").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::INR => "\u{20b9}",
            Currency::JPY => "\u{00a5}",
            Currency::CAD => "CA$",
            Currency::AUD => "A$",
        }
    }

    /// Number of decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Parse a currency code string, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "INR" => Some(Currency::INR),
            "JPY" => Some(Currency::JPY),
            "CAD" => Some(Currency::CAD),
            "AUD" => Some(Currency::AUD),
            _ => None,
        }
    }

    fn minor_per_major(&self) -> i64 {
        10_i64.pow(self.decimal_places())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Amount in smallest currency unit (e.g., cents).
    pub amount_cents: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from cents.
    pub const fn new(amount_cents: i64, currency: Currency) -> Self {
        Self {
            amount_cents,
            currency,
        }
    }

    /// Create a zero amount in the given currency.
    pub const fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Create a Money value from a decimal amount as sent by the backend.
    ///
    /// ```
    /// use greens_commerce::money::{Currency, Money};
    /// let price = Money::from_decimal(49.99, Currency::USD).unwrap();
    /// assert_eq!(price.amount_cents, 4999);
    /// ```
    pub fn from_decimal(amount: f64, currency: Currency) -> Result<Self, CommerceError> {
        let cents = amount * currency.minor_per_major() as f64;
        Ok(Self::new(round_to_cents(cents)?, currency))
    }

    pub fn is_zero(&self) -> bool {
        self.amount_cents == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount_cents > 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount_cents < 0
    }

    /// Convert to a decimal value.
    pub fn to_decimal(&self) -> f64 {
        self.amount_cents as f64 / self.currency.minor_per_major() as f64
    }

    /// Format as a display string (e.g., "$49.99").
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.display_amount())
    }

    /// Format without symbol (e.g., "49.99").
    pub fn display_amount(&self) -> String {
        let places = self.currency.decimal_places() as usize;
        format!("{:.places$}", self.to_decimal())
    }

    /// Add another Money value.
    pub fn try_add(&self, other: &Money) -> Result<Money, CommerceError> {
        self.ensure_same_currency(other)?;
        self.amount_cents
            .checked_add(other.amount_cents)
            .map(|cents| Money::new(cents, self.currency))
            .ok_or(CommerceError::Overflow)
    }

    /// Subtract another Money value.
    pub fn try_subtract(&self, other: &Money) -> Result<Money, CommerceError> {
        self.ensure_same_currency(other)?;
        self.amount_cents
            .checked_sub(other.amount_cents)
            .map(|cents| Money::new(cents, self.currency))
            .ok_or(CommerceError::Overflow)
    }

    /// Multiply by an integer factor (e.g., a quantity).
    pub fn try_multiply(&self, factor: i64) -> Result<Money, CommerceError> {
        self.amount_cents
            .checked_mul(factor)
            .map(|cents| Money::new(cents, self.currency))
            .ok_or(CommerceError::Overflow)
    }

    /// Calculate a percentage of this amount, rounded to the nearest cent.
    ///
    /// ```
    /// use greens_commerce::money::{Currency, Money};
    /// let total = Money::new(69800, Currency::USD);
    /// assert_eq!(total.percentage(15.0).unwrap().amount_cents, 10470);
    /// ```
    pub fn percentage(&self, percent: f64) -> Result<Money, CommerceError> {
        let cents = self.amount_cents as f64 * percent / 100.0;
        Ok(Money::new(round_to_cents(cents)?, self.currency))
    }

    /// The smaller of two amounts in the same currency.
    pub fn try_min(&self, other: &Money) -> Result<Money, CommerceError> {
        self.ensure_same_currency(other)?;
        Ok(match self.amount_cents.cmp(&other.amount_cents) {
            Ordering::Greater => *other,
            _ => *self,
        })
    }

    /// Sum an iterator of Money values. An empty iterator sums to zero.
    pub fn try_sum<'a>(
        iter: impl IntoIterator<Item = &'a Money>,
        currency: Currency,
    ) -> Result<Money, CommerceError> {
        iter.into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.try_add(m))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), CommerceError> {
        if self.currency != other.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: other.currency.code().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Round half away from zero, rejecting values outside the i64 range.
fn round_to_cents(value: f64) -> Result<i64, CommerceError> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return Err(CommerceError::Overflow);
    }
    Ok(rounded as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_decimal() {
        let m = Money::from_decimal(49.99, Currency::USD).unwrap();
        assert_eq!(m.amount_cents, 4999);

        let m = Money::from_decimal(100.0, Currency::JPY).unwrap();
        assert_eq!(m.amount_cents, 100);
    }

    #[test]
    fn test_money_from_decimal_rejects_non_finite() {
        assert_eq!(
            Money::from_decimal(f64::NAN, Currency::USD),
            Err(CommerceError::Overflow)
        );
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(4999, Currency::USD).display(), "$49.99");
        assert_eq!(Money::new(100, Currency::JPY).display(), "\u{00a5}100");
        assert_eq!(Money::new(10470, Currency::USD).display_amount(), "104.70");
    }

    #[test]
    fn test_money_addition_and_subtraction() {
        let a = Money::new(1000, Currency::USD);
        let b = Money::new(300, Currency::USD);
        assert_eq!(a.try_add(&b).unwrap().amount_cents, 1300);
        assert_eq!(a.try_subtract(&b).unwrap().amount_cents, 700);
    }

    #[test]
    fn test_money_currency_mismatch() {
        let usd = Money::new(1000, Currency::USD);
        let eur = Money::new(1000, Currency::EUR);
        assert!(matches!(
            usd.try_add(&eur),
            Err(CommerceError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_money_multiply_overflow() {
        let m = Money::new(i64::MAX / 2, Currency::USD);
        assert_eq!(m.try_multiply(3), Err(CommerceError::Overflow));
    }

    #[test]
    fn test_money_percentage_rounds() {
        let m = Money::new(10000, Currency::USD);
        assert_eq!(m.percentage(10.0).unwrap().amount_cents, 1000);

        // 12.5% of $0.99 = 12.375 cents
        let m = Money::new(99, Currency::USD);
        assert_eq!(m.percentage(12.5).unwrap().amount_cents, 12);
    }

    #[test]
    fn test_money_min() {
        let a = Money::new(1500, Currency::USD);
        let b = Money::new(1000, Currency::USD);
        assert_eq!(a.try_min(&b).unwrap(), b);
        assert_eq!(b.try_min(&a).unwrap(), b);
    }

    #[test]
    fn test_money_sum_empty_is_zero() {
        let empty: Vec<Money> = Vec::new();
        assert_eq!(
            Money::try_sum(&empty, Currency::USD).unwrap(),
            Money::zero(Currency::USD)
        );
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_code(" inr "), Some(Currency::INR));
        assert_eq!(Currency::from_code("INVALID"), None);
    }
}
