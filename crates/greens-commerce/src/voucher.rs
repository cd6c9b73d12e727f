//! Voucher rules and evaluation.
//!
//! The rule set is static for a session. Evaluating a code never mutates the
//! cart: the discount is advisory and callers show `subtotal - discount`.

use crate::cart::CartItem;
use crate::error::CommerceError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Why a voucher could not be applied.
///
/// The `Display` text is what the storefront shows next to the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoucherError {
    #[error("Please enter a voucher code")]
    EmptyCode,

    #[error("Please select items to apply the voucher")]
    NoItemsSelected,

    #[error("Invalid voucher code: {0}")]
    InvalidCode(String),

    #[error("Could not price voucher: {0}")]
    Pricing(#[from] CommerceError),
}

/// How a voucher discounts the selected subtotal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VoucherKind {
    /// Percentage off (0.0 - 100.0).
    Percentage(f64),
    /// Fixed amount off, never more than the subtotal.
    FixedAmount(Money),
}

impl VoucherKind {
    /// Discount for a given subtotal.
    pub fn discount_for(&self, subtotal: &Money) -> Result<Money, CommerceError> {
        match self {
            VoucherKind::Percentage(percent) => subtotal.percentage(*percent),
            VoucherKind::FixedAmount(amount) => amount.try_min(subtotal),
        }
    }
}

/// A named discount definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherRule {
    /// Upper-case voucher code.
    pub code: String,
    pub kind: VoucherKind,
}

impl VoucherRule {
    pub fn percentage(code: &str, percent: f64) -> Self {
        Self {
            code: normalize_code(code),
            kind: VoucherKind::Percentage(percent),
        }
    }

    pub fn fixed_amount(code: &str, amount: Money) -> Self {
        Self {
            code: normalize_code(code),
            kind: VoucherKind::FixedAmount(amount),
        }
    }
}

/// Result of evaluating a voucher against a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherApplication {
    /// Normalized code that matched.
    pub code: String,
    /// Sum of the selected line totals.
    pub subtotal: Money,
    /// Amount taken off the subtotal.
    pub discount: Money,
}

impl VoucherApplication {
    /// What the customer pays for the selection.
    pub fn payable(&self) -> Result<Money, CommerceError> {
        self.subtotal.try_subtract(&self.discount)
    }
}

/// The configured voucher rule set, keyed by normalized code.
#[derive(Debug, Clone, PartialEq)]
pub struct VoucherBook {
    rules: HashMap<String, VoucherRule>,
}

impl VoucherBook {
    /// Build a rule set. Later rules win over earlier ones with the same code.
    pub fn new(rules: impl IntoIterator<Item = VoucherRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                rule.code = normalize_code(&rule.code);
                (rule.code.clone(), rule)
            })
            .collect();
        Self { rules }
    }

    /// The storefront's built-in rules, with fixed amounts in `currency`.
    pub fn builtin(currency: Currency) -> Self {
        let fifteen = 15 * 10_i64.pow(currency.decimal_places());
        Self::new([
            VoucherRule::percentage("SAVE10", 10.0),
            VoucherRule::percentage("WELCOME", 15.0),
            VoucherRule::fixed_amount("FIXED15", Money::new(fifteen, currency)),
        ])
    }

    /// Look up a rule by code, case-insensitively.
    pub fn get(&self, code: &str) -> Option<&VoucherRule> {
        self.rules.get(&normalize_code(code))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules sorted by code.
    pub fn rules(&self) -> Vec<&VoucherRule> {
        let mut rules: Vec<_> = self.rules.values().collect();
        rules.sort_by(|a, b| a.code.cmp(&b.code));
        rules
    }

    /// Evaluate `code` against the selected items.
    ///
    /// Validation order: empty code, empty selection, unknown code.
    pub fn evaluate(
        &self,
        code: &str,
        selected: &[CartItem],
    ) -> Result<VoucherApplication, VoucherError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(VoucherError::EmptyCode);
        }
        let Some(first) = selected.first() else {
            return Err(VoucherError::NoItemsSelected);
        };

        let normalized = normalize_code(code);
        let rule = self
            .rules
            .get(&normalized)
            .ok_or_else(|| VoucherError::InvalidCode(normalized.clone()))?;

        let subtotal = Money::try_sum(
            selected.iter().map(|i| &i.line_total),
            first.line_total.currency,
        )?;
        let discount = rule.kind.discount_for(&subtotal)?;

        tracing::debug!(
            code = %normalized,
            subtotal = %subtotal,
            discount = %discount,
            "voucher evaluated"
        );

        Ok(VoucherApplication {
            code: normalized,
            subtotal,
            discount,
        })
    }
}

impl Default for VoucherBook {
    fn default() -> Self {
        Self::builtin(Currency::default())
    }
}

/// Trim and upper-case a voucher code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn item(id: &str, cents: i64, qty: i64) -> CartItem {
        CartItem::new(id, id, usd(cents), qty).unwrap()
    }

    #[test]
    fn test_percentage_voucher() {
        let book = VoucherBook::default();
        let applied = book.evaluate("SAVE10", &[item("a", 10000, 1)]).unwrap();
        assert_eq!(applied.discount, usd(1000));
        assert_eq!(applied.payable().unwrap(), usd(9000));
    }

    #[test]
    fn test_fixed_voucher_capped_at_subtotal() {
        let book = VoucherBook::default();
        let applied = book.evaluate("FIXED15", &[item("a", 1000, 1)]).unwrap();
        assert_eq!(applied.discount, usd(1000));
        assert!(applied.payable().unwrap().is_zero());
    }

    #[test]
    fn test_fixed_voucher_below_subtotal() {
        let book = VoucherBook::default();
        let applied = book.evaluate("FIXED15", &[item("a", 5000, 1)]).unwrap();
        assert_eq!(applied.discount, usd(1500));
    }

    #[test]
    fn test_welcome_on_mixed_cart() {
        let book = VoucherBook::default();
        let items = [item("a", 19900, 2), item("b", 15000, 2)];
        let applied = book.evaluate("WELCOME", &items).unwrap();
        assert_eq!(applied.subtotal, usd(69800));
        assert_eq!(applied.discount, usd(10470));
        assert_eq!(applied.discount.display_amount(), "104.70");
    }

    #[test]
    fn test_code_is_case_insensitive_and_trimmed() {
        let book = VoucherBook::default();
        let applied = book.evaluate("  save10 ", &[item("a", 10000, 1)]).unwrap();
        assert_eq!(applied.code, "SAVE10");
    }

    #[test]
    fn test_unknown_code() {
        let book = VoucherBook::default();
        assert_eq!(
            book.evaluate("BOGUS", &[item("a", 10000, 1)]),
            Err(VoucherError::InvalidCode("BOGUS".to_string()))
        );
    }

    #[test]
    fn test_empty_code() {
        let book = VoucherBook::default();
        assert_eq!(
            book.evaluate("   ", &[item("a", 100, 1)]),
            Err(VoucherError::EmptyCode)
        );
    }

    #[test]
    fn test_no_items_selected_wins_over_code_validity() {
        let book = VoucherBook::default();
        assert_eq!(book.evaluate("SAVE10", &[]), Err(VoucherError::NoItemsSelected));
        assert_eq!(book.evaluate("BOGUS", &[]), Err(VoucherError::NoItemsSelected));
    }

    #[test]
    fn test_custom_rules_override_by_code() {
        let book = VoucherBook::new([
            VoucherRule::percentage("greens", 5.0),
            VoucherRule::percentage("GREENS", 20.0),
        ]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("Greens").unwrap().kind, VoucherKind::Percentage(20.0));
    }
}
