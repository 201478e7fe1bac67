//! Discount and coupon types.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::integrations::DiscountLookup;
use crate::money::{round_half_up, Money};

/// Value of the discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DiscountValue {
    /// Percentage off the subtotal (0 - 100).
    Percentage(Decimal),
    /// Fixed amount off the subtotal.
    Fixed(Money),
}

impl DiscountValue {
    /// Calculate the discount for a subtotal in major units.
    ///
    /// The result is rounded half-up to `dp` places and always lies in
    /// `[0, subtotal]`.
    pub fn calculate(&self, subtotal: Decimal, dp: u32) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let raw = match self {
            DiscountValue::Percentage(percent) => {
                let percent = (*percent).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
                subtotal * percent / Decimal::ONE_HUNDRED
            }
            DiscountValue::Fixed(amount) => amount.to_decimal(),
        };

        round_half_up(raw, dp).clamp(Decimal::ZERO, subtotal)
    }
}

/// A discount/coupon definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discount {
    /// Discount code (e.g., "SPROUT10").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Value of the discount.
    pub value: DiscountValue,
    /// Inactive discounts resolve but take nothing off.
    pub active: bool,
}

impl Discount {
    /// Create a new percentage discount.
    pub fn percentage(code: impl Into<String>, name: impl Into<String>, percent: Decimal) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            value: DiscountValue::Percentage(percent),
            active: true,
        }
    }

    /// Create a new fixed amount discount.
    pub fn fixed_amount(code: impl Into<String>, name: impl Into<String>, amount: Money) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            value: DiscountValue::Fixed(amount),
            active: true,
        }
    }

    /// Discount amount for a subtotal; zero when inactive.
    pub fn amount_for(&self, subtotal: Decimal, dp: u32) -> Decimal {
        if self.active {
            self.value.calculate(subtotal, dp)
        } else {
            Decimal::ZERO
        }
    }
}

/// In-memory discount table keyed by case-insensitive code.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscounts {
    by_code: HashMap<String, Discount>,
}

impl StaticDiscounts {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a discount, replacing any with the same code.
    pub fn with(mut self, discount: Discount) -> Self {
        self.insert(discount);
        self
    }

    /// Add a discount, replacing any with the same code.
    pub fn insert(&mut self, discount: Discount) {
        self.by_code
            .insert(normalize_code(&discount.code), discount);
    }

    /// Number of codes in the table.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl DiscountLookup for StaticDiscounts {
    fn resolve_discount(&self, code: &str) -> Option<Discount> {
        self.by_code.get(&normalize_code(code)).cloned()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
