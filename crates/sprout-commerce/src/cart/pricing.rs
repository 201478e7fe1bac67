//! Order pricing.
//!
//! [`PricingEngine`] turns a cart snapshot into an [`OrderPricing`]
//! breakdown. It is a pure function of its inputs: the same selections,
//! items and discount always produce the same breakdown.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{CartContents, Discount, VarietySelection};
use crate::catalog::Catalog;
use crate::config::PricingConfig;
use crate::error::CommerceError;
use crate::ids::{LineItemId, VarietyId};
use crate::money::{round_half_up, Currency, Money};

/// What a priced line refers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LineReference {
    /// A variety selection.
    Variety(VarietyId),
    /// A general cart item.
    Item(LineItemId),
}

/// Pricing breakdown for a single line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemPricing {
    /// Source of the line.
    pub reference: LineReference,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub unit_price: Money,
    /// Quantity.
    pub quantity: i64,
    /// Subtotal (unit_price * quantity).
    pub subtotal: Money,
}

/// Order totals rounded to the currency's minor unit, for display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricingSummary {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

/// Complete pricing breakdown for an order.
///
/// Amounts are in major units at full precision; `total` always equals
/// `subtotal - discount_amount + shipping_amount + tax_amount` exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPricing {
    /// Order currency.
    pub currency: Currency,
    /// Sum of quantity times unit price over selected lines.
    pub subtotal: Decimal,
    /// Discount taken off the subtotal.
    pub discount_amount: Decimal,
    /// Shipping charge.
    pub shipping_amount: Decimal,
    /// Tax on the discounted subtotal plus shipping.
    pub tax_amount: Decimal,
    /// Final total.
    pub total: Decimal,
    /// Code of the discount that was applied, if any.
    pub discount_code: Option<String>,
    /// Per-line breakdown.
    pub lines: Vec<LineItemPricing>,
    summary: PricingSummary,
}

impl OrderPricing {
    /// Pricing of an empty order: every amount zero.
    pub fn zero(currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            currency,
            subtotal: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            shipping_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total: Decimal::ZERO,
            discount_code: None,
            lines: Vec::new(),
            summary: PricingSummary {
                subtotal: zero,
                discount: zero,
                shipping: zero,
                tax: zero,
                total: zero,
            },
        }
    }

    /// Totals rounded half-up to cents.
    pub fn summary(&self) -> &PricingSummary {
        &self.summary
    }

    /// Check if all amounts are zero.
    pub fn is_zero(&self) -> bool {
        self.total.is_zero() && self.subtotal.is_zero()
    }

    /// Check if a discount took something off.
    pub fn has_discount(&self) -> bool {
        self.discount_amount > Decimal::ZERO
    }

    /// Check if shipping was waived on a non-empty order.
    pub fn has_free_shipping(&self) -> bool {
        self.subtotal > Decimal::ZERO && self.shipping_amount.is_zero()
    }
}

/// Computes [`OrderPricing`] from catalog prices and [`PricingConfig`].
#[derive(Debug, Clone)]
pub struct PricingEngine {
    catalog: Arc<Catalog>,
    config: PricingConfig,
}

impl PricingEngine {
    /// Create an engine over a shared catalog.
    pub fn new(catalog: Arc<Catalog>, config: PricingConfig) -> Self {
        Self { catalog, config }
    }

    /// The catalog prices are looked up in.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Shared handle to the catalog.
    pub fn catalog_handle(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    /// The pricing constants.
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price variety selections with an optional discount.
    ///
    /// Selections with quantity 0 are skipped.
    pub fn calculate_order_pricing(
        &self,
        selections: &[VarietySelection],
        discount: Option<&Discount>,
    ) -> Result<OrderPricing, CommerceError> {
        let lines = self.selection_lines(selections)?;
        self.price_lines(lines, discount)
    }

    /// Price a whole cart: variety selections and general items together.
    pub fn calculate_cart_pricing(
        &self,
        contents: &CartContents,
    ) -> Result<OrderPricing, CommerceError> {
        let mut lines = self.selection_lines(&contents.selections())?;

        for item in &contents.items {
            if item.unit_price.currency != self.config.currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: self.config.currency.code().to_string(),
                    got: item.unit_price.currency.code().to_string(),
                });
            }
            lines.push(LineItemPricing {
                reference: LineReference::Item(item.id.clone()),
                name: item.name.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
                subtotal: item.line_total()?,
            });
        }

        self.price_lines(lines, contents.discount.as_ref())
    }

    fn selection_lines(
        &self,
        selections: &[VarietySelection],
    ) -> Result<Vec<LineItemPricing>, CommerceError> {
        selections
            .iter()
            .filter(|selection| selection.quantity > 0)
            .map(|selection| {
                let variety = self
                    .catalog
                    .variety(&selection.variety_id)
                    .map_err(|_| CommerceError::UnknownVariety(selection.variety_id.to_string()))?;
                if variety.unit_price.currency != self.config.currency {
                    return Err(CommerceError::CurrencyMismatch {
                        expected: self.config.currency.code().to_string(),
                        got: variety.unit_price.currency.code().to_string(),
                    });
                }
                let quantity = i64::from(selection.quantity);
                let subtotal = variety
                    .unit_price
                    .try_multiply(quantity)
                    .ok_or(CommerceError::Overflow)?;
                Ok(LineItemPricing {
                    reference: LineReference::Variety(variety.id.clone()),
                    name: variety.name.clone(),
                    unit_price: variety.unit_price,
                    quantity,
                    subtotal,
                })
            })
            .collect()
    }

    fn price_lines(
        &self,
        lines: Vec<LineItemPricing>,
        discount: Option<&Discount>,
    ) -> Result<OrderPricing, CommerceError> {
        let currency = self.config.currency;
        if lines.is_empty() {
            return Ok(OrderPricing::zero(currency));
        }

        let dp = currency.decimal_places();
        let subtotal = Money::try_sum(lines.iter().map(|l| &l.subtotal), currency)
            .ok_or(CommerceError::Overflow)?
            .to_decimal();

        if let Some(Discount {
            value: crate::cart::DiscountValue::Fixed(amount),
            ..
        }) = discount
        {
            if amount.currency != currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: currency.code().to_string(),
                    got: amount.currency.code().to_string(),
                });
            }
        }

        let discount_amount = discount
            .map(|d| d.amount_for(subtotal, dp))
            .unwrap_or(Decimal::ZERO);
        let discounted = subtotal - discount_amount;

        let shipping_amount = if discounted >= self.config.free_shipping_threshold {
            Decimal::ZERO
        } else {
            round_half_up(self.config.flat_shipping_rate, dp)
        };

        let taxable = discounted + shipping_amount;
        let tax_amount = self
            .config
            .tax_rate
            .checked_mul(taxable)
            .ok_or(CommerceError::Overflow)?;
        let total = taxable + tax_amount;

        let to_money =
            |value: Decimal| Money::from_decimal(value, currency).ok_or(CommerceError::Overflow);
        let summary = PricingSummary {
            subtotal: to_money(subtotal)?,
            discount: to_money(discount_amount)?,
            shipping: to_money(shipping_amount)?,
            tax: to_money(tax_amount)?,
            total: to_money(total)?,
        };

        tracing::debug!(
            %subtotal,
            %discount_amount,
            %shipping_amount,
            %tax_amount,
            %total,
            lines = lines.len(),
            "priced order"
        );

        Ok(OrderPricing {
            currency,
            subtotal,
            discount_amount,
            shipping_amount,
            tax_amount,
            total,
            discount_code: discount
                .filter(|_| discount_amount > Decimal::ZERO)
                .map(|d| d.code.clone()),
            lines,
            summary,
        })
    }
}
