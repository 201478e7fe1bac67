//! Cart contents and the cart aggregator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cart::{Discount, OrderPricing, PricingEngine};
use crate::catalog::{Catalog, PlanType};
use crate::error::CommerceError;
use crate::ids::{LineItemId, ProductId, VarietyId};
use crate::money::Money;

/// Maximum quantity allowed per line item or variety.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// A customer's chosen quantity of one variety.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VarietySelection {
    /// Variety being selected.
    pub variety_id: VarietyId,
    /// Packs selected; 0 means not selected.
    pub quantity: u32,
}

impl VarietySelection {
    /// Create a selection.
    pub fn new(variety_id: impl Into<VarietyId>, quantity: u32) -> Self {
        Self {
            variety_id: variety_id.into(),
            quantity,
        }
    }
}

/// A line in the general (non-plan) cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Unique line identifier.
    pub id: LineItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Product name (denormalized for display).
    pub name: String,
    /// Quantity, always positive.
    pub quantity: i64,
    /// Unit price.
    pub unit_price: Money,
    /// Plan this item is delivered with, if it belongs to a subscription.
    pub subscription: Option<PlanType>,
}

impl CartItem {
    /// Unit price times quantity.
    pub fn line_total(&self) -> Result<Money, CommerceError> {
        self.unit_price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}

/// Input for [`Cart::add_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subscription: Option<PlanType>,
}

impl NewCartItem {
    /// Describe a one-off purchase.
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            quantity,
            unit_price,
            subscription: None,
        }
    }

    /// Link the item to a subscription plan.
    pub fn with_subscription(mut self, plan: PlanType) -> Self {
        self.subscription = Some(plan);
        self
    }

    /// Turn into a cart line with a fresh id.
    pub fn into_item(self) -> CartItem {
        CartItem {
            id: LineItemId::generate(),
            product_id: self.product_id,
            name: self.name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            subscription: self.subscription,
        }
    }
}

/// Plain, serializable cart state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartContents {
    /// Selected subscription plan, if the order is plan based.
    pub plan: Option<PlanType>,
    /// Packs per variety, keyed uniquely by variety id.
    pub selections: BTreeMap<VarietyId, u32>,
    /// General cart lines.
    pub items: Vec<CartItem>,
    /// Applied discount.
    pub discount: Option<Discount>,
}

impl CartContents {
    /// Selections in variety id order, including zero quantities.
    pub fn selections(&self) -> Vec<VarietySelection> {
        self.selections
            .iter()
            .map(|(id, quantity)| VarietySelection::new(id.clone(), *quantity))
            .collect()
    }

    /// Set the packs for a variety.
    pub fn set_selection(&mut self, variety_id: VarietyId, quantity: u32) {
        self.selections.insert(variety_id, quantity);
    }

    /// Total packs across all varieties. Saturates rather than wrapping.
    pub fn total_packs(&self) -> u32 {
        self.selections
            .values()
            .fold(0u32, |total, quantity| total.saturating_add(*quantity))
    }

    /// Total quantity across varieties and general items.
    pub fn item_count(&self) -> i64 {
        self.items
            .iter()
            .fold(i64::from(self.total_packs()), |total, item| {
                total.saturating_add(item.quantity)
            })
    }

    /// Check quantities and variety ids the way the cart mutations do.
    ///
    /// Contents built through [`Cart`] always pass; saved or hand-built
    /// contents may not.
    pub fn check(&self, catalog: &Catalog) -> Result<(), CommerceError> {
        if let Some(plan) = self.plan {
            catalog.plan(plan)?;
        }
        for (variety_id, quantity) in &self.selections {
            let quantity = i64::from(*quantity);
            if quantity > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(
                    quantity,
                    MAX_QUANTITY_PER_ITEM,
                ));
            }
            if quantity > 0 && !catalog.contains_variety(variety_id) {
                return Err(CommerceError::UnknownVariety(variety_id.to_string()));
            }
        }
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(CommerceError::InvalidQuantity(item.quantity));
            }
            if item.quantity > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(
                    item.quantity,
                    MAX_QUANTITY_PER_ITEM,
                ));
            }
        }
        Ok(())
    }

    /// Whether nothing with a positive quantity is in the cart.
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Compact `id:qty` list of selected varieties, e.g. `megaMix:2,peaShoots:1`.
    pub fn selection_summary(&self) -> String {
        self.selections
            .iter()
            .filter(|(_, quantity)| **quantity > 0)
            .map(|(id, quantity)| format!("{id}:{quantity}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The cart aggregator.
///
/// Every mutation goes through [`Cart::mutate`], which reprices the changed
/// contents before committing them, so `pricing()` is never stale and a
/// failed mutation leaves the cart untouched.
#[derive(Debug, Clone)]
pub struct Cart {
    engine: PricingEngine,
    contents: CartContents,
    pricing: OrderPricing,
}

impl Cart {
    /// Create an empty cart.
    pub fn new(engine: PricingEngine) -> Self {
        let pricing = OrderPricing::zero(engine.config().currency);
        Self {
            engine,
            contents: CartContents::default(),
            pricing,
        }
    }

    /// Rebuild a cart from saved contents, checking and repricing them.
    pub fn from_contents(engine: PricingEngine, contents: CartContents) -> Result<Self, CommerceError> {
        if let Err(err) = contents.check(engine.catalog()) {
            tracing::error!(error = %err, "saved cart contents rejected");
            return Err(err);
        }
        let pricing = engine.calculate_cart_pricing(&contents)?;
        Ok(Self {
            engine,
            contents,
            pricing,
        })
    }

    /// The pricing engine.
    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    /// Current contents.
    pub fn contents(&self) -> &CartContents {
        &self.contents
    }

    /// Pricing of the current contents.
    pub fn pricing(&self) -> &OrderPricing {
        &self.pricing
    }

    /// Selected plan.
    pub fn plan(&self) -> Option<PlanType> {
        self.contents.plan
    }

    /// Applied discount.
    pub fn discount(&self) -> Option<&Discount> {
        self.contents.discount.as_ref()
    }

    /// General cart lines.
    pub fn items(&self) -> &[CartItem] {
        &self.contents.items
    }

    /// Packs selected for a variety (0 if never touched).
    pub fn variety_quantity(&self, variety_id: &VarietyId) -> u32 {
        self.contents
            .selections
            .get(variety_id)
            .copied()
            .unwrap_or(0)
    }

    /// Total packs across varieties.
    pub fn total_packs(&self) -> u32 {
        self.contents.total_packs()
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.contents.item_count()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Get an item by ID.
    pub fn get_item(&self, line_item_id: &LineItemId) -> Option<&CartItem> {
        self.contents.items.iter().find(|i| &i.id == line_item_id)
    }

    /// Choose or clear the subscription plan.
    pub fn set_plan(&mut self, plan: Option<PlanType>) -> Result<(), CommerceError> {
        if let Some(plan) = plan {
            self.engine.catalog().plan(plan)?;
        }
        self.mutate(|contents| {
            contents.plan = plan;
            Ok(())
        })
    }

    /// Set (not increment) the packs selected for a variety.
    ///
    /// Setting 0 keeps the entry but excludes it from pricing.
    pub fn set_variety_quantity(
        &mut self,
        variety_id: &VarietyId,
        quantity: i64,
    ) -> Result<(), CommerceError> {
        if quantity < 0 {
            tracing::error!(variety = %variety_id, quantity, "negative variety quantity");
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }
        if !self.engine.catalog().contains_variety(variety_id) {
            tracing::error!(variety = %variety_id, "quantity set for unknown variety");
            return Err(CommerceError::UnknownVariety(variety_id.to_string()));
        }
        let quantity = u32::try_from(quantity).map_err(|_| CommerceError::InvalidQuantity(quantity))?;

        self.mutate(|contents| {
            contents.set_selection(variety_id.clone(), quantity);
            Ok(())
        })
    }

    /// Add an item to the cart.
    ///
    /// Adding a product that is already in the cart increases that line's
    /// quantity and returns its id.
    pub fn add_item(&mut self, item: NewCartItem) -> Result<LineItemId, CommerceError> {
        if item.quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(item.quantity));
        }

        self.mutate(|contents| {
            if let Some(existing) = contents
                .items
                .iter_mut()
                .find(|i| i.product_id == item.product_id && i.subscription == item.subscription)
            {
                let new_quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(CommerceError::Overflow)?;
                if new_quantity > MAX_QUANTITY_PER_ITEM {
                    return Err(CommerceError::QuantityExceedsLimit(
                        new_quantity,
                        MAX_QUANTITY_PER_ITEM,
                    ));
                }
                existing.quantity = new_quantity;
                return Ok(existing.id.clone());
            }

            if item.quantity > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(
                    item.quantity,
                    MAX_QUANTITY_PER_ITEM,
                ));
            }

            let line = item.into_item();
            let id = line.id.clone();
            contents.items.push(line);
            Ok(id)
        })
    }

    /// Update item quantity. A quantity of 0 or less removes the line.
    pub fn update_item_quantity(
        &mut self,
        line_item_id: &LineItemId,
        quantity: i64,
    ) -> Result<(), CommerceError> {
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }

        self.mutate(|contents| {
            let position = contents
                .items
                .iter()
                .position(|i| &i.id == line_item_id)
                .ok_or_else(|| CommerceError::ItemNotInCart(line_item_id.to_string()))?;

            if quantity <= 0 {
                contents.items.remove(position);
            } else if let Some(item) = contents.items.get_mut(position) {
                item.quantity = quantity;
            }
            Ok(())
        })
    }

    /// Remove an item from the cart. Returns whether anything was removed.
    pub fn remove_item(&mut self, line_item_id: &LineItemId) -> Result<bool, CommerceError> {
        self.mutate(|contents| {
            let len_before = contents.items.len();
            contents.items.retain(|i| &i.id != line_item_id);
            Ok(contents.items.len() < len_before)
        })
    }

    /// Apply a discount, replacing any previous one.
    pub fn apply_discount(&mut self, discount: Discount) -> Result<(), CommerceError> {
        self.mutate(|contents| {
            contents.discount = Some(discount);
            Ok(())
        })
    }

    /// Remove the applied discount. Returns whether one was applied.
    pub fn remove_discount(&mut self) -> Result<bool, CommerceError> {
        self.mutate(|contents| Ok(contents.discount.take().is_some()))
    }

    /// Empty the cart: selections, items and discount. The plan choice is kept.
    pub fn clear(&mut self) {
        self.contents.selections.clear();
        self.contents.items.clear();
        self.contents.discount = None;
        self.pricing = OrderPricing::zero(self.engine.config().currency);
    }

    /// Apply `change` to a copy of the contents, reprice, then commit both.
    fn mutate<R>(
        &mut self,
        change: impl FnOnce(&mut CartContents) -> Result<R, CommerceError>,
    ) -> Result<R, CommerceError> {
        let mut next = self.contents.clone();
        let result = change(&mut next)?;
        let pricing = self.engine.calculate_cart_pricing(&next)?;
        self.contents = next;
        self.pricing = pricing;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;
    use crate::money::Currency;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn cart() -> Cart {
        Cart::new(PricingEngine::new(
            Arc::new(Catalog::standard()),
            PricingConfig::default(),
        ))
    }

    fn kit(quantity: i64) -> NewCartItem {
        NewCartItem::new(
            ProductId::new("grow-kit"),
            "Grow Kit",
            quantity,
            Money::new(2500, Currency::USD),
        )
    }

    #[test]
    fn test_cart_creation() {
        let cart = cart();
        assert!(cart.is_empty());
        assert!(cart.pricing().is_zero());
    }

    #[test]
    fn test_set_variety_quantity_reprices() {
        let mut cart = cart();
        cart.set_variety_quantity(&VarietyId::new("megaMix"), 2).unwrap();

        assert_eq!(cart.variety_quantity(&VarietyId::new("megaMix")), 2);
        assert_eq!(cart.pricing().subtotal, Decimal::new(2598, 2));
        assert_eq!(cart.pricing().summary().total.amount_cents, 3706);
    }

    #[test]
    fn test_set_variety_quantity_is_idempotent() {
        let mut once = cart();
        once.set_variety_quantity(&VarietyId::new("megaMix"), 3).unwrap();

        let mut twice = cart();
        twice.set_variety_quantity(&VarietyId::new("megaMix"), 3).unwrap();
        twice.set_variety_quantity(&VarietyId::new("megaMix"), 3).unwrap();

        assert_eq!(once.contents(), twice.contents());
        assert_eq!(once.pricing(), twice.pricing());
    }

    #[test]
    fn test_zero_quantity_keeps_entry_but_not_price() {
        let mut cart = cart();
        let id = VarietyId::new("peaShoots");
        cart.set_variety_quantity(&id, 2).unwrap();
        cart.set_variety_quantity(&id, 0).unwrap();

        assert!(cart.contents().selections.contains_key(&id));
        assert!(cart.pricing().is_zero());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let mut cart = cart();
        let result = cart.set_variety_quantity(&VarietyId::new("megaMix"), -1);
        assert_eq!(result, Err(CommerceError::InvalidQuantity(-1)));
        assert!(cart.contents().selections.is_empty());
    }

    #[test]
    fn test_unknown_variety_rejected() {
        let mut cart = cart();
        let result = cart.set_variety_quantity(&VarietyId::new("kale"), 1);
        assert_eq!(result, Err(CommerceError::UnknownVariety("kale".to_string())));
    }

    #[test]
    fn test_add_same_item_increases_quantity() {
        let mut cart = cart();
        let first = cart.add_item(kit(1)).unwrap();
        let second = cart.add_item(kit(2)).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.pricing().subtotal, Decimal::new(7500, 2));
    }

    #[test]
    fn test_subscription_items_get_their_own_line() {
        let mut cart = cart();
        cart.add_item(kit(1)).unwrap();
        cart.add_item(kit(1).with_subscription(PlanType::Pro)).unwrap();
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_invalid_item_quantity() {
        let mut cart = cart();
        assert_eq!(cart.add_item(kit(0)), Err(CommerceError::InvalidQuantity(0)));
        assert!(matches!(
            cart.add_item(kit(MAX_QUANTITY_PER_ITEM + 1)),
            Err(CommerceError::QuantityExceedsLimit(..))
        ));
    }

    #[test]
    fn test_update_and_remove_items() {
        let mut cart = cart();
        let line = cart.add_item(kit(1)).unwrap();

        cart.update_item_quantity(&line, 4).unwrap();
        assert_eq!(cart.get_item(&line).map(|i| i.quantity), Some(4));
        assert_eq!(cart.pricing().subtotal, Decimal::new(10000, 2));

        cart.update_item_quantity(&line, 0).unwrap();
        assert!(cart.get_item(&line).is_none());
        assert!(cart.pricing().is_zero());

        let line = cart.add_item(kit(1)).unwrap();
        assert!(cart.remove_item(&line).unwrap());
        assert!(!cart.remove_item(&line).unwrap());
    }

    #[test]
    fn test_update_missing_item() {
        let mut cart = cart();
        let result = cart.update_item_quantity(&LineItemId::new("nope"), 2);
        assert!(matches!(result, Err(CommerceError::ItemNotInCart(_))));
    }

    #[test]
    fn test_discount_reprices() {
        let mut cart = cart();
        cart.set_variety_quantity(&VarietyId::new("megaMix"), 2).unwrap();
        cart.apply_discount(Discount::fixed_amount(
            "FIVE",
            "$5 Off",
            Money::new(500, Currency::USD),
        ))
        .unwrap();
        assert_eq!(cart.pricing().discount_amount, Decimal::new(500, 2));

        assert!(cart.remove_discount().unwrap());
        assert!(cart.pricing().discount_amount.is_zero());
    }

    #[test]
    fn test_clear_resets_pricing() {
        let mut cart = cart();
        cart.set_plan(Some(PlanType::Pro)).unwrap();
        cart.set_variety_quantity(&VarietyId::new("megaMix"), 4).unwrap();
        cart.add_item(kit(1)).unwrap();

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.plan(), Some(PlanType::Pro));
        assert_eq!(cart.pricing(), &OrderPricing::zero(Currency::USD));
    }

    #[test]
    fn test_selection_summary() {
        let mut cart = cart();
        cart.set_variety_quantity(&VarietyId::new("peaShoots"), 1).unwrap();
        cart.set_variety_quantity(&VarietyId::new("megaMix"), 2).unwrap();
        cart.set_variety_quantity(&VarietyId::new("broccoli"), 0).unwrap();
        assert_eq!(cart.contents().selection_summary(), "megaMix:2,peaShoots:1");
    }

    #[test]
    fn test_from_contents_reprices() {
        let mut contents = CartContents::default();
        contents.set_selection(VarietyId::new("megaMix"), 2);
        let engine = PricingEngine::new(Arc::new(Catalog::standard()), PricingConfig::default());

        let cart = Cart::from_contents(engine, contents).unwrap();
        assert_eq!(cart.pricing().summary().total.amount_cents, 3706);
    }

    #[test]
    fn test_from_contents_rejects_out_of_range_contents() {
        let engine = PricingEngine::new(Arc::new(Catalog::standard()), PricingConfig::default());

        let mut oversized = CartContents::default();
        oversized.set_selection(VarietyId::new("megaMix"), 3_000_000_000);
        assert_eq!(
            Cart::from_contents(engine.clone(), oversized).unwrap_err(),
            CommerceError::QuantityExceedsLimit(3_000_000_000, MAX_QUANTITY_PER_ITEM)
        );

        let mut unknown = CartContents::default();
        unknown.set_selection(VarietyId::new("kale"), 1);
        assert_eq!(
            Cart::from_contents(engine.clone(), unknown).unwrap_err(),
            CommerceError::UnknownVariety("kale".to_string())
        );

        let mut bad_item = CartContents::default();
        bad_item.items.push(kit(0).into_item());
        assert_eq!(
            Cart::from_contents(engine, bad_item).unwrap_err(),
            CommerceError::InvalidQuantity(0)
        );
    }

    #[test]
    fn test_total_packs_saturates() {
        let mut contents = CartContents::default();
        contents.set_selection(VarietyId::new("megaMix"), u32::MAX);
        contents.set_selection(VarietyId::new("peaShoots"), 5);

        assert_eq!(contents.total_packs(), u32::MAX);
        assert!(!contents.is_empty());
    }
}
