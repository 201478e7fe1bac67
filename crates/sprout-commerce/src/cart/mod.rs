//! Shopping cart module.
//!
//! Contains the cart aggregator, variety selections, general line items,
//! discounts and the pricing engine.

mod cart;
mod discount;
mod pricing;

pub use cart::{Cart, CartContents, CartItem, NewCartItem, VarietySelection, MAX_QUANTITY_PER_ITEM};
pub use discount::{Discount, DiscountValue, StaticDiscounts};
pub use pricing::{LineItemPricing, LineReference, OrderPricing, PricingEngine, PricingSummary};
