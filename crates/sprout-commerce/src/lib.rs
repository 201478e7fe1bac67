//! Checkout core for the Sprout microgreens storefront.
//!
//! This crate holds the part of the storefront with real logic behind it:
//!
//! - **Catalog**: subscription plans and microgreen varieties
//! - **Cart**: variety selections, general line items, discounts, pricing
//! - **Checkout**: step data, validation rules, the step state machine and
//!   the async submission to a payment gateway
//!
//! Pages, routing, the payment provider's API and authentication live
//! elsewhere and are reached through the traits in [`integrations`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sprout_commerce::prelude::*;
//!
//! let engine = PricingEngine::new(Arc::new(Catalog::standard()), PricingConfig::default());
//! let mut cart = Cart::new(engine);
//! cart.set_variety_quantity(&VarietyId::new("megaMix"), 2)?;
//!
//! // 25.98 + 10.00 shipping + 3% tax
//! assert_eq!(cart.pricing().summary().total.display(), "$37.06");
//! # Ok::<(), CommerceError>(())
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod integrations;
pub mod store;

pub use error::{CommerceError, ConfigError, GatewayError};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CommerceError, ConfigError, GatewayError};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        Catalog, PackRequirement, PlanConfiguration, PlanType, VarietyDefinition,
    };

    // Cart
    pub use crate::cart::{
        Cart, CartContents, CartItem, Discount, DiscountValue, LineItemPricing, NewCartItem,
        OrderPricing, PricingEngine, PricingSummary, StaticDiscounts, VarietySelection,
    };

    // Checkout
    pub use crate::checkout::{
        Address, AddressPatch, BillingInfo, BillingInfoPatch, CheckoutData, CheckoutFlow,
        CheckoutSession, CheckoutStep, CustomerInfo, CustomerInfoPatch, PaymentInfo,
        PaymentInfoPatch, PaymentMethodKind, StepErrors,
    };

    // Configuration and collaborators
    pub use crate::config::{CheckoutConfig, GatewayConfig, PricingConfig};
    pub use crate::integrations::{
        AnonymousIdentity, CurrentUser, DiscountLookup, IdentityProvider, PaymentGateway,
        PaymentLineItem, PaymentSession, PaymentSessionRequest,
    };
    pub use crate::store::{CheckoutStore, InMemoryCheckoutStore, SessionId};
}
