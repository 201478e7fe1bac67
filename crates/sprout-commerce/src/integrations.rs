//! Collaborators the checkout core talks to.
//!
//! The payment gateway and identity provider are async and reached through
//! trait objects so a session can be wired to real clients or to mocks.
//! Discount lookup is synchronous; [`StaticDiscounts`](crate::cart::StaticDiscounts)
//! is the in-process table implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::cart::Discount;
use crate::error::GatewayError;

/// One priced line handed to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentLineItem {
    /// Gateway-side price reference.
    pub price_ref: String,
    pub quantity: u32,
}

/// Everything the gateway needs to open a payment session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSessionRequest {
    pub line_items: Vec<PaymentLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Opaque key/value pairs stamped onto the order.
    pub metadata: BTreeMap<String, String>,
}

/// A payment session opened by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSession {
    pub session_id: String,
    /// Where to send the customer to pay.
    pub redirect_url: String,
}

/// The signed-in user, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    /// Opaque user id.
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub profile: BTreeMap<String, String>,
}

/// External payment processor.
///
/// Implementations must not retry on their own; retry policy belongs to
/// the caller.
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a payment session for a finalized order.
    async fn create_payment_session(
        &self,
        request: PaymentSessionRequest,
    ) -> Result<PaymentSession, GatewayError>;
}

/// External authentication system.
#[automock]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `None` for guest checkout.
    async fn current_user(&self) -> Option<CurrentUser>;
}

/// Identity provider for guest-only storefronts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

#[async_trait]
impl IdentityProvider for AnonymousIdentity {
    async fn current_user(&self) -> Option<CurrentUser> {
        None
    }
}

/// Resolves customer-entered discount codes.
#[automock]
pub trait DiscountLookup: Send + Sync {
    /// `None` means the code does not exist.
    fn resolve_discount(&self, code: &str) -> Option<Discount>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use testresult::TestResult;

    #[tokio::test]
    async fn test_anonymous_identity_has_no_user() {
        assert_eq!(AnonymousIdentity.current_user().await, None);
    }

    #[tokio::test]
    async fn test_mock_gateway_surfaces_errors() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_payment_session()
            .returning(|_| Err(GatewayError::new("price_missing", "No such price: price_pro")));

        let request = PaymentSessionRequest {
            line_items: vec![PaymentLineItem {
                price_ref: "price_pro".into(),
                quantity: 4,
            }],
            success_url: "https://sprout.example/success".into(),
            cancel_url: "https://sprout.example/checkout".into(),
            metadata: BTreeMap::new(),
        };

        let err = gateway.create_payment_session(request).await.unwrap_err();
        assert_eq!(err.code, "price_missing");
    }

    #[test]
    fn test_mock_discount_lookup() -> TestResult {
        let mut lookup = MockDiscountLookup::new();
        lookup
            .expect_resolve_discount()
            .withf(|code| code == "SPROUT10")
            .returning(|code| Some(Discount::percentage(code, "10% Off", Decimal::TEN)));

        let discount = lookup.resolve_discount("SPROUT10").ok_or("no discount")?;
        assert_eq!(discount.code, "SPROUT10");
        Ok(())
    }
}
