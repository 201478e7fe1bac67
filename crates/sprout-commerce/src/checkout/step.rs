//! Checkout steps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Steps in the checkout flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Contact information.
    CustomerInfo,
    /// Shipping address.
    Shipping,
    /// Payment method and billing address.
    Payment,
    /// Order review before handing off to the payment gateway.
    Review,
}

impl CheckoutStep {
    /// All steps in flow order.
    pub const ALL: [CheckoutStep; 4] = [
        CheckoutStep::CustomerInfo,
        CheckoutStep::Shipping,
        CheckoutStep::Payment,
        CheckoutStep::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::CustomerInfo => "customer_info",
            CheckoutStep::Shipping => "shipping",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Review => "review",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CheckoutStep::CustomerInfo => "Customer Info",
            CheckoutStep::Shipping => "Shipping",
            CheckoutStep::Payment => "Payment",
            CheckoutStep::Review => "Review",
        }
    }

    /// Get the step number (1-indexed).
    pub fn number(&self) -> u8 {
        match self {
            CheckoutStep::CustomerInfo => 1,
            CheckoutStep::Shipping => 2,
            CheckoutStep::Payment => 3,
            CheckoutStep::Review => 4,
        }
    }

    /// The following step, if any.
    pub fn next(&self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::CustomerInfo => Some(CheckoutStep::Shipping),
            CheckoutStep::Shipping => Some(CheckoutStep::Payment),
            CheckoutStep::Payment => Some(CheckoutStep::Review),
            CheckoutStep::Review => None,
        }
    }

    /// The preceding step, if any.
    pub fn prev(&self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::CustomerInfo => None,
            CheckoutStep::Shipping => Some(CheckoutStep::CustomerInfo),
            CheckoutStep::Payment => Some(CheckoutStep::Shipping),
            CheckoutStep::Review => Some(CheckoutStep::Payment),
        }
    }

    /// Steps strictly before this one.
    pub fn predecessors(&self) -> impl Iterator<Item = CheckoutStep> + '_ {
        Self::ALL.into_iter().filter(move |step| step < self)
    }

    /// Parse a step from its snake_case key.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.as_str() == s)
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
