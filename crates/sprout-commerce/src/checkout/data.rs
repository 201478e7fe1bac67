//! Checkout data slices and the aggregate snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cart::{CartContents, OrderPricing};
use crate::checkout::CheckoutStep;
use crate::money::Currency;

/// Contact details collected in the customer info step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerInfo {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Free-form; international formats are accepted as-is.
    pub phone: String,
}

impl CustomerInfo {
    /// Get full name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Partial update for [`CustomerInfo`]; every `Some` field overwrites.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerInfoPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl CustomerInfoPatch {
    /// Shallow-merge into `info`. Returns whether anything was set.
    pub fn apply(self, info: &mut CustomerInfo) -> bool {
        let mut touched = false;
        touched |= merge(&mut info.email, self.email);
        touched |= merge(&mut info.first_name, self.first_name);
        touched |= merge(&mut info.last_name, self.last_name);
        touched |= merge(&mut info.phone, self.phone);
        touched
    }
}

/// A postal address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Address line 1.
    pub address1: String,
    /// Address line 2 (apt, suite, etc.).
    pub address2: Option<String>,
    pub city: String,
    /// State/province code (e.g., "CA").
    pub state: String,
    /// Postal/ZIP code.
    pub postal_code: String,
    /// Country code; filled with the configured default when left blank.
    pub country: Option<String>,
}

impl Address {
    /// Create a new address.
    pub fn new(
        address1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            address1: address1.into(),
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            ..Self::default()
        }
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.address1.clone()];
        if let Some(ref addr2) = self.address2 {
            parts.push(addr2.clone());
        }
        parts.push(self.city.clone());
        parts.push(format!("{} {}", self.state, self.postal_code));
        if let Some(ref country) = self.country {
            parts.push(country.clone());
        }
        parts.join(", ")
    }

    /// Whether no field has been filled in.
    pub fn is_blank(&self) -> bool {
        self.address1.trim().is_empty()
            && self.city.trim().is_empty()
            && self.state.trim().is_empty()
            && self.postal_code.trim().is_empty()
    }

    pub(crate) fn fill_country(&mut self, default_country: &str) {
        if self.country.as_deref().map_or(true, |c| c.trim().is_empty()) {
            self.country = Some(default_country.to_string());
        }
    }
}

/// Partial update for [`Address`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressPatch {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl AddressPatch {
    /// Shallow-merge into `address`. Returns whether anything was set.
    pub fn apply(self, address: &mut Address) -> bool {
        let mut touched = false;
        touched |= merge(&mut address.address1, self.address1);
        touched |= merge(&mut address.city, self.city);
        touched |= merge(&mut address.state, self.state);
        touched |= merge(&mut address.postal_code, self.postal_code);
        if let Some(address2) = self.address2 {
            address.address2 = Some(address2);
            touched = true;
        }
        if let Some(country) = self.country {
            address.country = Some(country);
            touched = true;
        }
        touched
    }
}

/// Billing details collected in the payment step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillingInfo {
    /// Use shipping address as billing.
    pub same_as_shipping: bool,
    /// Billing address; ignored while `same_as_shipping` is set.
    pub address: Address,
}

impl Default for BillingInfo {
    fn default() -> Self {
        Self {
            same_as_shipping: true,
            address: Address::default(),
        }
    }
}

/// Partial update for [`BillingInfo`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillingInfoPatch {
    pub same_as_shipping: Option<bool>,
    #[serde(default)]
    pub address: AddressPatch,
}

impl BillingInfoPatch {
    /// Shallow-merge into `billing`. Returns whether anything was set.
    pub fn apply(self, billing: &mut BillingInfo) -> bool {
        let mut touched = false;
        if let Some(same) = self.same_as_shipping {
            billing.same_as_shipping = same;
            touched = true;
        }
        touched | self.address.apply(&mut billing.address)
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    /// Card tokenized by the gateway's client-side component.
    Card,
    /// Wallet payment (Apple Pay, Google Pay, ...).
    Wallet,
    /// Pay by invoice.
    Invoice,
}

impl PaymentMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodKind::Card => "card",
            PaymentMethodKind::Wallet => "wallet",
            PaymentMethodKind::Invoice => "invoice",
        }
    }

    /// Whether a gateway token reference must accompany this method.
    pub fn requires_token(&self) -> bool {
        matches!(self, PaymentMethodKind::Card | PaymentMethodKind::Wallet)
    }
}

/// Payment selection. Only gateway token references are held, never card data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentInfo {
    pub method: Option<PaymentMethodKind>,
    pub token: Option<String>,
}

/// Partial update for [`PaymentInfo`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentInfoPatch {
    pub method: Option<PaymentMethodKind>,
    pub token: Option<String>,
}

impl PaymentInfoPatch {
    /// Shallow-merge into `payment`. Returns whether anything was set.
    pub fn apply(self, payment: &mut PaymentInfo) -> bool {
        let mut touched = false;
        if let Some(method) = self.method {
            payment.method = Some(method);
            touched = true;
        }
        if let Some(token) = self.token {
            payment.token = Some(token);
            touched = true;
        }
        touched
    }
}

fn merge(target: &mut String, value: Option<String>) -> bool {
    match value {
        Some(value) => {
            *target = value;
            true
        }
        None => false,
    }
}

/// Validation messages keyed per step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StepErrors {
    by_step: BTreeMap<CheckoutStep, Vec<String>>,
}

impl StepErrors {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded for a step.
    pub fn get(&self, step: CheckoutStep) -> &[String] {
        self.by_step.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the messages for a step. An empty list clears it.
    pub fn record(&mut self, step: CheckoutStep, messages: Vec<String>) {
        if messages.is_empty() {
            self.by_step.remove(&step);
        } else {
            self.by_step.insert(step, messages);
        }
    }

    /// Drop the messages for a step.
    pub fn clear(&mut self, step: CheckoutStep) {
        self.by_step.remove(&step);
    }

    /// Drop everything.
    pub fn clear_all(&mut self) {
        self.by_step.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.by_step.is_empty()
    }

    /// Whether a step has messages.
    pub fn has_errors(&self, step: CheckoutStep) -> bool {
        self.by_step.contains_key(&step)
    }

    /// Steps with messages, in flow order.
    pub fn failing_steps(&self) -> Vec<CheckoutStep> {
        self.by_step.keys().copied().collect()
    }

    /// Failing step keys joined with `, `.
    pub fn failing_steps_display(&self) -> String {
        self.by_step
            .keys()
            .map(CheckoutStep::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Iterate over `(step, messages)` in flow order.
    pub fn iter(&self) -> impl Iterator<Item = (CheckoutStep, &[String])> {
        self.by_step
            .iter()
            .map(|(step, messages)| (*step, messages.as_slice()))
    }
}

/// Serializable snapshot of an in-progress checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutData {
    pub customer: CustomerInfo,
    pub shipping: Address,
    pub billing: BillingInfo,
    pub payment: PaymentInfo,
    /// Code the customer entered, resolved or not.
    pub discount_code: Option<String>,
    /// Plan, selections, items and the resolved discount.
    pub cart: CartContents,
    /// Pricing of `cart` at snapshot time.
    pub pricing: OrderPricing,
    pub step: CheckoutStep,
    pub errors: StepErrors,
    /// Payment session reference once submitted.
    pub submitted: Option<String>,
}

impl CheckoutData {
    /// A fresh checkout with nothing filled in.
    pub fn new(currency: Currency) -> Self {
        Self {
            customer: CustomerInfo::default(),
            shipping: Address::default(),
            billing: BillingInfo::default(),
            payment: PaymentInfo::default(),
            discount_code: None,
            cart: CartContents::default(),
            pricing: OrderPricing::zero(currency),
            step: CheckoutStep::CustomerInfo,
            errors: StepErrors::default(),
            submitted: None,
        }
    }

    /// Shipping address when billing is the same, otherwise the billing address.
    pub fn effective_billing_address(&self) -> &Address {
        if self.billing.same_as_shipping {
            &self.shipping
        } else {
            &self.billing.address
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_patch_is_shallow() {
        let mut info = CustomerInfo {
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            ..CustomerInfo::default()
        };
        let touched = CustomerInfoPatch {
            last_name: Some("Lovelace".into()),
            ..CustomerInfoPatch::default()
        }
        .apply(&mut info);

        assert!(touched);
        assert_eq!(info.email, "ada@example.com");
        assert_eq!(info.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_empty_patch_touches_nothing() {
        let mut address = Address::new("1 Main St", "Portland", "OR", "97201");
        assert!(!AddressPatch::default().apply(&mut address));
        assert_eq!(address.one_line(), "1 Main St, Portland, OR 97201");
    }

    #[test]
    fn test_fill_country() {
        let mut address = Address::new("1 Main St", "Portland", "OR", "97201");
        address.fill_country("US");
        assert_eq!(address.country.as_deref(), Some("US"));

        address.country = Some("CA".into());
        address.fill_country("US");
        assert_eq!(address.country.as_deref(), Some("CA"));
    }

    #[test]
    fn test_billing_defaults_to_shipping() {
        let mut data = CheckoutData::new(Currency::USD);
        data.shipping = Address::new("1 Main St", "Portland", "OR", "97201");
        assert_eq!(data.effective_billing_address(), &data.shipping);

        BillingInfoPatch {
            same_as_shipping: Some(false),
            address: AddressPatch {
                address1: Some("9 Side Rd".into()),
                ..AddressPatch::default()
            },
        }
        .apply(&mut data.billing);
        assert_eq!(data.effective_billing_address().address1, "9 Side Rd");
    }

    #[test]
    fn test_step_errors() {
        let mut errors = StepErrors::new();
        errors.record(CheckoutStep::Shipping, vec!["City is required".into()]);
        errors.record(CheckoutStep::CustomerInfo, vec!["Email is required".into()]);
        errors.record(CheckoutStep::Payment, Vec::new());

        assert_eq!(
            errors.failing_steps(),
            vec![CheckoutStep::CustomerInfo, CheckoutStep::Shipping]
        );
        assert_eq!(errors.failing_steps_display(), "customer_info, shipping");
        assert!(errors.get(CheckoutStep::Payment).is_empty());

        errors.clear(CheckoutStep::Shipping);
        assert!(!errors.has_errors(CheckoutStep::Shipping));
    }

    #[test]
    fn test_snapshot_serializes() {
        let data = CheckoutData::new(Currency::USD);
        let json = serde_json::to_string(&data).unwrap();
        let back: CheckoutData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
