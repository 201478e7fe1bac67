//! Checkout flow state machine.

use std::fmt;
use std::sync::Arc;

use crate::cart::{Cart, PricingEngine};
use crate::catalog::Catalog;
use crate::checkout::validation::{
    unresolved_discount_message, validate_checkout_data, validate_step,
};
use crate::checkout::{
    Address, AddressPatch, BillingInfoPatch, CheckoutData, CheckoutStep, CustomerInfoPatch,
    PaymentInfoPatch, StepErrors,
};
use crate::config::CheckoutConfig;
use crate::error::CommerceError;
use crate::ids::CheckoutId;
use crate::integrations::DiscountLookup;

/// One customer's in-progress checkout.
///
/// Owns the step data, the cart and the per-step error map. All changes go
/// through its methods; after a successful submission every mutation fails
/// with [`CommerceError::AlreadySubmitted`] until [`CheckoutFlow::reset`].
pub struct CheckoutFlow {
    id: CheckoutId,
    data: CheckoutData,
    cart: Cart,
    discounts: Arc<dyn DiscountLookup>,
    default_country: String,
}

impl fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("id", &self.id)
            .field("data", &self.data)
            .field("default_country", &self.default_country)
            .finish_non_exhaustive()
    }
}

impl CheckoutFlow {
    /// Create a new checkout flow.
    pub fn new(engine: PricingEngine, discounts: Arc<dyn DiscountLookup>) -> Self {
        let data = CheckoutData::new(engine.config().currency);
        Self {
            id: CheckoutId::generate(),
            data,
            cart: Cart::new(engine),
            discounts,
            default_country: "US".to_string(),
        }
    }

    /// Create a flow priced and defaulted by `config`.
    pub fn from_config(
        config: &CheckoutConfig,
        catalog: Arc<Catalog>,
        discounts: Arc<dyn DiscountLookup>,
    ) -> Self {
        let engine = PricingEngine::new(catalog, config.pricing.clone());
        Self::new(engine, discounts).with_default_country(config.default_country.clone())
    }

    /// Country applied to addresses left without one.
    pub fn with_default_country(mut self, country: impl Into<String>) -> Self {
        self.default_country = country.into();
        self
    }

    /// Rebuild a flow from a saved snapshot.
    ///
    /// The cart contents are checked and repriced rather than trusted.
    /// Addresses default to `US`; chain [`CheckoutFlow::with_default_country`]
    /// or use [`CheckoutFlow::restore_from_config`] for another country.
    pub fn restore(
        data: CheckoutData,
        engine: PricingEngine,
        discounts: Arc<dyn DiscountLookup>,
    ) -> Result<Self, CommerceError> {
        let cart = Cart::from_contents(engine, data.cart.clone())?;
        let mut flow = Self {
            id: CheckoutId::generate(),
            data,
            cart,
            discounts,
            default_country: "US".to_string(),
        };
        flow.sync_cart();
        Ok(flow)
    }

    /// Rebuild a flow from a saved snapshot, priced and defaulted by `config`.
    pub fn restore_from_config(
        data: CheckoutData,
        config: &CheckoutConfig,
        catalog: Arc<Catalog>,
        discounts: Arc<dyn DiscountLookup>,
    ) -> Result<Self, CommerceError> {
        let engine = PricingEngine::new(catalog, config.pricing.clone());
        Ok(Self::restore(data, engine, discounts)?
            .with_default_country(config.default_country.clone()))
    }

    pub fn id(&self) -> &CheckoutId {
        &self.id
    }

    /// Current step.
    pub fn step(&self) -> CheckoutStep {
        self.data.step
    }

    /// Step data as of now.
    pub fn data(&self) -> &CheckoutData {
        &self.data
    }

    /// Recorded errors per step.
    pub fn errors(&self) -> &StepErrors {
        &self.data.errors
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Catalog the cart is priced against.
    pub fn catalog(&self) -> &Catalog {
        self.cart.engine().catalog()
    }

    /// Owned copy of the checkout data, for persistence.
    pub fn snapshot(&self) -> CheckoutData {
        self.data.clone()
    }

    /// Whether the flow reached the submitted state.
    pub fn is_submitted(&self) -> bool {
        self.data.is_submitted()
    }

    /// Payment session reference recorded at submission.
    pub fn submission(&self) -> Option<&str> {
        self.data.submitted.as_deref()
    }

    /// Merge customer details and clear the customer info errors.
    pub fn update_customer_info(&mut self, patch: CustomerInfoPatch) -> Result<(), CommerceError> {
        self.ensure_open()?;
        patch.apply(&mut self.data.customer);
        self.data.errors.clear(CheckoutStep::CustomerInfo);
        Ok(())
    }

    /// Merge the shipping address and clear the shipping errors.
    pub fn update_shipping_info(&mut self, patch: AddressPatch) -> Result<(), CommerceError> {
        self.ensure_open()?;
        patch.apply(&mut self.data.shipping);
        self.data.shipping.fill_country(&self.default_country);
        self.data.errors.clear(CheckoutStep::Shipping);
        Ok(())
    }

    /// Merge billing details. Billing belongs to the payment step.
    pub fn update_billing_info(&mut self, patch: BillingInfoPatch) -> Result<(), CommerceError> {
        self.ensure_open()?;
        patch.apply(&mut self.data.billing);
        if !self.data.billing.same_as_shipping && !self.data.billing.address.is_blank() {
            self.data.billing.address.fill_country(&self.default_country);
        }
        self.data.errors.clear(CheckoutStep::Payment);
        Ok(())
    }

    /// Merge the payment selection and clear the payment errors.
    pub fn update_payment_info(&mut self, patch: PaymentInfoPatch) -> Result<(), CommerceError> {
        self.ensure_open()?;
        patch.apply(&mut self.data.payment);
        self.data.errors.clear(CheckoutStep::Payment);
        Ok(())
    }

    /// Change the cart. Pricing is recomputed by the cart itself and the
    /// review errors are cleared.
    ///
    /// `change` runs on a copy; if it fails, none of its calls take effect.
    pub fn edit_cart<R>(
        &mut self,
        change: impl FnOnce(&mut Cart) -> Result<R, CommerceError>,
    ) -> Result<R, CommerceError> {
        self.ensure_open()?;
        let mut next = self.cart.clone();
        let result = change(&mut next)?;
        self.cart = next;
        self.sync_cart();
        self.data.errors.clear(CheckoutStep::Review);
        Ok(result)
    }

    /// Resolve and apply a discount code.
    ///
    /// Returns whether the code resolved. On a miss the discount is unset
    /// and the review step carries the error until the code is replaced or
    /// removed.
    pub fn apply_discount_code(&mut self, code: &str) -> Result<bool, CommerceError> {
        self.ensure_open()?;
        let code = code.trim();
        let resolved = self.discounts.resolve_discount(code);
        let found = resolved.is_some();

        match resolved {
            Some(discount) => {
                tracing::info!(checkout = %self.id, code, "discount applied");
                self.cart.apply_discount(discount)?;
            }
            None => {
                tracing::warn!(checkout = %self.id, code, "unknown discount code");
                self.cart.remove_discount()?;
            }
        }

        self.data.discount_code = Some(code.to_string());
        self.sync_cart();
        if found {
            self.data.errors.clear(CheckoutStep::Review);
        } else {
            self.data
                .errors
                .record(CheckoutStep::Review, vec![unresolved_discount_message(code)]);
        }
        Ok(found)
    }

    /// Drop the entered discount code and any discount it resolved to.
    pub fn remove_discount_code(&mut self) -> Result<(), CommerceError> {
        self.ensure_open()?;
        self.cart.remove_discount()?;
        self.data.discount_code = None;
        self.sync_cart();
        self.data.errors.clear(CheckoutStep::Review);
        Ok(())
    }

    /// Validate a step against the current data and record the result.
    pub fn validate_step(&mut self, step: CheckoutStep) -> Vec<String> {
        let messages = validate_step(step, &self.data, self.cart.engine().catalog());
        self.data.errors.record(step, messages.clone());
        messages
    }

    /// Validate every step and record the results.
    pub fn validate_all(&mut self) -> StepErrors {
        let errors = validate_checkout_data(&self.data, self.cart.engine().catalog());
        self.data.errors = errors.clone();
        errors
    }

    /// Whether every step strictly before `target` is currently valid.
    pub fn can_proceed_to_step(&self, target: CheckoutStep) -> bool {
        self.blocking_steps(target).is_empty()
    }

    /// Move to `target` if every earlier step is valid.
    ///
    /// A refused move leaves the step and data untouched, records the
    /// blocking steps' messages and reports the first blocking step.
    pub fn go_to_step(&mut self, target: CheckoutStep) -> Result<(), CommerceError> {
        self.ensure_open()?;
        let blocking = self.blocking_steps(target);

        if let Some(first) = blocking.first().map(|(step, _)| *step) {
            tracing::warn!(
                checkout = %self.id,
                from = %self.data.step,
                to = %target,
                blocking = %first,
                "step unreachable"
            );
            for (step, messages) in blocking {
                self.data.errors.record(step, messages);
            }
            return Err(CommerceError::StepUnreachable {
                from: self.data.step,
                to: target,
                blocking: first,
            });
        }

        if self.data.step != target {
            tracing::info!(checkout = %self.id, from = %self.data.step, to = %target, "step changed");
            self.data.step = target;
        }
        Ok(())
    }

    /// Advance to the next step. On the last step this stays put.
    pub fn advance(&mut self) -> Result<CheckoutStep, CommerceError> {
        if let Some(next) = self.data.step.next() {
            self.go_to_step(next)?;
        }
        Ok(self.data.step)
    }

    /// Go back to the previous step. On the first step this stays put.
    pub fn go_back(&mut self) -> Result<CheckoutStep, CommerceError> {
        if let Some(prev) = self.data.step.prev() {
            self.go_to_step(prev)?;
        }
        Ok(self.data.step)
    }

    /// True iff the step validates cleanly and its minimum data is present.
    pub fn is_step_completed(&self, step: CheckoutStep) -> bool {
        self.has_minimum_data(step)
            && validate_step(step, &self.data, self.cart.engine().catalog()).is_empty()
    }

    /// Steps that validate cleanly and hold their minimum data, in order.
    pub fn completed_steps(&self) -> Vec<CheckoutStep> {
        CheckoutStep::ALL
            .into_iter()
            .filter(|step| self.is_step_completed(*step))
            .collect()
    }

    /// Get the effective billing address.
    pub fn effective_billing_address(&self) -> &Address {
        self.data.effective_billing_address()
    }

    /// Get progress percentage.
    pub fn progress_percent(&self) -> u8 {
        let total = CheckoutStep::ALL.len() as u8;
        self.data.step.number() * 100 / total
    }

    /// Discard everything and start over on the first step.
    ///
    /// The checkout id is kept; the cart is emptied including its plan.
    pub fn reset(&mut self) {
        let engine = self.cart.engine().clone();
        self.data = CheckoutData::new(engine.config().currency);
        self.cart = Cart::new(engine);
        tracing::debug!(checkout = %self.id, "checkout reset");
    }

    /// Enter the terminal submitted state, discarding the collected data.
    pub(crate) fn mark_submitted(&mut self, session_id: String) {
        self.reset();
        self.data.submitted = Some(session_id);
    }

    /// Move to review without validation. Only for callers that just
    /// validated every step.
    pub(crate) fn enter_review(&mut self) {
        self.data.step = CheckoutStep::Review;
    }

    fn ensure_open(&self) -> Result<(), CommerceError> {
        if self.data.is_submitted() {
            return Err(CommerceError::AlreadySubmitted);
        }
        Ok(())
    }

    fn sync_cart(&mut self) {
        self.data.cart = self.cart.contents().clone();
        self.data.pricing = self.cart.pricing().clone();
    }

    fn blocking_steps(&self, target: CheckoutStep) -> Vec<(CheckoutStep, Vec<String>)> {
        let catalog = self.cart.engine().catalog();
        target
            .predecessors()
            .map(|step| (step, validate_step(step, &self.data, catalog)))
            .filter(|(_, messages)| !messages.is_empty())
            .collect()
    }

    fn has_minimum_data(&self, step: CheckoutStep) -> bool {
        let data = &self.data;
        match step {
            CheckoutStep::CustomerInfo => !data.customer.email.trim().is_empty(),
            CheckoutStep::Shipping => !data.shipping.is_blank(),
            CheckoutStep::Payment => data.payment.method.is_some(),
            CheckoutStep::Review => !data.cart.is_empty(),
        }
    }
}
