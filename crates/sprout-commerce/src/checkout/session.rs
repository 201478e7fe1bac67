//! Checkout session: a flow plus the collaborators needed to submit it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::checkout::{CheckoutData, CheckoutFlow};
use crate::config::GatewayConfig;
use crate::error::CommerceError;
use crate::integrations::{
    IdentityProvider, PaymentGateway, PaymentLineItem, PaymentSession, PaymentSessionRequest,
};
use crate::store::{CheckoutStore, SessionId};

/// Owns one [`CheckoutFlow`] and performs its terminal submission.
///
/// Only one `submit` may be outstanding at a time; a concurrent call is
/// rejected with [`CommerceError::Conflict`] rather than queued. While a
/// submission is in flight the flow cannot be edited or cancelled.
pub struct CheckoutSession {
    flow: Mutex<CheckoutFlow>,
    in_flight: AtomicBool,
    gateway: Arc<dyn PaymentGateway>,
    identity: Arc<dyn IdentityProvider>,
    config: GatewayConfig,
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutSession {
    pub fn new(
        flow: CheckoutFlow,
        gateway: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityProvider>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            flow: Mutex::new(flow),
            in_flight: AtomicBool::new(false),
            gateway,
            identity,
            config,
        }
    }

    /// Whether a submission is outstanding.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Read the flow.
    pub fn read<R>(&self, f: impl FnOnce(&CheckoutFlow) -> R) -> R {
        f(&self.lock())
    }

    /// Change the flow. Fails with `Conflict` while a submission is in flight.
    pub fn edit<R>(
        &self,
        f: impl FnOnce(&mut CheckoutFlow) -> Result<R, CommerceError>,
    ) -> Result<R, CommerceError> {
        let mut flow = self.lock();
        self.ensure_idle()?;
        f(&mut flow)
    }

    /// Owned copy of the checkout data.
    pub fn snapshot(&self) -> CheckoutData {
        self.lock().snapshot()
    }

    /// Abandon the checkout and start over.
    pub fn cancel(&self) -> Result<(), CommerceError> {
        let mut flow = self.lock();
        self.ensure_idle()?;
        tracing::info!(checkout = %flow.id(), "checkout cancelled");
        flow.reset();
        Ok(())
    }

    /// Persist the current checkout data.
    pub async fn save_to(
        &self,
        store: &dyn CheckoutStore,
        id: &SessionId,
    ) -> Result<(), CommerceError> {
        let data = self.snapshot();
        store.save_checkout_data(id, &data).await
    }

    /// Validate everything and hand the order to the payment gateway.
    ///
    /// On validation errors the gateway is never contacted. On a gateway
    /// failure the flow stays on review so the customer can retry. On
    /// success the flow enters the submitted state and its data is reset.
    pub async fn submit(&self) -> Result<PaymentSession, CommerceError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("submit rejected: already processing");
            return Err(CommerceError::Conflict("checkout submission".to_string()));
        }
        let _guard = InFlightGuard(&self.in_flight);

        let (checkout_id, mut request) = {
            let mut flow = self.lock();
            if flow.is_submitted() {
                return Err(CommerceError::AlreadySubmitted);
            }

            let errors = flow.validate_all();
            if !errors.is_empty() {
                tracing::warn!(
                    checkout = %flow.id(),
                    steps = %errors.failing_steps_display(),
                    "submit blocked by validation errors"
                );
                return Err(CommerceError::Validation(errors));
            }

            flow.enter_review();
            let request = payment_request(&flow, &self.config)?;
            (flow.id().clone(), request)
        };

        if let Some(user) = self.identity.current_user().await {
            request.metadata.insert("user_id".to_string(), user.id);
        }

        match self.gateway.create_payment_session(request).await {
            Ok(session) => {
                tracing::info!(
                    checkout = %checkout_id,
                    session_id = %session.session_id,
                    "checkout submitted"
                );
                self.lock().mark_submitted(session.session_id.clone());
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(
                    checkout = %checkout_id,
                    code = %err.code,
                    error = %err.message,
                    "payment gateway rejected checkout"
                );
                Err(CommerceError::Gateway(err))
            }
        }
    }

    /// Checked with the flow locked: `submit` raises the flag before it
    /// first locks, so an edit either lands before the request is built or
    /// sees the flag.
    fn ensure_idle(&self) -> Result<(), CommerceError> {
        if self.is_submitting() {
            return Err(CommerceError::Conflict("checkout submission".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, CheckoutFlow> {
        self.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build the gateway request for a validated flow.
///
/// Plan orders become one line for the plan with the pack count as
/// quantity; otherwise each selected variety is its own line. General cart
/// items are always listed per product.
fn payment_request(
    flow: &CheckoutFlow,
    config: &GatewayConfig,
) -> Result<PaymentSessionRequest, CommerceError> {
    let contents = flow.cart().contents();
    let mut line_items = Vec::new();

    if let Some(plan) = contents.plan {
        let price_ref = config.plan_price(plan).ok_or_else(|| {
            missing_config(format!("no gateway price reference for plan {plan}"))
        })?;
        line_items.push(PaymentLineItem {
            price_ref: price_ref.to_string(),
            quantity: contents.total_packs(),
        });
    } else {
        for selection in contents.selections().into_iter().filter(|s| s.quantity > 0) {
            let price_ref = config.variety_price(&selection.variety_id).ok_or_else(|| {
                missing_config(format!(
                    "no gateway price reference for variety {}",
                    selection.variety_id
                ))
            })?;
            line_items.push(PaymentLineItem {
                price_ref: price_ref.to_string(),
                quantity: selection.quantity,
            });
        }
    }

    for item in &contents.items {
        let price_ref = config.product_price(&item.product_id).ok_or_else(|| {
            missing_config(format!(
                "no gateway price reference for product {}",
                item.product_id
            ))
        })?;
        let quantity = u32::try_from(item.quantity)
            .map_err(|_| CommerceError::InvalidQuantity(item.quantity))?;
        line_items.push(PaymentLineItem {
            price_ref: price_ref.to_string(),
            quantity,
        });
    }

    if config.success_url.is_empty() || config.cancel_url.is_empty() {
        return Err(missing_config(
            "gateway success and cancel urls must be set".to_string(),
        ));
    }

    let data = flow.data();
    let summary = data.pricing.summary();
    let mut metadata = BTreeMap::new();
    metadata.insert("checkout_id".to_string(), flow.id().to_string());
    metadata.insert("customer_email".to_string(), data.customer.email.clone());
    metadata.insert("total".to_string(), summary.total.display_amount());
    metadata.insert(
        "currency".to_string(),
        summary.total.currency.code().to_string(),
    );
    if let Some(plan) = contents.plan {
        metadata.insert("plan".to_string(), plan.as_str().to_string());
    }
    let selections = contents.selection_summary();
    if !selections.is_empty() {
        metadata.insert("selections".to_string(), selections);
    }
    if let Some(code) = &data.pricing.discount_code {
        metadata.insert("discount_code".to_string(), code.clone());
    }

    Ok(PaymentSessionRequest {
        line_items,
        success_url: config.success_url.clone(),
        cancel_url: config.cancel_url.clone(),
        metadata,
    })
}

fn missing_config(message: String) -> CommerceError {
    tracing::error!(%message, "checkout configuration incomplete");
    CommerceError::Configuration(message)
}
