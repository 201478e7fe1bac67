use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sprout_commerce::integrations::MockPaymentGateway;
use sprout_commerce::prelude::*;
use testresult::TestResult;

fn engine() -> PricingEngine {
    PricingEngine::new(Arc::new(Catalog::standard()), PricingConfig::default())
}

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        success_url: "https://sprout.example/checkout/success".into(),
        cancel_url: "https://sprout.example/checkout".into(),
        plan_prices: BTreeMap::from([("pro".to_string(), "price_pro".to_string())]),
        variety_prices: BTreeMap::from([
            ("megaMix".to_string(), "price_mega".to_string()),
            ("brassicaBlend".to_string(), "price_brassica".to_string()),
        ]),
        product_prices: BTreeMap::new(),
    }
}

fn filled_flow() -> Result<CheckoutFlow, CommerceError> {
    let discounts = StaticDiscounts::new().with(Discount::percentage(
        "SPROUT10",
        "10% Off",
        Decimal::TEN,
    ));
    let mut flow = CheckoutFlow::new(engine(), Arc::new(discounts));
    flow.update_customer_info(CustomerInfoPatch {
        email: Some("grower@example.com".into()),
        first_name: Some("Sam".into()),
        last_name: Some("Green".into()),
        phone: Some("+44 20 7946 0958".into()),
    })?;
    flow.update_shipping_info(AddressPatch {
        address1: Some("1 Main St".into()),
        city: Some("Portland".into()),
        state: Some("OR".into()),
        postal_code: Some("97201".into()),
        ..AddressPatch::default()
    })?;
    flow.update_payment_info(PaymentInfoPatch {
        method: Some(PaymentMethodKind::Card),
        token: Some("tok_1Nv0".into()),
    })?;
    flow.edit_cart(|cart| cart.set_variety_quantity(&VarietyId::new("megaMix"), 2))?;
    Ok(flow)
}

#[test]
fn flat_shipping_below_threshold() -> TestResult {
    let pricing = engine().calculate_order_pricing(&[VarietySelection::new("megaMix", 2)], None)?;
    let summary = pricing.summary();

    assert_eq!(summary.subtotal.display(), "$25.98");
    assert_eq!(summary.shipping.display(), "$10.00");
    assert_eq!(summary.tax.display(), "$1.08");
    assert_eq!(summary.total.display(), "$37.06");
    Ok(())
}

#[test]
fn free_shipping_at_threshold() -> TestResult {
    let pricing = engine().calculate_order_pricing(
        &[
            VarietySelection::new("megaMix", 2),
            VarietySelection::new("brassicaBlend", 3),
        ],
        None,
    )?;
    let summary = pricing.summary();

    assert_eq!(summary.subtotal.display(), "$64.95");
    assert!(summary.shipping.is_zero());
    assert_eq!(summary.tax.display(), "$1.95");
    assert_eq!(summary.total.display(), "$66.90");
    Ok(())
}

#[test]
fn review_unreachable_with_empty_email() -> TestResult {
    let mut flow = filled_flow()?;
    flow.update_customer_info(CustomerInfoPatch {
        email: Some(String::new()),
        ..CustomerInfoPatch::default()
    })?;
    let step_before = flow.step();
    let shipping_before = flow.data().shipping.clone();

    let result = flow.go_to_step(CheckoutStep::Review);

    assert!(matches!(
        result,
        Err(CommerceError::StepUnreachable {
            blocking: CheckoutStep::CustomerInfo,
            ..
        })
    ));
    assert_eq!(flow.step(), step_before);
    assert_eq!(flow.data().shipping, shipping_before);
    assert!(flow
        .errors()
        .get(CheckoutStep::CustomerInfo)
        .iter()
        .any(|message| message == "Email is required"));
    Ok(())
}

#[test]
fn pro_plan_needs_exactly_four_packs() -> TestResult {
    let mut flow = filled_flow()?;
    flow.edit_cart(|cart| {
        cart.set_plan(Some(PlanType::Pro))?;
        cart.set_variety_quantity(&VarietyId::new("megaMix"), 2)?;
        cart.set_variety_quantity(&VarietyId::new("brassicaBlend"), 1)
    })?;

    assert!(!flow.is_step_completed(CheckoutStep::Review));
    let messages = flow.validate_step(CheckoutStep::Review);
    assert_eq!(messages, vec!["The Pro plan requires exactly 4 packs; 3 selected"]);

    flow.edit_cart(|cart| cart.set_variety_quantity(&VarietyId::new("brassicaBlend"), 2))?;
    assert!(flow.is_step_completed(CheckoutStep::Review));
    Ok(())
}

#[test]
fn setting_quantity_twice_matches_setting_once() -> TestResult {
    let mut once = Cart::new(engine());
    once.set_variety_quantity(&VarietyId::new("peaShoots"), 3)?;

    let mut twice = Cart::new(engine());
    twice.set_variety_quantity(&VarietyId::new("peaShoots"), 3)?;
    twice.set_variety_quantity(&VarietyId::new("peaShoots"), 3)?;

    assert_eq!(once.contents(), twice.contents());
    assert_eq!(once.pricing(), twice.pricing());
    Ok(())
}

#[test]
fn review_gated_while_any_prior_step_invalid() -> TestResult {
    let mut flow = filled_flow()?;
    assert!(flow.can_proceed_to_step(CheckoutStep::Review));

    flow.update_payment_info(PaymentInfoPatch {
        token: Some("4111111111111111".into()),
        ..PaymentInfoPatch::default()
    })?;
    assert!(!flow.can_proceed_to_step(CheckoutStep::Review));
    Ok(())
}

/// Gateway that yields once before answering, so a second submit can
/// arrive while the first is outstanding.
#[derive(Default)]
struct YieldingGateway {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl PaymentGateway for YieldingGateway {
    async fn create_payment_session(
        &self,
        request: PaymentSessionRequest,
    ) -> Result<PaymentSession, GatewayError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        if self.fail {
            return Err(GatewayError::new("rate_limited", "Too many requests"));
        }
        let checkout = request
            .metadata
            .get("checkout_id")
            .cloned()
            .unwrap_or_default();
        Ok(PaymentSession {
            session_id: format!("cs_{call}"),
            redirect_url: format!("https://pay.example/{checkout}"),
        })
    }
}

#[tokio::test]
async fn concurrent_submit_is_rejected() -> TestResult {
    let gateway = Arc::new(YieldingGateway::default());
    let session = CheckoutSession::new(
        filled_flow()?,
        gateway.clone(),
        Arc::new(AnonymousIdentity),
        gateway_config(),
    );

    let (first, second) = tokio::join!(session.submit(), session.submit());

    assert_eq!(first?.session_id, "cs_1");
    assert!(matches!(second, Err(CommerceError::Conflict(_))));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    session.read(|flow| assert_eq!(flow.submission(), Some("cs_1")));
    Ok(())
}

#[tokio::test]
async fn concurrent_submit_does_not_mask_gateway_failure() -> TestResult {
    let gateway = Arc::new(YieldingGateway {
        fail: true,
        ..YieldingGateway::default()
    });
    let session = CheckoutSession::new(
        filled_flow()?,
        gateway.clone(),
        Arc::new(AnonymousIdentity),
        gateway_config(),
    );

    let (first, second) = tokio::join!(session.submit(), session.submit());

    assert!(matches!(first, Err(CommerceError::Gateway(ref e)) if e.code == "rate_limited"));
    assert!(matches!(second, Err(CommerceError::Conflict(_))));
    session.read(|flow| {
        assert_eq!(flow.step(), CheckoutStep::Review);
        assert!(!flow.is_submitted());
    });

    // The flag is released, so the customer can retry.
    assert!(!session.is_submitting());
    assert!(matches!(
        session.submit().await,
        Err(CommerceError::Gateway(_))
    ));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn discount_flows_into_gateway_metadata() -> TestResult {
    let mut flow = filled_flow()?;
    assert!(flow.apply_discount_code("sprout10")?);

    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_payment_session()
        .withf(|request| {
            request.metadata.get("discount_code").map(String::as_str) == Some("SPROUT10")
        })
        .times(1)
        .returning(|_| {
            Ok(PaymentSession {
                session_id: "cs_discount".into(),
                redirect_url: "https://pay.example/cs_discount".into(),
            })
        });

    let session = CheckoutSession::new(
        flow,
        Arc::new(gateway),
        Arc::new(AnonymousIdentity),
        gateway_config(),
    );
    session.submit().await?;
    Ok(())
}

#[tokio::test]
async fn checkout_survives_a_store_round_trip() -> TestResult {
    let store = InMemoryCheckoutStore::new();
    let id = SessionId::generate();

    let session = CheckoutSession::new(
        filled_flow()?,
        Arc::new(MockPaymentGateway::new()),
        Arc::new(AnonymousIdentity),
        gateway_config(),
    );
    session.save_to(&store, &id).await?;

    let data = store
        .load_checkout_data(&id)
        .await?
        .ok_or("checkout was not saved")?;
    let restored = CheckoutFlow::restore(data, engine(), Arc::new(StaticDiscounts::new()))?;

    assert_eq!(restored.data(), &session.snapshot());
    assert!(restored.can_proceed_to_step(CheckoutStep::Review));
    assert_eq!(restored.cart().pricing().summary().total.amount_cents, 3706);
    Ok(())
}
