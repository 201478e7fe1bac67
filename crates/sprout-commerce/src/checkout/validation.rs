//! Per-step validation rules.
//!
//! Each step has a static schema of `(Field, Rule)` pairs that is evaluated
//! uniformly; adding a rule is adding a row. Checks that span several values
//! (payment method, plan pack counts, discount resolution) run after the
//! schema rows for their step.

use crate::catalog::{Catalog, PackRequirement};
use crate::checkout::{Address, CheckoutData, CheckoutStep, StepErrors};

/// A single field a rule can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    FirstName,
    LastName,
    Phone,
    Shipping(AddressField),
    Billing(AddressField),
    PaymentToken,
}

/// A field within an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Address1,
    City,
    State,
    PostalCode,
}

/// A check applied to a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Non-empty after trimming.
    Required,
    /// Shaped like `local@domain.tld`.
    Email,
    /// At least this many characters after trimming.
    MinLength(usize),
    /// Not a raw card number (13 to 19 digits, spaces and dashes ignored).
    NotCardNumber,
}

const CUSTOMER_INFO_RULES: &[(Field, Rule)] = &[
    (Field::Email, Rule::Required),
    (Field::Email, Rule::Email),
    (Field::FirstName, Rule::Required),
    (Field::LastName, Rule::Required),
    (Field::Phone, Rule::Required),
];

const SHIPPING_RULES: &[(Field, Rule)] = &[
    (Field::Shipping(AddressField::Address1), Rule::Required),
    (Field::Shipping(AddressField::City), Rule::Required),
    (Field::Shipping(AddressField::State), Rule::Required),
    (Field::Shipping(AddressField::State), Rule::MinLength(2)),
    (Field::Shipping(AddressField::PostalCode), Rule::Required),
    (Field::Shipping(AddressField::PostalCode), Rule::MinLength(5)),
];

const BILLING_RULES: &[(Field, Rule)] = &[
    (Field::Billing(AddressField::Address1), Rule::Required),
    (Field::Billing(AddressField::City), Rule::Required),
    (Field::Billing(AddressField::State), Rule::Required),
    (Field::Billing(AddressField::State), Rule::MinLength(2)),
    (Field::Billing(AddressField::PostalCode), Rule::Required),
    (Field::Billing(AddressField::PostalCode), Rule::MinLength(5)),
];

const TOKEN_RULES: &[(Field, Rule)] = &[
    (Field::PaymentToken, Rule::Required),
    (Field::PaymentToken, Rule::NotCardNumber),
];

impl Field {
    /// Human-readable field name used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Email => "Email",
            Field::FirstName => "First name",
            Field::LastName => "Last name",
            Field::Phone => "Phone",
            Field::Shipping(field) => field.label(),
            Field::Billing(field) => match field {
                AddressField::Address1 => "Billing address",
                AddressField::City => "Billing city",
                AddressField::State => "Billing state",
                AddressField::PostalCode => "Billing postal code",
            },
            Field::PaymentToken => "Payment token",
        }
    }

    fn value<'a>(&self, data: &'a CheckoutData) -> &'a str {
        match self {
            Field::Email => &data.customer.email,
            Field::FirstName => &data.customer.first_name,
            Field::LastName => &data.customer.last_name,
            Field::Phone => &data.customer.phone,
            Field::Shipping(field) => field.value(&data.shipping),
            Field::Billing(field) => field.value(&data.billing.address),
            Field::PaymentToken => data.payment.token.as_deref().unwrap_or(""),
        }
    }
}

impl AddressField {
    pub fn label(&self) -> &'static str {
        match self {
            AddressField::Address1 => "Address",
            AddressField::City => "City",
            AddressField::State => "State",
            AddressField::PostalCode => "Postal code",
        }
    }

    fn value<'a>(&self, address: &'a Address) -> &'a str {
        match self {
            AddressField::Address1 => &address.address1,
            AddressField::City => &address.city,
            AddressField::State => &address.state,
            AddressField::PostalCode => &address.postal_code,
        }
    }
}

impl Rule {
    /// The message for `field` when `value` breaks this rule.
    ///
    /// Only `Required` fires on an empty value, so a blank field gets a
    /// single message.
    pub fn check(&self, field: Field, value: &str) -> Option<String> {
        let value = value.trim();
        let label = field.label();
        match self {
            Rule::Required if value.is_empty() => Some(format!("{label} is required")),
            Rule::Required => None,
            _ if value.is_empty() => None,
            Rule::Email if !is_email_shaped(value) => {
                Some(format!("{label} must be a valid email address"))
            }
            Rule::MinLength(min) if value.chars().count() < *min => {
                Some(format!("{label} must be at least {min} characters"))
            }
            Rule::NotCardNumber if looks_like_card_number(value) => Some(format!(
                "{label} must be a payment gateway reference, not card details"
            )),
            _ => None,
        }
    }
}

fn apply_rules(rules: &[(Field, Rule)], data: &CheckoutData, errors: &mut Vec<String>) {
    errors.extend(
        rules
            .iter()
            .filter_map(|(field, rule)| rule.check(*field, field.value(data))),
    );
}

/// Validate one step. An empty list means the step is valid.
pub fn validate_step(step: CheckoutStep, data: &CheckoutData, catalog: &Catalog) -> Vec<String> {
    let mut errors = Vec::new();
    match step {
        CheckoutStep::CustomerInfo => apply_rules(CUSTOMER_INFO_RULES, data, &mut errors),
        CheckoutStep::Shipping => apply_rules(SHIPPING_RULES, data, &mut errors),
        CheckoutStep::Payment => {
            match data.payment.method {
                None => errors.push("Payment method is required".to_string()),
                Some(method) if method.requires_token() => {
                    apply_rules(TOKEN_RULES, data, &mut errors)
                }
                Some(_) => {
                    // Tokens are optional here but still never card numbers.
                    apply_rules(&TOKEN_RULES[1..], data, &mut errors)
                }
            }
            if !data.billing.same_as_shipping {
                apply_rules(BILLING_RULES, data, &mut errors);
            }
        }
        CheckoutStep::Review => validate_review(data, catalog, &mut errors),
    }
    errors
}

fn validate_review(data: &CheckoutData, catalog: &Catalog, errors: &mut Vec<String>) {
    for prior in CheckoutStep::Review.predecessors() {
        if !validate_step(prior, data, catalog).is_empty() {
            errors.push(format!("{} step has errors", prior.display_name()));
        }
    }

    if data.cart.is_empty() {
        errors.push("Cart is empty".to_string());
    }

    if let Some(plan_type) = data.cart.plan {
        match catalog.plan(plan_type) {
            Ok(plan) => {
                let selected = data.cart.total_packs();
                match plan.pack_requirement {
                    PackRequirement::Exactly(required) if selected != required => {
                        errors.push(format!(
                            "The {} plan requires exactly {required} packs; {selected} selected",
                            plan.name
                        ));
                    }
                    PackRequirement::OpenEnded if selected == 0 => {
                        errors.push(format!(
                            "The {} plan requires at least one pack",
                            plan.name
                        ));
                    }
                    _ => {}
                }
            }
            Err(_) => errors.push(format!("Unknown plan: {plan_type}")),
        }
    }

    if let Some(code) = &data.discount_code {
        if data.cart.discount.is_none() {
            errors.push(unresolved_discount_message(code));
        }
    }
}

pub(crate) fn unresolved_discount_message(code: &str) -> String {
    format!("Discount code {code} is not valid")
}

/// Validate every step at once.
pub fn validate_checkout_data(data: &CheckoutData, catalog: &Catalog) -> StepErrors {
    let mut errors = StepErrors::new();
    for step in CheckoutStep::ALL {
        errors.record(step, validate_step(step, data, catalog));
    }
    errors
}

/// Minimal `local@domain.tld` shape check; deliverability is the mail
/// provider's problem.
fn is_email_shaped(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn looks_like_card_number(value: &str) -> bool {
    let digits: Vec<char> = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    (13..=19).contains(&digits.len()) && digits.iter().all(char::is_ascii_digit)
}
