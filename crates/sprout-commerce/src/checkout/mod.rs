//! Checkout module.
//!
//! Contains the step model, the per-step data slices, validation rules,
//! the checkout state machine and the async submission wrapper.

mod data;
mod flow;
mod session;
mod step;
pub mod validation;

pub use data::{
    Address, AddressPatch, BillingInfo, BillingInfoPatch, CheckoutData, CustomerInfo,
    CustomerInfoPatch, PaymentInfo, PaymentInfoPatch, PaymentMethodKind, StepErrors,
};
pub use flow::CheckoutFlow;
pub use session::CheckoutSession;
pub use step::CheckoutStep;
pub use validation::{validate_checkout_data, validate_step};
