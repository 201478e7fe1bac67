//! Commerce error types.

use thiserror::Error;

use crate::checkout::{CheckoutStep, StepErrors};

/// Errors that can occur in checkout, cart and pricing operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommerceError {
    /// One or more checkout steps failed validation.
    #[error("Checkout has validation errors in: {}", .0.failing_steps_display())]
    Validation(StepErrors),

    /// Navigation to a step whose predecessors are not valid.
    #[error("Cannot go from {from} to {to}: {blocking} is incomplete")]
    StepUnreachable {
        from: CheckoutStep,
        to: CheckoutStep,
        blocking: CheckoutStep,
    },

    /// A required mapping (e.g. plan to price reference) is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The payment gateway rejected or failed the request.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A submission is already in progress for this checkout.
    #[error("Already processing: {0}")]
    Conflict(String),

    /// The checkout was already submitted and can no longer change.
    #[error("Checkout already submitted")]
    AlreadySubmitted,

    /// A catalog key that should exist does not.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A selection references a variety the catalog does not define.
    #[error("Unknown variety: {0}")]
    UnknownVariety(String),

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// The persisted session store failed.
    #[error("Session store error: {0}")]
    Store(String),
}

impl CommerceError {
    /// Whether the error reflects a caller defect rather than user input or
    /// an external failure.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            CommerceError::NotFound(_)
                | CommerceError::UnknownVariety(_)
                | CommerceError::InvalidQuantity(_)
        )
    }
}

/// Failure reported by the payment gateway, surfaced verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Payment gateway error ({code}): {message}")]
pub struct GatewayError {
    /// Provider error code.
    pub code: String,
    /// Provider message.
    pub message: String,
}

impl GatewayError {
    /// Create a gateway error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors loading checkout configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse failure.
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse failure.
    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A value parsed but is out of range.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
