//! Checkout configuration.
//!
//! Rates, thresholds and gateway price references live here so that every
//! pricing call site reads them from one place. A config file looks like:
//!
//! ```toml
//! default_country = "US"
//!
//! [pricing]
//! currency = "USD"
//! flat_shipping_rate = "10.00"
//! free_shipping_threshold = "50.00"
//! tax_rate = "0.03"
//!
//! [gateway]
//! success_url = "https://sprout.example/checkout/success"
//! cancel_url = "https://sprout.example/checkout"
//!
//! [gateway.plan_prices]
//! pro = "price_pro_monthly"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::PlanType;
use crate::error::ConfigError;
use crate::ids::{ProductId, VarietyId};
use crate::money::Currency;

/// Top-level checkout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Pricing constants.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Payment gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Country applied to shipping addresses that leave it blank.
    #[serde(default = "default_country")]
    pub default_country: String,
}

fn default_country() -> String {
    "US".to_string()
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            gateway: GatewayConfig::default(),
            default_country: default_country(),
        }
    }
}

impl CheckoutConfig {
    /// Load config from a file; `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make pricing meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pricing.validate()?;
        if self.default_country.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_country",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Pricing constants consumed by the pricing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Order currency.
    #[serde(default)]
    pub currency: Currency,

    /// Shipping charged below the free-shipping threshold, in major units.
    #[serde(default = "default_flat_shipping_rate")]
    pub flat_shipping_rate: Decimal,

    /// Discounted subtotal at or above which shipping is free.
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,

    /// Tax rate as a fraction (0.03 is 3%).
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
}

fn default_flat_shipping_rate() -> Decimal {
    Decimal::new(1000, 2)
}

fn default_free_shipping_threshold() -> Decimal {
    Decimal::new(5000, 2)
}

fn default_tax_rate() -> Decimal {
    Decimal::new(3, 2)
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            flat_shipping_rate: default_flat_shipping_rate(),
            free_shipping_threshold: default_free_shipping_threshold(),
            tax_rate: default_tax_rate(),
        }
    }
}

impl PricingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.flat_shipping_rate.is_sign_negative() {
            return Err(ConfigError::Invalid {
                field: "pricing.flat_shipping_rate",
                reason: format!("{} is negative", self.flat_shipping_rate),
            });
        }
        if self.free_shipping_threshold.is_sign_negative() {
            return Err(ConfigError::Invalid {
                field: "pricing.free_shipping_threshold",
                reason: format!("{} is negative", self.free_shipping_threshold),
            });
        }
        if self.tax_rate.is_sign_negative() || self.tax_rate >= Decimal::ONE {
            return Err(ConfigError::Invalid {
                field: "pricing.tax_rate",
                reason: format!("{} is outside [0, 1)", self.tax_rate),
            });
        }
        Ok(())
    }
}

/// Payment gateway settings: redirect targets and price references.
///
/// Price reference maps are keyed by plan key, variety id or product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Where the gateway sends the customer after paying.
    #[serde(default)]
    pub success_url: String,

    /// Where the gateway sends the customer on cancel.
    #[serde(default)]
    pub cancel_url: String,

    /// Plan key to gateway price reference.
    #[serde(default)]
    pub plan_prices: BTreeMap<String, String>,

    /// Variety id to gateway price reference, for orders without a plan.
    #[serde(default)]
    pub variety_prices: BTreeMap<String, String>,

    /// Product id to gateway price reference, for general cart items.
    #[serde(default)]
    pub product_prices: BTreeMap<String, String>,
}

impl GatewayConfig {
    /// Price reference for a plan.
    pub fn plan_price(&self, plan: PlanType) -> Option<&str> {
        self.plan_prices.get(plan.as_str()).map(String::as_str)
    }

    /// Price reference for a variety.
    pub fn variety_price(&self, id: &VarietyId) -> Option<&str> {
        self.variety_prices.get(id.as_str()).map(String::as_str)
    }

    /// Price reference for a product.
    pub fn product_price(&self, id: &ProductId) -> Option<&str> {
        self.product_prices.get(id.as_str()).map(String::as_str)
    }
}
