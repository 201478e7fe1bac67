//! Variety definitions.

use crate::ids::VarietyId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// A sellable microgreens variety.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VarietyDefinition {
    /// Variety key.
    pub id: VarietyId,
    /// Display name.
    pub name: String,
    /// Price of one pack.
    pub unit_price: Money,
}

impl VarietyDefinition {
    /// Create a variety definition.
    pub fn new(id: impl Into<VarietyId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
        }
    }

    /// The standard Sprout varieties.
    pub fn standard() -> Vec<VarietyDefinition> {
        let usd = |cents| Money::new(cents, Currency::USD);
        vec![
            VarietyDefinition::new("megaMix", "Mega Mix", usd(1299)),
            VarietyDefinition::new("brassicaBlend", "Brassica Blend", usd(1299)),
            VarietyDefinition::new("sunflowerShoots", "Sunflower Shoots", usd(1199)),
            VarietyDefinition::new("peaShoots", "Pea Shoots", usd(1199)),
            VarietyDefinition::new("spicyRadish", "Spicy Radish", usd(1299)),
            VarietyDefinition::new("broccoli", "Broccoli", usd(1399)),
        ]
    }
}
