//! Subscription plan definitions.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Pick any number of packs.
    Starter,
    /// Fixed box of packs.
    Pro,
    /// Larger fixed box.
    Elite,
}

impl PlanType {
    /// All plan types, cheapest first.
    pub const ALL: [PlanType; 3] = [PlanType::Starter, PlanType::Pro, PlanType::Elite];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Starter => "starter",
            PlanType::Pro => "pro",
            PlanType::Elite => "elite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "starter" => Some(PlanType::Starter),
            "pro" => Some(PlanType::Pro),
            "elite" => Some(PlanType::Elite),
            _ => None,
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many packs a plan requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackRequirement {
    /// Any positive number of packs.
    OpenEnded,
    /// Exactly this many packs, no more and no less.
    Exactly(u32),
}

impl PackRequirement {
    /// Check a selected pack count against the requirement.
    pub fn is_satisfied_by(&self, packs: u32) -> bool {
        match self {
            PackRequirement::OpenEnded => packs > 0,
            PackRequirement::Exactly(required) => packs == *required,
        }
    }

    /// The fixed count, if any.
    pub fn exact(&self) -> Option<u32> {
        match self {
            PackRequirement::OpenEnded => None,
            PackRequirement::Exactly(n) => Some(*n),
        }
    }
}

/// A subscription plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanConfiguration {
    /// Plan key.
    pub plan_type: PlanType,
    /// Display name.
    pub name: String,
    /// Pack count the customer must choose.
    pub pack_requirement: PackRequirement,
    /// Advertised price of one pack on this plan, for display only.
    ///
    /// Order pricing uses each variety's own price, and the gateway charges
    /// plan orders through the configured plan price reference.
    pub price_per_pack: Money,
}

impl PlanConfiguration {
    /// Create a plan definition.
    pub fn new(
        plan_type: PlanType,
        name: impl Into<String>,
        pack_requirement: PackRequirement,
        price_per_pack: Money,
    ) -> Self {
        Self {
            plan_type,
            name: name.into(),
            pack_requirement,
            price_per_pack,
        }
    }

    /// The standard Sprout plans.
    pub fn standard() -> Vec<PlanConfiguration> {
        vec![
            PlanConfiguration::new(
                PlanType::Starter,
                "Starter",
                PackRequirement::OpenEnded,
                Money::new(1299, Currency::USD),
            ),
            PlanConfiguration::new(
                PlanType::Pro,
                "Pro",
                PackRequirement::Exactly(4),
                Money::new(1199, Currency::USD),
            ),
            PlanConfiguration::new(
                PlanType::Elite,
                "Elite",
                PackRequirement::Exactly(6),
                Money::new(1099, Currency::USD),
            ),
        ]
    }
}
