//! Product catalog module.
//!
//! Static plan and variety definitions. A [`Catalog`] is built once at
//! startup, wrapped in an `Arc` and shared read-only by every checkout.

mod plan;
mod variety;

pub use plan::{PackRequirement, PlanConfiguration, PlanType};
pub use variety::VarietyDefinition;

use std::collections::BTreeMap;

use crate::error::CommerceError;
use crate::ids::VarietyId;

/// Lookup table of plans and varieties.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    plans: BTreeMap<PlanType, PlanConfiguration>,
    varieties: BTreeMap<VarietyId, VarietyDefinition>,
}

impl Catalog {
    /// Build a catalog from explicit definitions. Later duplicates win.
    pub fn new(
        plans: impl IntoIterator<Item = PlanConfiguration>,
        varieties: impl IntoIterator<Item = VarietyDefinition>,
    ) -> Self {
        Self {
            plans: plans.into_iter().map(|p| (p.plan_type, p)).collect(),
            varieties: varieties.into_iter().map(|v| (v.id.clone(), v)).collect(),
        }
    }

    /// The standard Sprout catalog.
    pub fn standard() -> Self {
        Self::new(PlanConfiguration::standard(), VarietyDefinition::standard())
    }

    /// Look up a plan.
    ///
    /// A miss means the caller holds a key outside the catalog's closed set.
    pub fn plan(&self, plan_type: PlanType) -> Result<&PlanConfiguration, CommerceError> {
        self.plans.get(&plan_type).ok_or_else(|| {
            tracing::error!(plan = %plan_type, "plan missing from catalog");
            CommerceError::NotFound(format!("plan {plan_type}"))
        })
    }

    /// Look up a variety.
    pub fn variety(&self, id: &VarietyId) -> Result<&VarietyDefinition, CommerceError> {
        self.varieties.get(id).ok_or_else(|| {
            tracing::error!(variety = %id, "variety missing from catalog");
            CommerceError::NotFound(format!("variety {id}"))
        })
    }

    /// Check whether a variety exists without logging a miss.
    pub fn contains_variety(&self, id: &VarietyId) -> bool {
        self.varieties.contains_key(id)
    }

    /// Varieties in id order.
    pub fn varieties(&self) -> impl Iterator<Item = &VarietyDefinition> {
        self.varieties.values()
    }

    /// Plans, cheapest tier first.
    pub fn plans(&self) -> impl Iterator<Item = &PlanConfiguration> {
        self.plans.values()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
