//! Newtype IDs for type-safe identifiers.
//!
//! Varieties, products, cart lines and checkouts are all keyed by strings;
//! wrapping each in its own type keeps a `VarietyId` from being passed where
//! a `ProductId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new random ID.
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a microgreens variety in the catalog (e.g. `megaMix`).
    VarietyId,
    "var"
);
define_id!(
    /// Identifier of a general (non-plan) product.
    ProductId,
    "prod"
);
define_id!(
    /// Identifier of a line in the general cart.
    LineItemId,
    "line"
);
define_id!(
    /// Identifier of one checkout.
    CheckoutId,
    "chk"
);

/// Generate a prefixed id from 64 random bits.
fn generate_id(prefix: &str) -> String {
    let bits: u64 = rand::random();
    format!("{prefix}_{bits:016x}")
}
