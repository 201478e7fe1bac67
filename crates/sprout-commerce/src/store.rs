//! Persisted checkout sessions.
//!
//! The core works without persistence; a [`CheckoutStore`] only lets a
//! caller park a [`CheckoutData`] snapshot between requests and restore it
//! later with [`CheckoutFlow::restore`](crate::checkout::CheckoutFlow::restore).

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::checkout::CheckoutData;
use crate::error::CommerceError;

/// A unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random, URL-safe session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the session ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Storage for checkout snapshots keyed by session.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Load a snapshot, `None` if the session has nothing saved.
    async fn load_checkout_data(&self, id: &SessionId)
        -> Result<Option<CheckoutData>, CommerceError>;

    /// Save a snapshot, replacing any previous one.
    async fn save_checkout_data(
        &self,
        id: &SessionId,
        data: &CheckoutData,
    ) -> Result<(), CommerceError>;

    /// Forget a session. Returns whether anything was stored.
    async fn delete_checkout_data(&self, id: &SessionId) -> Result<bool, CommerceError>;
}

#[derive(Debug, Clone)]
struct StoredCheckout {
    /// Bumped on every save.
    version: u64,
    payload: String,
}

/// Process-local store holding JSON-encoded snapshots.
#[derive(Debug, Default)]
pub struct InMemoryCheckoutStore {
    entries: RwLock<HashMap<SessionId, StoredCheckout>>,
}

impl InMemoryCheckoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saves for a session, `None` if it has nothing stored.
    pub fn version(&self, id: &SessionId) -> Option<u64> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|entry| entry.version)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CheckoutStore for InMemoryCheckoutStore {
    async fn load_checkout_data(
        &self,
        id: &SessionId,
    ) -> Result<Option<CheckoutData>, CommerceError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.get(id) else {
            return Ok(None);
        };
        serde_json::from_str(&entry.payload)
            .map(Some)
            .map_err(|e| CommerceError::Store(format!("corrupt checkout {id}: {e}")))
    }

    async fn save_checkout_data(
        &self,
        id: &SessionId,
        data: &CheckoutData,
    ) -> Result<(), CommerceError> {
        let payload =
            serde_json::to_string(data).map_err(|e| CommerceError::Store(e.to_string()))?;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let version = entries.get(id).map_or(1, |entry| entry.version + 1);
        entries.insert(id.clone(), StoredCheckout { version, payload });

        tracing::debug!(session = %id, version, "saved checkout");
        Ok(())
    }

    async fn delete_checkout_data(&self, id: &SessionId) -> Result<bool, CommerceError> {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use testresult::TestResult;

    #[test]
    fn test_generated_ids_are_unique_and_url_safe() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("sess_"));
        assert!(a
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[tokio::test]
    async fn test_save_load_delete() -> TestResult {
        let store = InMemoryCheckoutStore::new();
        let id = SessionId::new("sess_test");
        assert!(store.load_checkout_data(&id).await?.is_none());

        let mut data = CheckoutData::new(Currency::USD);
        data.customer.email = "grower@example.com".into();
        store.save_checkout_data(&id, &data).await?;
        store.save_checkout_data(&id, &data).await?;

        assert_eq!(store.version(&id), Some(2));
        assert_eq!(store.load_checkout_data(&id).await?, Some(data));

        assert!(store.delete_checkout_data(&id).await?);
        assert!(!store.delete_checkout_data(&id).await?);
        assert!(store.is_empty());
        Ok(())
    }
}
