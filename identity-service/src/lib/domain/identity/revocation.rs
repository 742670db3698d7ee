use std::sync::Arc;
use std::time::Duration;

use crate::identity::ports::EphemeralStore;
use crate::identity::ports::StoreError;

const KEY_PREFIX: &str = "denylist:";

/// TTL-bounded denylist of revoked tokens.
///
/// A marker outlives the longest-lived token kind it protects (the entry TTL
/// is a configured ceiling, e.g. 7 days), so a revoked token can never become
/// valid again before it expires on its own. Once a marker is present the
/// token is invalid regardless of signature validity or an unexpired `exp`.
pub struct RevocationStore<S: EphemeralStore> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S: EphemeralStore> RevocationStore<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(token: &str) -> String {
        format!("{}{}", KEY_PREFIX, token)
    }

    /// Insert a denylist marker for `token`.
    ///
    /// Idempotent: revoking an already-revoked token refreshes the marker's
    /// TTL and nothing else.
    pub async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        self.store
            .set_with_ttl(&Self::key(token), "revoked", self.ttl)
            .await
    }

    /// Whether a live denylist marker exists for `token`.
    pub async fn is_revoked(&self, token: &str) -> Result<bool, StoreError> {
        self.store.exists(&Self::key(token)).await
    }
}

impl<S: EphemeralStore> Clone for RevocationStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::stores::memory::InMemoryEphemeralStore;

    #[tokio::test]
    async fn test_revoke_and_check() {
        let store = Arc::new(InMemoryEphemeralStore::new());
        let revocation = RevocationStore::new(store, Duration::from_secs(60));

        assert!(!revocation.is_revoked("tok").await.unwrap());

        revocation.revoke("tok").await.unwrap();
        assert!(revocation.is_revoked("tok").await.unwrap());
        assert!(!revocation.is_revoked("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_twice_is_a_noop() {
        let store = Arc::new(InMemoryEphemeralStore::new());
        let revocation = RevocationStore::new(store, Duration::from_secs(60));

        revocation.revoke("tok").await.unwrap();
        revocation.revoke("tok").await.unwrap();
        assert!(revocation.is_revoked("tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_marker_lapses_with_ttl() {
        let store = Arc::new(InMemoryEphemeralStore::new());
        let revocation = RevocationStore::new(store, Duration::from_millis(40));

        revocation.revoke("tok").await.unwrap();
        assert!(revocation.is_revoked("tok").await.unwrap());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!revocation.is_revoked("tok").await.unwrap());
    }
}
