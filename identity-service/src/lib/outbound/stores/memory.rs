use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;

use crate::identity::ports::EphemeralStore;
use crate::identity::ports::StoreError;

struct Entry {
    value: String,
    deadline: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline > now
    }
}

/// In-process TTL keyed store.
///
/// Backs revocation markers, reset entries, and the role cache in
/// deployments without an external keyed store, and all of the test suites.
/// Every operation runs under one mutex, which gives the single-key
/// atomicity the port requires; `delete_if_matches` compares and removes
/// without releasing it. Expired entries are dropped lazily on access plus
/// in a periodic sweep on insert.
///
/// Construct once at startup and share; nothing here may be created lazily
/// inside a request path.
pub struct InMemoryEphemeralStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryEphemeralStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryEphemeralStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EphemeralStore for InMemoryEphemeralStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock();

        let found = entries
            .get(key)
            .map(|entry| (entry.is_live(now), entry.value.clone()));

        match found {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.lock();

        // Occasional sweep so never-read keys don't pile up.
        if !entries.is_empty() && entries.len() % 64 == 0 {
            entries.retain(|_, entry| entry.is_live(now));
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                deadline: now + ttl,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock();

        match entries.remove(key) {
            Some(entry) => Ok(entry.is_live(now)),
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete_if_matches(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock();

        let found = entries
            .get(key)
            .map(|entry| (entry.is_live(now), entry.value == expected));

        match found {
            Some((true, true)) => {
                entries.remove(key);
                Ok(true)
            }
            Some((false, _)) => {
                entries.remove(key);
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}
