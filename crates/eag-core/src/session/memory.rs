// # Memory Session Store
//
// In-memory implementation of SessionStore.
//
// Nothing survives the process. Used by tests and by runs that are handed a
// session cookie explicitly and should not cache it.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::session_store::{SessionRecord, SessionStore};

/// In-memory session store
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<BTreeMap<String, SessionRecord>>>,
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore").finish_non_exhaustive()
    }
}

impl MemorySessionStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.get(key).map(|r| r.value.clone()))
    }

    async fn get_record(&self, key: &str) -> Result<Option<SessionRecord>, Error> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .insert(key.to_string(), SessionRecord::new(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.inner.write().await.clear();
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
