// # Session Store Trait
//
// Defines the interface for persisting registry sessions between runs.
//
// ## Purpose
//
// Logging into the router cloud API needs a one-time verification code sent
// by email or SMS. The resulting session token is cached so later runs can
// skip the interactive login. Nothing else about a sync is persisted.
//
// ## Implementations
//
// - File-based: JSON file with atomic writes and backup recovery
// - Memory: for tests and `--eero-cookie` one-off runs
//
// ## Usage
//
// ```rust,ignore
// use eag_core::SessionStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* SessionStore implementation */;
//
//     if store.get("eero").await?.is_none() {
//         // interactive login ...
//         store.set("eero", "user-token").await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// A cached session value
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionRecord {
    /// The session token or cookie value
    pub value: String,
    /// When the value was stored
    pub saved_at: chrono::DateTime<chrono::Utc>,
}

impl SessionRecord {
    /// Create a record stamped with the current time
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            saved_at: chrono::Utc::now(),
        }
    }

    /// Check if the record is older than `max_age`
    pub fn is_older_than(&self, max_age: chrono::Duration) -> bool {
        chrono::Utc::now().signed_duration_since(self.saved_at) > max_age
    }
}

/// Trait for session store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Implement locking for thread safety
///
/// ## Forbidden Capabilities
/// - ❌ Log stored values (they are credentials)
/// - ❌ Spawn background tasks
///
/// All methods must be safe to call concurrently.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the value stored under `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))`: the stored value
    /// - `Ok(None)`: nothing stored
    /// - `Err(Error)`: storage error
    async fn get(&self, key: &str) -> Result<Option<String>, crate::Error>;

    /// Get the full record stored under `key`
    async fn get_record(&self, key: &str) -> Result<Option<SessionRecord>, crate::Error>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), crate::Error>;

    /// Remove `key` (no error if absent)
    async fn remove(&self, key: &str) -> Result<(), crate::Error>;

    /// List stored keys
    async fn list(&self) -> Result<Vec<String>, crate::Error>;

    /// Remove everything
    async fn clear(&self) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
