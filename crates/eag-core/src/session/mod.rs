// # Session Store Implementations
//
// This module provides implementations of the SessionStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

use std::sync::Arc;

use crate::config::SessionStoreConfig;
use crate::error::Result;
use crate::traits::SessionStore;

/// Create the session store described by `config`
pub async fn open(config: &SessionStoreConfig) -> Result<Arc<dyn SessionStore>> {
    match config {
        SessionStoreConfig::File { path } => Ok(Arc::new(FileSessionStore::new(path).await?)),
        SessionStoreConfig::Memory => Ok(Arc::new(MemorySessionStore::new())),
    }
}
