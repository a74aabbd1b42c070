// # File Session Store
//
// File-based implementation of SessionStore with crash recovery.
//
// ## Purpose
//
// Keeps registry session tokens across runs so the interactive login only
// happens once. `eag-sync clear` removes everything.
//
// ## Crash Recovery
//
// - Atomic writes: write to `.tmp`, then rename over the real file
// - Backup: the previous good file is copied to `.backup` before each write
// - Recovery: a file that fails to parse is replaced by its backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "sessions": {
//     "eero": {
//       "value": "<token>",
//       "saved_at": "2026-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::session_store::{SessionRecord, SessionStore};

/// Session file format version
const SESSION_FILE_VERSION: &str = "1.0";

/// File-based session store with crash recovery
///
/// Every mutation is written through immediately.
///
/// # Example
///
/// ```rust,no_run
/// use eag_core::session::FileSessionStore;
/// use eag_core::traits::SessionStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileSessionStore::new("/home/me/.local/share/eag-sync/sessions.json").await?;
///
///     store.set("eero", "token").await?;
///     assert_eq!(store.get("eero").await?, Some("token".to_string()));
///
///     Ok(())
/// }
/// ```
pub struct FileSessionStore {
    path: PathBuf,
    sessions: Arc<RwLock<BTreeMap<String, SessionRecord>>>,
}

// Values are credentials; only the keys are shown
impl std::fmt::Debug for FileSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSessionStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Serializable session file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SessionFileFormat {
    version: String,
    sessions: BTreeMap<String, SessionRecord>,
}

/// Why a session file could not be loaded
enum LoadError {
    /// The file exists but is not a valid session file
    Corrupt(Error),
    /// The file could not be read at all
    Unreadable(Error),
}

impl FileSessionStore {
    /// Create or load a file session store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing file, if any
    /// 3. Fall back to the backup if the file is corrupted
    /// 4. Start empty if both are unusable
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create session directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let sessions = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            sessions: Arc::new(RwLock::new(sessions)),
        })
    }

    /// Path of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_with_recovery(path: &Path) -> Result<BTreeMap<String, SessionRecord>, Error> {
        match Self::load(path).await {
            Ok(sessions) => {
                tracing::debug!("Loaded {} session(s) from {}", sessions.len(), path.display());
                Ok(sessions)
            }
            Err(LoadError::Unreadable(e)) => Err(e),
            Err(LoadError::Corrupt(e)) => {
                tracing::warn!("Session file appears corrupted: {}. Trying backup.", e);

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No session backup found. Starting with no sessions.");
                    return Ok(BTreeMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(sessions) => {
                        tracing::info!("Recovered {} session(s) from backup", sessions.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore session file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(sessions)
                    }
                    Err(LoadError::Corrupt(backup_err) | LoadError::Unreadable(backup_err)) => {
                        tracing::error!(
                            "Session backup also unusable: {}. Starting with no sessions.",
                            backup_err
                        );
                        Ok(BTreeMap::new())
                    }
                }
            }
        }
    }

    async fn load(path: &Path) -> Result<BTreeMap<String, SessionRecord>, LoadError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadError::Unreadable(Error::session_store(format!(
                "Failed to read session file {}: {}",
                path.display(),
                e
            )))
        })?;

        let file: SessionFileFormat = serde_json::from_str(&content).map_err(|e| {
            LoadError::Corrupt(Error::session_store(format!(
                "Failed to parse session file {}: {}",
                path.display(),
                e
            )))
        })?;

        if file.version != SESSION_FILE_VERSION {
            tracing::warn!(
                "Session file version mismatch: expected {}, got {}. Loading anyway.",
                SESSION_FILE_VERSION,
                file.version
            );
        }

        Ok(file.sessions)
    }

    /// Write the current sessions atomically
    async fn write(&self) -> Result<(), Error> {
        let json = {
            let sessions = self.sessions.read().await;
            serde_json::to_string_pretty(&SessionFileFormat {
                version: SESSION_FILE_VERSION.to_string(),
                sessions: sessions.clone(),
            })
            .map_err(|e| Error::session_store(format!("Failed to serialize sessions: {}", e)))?
        };

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::session_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::session_store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.flush().await.map_err(|e| {
                Error::session_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to back up session file: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::session_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Sessions written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(key).map(|r| r.value.clone()))
    }

    async fn get_record(&self, key: &str) -> Result<Option<SessionRecord>, Error> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.sessions
            .write()
            .await
            .insert(key.to_string(), SessionRecord::new(value));
        self.write().await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.sessions.write().await.remove(key);
        self.write().await
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        let sessions = self.sessions.read().await;
        Ok(sessions.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.sessions.write().await.clear();
        self.write().await?;

        // Cleared credentials must not come back through the backup
        let backup_path = Self::backup_path(&self.path);
        if backup_path.exists() {
            fs::remove_file(&backup_path).await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Every mutation is already written through
        Ok(())
    }
}
