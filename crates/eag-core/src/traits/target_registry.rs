// # Target Registry Trait
//
// Defines the read/write interface to the registry being reconciled
// (the filtering appliance's client list).
//
// ## Implementations
//
// - AdGuard Home: `eag-target-adguard` crate
//
// ## Usage
//
// ```rust,ignore
// use eag_core::TargetRegistry;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let target = /* TargetRegistry implementation */;
//
//     let devices = target.list_devices().await?;
//     target.delete_device(&devices[0].name).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::device::{DeviceCandidate, DeviceRecord};

/// Trait for the target registry
///
/// The target's uniqueness constraint is on the display **name**, not the
/// hardware address: updates and deletes are addressed by name.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Own HTTP timeouts
/// - ✅ Classify failures (see below)
///
/// ## Forbidden Capabilities
/// - ❌ Retry or roll back (re-running the sync is the recovery path)
/// - ❌ Decide whether an update is needed (owned by the engine)
/// - ❌ Batch or reorder calls; each call is one remote mutation
///
/// ## Failure Classification
///
/// Errors returned from these methods are classified with
/// [`crate::Error::class`]:
///
/// - `create_device` returns [`crate::Error::DuplicateTargetName`] when the
///   name is taken; the engine skips the record and continues.
/// - [`crate::Error::TransientNetwork`] for timeouts, 429 and 5xx.
/// - Anything else is fatal and aborts the run.
#[async_trait]
pub trait TargetRegistry: Send + Sync {
    /// List every device known to the registry
    async fn list_devices(&self) -> Result<Vec<DeviceCandidate>, crate::Error>;

    /// Create a device
    ///
    /// # Returns
    ///
    /// - `Ok(())`: created
    /// - `Err(Error::DuplicateTargetName)`: the name is already in use
    /// - `Err(Error)`: any other failure
    async fn create_device(&self, record: &DeviceRecord) -> Result<(), crate::Error>;

    /// Replace the device currently named `name` with `record`
    ///
    /// # Parameters
    ///
    /// - `name`: current display name of the target device
    /// - `record`: new contents, already merged by the engine
    async fn update_device(&self, name: &str, record: &DeviceRecord) -> Result<(), crate::Error>;

    /// Delete the device named `name`
    async fn delete_device(&self, name: &str) -> Result<(), crate::Error>;

    /// Delete every device (overwrite mode only)
    async fn clear_all(&self) -> Result<(), crate::Error>;

    /// Get the registry name (for logging/debugging)
    fn registry_name(&self) -> &'static str;
}
