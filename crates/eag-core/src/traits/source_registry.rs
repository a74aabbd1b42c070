// # Source Registry Trait
//
// Defines the read-only interface to the authoritative device registry
// (the router's DHCP/client list).
//
// ## Implementations
//
// - Eero: `eag-source-eero` crate
//
// ## Usage
//
// ```rust,ignore
// use eag_core::SourceRegistry;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* SourceRegistry implementation */;
//
//     for device in source.list_devices().await? {
//         println!("{} {:?}", device.name, device.identifiers);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::device::DeviceCandidate;

/// Trait for the authoritative registry
///
/// # Trust Level: Untrusted
///
/// Source registries are **untrusted** components:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Refresh their own session and persist it through a `SessionStore`
/// - ✅ Map native records into [`DeviceCandidate`]s
///
/// ## Forbidden Capabilities
/// - ❌ Normalize identity or drop records without a MAC (owned by the engine)
/// - ❌ Decide what is new, matched or stale (owned by `reconcile`)
/// - ❌ Spawn tasks or threads
///
/// Records without a hardware address must still be returned: the engine
/// reports them to the operator by name.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// List every device known to the registry
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DeviceCandidate>)`: all devices, in registry order
    /// - `Err(Error)`: if the listing failed
    async fn list_devices(&self) -> Result<Vec<DeviceCandidate>, crate::Error>;

    /// Get the registry name (for logging/debugging)
    fn registry_name(&self) -> &'static str;
}
