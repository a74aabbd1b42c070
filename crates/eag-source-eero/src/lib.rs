// # Eero Source Registry
//
// This crate provides an Eero network's device list as a `SourceRegistry`.
//
// ## Devices
//
// A network's devices are its client devices (`networks/{id}/devices`) plus,
// optionally, the eero nodes themselves (`networks/{id}/eeros`), in that
// order. Client devices are named by nickname, else hostname, else MAC; nodes
// are named `"{location} {model}"`.
//
// ### Trust Level: Untrusted (Source Registry)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the Eero API only
// - ✅ Refresh and persist its own session through a `SessionStore`
//
// **Forbidden Capabilities**:
// - ❌ Drop devices without a MAC (the engine reports them by name)
// - ❌ Spawn tasks or threads
//
// ## Security Requirements
//
// - The session cookie NEVER appears in logs or Debug output

pub mod client;
pub mod model;

pub use client::{EERO_API_BASE, EeroClient, SESSION_KEY};
pub use model::{EeroClientDevice, EeroNetworkDevice, Network, device_tag};

use async_trait::async_trait;
use eag_core::device::{DeviceCandidate, DeviceMapping};
use eag_core::traits::SourceRegistry;
use eag_core::{Error, Result};
use std::sync::Arc;

/// Pick a network by index (`"0"`, `"1"`, ...) or by name (case-insensitive)
///
/// # Returns
///
/// - `Ok(&Network)`: the matching network
/// - `Err(Error::InvalidInput)`: nothing matches
/// - `Err(Error::Config)`: the account has no networks
pub fn select_network<'a>(networks: &'a [Network], wanted: &str) -> Result<&'a Network> {
    if networks.is_empty() {
        return Err(Error::config("No Eero networks associated with this account"));
    }

    let wanted = wanted.trim();
    if let Ok(index) = wanted.parse::<usize>()
        && let Some(network) = networks.get(index)
    {
        return Ok(network);
    }

    networks
        .iter()
        .find(|n| n.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| {
            Error::invalid_input(format!(
                "No Eero network '{}' (choose 0-{} or a network name)",
                wanted,
                networks.len() - 1
            ))
        })
}

/// Devices on one Eero network
#[derive(Debug)]
pub struct EeroSource {
    client: Arc<EeroClient>,
    network: Network,
    include_network_devices: bool,
}

impl EeroSource {
    /// Create a source for `network`
    pub fn new(client: Arc<EeroClient>, network: Network) -> Self {
        Self {
            client,
            network,
            include_network_devices: true,
        }
    }

    /// Whether the eero nodes are listed as devices too (default: yes)
    pub fn with_network_devices(mut self, include: bool) -> Self {
        self.include_network_devices = include;
        self
    }

    /// The selected network
    pub fn network(&self) -> &Network {
        &self.network
    }
}

#[async_trait]
impl SourceRegistry for EeroSource {
    async fn list_devices(&self) -> Result<Vec<DeviceCandidate>> {
        let network_id = self.network.id();

        let devices = self.client.devices(network_id).await?;
        tracing::debug!(
            "Eero network '{}' lists {} client device(s)",
            self.network.name,
            devices.len()
        );
        let mut candidates: Vec<DeviceCandidate> =
            devices.iter().map(EeroClientDevice::to_candidate).collect();

        if self.include_network_devices {
            let eeros = self.client.eeros(network_id).await?;
            tracing::debug!(
                "Eero network '{}' has {} eero node(s)",
                self.network.name,
                eeros.len()
            );
            candidates.extend(eeros.iter().map(EeroNetworkDevice::to_candidate));
        }

        Ok(candidates)
    }

    fn registry_name(&self) -> &'static str {
        client::REGISTRY
    }
}
