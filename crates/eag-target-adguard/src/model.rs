//! AdGuard Home wire types
//!
//! `GET /control/clients` returns persistent clients as:
//!
//! ```json
//! {
//!   "clients": [
//!     {
//!       "name": "Phone",
//!       "ids": ["AA:BB:CC:DD:EE:01", "192.168.4.20"],
//!       "tags": ["device_phone"],
//!       "use_global_settings": true,
//!       "filtering_enabled": false,
//!       ...
//!     }
//!   ],
//!   "auto_clients": [ ... ]
//! }
//! ```
//!
//! Older releases return the bare array; both are accepted. `clients`,
//! `ids`, `tags` and `upstreams` may be `null`.

use eag_core::device::{DeviceCandidate, DeviceMapping, DeviceRecord, Origin};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::net::IpAddr;

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_true() -> bool {
    true
}

/// Per-client settings the sync manages
///
/// These are the only keys taken from a record's origin payload when a client
/// is created or updated; anything else in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_true")]
    pub use_global_settings: bool,
    #[serde(default = "default_true")]
    pub use_global_blocked_services: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub upstreams: Vec<String>,
    #[serde(default)]
    pub filtering_enabled: bool,
    #[serde(default)]
    pub parental_enabled: bool,
    #[serde(default)]
    pub safebrowsing_enabled: bool,
    #[serde(default)]
    pub safesearch_enabled: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            use_global_settings: true,
            use_global_blocked_services: true,
            upstreams: Vec::new(),
            filtering_enabled: false,
            parental_enabled: false,
            safebrowsing_enabled: false,
            safesearch_enabled: false,
        }
    }
}

impl ClientSettings {
    /// Read known settings out of an origin payload
    ///
    /// Missing keys and values of the wrong type fall back to the defaults.
    pub fn from_origin(origin: &Origin) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            origin.get(key).and_then(Value::as_bool).unwrap_or(default)
        };

        Self {
            use_global_settings: flag("use_global_settings", defaults.use_global_settings),
            use_global_blocked_services: flag(
                "use_global_blocked_services",
                defaults.use_global_blocked_services,
            ),
            upstreams: origin
                .get("upstreams")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.upstreams),
            filtering_enabled: flag("filtering_enabled", defaults.filtering_enabled),
            parental_enabled: flag("parental_enabled", defaults.parental_enabled),
            safebrowsing_enabled: flag("safebrowsing_enabled", defaults.safebrowsing_enabled),
            safesearch_enabled: flag("safesearch_enabled", defaults.safesearch_enabled),
        }
    }

    /// Write the settings into an origin payload
    pub fn to_origin(&self) -> Origin {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Origin::from(map),
            _ => Origin::new(),
        }
    }
}

/// A persistent AdGuard Home client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdGuardClient {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub settings: ClientSettings,
}

impl DeviceMapping for AdGuardClient {
    fn to_candidate(&self) -> DeviceCandidate {
        let addresses: Vec<IpAddr> = self.ids.iter().filter_map(|id| id.parse().ok()).collect();
        let mut candidate = DeviceCandidate::new(self.name.clone(), self.ids.clone())
            .with_addresses(addresses)
            .with_origin(self.settings.to_origin());
        for tag in &self.tags {
            candidate = candidate.with_tag(tag.clone());
        }
        candidate
    }

    fn from_record(record: &DeviceRecord) -> Self {
        let mut ids = vec![record.identity.to_string()];
        for address in &record.addresses {
            let address = address.to_string();
            if !ids.contains(&address) {
                ids.push(address);
            }
        }

        Self {
            name: record.name.clone(),
            ids,
            tags: record.tags.iter().cloned().collect(),
            settings: ClientSettings::from_origin(&record.origin),
        }
    }
}

/// `GET /control/clients` body
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ClientList {
    Bare(Vec<AdGuardClient>),
    Wrapped {
        #[serde(default, deserialize_with = "null_as_empty")]
        clients: Vec<AdGuardClient>,
    },
}

impl ClientList {
    pub(crate) fn into_clients(self) -> Vec<AdGuardClient> {
        match self {
            ClientList::Bare(clients) | ClientList::Wrapped { clients } => clients,
        }
    }
}

/// `POST /control/clients/update` body
#[derive(Debug, Serialize)]
pub(crate) struct UpdateRequest<'a> {
    pub name: &'a str,
    pub data: &'a AdGuardClient,
}

/// `POST /control/clients/delete` body
#[derive(Debug, Serialize)]
pub(crate) struct DeleteRequest<'a> {
    pub name: &'a str,
}

/// `POST /control/login` body
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub name: &'a str,
    pub password: &'a str,
}
