//! Eero API wire types
//!
//! Every response is wrapped as `{"meta": {"code": 200, ...}, "data": ...}`.

use eag_core::device::{DeviceCandidate, DeviceMapping, DeviceRecord, Origin};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub meta: Meta,
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Meta {
    pub code: Option<u16>,
    pub error: Option<String>,
}

/// `POST login` and `POST login/refresh` data
#[derive(Debug, Deserialize)]
pub(crate) struct UserToken {
    pub user_token: String,
}

/// `GET account` data (only the parts the sync needs)
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub networks: NetworkList,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Network>,
}

/// A network on the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    /// API path, e.g. `/2.2/networks/123456`
    pub url: String,
}

impl Network {
    /// Network ID (last segment of `url`)
    pub fn id(&self) -> &str {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.url)
    }
}

/// Map an Eero device type to an AdGuard Home client tag
pub fn device_tag(device_type: Option<&str>) -> &'static str {
    match device_type.map(str::to_ascii_lowercase).as_deref() {
        Some("phone" | "smartphone") => "device_phone",
        Some("tablet") => "device_tablet",
        Some("laptop") => "device_laptop",
        Some("computer" | "desktop" | "pc") => "device_pc",
        Some("tv" | "streaming" | "media_player") => "device_tv",
        Some("gaming" | "game_console" | "console") => "device_gameconsole",
        Some("printer") => "device_printer",
        Some("camera" | "security_camera") => "device_camera",
        Some("speaker" | "audio" | "smart_speaker") => "device_audio",
        Some("nas" | "storage") => "device_nas",
        Some("security" | "alarm" | "security_system") => "device_securityalarm",
        _ => "device_other",
    }
}

/// A client device on an Eero network (`GET networks/{id}/devices`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EeroClientDevice {
    pub mac: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ips: Vec<String>,
    pub nickname: Option<String>,
    pub hostname: Option<String>,
    pub device_type: Option<String>,
    #[serde(default)]
    pub wireless: bool,
    #[serde(default)]
    pub connected: bool,
}

impl EeroClientDevice {
    /// Display name: nickname, else hostname, else MAC
    pub fn display_name(&self) -> String {
        [&self.nickname, &self.hostname, &self.mac]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("unknown device")
            .to_string()
    }

    /// `[mac, ips...]`
    pub fn identifiers(&self) -> Vec<String> {
        self.mac
            .iter()
            .chain(self.ips.iter())
            .cloned()
            .collect()
    }
}

impl DeviceMapping for EeroClientDevice {
    fn to_candidate(&self) -> DeviceCandidate {
        DeviceCandidate::new(self.display_name(), self.identifiers())
            .with_addresses(self.ips.iter().filter_map(|ip| ip.parse().ok()))
            .with_tag(device_tag(self.device_type.as_deref()))
            .with_origin(
                Origin::new()
                    .with("eero_device_type", json!(self.device_type))
                    .with("eero_wireless", json!(self.wireless)),
            )
    }

    fn from_record(record: &DeviceRecord) -> Self {
        Self {
            mac: Some(record.identity.to_string().to_lowercase()),
            ips: record.addresses.iter().map(ToString::to_string).collect(),
            nickname: Some(record.name.clone()),
            hostname: None,
            device_type: record
                .origin
                .get("eero_device_type")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            wireless: record
                .origin
                .get("eero_wireless")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            connected: false,
        }
    }
}

/// An IPv6 address entry on an eero node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Address {
    pub address: Option<String>,
}

/// An eero node (`GET networks/{id}/eeros`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EeroNetworkDevice {
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub gateway: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ipv6_addresses: Vec<Ipv6Address>,
}

impl EeroNetworkDevice {
    /// `"{location} {model}"`, plus `" (Gateway)"` on the gateway node
    pub fn nickname(&self) -> String {
        let mut nickname = format!("{} {}", self.location, self.model).trim().to_string();
        if self.gateway {
            nickname.push_str(" (Gateway)");
        }
        nickname
    }

    /// IPv4 address first, then IPv6 addresses
    pub fn ips(&self) -> Vec<String> {
        self.ip_address
            .iter()
            .cloned()
            .chain(self.ipv6_addresses.iter().filter_map(|a| a.address.clone()))
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// The node as a client device
    pub fn as_client_device(&self) -> EeroClientDevice {
        EeroClientDevice {
            mac: self.mac_address.clone(),
            ips: self.ips(),
            nickname: Some(self.nickname()),
            hostname: None,
            device_type: Some("generic".to_string()),
            wireless: false,
            connected: true,
        }
    }
}

impl DeviceMapping for EeroNetworkDevice {
    fn to_candidate(&self) -> DeviceCandidate {
        self.as_client_device().to_candidate()
    }

    fn from_record(record: &DeviceRecord) -> Self {
        let (ipv4, ipv6): (Vec<_>, Vec<_>) = record.addresses.iter().partition(|a| a.is_ipv4());
        Self {
            mac_address: Some(record.identity.to_string().to_lowercase()),
            ip_address: ipv4.first().map(ToString::to_string),
            model: String::new(),
            location: record.name.clone(),
            gateway: false,
            ipv6_addresses: ipv6
                .into_iter()
                .map(|a: &std::net::IpAddr| Ipv6Address {
                    address: Some(a.to_string()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(value: serde_json::Value) -> EeroClientDevice {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_name_fallback() {
        let named = client(json!({
            "mac": "aa:bb:cc:dd:ee:01", "ips": ["192.168.4.20"],
            "nickname": "Phone", "hostname": "iphone", "device_type": "phone"
        }));
        assert_eq!(named.display_name(), "Phone");

        let hostname_only = client(json!({
            "mac": "aa:bb:cc:dd:ee:02", "ips": null,
            "nickname": null, "hostname": "nas-01", "device_type": null
        }));
        assert_eq!(hostname_only.display_name(), "nas-01");

        let bare = client(json!({
            "mac": "aa:bb:cc:dd:ee:03", "nickname": "  ", "hostname": null
        }));
        assert_eq!(bare.display_name(), "aa:bb:cc:dd:ee:03");
    }

    #[test]
    fn test_client_candidate() {
        let device = client(json!({
            "mac": "aa:bb:cc:dd:ee:01", "ips": ["192.168.4.20", "fe80::1"],
            "nickname": "Phone", "device_type": "phone", "wireless": true
        }));
        let candidate = device.to_candidate();
        assert_eq!(
            candidate.identifiers,
            vec!["aa:bb:cc:dd:ee:01", "192.168.4.20", "fe80::1"]
        );
        assert_eq!(candidate.addresses.len(), 2);
        assert!(candidate.tags.contains("device_phone"));

        let record = candidate.identify().unwrap();
        assert_eq!(record.identity.to_string(), "AA:BB:CC:DD:EE:01");
        let back = EeroClientDevice::from_record(&record);
        assert_eq!(back.mac.as_deref(), Some("aa:bb:cc:dd:ee:01"));
        assert_eq!(back.device_type.as_deref(), Some("phone"));
        assert!(back.wireless);
    }

    #[test]
    fn test_missing_mac_is_unidentifiable() {
        let device = client(json!({ "mac": null, "ips": ["192.168.4.44"], "nickname": "Guest" }));
        let rejected = device.to_candidate().identify().unwrap_err();
        assert_eq!(rejected.name, "Guest");
    }

    #[test]
    fn test_device_tags() {
        assert_eq!(device_tag(Some("Tablet")), "device_tablet");
        assert_eq!(device_tag(Some("gaming")), "device_gameconsole");
        assert_eq!(device_tag(Some("toaster")), "device_other");
        assert_eq!(device_tag(None), "device_other");
    }

    #[test]
    fn test_network_node_nickname() {
        let node: EeroNetworkDevice = serde_json::from_value(json!({
            "mac_address": "f8:bb:bf:00:00:01",
            "ip_address": "192.168.4.1",
            "model": "eero Pro 6",
            "location": "Living Room",
            "gateway": true,
            "ipv6_addresses": [{ "address": "2001:db8::1" }, { "address": null }]
        }))
        .unwrap();

        assert_eq!(node.nickname(), "Living Room eero Pro 6 (Gateway)");
        assert_eq!(node.ips(), vec!["192.168.4.1", "2001:db8::1"]);

        let candidate = node.to_candidate();
        assert_eq!(candidate.name, "Living Room eero Pro 6 (Gateway)");
        assert!(candidate.tags.contains("device_other"));
    }

    #[test]
    fn test_network_id_from_url() {
        let network = Network {
            name: "Home".to_string(),
            url: "/2.2/networks/123456".to_string(),
        };
        assert_eq!(network.id(), "123456");
    }
}
