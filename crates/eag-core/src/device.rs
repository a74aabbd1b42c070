//! Device records
//!
//! Registry adapters produce [`DeviceCandidate`]s: source-agnostic records
//! whose identity has not been established yet. [`DeviceCandidate::identify`]
//! is the mapping boundary: it either yields a [`DeviceRecord`] carrying a
//! guaranteed [`IdentityKey`], or an [`Unidentified`] report. The
//! reconciliation engine only ever partitions `DeviceRecord`s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::identity::{IdentityKey, normalize_named};

/// Opaque per-registry payload carried alongside a device
///
/// Holds whatever a registry needs to re-issue an update for the device,
/// e.g. the appliance-side client settings. The engine never interprets the
/// fields; it only merges them on update (see [`Origin::merge`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(Map<String, Value>);

impl Origin {
    /// Create an empty origin payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Builder-style [`Origin::insert`]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Iterate over the fields
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge a target-side payload with authoritative-side fields
    ///
    /// Precedence, field by field:
    ///
    /// 1. A non-null field supplied by `authoritative` wins.
    /// 2. Otherwise the `target` field is kept as is.
    ///
    /// Fields only the target knows about are therefore never lost on update,
    /// and a `null` on the authoritative side never erases a target setting.
    pub fn merge(target: &Origin, authoritative: &Origin) -> Origin {
        let mut merged = target.0.clone();
        for (key, value) in authoritative.iter() {
            if !value.is_null() {
                merged.insert(key.clone(), value.clone());
            }
        }
        Origin(merged)
    }
}

impl From<Map<String, Value>> for Origin {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Origin> for Map<String, Value> {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}

/// A device as listed by a registry, before identity is established
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCandidate {
    /// Display name
    pub name: String,

    /// Identifier strings in source order (MACs, IPs, vendor IDs, ...)
    pub identifiers: Vec<String>,

    /// Secondary network addresses
    #[serde(default)]
    pub addresses: Vec<IpAddr>,

    /// Category tags
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Registry-specific payload
    #[serde(default)]
    pub origin: Origin,
}

impl DeviceCandidate {
    /// Create a candidate with a name and identifier list
    pub fn new<I, S>(name: impl Into<String>, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            addresses: Vec::new(),
            tags: BTreeSet::new(),
            origin: Origin::new(),
        }
    }

    /// Set the secondary addresses
    pub fn with_addresses(mut self, addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        self.addresses = addresses.into_iter().collect();
        self
    }

    /// Add a category tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Set the origin payload
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Establish identity, rejecting candidates with no hardware address
    pub fn identify(self) -> std::result::Result<DeviceRecord, Unidentified> {
        match normalize_named(&self.name, &self.identifiers) {
            Ok(identity) => Ok(DeviceRecord {
                identity,
                addresses: self.addresses,
                name: self.name,
                tags: self.tags,
                origin: self.origin,
            }),
            Err(e) => Err(Unidentified {
                reason: e.to_string(),
                name: self.name,
                identifiers: self.identifiers,
            }),
        }
    }
}

/// A device with an established identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Canonical hardware address
    pub identity: IdentityKey,

    /// Secondary network addresses; never used for matching
    pub addresses: Vec<IpAddr>,

    /// Display name
    pub name: String,

    /// Category tags
    pub tags: BTreeSet<String>,

    /// Registry-specific payload
    pub origin: Origin,
}

impl DeviceRecord {
    /// Build the record to send when updating `target` from `self`
    ///
    /// Name, tags and addresses come from the authoritative record (`self`);
    /// the origin payload is [`Origin::merge`]d so target-only settings
    /// survive.
    pub fn updated_from(&self, target: &DeviceRecord) -> DeviceRecord {
        DeviceRecord {
            identity: self.identity,
            addresses: self.addresses.clone(),
            name: self.name.clone(),
            tags: self.tags.clone(),
            origin: Origin::merge(&target.origin, &self.origin),
        }
    }
}

/// A candidate rejected at the mapping boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unidentified {
    /// Display name, for the operator
    pub name: String,
    /// The identifiers that were tried
    pub identifiers: Vec<String>,
    /// Why it was rejected
    pub reason: String,
}

/// Conversion between a registry's native device type and the canonical model
///
/// Each registry adapter implements this for its wire types. `to_candidate`
/// must put the hardware address (if the registry knows it) somewhere in
/// `identifiers`; the normalizer picks it out.
pub trait DeviceMapping: Sized {
    /// Convert a native device into a canonical candidate
    fn to_candidate(&self) -> DeviceCandidate;

    /// Build a native device from a canonical record
    fn from_record(record: &DeviceRecord) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_target_fields_survive() {
        let target = Origin::new()
            .with("filtering_enabled", json!(true))
            .with("upstreams", json!(["9.9.9.9"]));
        let authoritative = Origin::new().with("device_type", json!("phone"));

        let merged = Origin::merge(&target, &authoritative);
        assert_eq!(merged.get("filtering_enabled"), Some(&json!(true)));
        assert_eq!(merged.get("upstreams"), Some(&json!(["9.9.9.9"])));
        assert_eq!(merged.get("device_type"), Some(&json!("phone")));
    }

    #[test]
    fn test_merge_authoritative_overrides_unless_null() {
        let target = Origin::new()
            .with("filtering_enabled", json!(true))
            .with("safesearch_enabled", json!(true));
        let authoritative = Origin::new()
            .with("filtering_enabled", json!(false))
            .with("safesearch_enabled", Value::Null);

        let merged = Origin::merge(&target, &authoritative);
        assert_eq!(merged.get("filtering_enabled"), Some(&json!(false)));
        assert_eq!(merged.get("safesearch_enabled"), Some(&json!(true)));
    }

    #[test]
    fn test_identify_rejects_without_mac() {
        let candidate = DeviceCandidate::new("Mystery", ["10.0.0.7", "not-an-address"]);
        let rejected = candidate.identify().unwrap_err();
        assert_eq!(rejected.name, "Mystery");
        assert_eq!(rejected.identifiers.len(), 2);
        assert_eq!(rejected.reason, "No valid hardware address for device 'Mystery'");
    }

    #[test]
    fn test_identify_keeps_fields() {
        let candidate = DeviceCandidate::new("Phone", ["10.0.0.7", "aa:bb:cc:dd:ee:01"])
            .with_addresses(["10.0.0.7".parse().unwrap()])
            .with_tag("device_phone");
        let record = candidate.identify().unwrap();
        assert_eq!(record.identity.to_string(), "AA:BB:CC:DD:EE:01");
        assert_eq!(record.name, "Phone");
        assert!(record.tags.contains("device_phone"));
        assert_eq!(record.addresses.len(), 1);
    }

    #[test]
    fn test_updated_from_takes_authoritative_fields() {
        let target = DeviceCandidate::new("old name", ["aa:bb:cc:dd:ee:01"])
            .with_tag("device_other")
            .with_origin(Origin::new().with("parental_enabled", json!(true)))
            .identify()
            .unwrap();
        let source = DeviceCandidate::new("Phone", ["AABBCCDDEE01"])
            .with_tag("device_phone")
            .identify()
            .unwrap();

        let update = source.updated_from(&target);
        assert_eq!(update.name, "Phone");
        assert!(update.tags.contains("device_phone"));
        assert!(!update.tags.contains("device_other"));
        assert_eq!(update.origin.get("parental_enabled"), Some(&json!(true)));
    }
}
