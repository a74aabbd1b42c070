//! Test doubles and common utilities for sync contract tests
//!
//! The target double is a small in-memory registry with the same name
//! uniqueness rule as the real appliance, so a second run sees what the first
//! one wrote.

#![allow(dead_code)]

use eag_core::device::{DeviceCandidate, DeviceRecord};
use eag_core::error::{Error, Result};
use eag_core::traits::{SourceRegistry, TargetRegistry};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Build a candidate with a single MAC identifier
pub fn device(name: &str, mac: &str) -> DeviceCandidate {
    DeviceCandidate::new(name, [mac])
}

/// A fixed authoritative registry
pub struct MockSourceRegistry {
    devices: Vec<DeviceCandidate>,
    list_call_count: Arc<AtomicUsize>,
}

impl MockSourceRegistry {
    pub fn new(devices: Vec<DeviceCandidate>) -> Self {
        Self {
            devices,
            list_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times list_devices() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Create a new MockSourceRegistry that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            devices: other.devices.clone(),
            list_call_count: Arc::clone(&other.list_call_count),
        }
    }
}

#[async_trait::async_trait]
impl SourceRegistry for MockSourceRegistry {
    async fn list_devices(&self) -> Result<Vec<DeviceCandidate>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.clone())
    }

    fn registry_name(&self) -> &'static str {
        "mock-source"
    }
}

/// One recorded target call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(String),
    Update { current: String, new_name: String },
    Delete(String),
    ClearAll,
}

/// Failure injected into the target double
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injected {
    /// Name-collision rejection (recoverable)
    Conflict,
    /// Timeout / 5xx
    Transient,
    /// Authentication failure
    Auth,
}

impl Injected {
    fn error(self, name: &str) -> Error {
        match self {
            Injected::Conflict => Error::duplicate_name(name, "client already exists"),
            Injected::Transient => Error::transient("connection timed out"),
            Injected::Auth => Error::auth("session expired"),
        }
    }
}

/// An in-memory target registry that records every call in order
pub struct MockTargetRegistry {
    devices: Arc<Mutex<Vec<DeviceCandidate>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    failures: Arc<Mutex<Vec<(String, Injected)>>>,
}

impl MockTargetRegistry {
    pub fn new(devices: Vec<DeviceCandidate>) -> Self {
        Self {
            devices: Arc::new(Mutex::new(devices)),
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Make any mutation addressed to `name` fail with `failure`
    pub fn fail_on(self, name: &str, failure: Injected) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((name.to_string(), failure));
        self
    }

    /// Create a new MockTargetRegistry that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            devices: Arc::clone(&other.devices),
            calls: Arc::clone(&other.calls),
            failures: Arc::clone(&other.failures),
        }
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Mutating calls only, in order
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| *c != Call::List)
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    /// Forget recorded calls (state is kept)
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Current device names, in registry order
    pub fn names(&self) -> Vec<String> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn injected(&self, name: &str) -> Option<Injected> {
        self.failures
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| *f)
    }
}

fn to_candidate(record: &DeviceRecord) -> DeviceCandidate {
    let mut candidate = DeviceCandidate::new(record.name.clone(), [record.identity.to_string()])
        .with_addresses(record.addresses.clone())
        .with_origin(record.origin.clone());
    candidate.tags = record.tags.clone();
    candidate
}

#[async_trait::async_trait]
impl TargetRegistry for MockTargetRegistry {
    async fn list_devices(&self) -> Result<Vec<DeviceCandidate>> {
        self.record(Call::List);
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn create_device(&self, record: &DeviceRecord) -> Result<()> {
        self.record(Call::Create(record.name.clone()));
        if let Some(failure) = self.injected(&record.name) {
            return Err(failure.error(&record.name));
        }

        let mut devices = self.devices.lock().unwrap();
        if devices.iter().any(|d| d.name == record.name) {
            return Err(Error::duplicate_name(
                &record.name,
                "another client uses the same name",
            ));
        }
        devices.push(to_candidate(record));
        Ok(())
    }

    async fn update_device(&self, name: &str, record: &DeviceRecord) -> Result<()> {
        self.record(Call::Update {
            current: name.to_string(),
            new_name: record.name.clone(),
        });
        if let Some(failure) = self.injected(name) {
            return Err(failure.error(name));
        }

        let mut devices = self.devices.lock().unwrap();
        match devices.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                *existing = to_candidate(record);
                Ok(())
            }
            None => Err(Error::unexpected("mock-target", format!("no client '{}'", name))),
        }
    }

    async fn delete_device(&self, name: &str) -> Result<()> {
        self.record(Call::Delete(name.to_string()));
        if let Some(failure) = self.injected(name) {
            return Err(failure.error(name));
        }

        self.devices.lock().unwrap().retain(|d| d.name != name);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.record(Call::ClearAll);
        self.devices.lock().unwrap().clear();
        Ok(())
    }

    fn registry_name(&self) -> &'static str {
        "mock-target"
    }
}

/// Names must be unique on the target; returns the duplicates, if any
pub fn duplicate_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|n| !seen.insert(n.as_str()))
        .cloned()
        .collect()
}

/// Engine config for tests
pub fn test_config() -> eag_core::config::EngineConfig {
    eag_core::config::EngineConfig {
        event_channel_capacity: 100,
        dry_run: false,
    }
}
