// # eag-core
//
// Core library for reconciling a router's device list into a DNS-filtering
// appliance's client list.
//
// ## Architecture Overview
//
// - **IdentityKey / normalize**: canonical hardware address picked out of a
//   record's untyped identifier strings
// - **DeviceCandidate / DeviceRecord**: registry-agnostic device model; a
//   record only exists once its identity is known
// - **reconcile**: three-way new / matched / stale partition
// - **SyncEngine**: applies a partition through a `TargetRegistry`
// - **SourceRegistry / TargetRegistry**: traits the registry adapters implement
// - **SessionStore**: cached registry sessions between runs
//
// ## Design Principles
//
// 1. **Hardware address is identity**: IP addresses never match two devices
// 2. **Nothing dropped silently**: records without identity are reported by name
// 3. **Library-First**: the CLI is a thin wrapper over this crate
// 4. **Idempotency**: re-running a sync is the recovery path

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod identity;
pub mod reconcile;
pub mod session;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, RunOptions, SessionStoreConfig, SourceConfig, SyncConfig, TargetConfig};
pub use device::{DeviceCandidate, DeviceMapping, DeviceRecord, Origin, Unidentified};
pub use engine::{ApplyReport, SyncEngine, SyncEvent};
pub use error::{Error, FailureClass, Result};
pub use identity::{IdentityKey, normalize};
pub use reconcile::{MatchedPair, Partition, Side, SkippedRecord, reconcile};
pub use session::{FileSessionStore, MemorySessionStore};
pub use traits::{SessionStore, SourceRegistry, TargetRegistry};
