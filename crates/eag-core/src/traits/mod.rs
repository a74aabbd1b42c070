//! Core traits for the sync system
//!
//! This module defines the abstract interfaces that registry adapters and
//! stores implement.
//!
//! - [`SourceRegistry`]: Read the authoritative device list
//! - [`TargetRegistry`]: Read and mutate the device list being reconciled
//! - [`SessionStore`]: Persist registry sessions between runs

pub mod session_store;
pub mod source_registry;
pub mod target_registry;

pub use session_store::{SessionRecord, SessionStore};
pub use source_registry::SourceRegistry;
pub use target_registry::TargetRegistry;
