//! Apply report
//!
//! Everything an operator needs to see after a run: which devices were
//! created, updated or deleted, and which were skipped and why.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceRecord;
use crate::identity::IdentityKey;
use crate::reconcile::{Side, SkippedRecord};

/// A device the driver acted on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDevice {
    /// Display name used for the call
    pub name: String,
    /// Canonical hardware address
    pub identity: IdentityKey,
}

impl From<&DeviceRecord> for AppliedDevice {
    fn from(record: &DeviceRecord) -> Self {
        Self {
            name: record.name.clone(),
            identity: record.identity,
        }
    }
}

/// A create rejected because the display name is already taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSkip {
    /// Display name that collided
    pub name: String,
    /// Hardware address of the device that was not created
    pub identity: IdentityKey,
    /// Message returned by the target registry
    pub message: String,
}

/// Outcome of one apply run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Devices created on the target
    pub created: Vec<AppliedDevice>,
    /// Devices updated on the target
    pub updated: Vec<AppliedDevice>,
    /// Devices deleted from the target
    pub deleted: Vec<AppliedDevice>,
    /// Creates skipped because of a name collision
    pub skipped_duplicates: Vec<DuplicateSkip>,
    /// Records from either side with no hardware address
    pub skipped_unidentifiable: Vec<SkippedRecord>,
    /// Target devices left untouched because a later target device has the
    /// same hardware address
    #[serde(default)]
    pub shadowed: Vec<AppliedDevice>,
    /// Whether the target was cleared first (overwrite mode)
    pub target_cleared: bool,
    /// Whether this run only reported intents
    pub dry_run: bool,
    /// When apply started
    pub started_at: DateTime<Utc>,
    /// When apply finished
    pub finished_at: DateTime<Utc>,
}

impl ApplyReport {
    pub(crate) fn start(dry_run: bool, skipped: Vec<SkippedRecord>) -> Self {
        let now = Utc::now();
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            skipped_duplicates: Vec::new(),
            skipped_unidentifiable: skipped,
            shadowed: Vec::new(),
            target_cleared: false,
            dry_run,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Whether the run changed (or in dry-run mode, would change) the target
    pub fn has_changes(&self) -> bool {
        self.target_cleared
            || !self.created.is_empty()
            || !self.updated.is_empty()
            || !self.deleted.is_empty()
    }

    /// Skipped-unidentifiable records from one side
    pub fn unidentifiable_on(&self, side: Side) -> impl Iterator<Item = &SkippedRecord> {
        self.skipped_unidentifiable
            .iter()
            .filter(move |s| s.side == side)
    }

    /// Wall-clock duration of the apply step
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

impl std::fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.dry_run {
            write!(f, "[dry run] ")?;
        }
        if self.target_cleared {
            write!(f, "cleared target, ")?;
        }
        write!(
            f,
            "{} created, {} updated, {} deleted, {} skipped (duplicate name), {} skipped (no hardware address)",
            self.created.len(),
            self.updated.len(),
            self.deleted.len(),
            self.skipped_duplicates.len(),
            self.skipped_unidentifiable.len()
        )?;
        if !self.shadowed.is_empty() {
            write!(
                f,
                ", {} skipped (duplicate hardware address)",
                self.shadowed.len()
            )?;
        }
        Ok(())
    }
}
