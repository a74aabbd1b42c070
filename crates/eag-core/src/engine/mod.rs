//! Sync engine
//!
//! The SyncEngine is responsible for:
//! - Listing both registries
//! - Reconciling them into a [`Partition`]
//! - Applying the partition to the target registry
//! - Reporting per-item outcomes
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐                        ┌────────────────┐
//! │ SourceRegistry │── list_devices ──┐ ┌───│ TargetRegistry │
//! └────────────────┘                  │ │   └────────────────┘
//!                                     ▼ ▼           ▲
//!                             ┌───────────────┐     │ update / create /
//!                             │  reconcile()  │     │ delete / clear_all
//!                             └───────────────┘     │
//!                                     │             │
//!                                     ▼             │
//!                             ┌───────────────┐     │
//!                             │  SyncEngine   │─────┘
//!                             │   ::apply     │
//!                             └───────────────┘
//!                                     │
//!                     ┌───────────────┴──────────────┐
//!                     ▼                              ▼
//!             ┌──────────────┐              ┌──────────────┐
//!             │ ApplyReport  │              │  SyncEvents  │
//!             └──────────────┘              └──────────────┘
//! ```
//!
//! ## Apply Order
//!
//! 1. Overwrite mode: `clear_all()` once, then create every authoritative
//!    record. Nothing else.
//! 2. Otherwise: update matched pairs, then create new records, then (only
//!    with `allow_delete`) delete stale records.
//!
//! Calls are strictly sequential. A create rejected for a duplicate name is
//! recorded and skipped; any other failure aborts the run with no rollback.

mod report;

pub use report::{AppliedDevice, ApplyReport, DuplicateSkip};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, RunOptions};
use crate::device::DeviceRecord;
use crate::error::{Error, FailureClass, Result};
use crate::identity::IdentityKey;
use crate::reconcile::{Partition, Side, reconcile};
use crate::traits::{SourceRegistry, TargetRegistry};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Both registries listed and reconciled
    Planned {
        new: usize,
        matched: usize,
        stale: usize,
        skipped: usize,
    },

    /// Every target device was deleted (overwrite mode)
    TargetCleared,

    /// Matched target device updated
    Updated { name: String, identity: IdentityKey },

    /// New device created
    Created { name: String, identity: IdentityKey },

    /// Stale device deleted
    Deleted { name: String, identity: IdentityKey },

    /// Create skipped because the name is taken
    SkippedDuplicate {
        name: String,
        identity: IdentityKey,
        message: String,
    },

    /// A call failed and the run was aborted
    Failed { name: String, error: String },

    /// Apply finished
    Finished {
        created: usize,
        updated: usize,
        deleted: usize,
        skipped: usize,
    },
}

/// Core sync engine
///
/// Owns one source and one target registry. A run is [`SyncEngine::plan`]
/// followed by [`SyncEngine::apply`] (or both via [`SyncEngine::sync`]);
/// the CLI calls them separately so it can ask for confirmation in between.
///
/// ## Idempotence
///
/// Nothing is persisted between runs. Re-running after a failed or partial
/// run converges: devices created last time now reconcile as matched.
pub struct SyncEngine {
    /// Authoritative registry
    source: Box<dyn SourceRegistry>,

    /// Registry being reconciled
    target: Box<dyn TargetRegistry>,

    /// Report intents without mutating the target
    dry_run: bool,

    /// Event sender for progress reporting
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// [`SyncEvent`]s. Dropping the receiver is fine; events are then discarded.
    pub fn new(
        source: Box<dyn SourceRegistry>,
        target: Box<dyn TargetRegistry>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            source,
            target,
            dry_run: config.dry_run,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Whether mutations are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// List both registries and reconcile them
    pub async fn plan(&self) -> Result<Partition> {
        let authoritative = self.source.list_devices().await?;
        debug!(
            "{} listed {} device(s)",
            self.source.registry_name(),
            authoritative.len()
        );

        let target = self.target.list_devices().await?;
        debug!(
            "{} listed {} device(s)",
            self.target.registry_name(),
            target.len()
        );

        let partition = reconcile(authoritative, target);
        info!(
            "Plan: {} new, {} matched, {} stale, {} skipped",
            partition.new.len(),
            partition.matched.len(),
            partition.stale.len(),
            partition.skipped.len() + partition.shadowed.len()
        );
        self.emit_event(SyncEvent::Planned {
            new: partition.new.len(),
            matched: partition.matched.len(),
            stale: partition.stale.len(),
            skipped: partition.skipped.len() + partition.shadowed.len(),
        });

        Ok(partition)
    }

    /// Plan and apply in one step
    pub async fn sync(&self, options: &RunOptions) -> Result<ApplyReport> {
        let partition = self.plan().await?;
        self.apply(&partition, options.allow_delete, options.overwrite)
            .await
    }

    /// Apply a partition to the target registry
    ///
    /// # Parameters
    ///
    /// - `partition`: result of [`SyncEngine::plan`] or [`reconcile`]
    /// - `allow_delete`: delete stale target devices (ignored in overwrite mode)
    /// - `overwrite_mode`: clear the target and recreate every authoritative device
    ///
    /// # Returns
    ///
    /// - `Ok(ApplyReport)`: every call succeeded or was a skipped duplicate
    /// - `Err(Error)`: the first fatal failure; earlier calls are not rolled back
    pub async fn apply(
        &self,
        partition: &Partition,
        allow_delete: bool,
        overwrite_mode: bool,
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::start(self.dry_run, partition.skipped.clone());
        for record in &partition.shadowed {
            warn!(
                "Leaving '{}' ({}) in place: a later {} device has the same hardware address",
                record.name,
                record.identity,
                self.target.registry_name()
            );
            report.shadowed.push(record.into());
        }

        if overwrite_mode {
            if allow_delete {
                debug!("Overwrite mode removes every target device; ignoring allow_delete");
            }

            info!("Clearing all {} devices", self.target.registry_name());
            if !self.dry_run
                && let Err(e) = self.target.clear_all().await
            {
                return Err(self.fail(self.target.registry_name(), e));
            }
            report.target_cleared = true;
            // Clearing removed every target device, reported or not
            report
                .skipped_unidentifiable
                .retain(|skipped| skipped.side != Side::Target);
            report.shadowed.clear();
            self.emit_event(SyncEvent::TargetCleared);

            for record in partition.authoritative_in_order() {
                self.create(record, &mut report).await?;
            }
        } else {
            for pair in &partition.matched {
                self.update(&pair.target.name, &pair.source.updated_from(&pair.target), &mut report)
                    .await?;
            }

            for record in &partition.new {
                self.create(record, &mut report).await?;
            }

            if allow_delete {
                for record in &partition.stale {
                    self.delete(record, &mut report).await?;
                }
            } else if !partition.stale.is_empty() {
                debug!(
                    "Leaving {} stale device(s) in place (delete not enabled)",
                    partition.stale.len()
                );
            }
        }

        let report = report.finish();
        info!("Apply finished: {}", report);
        self.emit_event(SyncEvent::Finished {
            created: report.created.len(),
            updated: report.updated.len(),
            deleted: report.deleted.len(),
            skipped: report.skipped_duplicates.len()
                + report.skipped_unidentifiable.len()
                + report.shadowed.len(),
        });

        Ok(report)
    }

    async fn update(
        &self,
        current_name: &str,
        record: &DeviceRecord,
        report: &mut ApplyReport,
    ) -> Result<()> {
        debug!("Updating '{}' ({})", current_name, record.identity);
        if !self.dry_run
            && let Err(e) = self.target.update_device(current_name, record).await
        {
            return Err(self.fail(current_name, e));
        }

        self.emit_event(SyncEvent::Updated {
            name: record.name.clone(),
            identity: record.identity,
        });
        report.updated.push(record.into());
        Ok(())
    }

    async fn create(&self, record: &DeviceRecord, report: &mut ApplyReport) -> Result<()> {
        debug!("Creating '{}' ({})", record.name, record.identity);
        let result = if self.dry_run {
            Ok(())
        } else {
            self.target.create_device(record).await
        };

        match result {
            Ok(()) => {
                self.emit_event(SyncEvent::Created {
                    name: record.name.clone(),
                    identity: record.identity,
                });
                report.created.push(record.into());
                Ok(())
            }
            Err(e) if e.class() == FailureClass::Conflict => {
                warn!(
                    "Skipping '{}' ({}): name already in use: {}",
                    record.name, record.identity, e
                );
                let message = match e {
                    Error::DuplicateTargetName { message, .. } => message,
                    other => other.to_string(),
                };
                self.emit_event(SyncEvent::SkippedDuplicate {
                    name: record.name.clone(),
                    identity: record.identity,
                    message: message.clone(),
                });
                report.skipped_duplicates.push(DuplicateSkip {
                    name: record.name.clone(),
                    identity: record.identity,
                    message,
                });
                Ok(())
            }
            Err(e) => Err(self.fail(&record.name, e)),
        }
    }

    async fn delete(&self, record: &DeviceRecord, report: &mut ApplyReport) -> Result<()> {
        debug!("Deleting '{}' ({})", record.name, record.identity);
        if !self.dry_run
            && let Err(e) = self.target.delete_device(&record.name).await
        {
            return Err(self.fail(&record.name, e));
        }

        self.emit_event(SyncEvent::Deleted {
            name: record.name.clone(),
            identity: record.identity,
        });
        report.deleted.push(record.into());
        Ok(())
    }

    /// Log and emit a fatal failure, handing the error back for propagation
    fn fail(&self, name: &str, e: Error) -> Error {
        error!("Aborting sync at '{}': {}", name, e);
        self.emit_event(SyncEvent::Failed {
            name: name.to_string(),
            error: e.to_string(),
        });
        e
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("source", &self.source.registry_name())
            .field("target", &self.target.registry_name())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
