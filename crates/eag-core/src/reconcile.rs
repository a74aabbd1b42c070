//! Reconciliation engine
//!
//! Computes the three-way partition between the authoritative (router) device
//! set and the target (filtering appliance) device set:
//!
//! ```text
//!   authoritative          target
//!   ┌──────────┐        ┌──────────┐
//!   │   new    │        │          │
//!   ├──────────┤◄──────►├──────────┤  matched (same IdentityKey)
//!   │          │        │  stale   │
//!   └──────────┘        └──────────┘
//! ```
//!
//! One pass over each side plus one hash lookup per authoritative record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::device::{DeviceCandidate, DeviceRecord, Unidentified};
use crate::identity::IdentityKey;

/// Which collection a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The authoritative (source) registry
    Authoritative,
    /// The target registry
    Target,
}

/// A record excluded from the partition because it has no identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Side the record was listed on
    pub side: Side,
    /// The rejected record
    #[serde(flatten)]
    pub record: Unidentified,
}

/// An authoritative record and the target record with the same identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    /// Authoritative side
    pub source: DeviceRecord,
    /// Target side
    pub target: DeviceRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    New(usize),
    Matched(usize),
}

/// Result of [`reconcile`]
///
/// `new` and `matched` follow authoritative order, `stale` follows target
/// order. Every identified record lands in exactly one list: `new` or
/// `matched` on the authoritative side, `matched`, `stale` or `shadowed` on
/// the target side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Present only in the authoritative set
    pub new: Vec<DeviceRecord>,
    /// Present on both sides
    pub matched: Vec<MatchedPair>,
    /// Present only in the target set
    pub stale: Vec<DeviceRecord>,
    /// Target records hidden by a later target record with the same identity
    pub shadowed: Vec<DeviceRecord>,
    /// Rejected at the mapping boundary, from either side
    pub skipped: Vec<SkippedRecord>,
    /// Interleaving of `new` and `matched` in authoritative order
    order: Vec<Slot>,
}

impl Partition {
    /// Every identified authoritative record, in authoritative order
    ///
    /// Used by overwrite mode, which recreates the whole authoritative set.
    pub fn authoritative_in_order(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.order.iter().map(|slot| match *slot {
            Slot::New(i) => &self.new[i],
            Slot::Matched(i) => &self.matched[i].source,
        })
    }

    /// Skipped records from one side
    pub fn skipped_on(&self, side: Side) -> impl Iterator<Item = &SkippedRecord> {
        self.skipped.iter().filter(move |s| s.side == side)
    }

    /// Whether applying this partition would change nothing (deletes excluded)
    pub fn is_converged(&self) -> bool {
        self.new.is_empty() && self.stale.is_empty()
    }
}

fn identify_all(
    candidates: impl IntoIterator<Item = DeviceCandidate>,
    side: Side,
    skipped: &mut Vec<SkippedRecord>,
) -> Vec<DeviceRecord> {
    let mut records = Vec::new();
    for candidate in candidates {
        match candidate.identify() {
            Ok(record) => records.push(record),
            Err(record) => {
                warn!(
                    "Skipping {:?} device '{}' with no hardware address",
                    side, record.name
                );
                skipped.push(SkippedRecord { side, record });
            }
        }
    }
    records
}

/// Partition the authoritative and target sets by identity
///
/// # Parameters
///
/// - `authoritative`: devices listed by the source registry
/// - `target`: devices listed by the target registry
///
/// # Returns
///
/// The [`Partition`]. Candidates with no hardware address are reported in
/// [`Partition::skipped`] and never counted as `new` or `stale`.
pub fn reconcile(
    authoritative: impl IntoIterator<Item = DeviceCandidate>,
    target: impl IntoIterator<Item = DeviceCandidate>,
) -> Partition {
    let mut skipped = Vec::new();
    let authoritative = identify_all(authoritative, Side::Authoritative, &mut skipped);
    let target = identify_all(target, Side::Target, &mut skipped);

    let mut partition = reconcile_records(authoritative, target);
    partition.skipped = skipped;
    partition
}

/// Partition already-identified records
///
/// Duplicate keys on the target side are last-write-wins: the later record
/// takes part in matching, the earlier one is reported in
/// [`Partition::shadowed`] and never updated or deleted. A duplicate key on
/// the authoritative side matches at most once; later occurrences are `new`.
pub fn reconcile_records(authoritative: Vec<DeviceRecord>, target: Vec<DeviceRecord>) -> Partition {
    // key -> index into `target`, plus first-seen order for `stale`
    let mut by_key: HashMap<IdentityKey, usize> = HashMap::with_capacity(target.len());
    let mut key_order: Vec<IdentityKey> = Vec::with_capacity(target.len());
    let mut shadowed_at: Vec<usize> = Vec::new();
    for (index, record) in target.iter().enumerate() {
        if let Some(previous) = by_key.insert(record.identity, index) {
            warn!(
                "Target lists {} twice ('{}' and '{}'), keeping the latter",
                record.identity, target[previous].name, record.name
            );
            shadowed_at.push(previous);
        } else {
            key_order.push(record.identity);
        }
    }
    shadowed_at.sort_unstable();

    let mut slots: Vec<Option<DeviceRecord>> = target.into_iter().map(Some).collect();
    let mut partition = Partition::default();
    for index in shadowed_at {
        if let Some(record) = slots[index].take() {
            partition.shadowed.push(record);
        }
    }

    for source in authoritative {
        let hit = by_key
            .get(&source.identity)
            .and_then(|&index| slots[index].take());
        match hit {
            Some(target) => {
                debug!("Matched {} ('{}' <-> '{}')", source.identity, source.name, target.name);
                partition.order.push(Slot::Matched(partition.matched.len()));
                partition.matched.push(MatchedPair { source, target });
            }
            None => {
                debug!("New device {} ('{}')", source.identity, source.name);
                partition.order.push(Slot::New(partition.new.len()));
                partition.new.push(source);
            }
        }
    }

    for key in key_order {
        if let Some(record) = by_key.get(&key).and_then(|&index| slots[index].take()) {
            debug!("Stale device {} ('{}')", record.identity, record.name);
            partition.stale.push(record);
        }
    }

    partition
}
