//! Contract Test: Failure Policy
//!
//! This test verifies how per-call failures affect a run.
//!
//! Constraints verified:
//! - A create rejected for a duplicate name is skipped and the run continues
//! - Authentication and network failures abort the run immediately
//! - Nothing applied before a failure is rolled back
//! - Unidentifiable records are reported with their names
//! - Target records hidden by a duplicate hardware address are reported

mod common;

use common::*;
use eag_core::device::DeviceCandidate;
use eag_core::engine::SyncEvent;
use eag_core::error::{Error, FailureClass};
use eag_core::reconcile::Side;
use eag_core::{RunOptions, SyncEngine};

fn engine_for(
    source: &MockSourceRegistry,
    target: &MockTargetRegistry,
) -> (SyncEngine, tokio::sync::mpsc::Receiver<SyncEvent>) {
    SyncEngine::new(
        Box::new(MockSourceRegistry::sharing_counters_with(source)),
        Box::new(MockTargetRegistry::sharing_counters_with(target)),
        test_config(),
    )
    .expect("engine construction succeeds")
}

#[tokio::test]
async fn duplicate_name_is_skipped_and_run_continues() {
    let source = MockSourceRegistry::new(vec![
        device("Phone", "AA:BB:CC:DD:EE:01"),
        device("Tablet", "AA:BB:CC:DD:EE:02"),
        device("Laptop", "AA:BB:CC:DD:EE:03"),
    ]);
    let target = MockTargetRegistry::empty().fail_on("Tablet", Injected::Conflict);

    let (engine, _events) = engine_for(&source, &target);
    let report = engine.sync(&RunOptions::default()).await.unwrap();

    assert_eq!(
        target.mutations(),
        vec![
            Call::Create("Phone".to_string()),
            Call::Create("Tablet".to_string()),
            Call::Create("Laptop".to_string()),
        ]
    );
    let created: Vec<_> = report.created.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(created, vec!["Phone", "Laptop"]);
    assert_eq!(report.skipped_duplicates.len(), 1);
    assert_eq!(report.skipped_duplicates[0].name, "Tablet");
    assert_eq!(report.skipped_duplicates[0].message, "client already exists");
}

#[tokio::test]
async fn name_taken_by_other_hardware_is_a_duplicate() {
    // Same display name, different hardware address: the target rejects it
    let source = MockSourceRegistry::new(vec![device("iPhone", "AA:BB:CC:DD:EE:01")]);
    let target = MockTargetRegistry::new(vec![device("iPhone", "AA:BB:CC:DD:EE:77")]);

    let (engine, _events) = engine_for(&source, &target);
    let report = engine.sync(&RunOptions::default()).await.unwrap();

    assert!(report.created.is_empty());
    assert_eq!(report.skipped_duplicates.len(), 1);
    assert_eq!(duplicate_names(&target.names()), Vec::<String>::new());
}

#[tokio::test]
async fn auth_failure_aborts_without_rollback() {
    let source = MockSourceRegistry::new(vec![
        device("Phone", "AA:BB:CC:DD:EE:01"),
        device("Tablet", "AA:BB:CC:DD:EE:02"),
        device("Laptop", "AA:BB:CC:DD:EE:03"),
    ]);
    let target = MockTargetRegistry::new(vec![device("Old", "AA:BB:CC:DD:EE:09")])
        .fail_on("Tablet", Injected::Auth);

    let (engine, mut events) = engine_for(&source, &target);
    let err = engine
        .sync(&RunOptions::new(true, false, true))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert_eq!(err.class(), FailureClass::Fatal);

    // Laptop and the delete never happened; Phone stays
    assert_eq!(
        target.mutations(),
        vec![Call::Create("Phone".to_string()), Call::Create("Tablet".to_string())]
    );
    assert_eq!(target.names(), vec!["Old", "Phone"]);

    let mut failed = None;
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, SyncEvent::Finished { .. }));
        if let SyncEvent::Failed { name, .. } = event {
            failed = Some(name);
        }
    }
    assert_eq!(failed.as_deref(), Some("Tablet"));
}

#[tokio::test]
async fn transient_failure_is_not_retried() {
    let source = MockSourceRegistry::new(vec![device("Phone", "AA:BB:CC:DD:EE:01")]);
    let target = MockTargetRegistry::new(vec![device("Phone", "AA:BB:CC:DD:EE:01")])
        .fail_on("Phone", Injected::Transient);

    let (engine, _events) = engine_for(&source, &target);
    let err = engine.sync(&RunOptions::default()).await.unwrap_err();

    assert_eq!(err.class(), FailureClass::TransientNetwork);
    assert_eq!(target.count(|c| matches!(c, Call::Update { .. })), 1);
}

#[tokio::test]
async fn failed_delete_stops_remaining_deletes() {
    let source = MockSourceRegistry::new(Vec::new());
    let target = MockTargetRegistry::new(vec![
        device("A", "AA:BB:CC:DD:EE:01"),
        device("B", "AA:BB:CC:DD:EE:02"),
        device("C", "AA:BB:CC:DD:EE:03"),
    ])
    .fail_on("B", Injected::Auth);

    let (engine, _events) = engine_for(&source, &target);
    assert!(engine.sync(&RunOptions::new(true, false, true)).await.is_err());

    assert_eq!(
        target.mutations(),
        vec![Call::Delete("A".to_string()), Call::Delete("B".to_string())]
    );
}

#[tokio::test]
async fn unidentifiable_records_are_reported() {
    let source = MockSourceRegistry::new(vec![
        device("Phone", "AA:BB:CC:DD:EE:01"),
        DeviceCandidate::new("Guest Device", ["192.168.4.77"]),
    ]);
    let target = MockTargetRegistry::new(vec![DeviceCandidate::new("Manual Entry", ["nas.lan"])]);

    let (engine, _events) = engine_for(&source, &target);
    let report = engine.sync(&RunOptions::new(true, false, true)).await.unwrap();

    // Never created, never deleted
    assert_eq!(target.mutations(), vec![Call::Create("Phone".to_string())]);

    let source_side: Vec<_> = report
        .unidentifiable_on(Side::Authoritative)
        .map(|s| s.record.name.as_str())
        .collect();
    let target_side: Vec<_> = report
        .unidentifiable_on(Side::Target)
        .map(|s| s.record.name.as_str())
        .collect();
    assert_eq!(source_side, vec!["Guest Device"]);
    assert_eq!(target_side, vec!["Manual Entry"]);
}

#[tokio::test]
async fn duplicate_hardware_address_on_target_is_reported() {
    let source = MockSourceRegistry::new(Vec::new());
    let target = MockTargetRegistry::new(vec![
        device("A", "AA:BB:CC:DD:EE:01"),
        device("B", "aa:bb:cc:dd:ee:01"),
    ]);

    let (engine, _events) = engine_for(&source, &target);
    let report = engine
        .sync(&RunOptions::new(true, false, true))
        .await
        .unwrap();

    // The later record is the one reconciled; the earlier one stays and is named
    assert_eq!(target.mutations(), vec![Call::Delete("B".to_string())]);
    assert_eq!(target.names(), vec!["A"]);
    let shadowed: Vec<_> = report.shadowed.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(shadowed, vec!["A"]);
    assert_eq!(report.shadowed[0].identity.to_string(), "AA:BB:CC:DD:EE:01");
    assert!(
        report
            .to_string()
            .ends_with("1 skipped (duplicate hardware address)")
    );
}
