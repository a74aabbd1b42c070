//! Contract Test: Apply Ordering
//!
//! This test verifies the order and scope of target mutations.
//!
//! Constraints verified:
//! - Updates run before creates, creates before deletes
//! - Deletes only happen when enabled
//! - Updates address the target by its current name and merge its settings
//! - Dry runs never mutate the target
//!
//! If this test fails, a sync can remove devices it should not.

mod common;

use common::*;
use eag_core::SyncEngine;
use eag_core::device::Origin;
use eag_core::engine::SyncEvent;
use serde_json::json;

fn engine(source: &MockSourceRegistry, target: &MockTargetRegistry) -> SyncEngine {
    let (engine, _events) = SyncEngine::new(
        Box::new(MockSourceRegistry::sharing_counters_with(source)),
        Box::new(MockTargetRegistry::sharing_counters_with(target)),
        test_config(),
    )
    .expect("engine construction succeeds");
    engine
}

#[tokio::test]
async fn scenario_create_then_delete() {
    let source = MockSourceRegistry::new(vec![device("Phone", "AA:BB:CC:DD:EE:01")]);
    let target = MockTargetRegistry::new(vec![device("Old", "AA:BB:CC:DD:EE:02")]);

    let engine = engine(&source, &target);
    let partition = engine.plan().await.unwrap();
    let report = engine.apply(&partition, true, false).await.unwrap();

    assert_eq!(
        target.mutations(),
        vec![Call::Create("Phone".to_string()), Call::Delete("Old".to_string())]
    );
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(target.names(), vec!["Phone"]);
}

#[tokio::test]
async fn updates_then_creates_then_deletes() {
    let source = MockSourceRegistry::new(vec![
        device("New Tablet", "AA:BB:CC:DD:EE:03"),
        device("Phone", "AA:BB:CC:DD:EE:01"),
    ]);
    let target = MockTargetRegistry::new(vec![
        device("Gone", "AA:BB:CC:DD:EE:09"),
        device("phone (old)", "aa:bb:cc:dd:ee:01"),
    ]);

    let engine = engine(&source, &target);
    let partition = engine.plan().await.unwrap();
    engine.apply(&partition, true, false).await.unwrap();

    assert_eq!(
        target.mutations(),
        vec![
            Call::Update {
                current: "phone (old)".to_string(),
                new_name: "Phone".to_string()
            },
            Call::Create("New Tablet".to_string()),
            Call::Delete("Gone".to_string()),
        ]
    );
}

#[tokio::test]
async fn stale_devices_kept_without_delete() {
    let source = MockSourceRegistry::new(vec![device("Phone", "AA:BB:CC:DD:EE:01")]);
    let target = MockTargetRegistry::new(vec![device("Old", "AA:BB:CC:DD:EE:02")]);

    let engine = engine(&source, &target);
    let report = engine
        .sync(&eag_core::RunOptions::new(false, false, true))
        .await
        .unwrap();

    assert_eq!(target.count(|c| matches!(c, Call::Delete(_))), 0);
    assert!(report.deleted.is_empty());
    assert_eq!(target.names(), vec!["Old", "Phone"]);
}

#[tokio::test]
async fn update_keeps_target_only_settings() {
    let source = MockSourceRegistry::new(vec![device("Phone", "AA:BB:CC:DD:EE:01").with_tag("device_phone")]);
    let target = MockTargetRegistry::new(vec![
        device("Old Phone", "AA:BB:CC:DD:EE:01")
            .with_tag("device_other")
            .with_origin(Origin::new().with("parental_enabled", json!(true))),
    ]);

    let engine = engine(&source, &target);
    engine
        .sync(&eag_core::RunOptions::default())
        .await
        .unwrap();

    let after = eag_core::TargetRegistry::list_devices(&target).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].name, "Phone");
    assert!(after[0].tags.contains("device_phone"));
    assert!(!after[0].tags.contains("device_other"));
    assert_eq!(after[0].origin.get("parental_enabled"), Some(&json!(true)));
}

#[tokio::test]
async fn dry_run_reports_without_mutating() {
    let source = MockSourceRegistry::new(vec![
        device("Phone", "AA:BB:CC:DD:EE:01"),
        device("Laptop", "AA:BB:CC:DD:EE:02"),
    ]);
    let target = MockTargetRegistry::new(vec![
        device("Laptop", "AA:BB:CC:DD:EE:02"),
        device("Old", "AA:BB:CC:DD:EE:03"),
    ]);

    let mut config = test_config();
    config.dry_run = true;
    let (engine, mut events) = SyncEngine::new(
        Box::new(MockSourceRegistry::sharing_counters_with(&source)),
        Box::new(MockTargetRegistry::sharing_counters_with(&target)),
        config,
    )
    .unwrap();

    let report = engine
        .sync(&eag_core::RunOptions::new(true, false, true))
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.deleted.len(), 1);
    assert!(target.mutations().is_empty());
    assert_eq!(target.names(), vec!["Laptop", "Old"]);

    let mut saw_finished = false;
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::Finished { created, .. } = event {
            assert_eq!(created, 1);
            saw_finished = true;
        }
    }
    assert!(saw_finished);
}

#[tokio::test]
async fn events_follow_apply_order() {
    let source = MockSourceRegistry::new(vec![
        device("Phone", "AA:BB:CC:DD:EE:01"),
        device("Tablet", "AA:BB:CC:DD:EE:02"),
    ]);
    let target = MockTargetRegistry::new(vec![device("Phone", "AA:BB:CC:DD:EE:01")]);

    let (engine, mut events) = SyncEngine::new(
        Box::new(MockSourceRegistry::sharing_counters_with(&source)),
        Box::new(MockTargetRegistry::sharing_counters_with(&target)),
        test_config(),
    )
    .unwrap();
    engine.sync(&eag_core::RunOptions::default()).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            SyncEvent::Planned { new, matched, .. } => format!("planned {}/{}", new, matched),
            SyncEvent::Updated { name, .. } => format!("updated {}", name),
            SyncEvent::Created { name, .. } => format!("created {}", name),
            SyncEvent::Finished { .. } => "finished".to_string(),
            other => format!("{:?}", other),
        });
    }
    assert_eq!(
        kinds,
        vec!["planned 1/1", "updated Phone", "created Tablet", "finished"]
    );
    assert_eq!(source.list_call_count(), 1);
}
