mod common;

use bindstore::{BindError, DataServiceConfig, ManualLifecycle, SweepReport, shared};
use common::{Profile, STORE, harness, harness_with, profile_schema, stored_sub_record, wait_until};
use std::time::Duration;

fn fast_autosave() -> DataServiceConfig {
    DataServiceConfig::new().with_autosave_interval(Duration::from_millis(20))
}

#[tokio::test]
async fn autosave_worker_writes_live_bindings() {
    let h = harness_with(fast_autosave());
    let profile = shared(Profile::default());
    let _binding = h
        .service
        .binding(STORE, "player_30")
        .bind("profile", profile.clone(), profile_schema())
        .open_and_fetch()
        .await
        .unwrap();

    profile.lock().await.coins = 512;
    assert!(h.service.start_autosave().await);
    assert!(!h.service.start_autosave().await);
    assert!(h.service.is_autosave_running().await);

    let store = h.store.clone();
    wait_until(move || store.write_count() >= 2).await;

    let stored = stored_sub_record(&h.store, "player_30", "profile")
        .await
        .unwrap();
    assert_eq!(stored.get_i64("coins"), Some(512));

    h.service.stop_autosave().await.unwrap();
    assert!(!h.service.is_autosave_running().await);

    let writes = h.store.write_count();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(h.store.write_count(), writes);
}

#[tokio::test]
async fn disabled_autosave_never_starts() {
    let h = harness();
    assert!(!h.service.start_autosave().await);
    assert!(!h.service.is_autosave_running().await);
    h.service.stop_autosave().await.unwrap();
}

#[tokio::test]
async fn save_all_skips_suppressed_and_pending_bindings() {
    let h = harness();

    let _healthy = h
        .service
        .binding(STORE, "player_31")
        .bind("profile", shared(Profile::default()), profile_schema())
        .open_and_fetch()
        .await
        .unwrap();

    h.store.fail_next_reads(1);
    let suppressed = h
        .service
        .binding(STORE, "player_32")
        .bind("profile", shared(Profile::default()), profile_schema())
        .open_and_fetch()
        .await
        .unwrap();
    assert!(suppressed.is_save_suppressed());

    h.store.pause_reads();
    let pending = h
        .service
        .binding(STORE, "player_33")
        .bind("profile", shared(Profile::default()), profile_schema())
        .open()
        .unwrap();
    assert!(!pending.is_retrieved());

    let report = h.service.save_all().await;
    assert_eq!(
        report,
        SweepReport {
            attempted: 3,
            written: 1,
            skipped: 2,
            failed: 0,
        }
    );
    assert_eq!(h.store.write_count(), 1);
    assert_eq!(h.service.registry().len(), 3);

    h.store.resume_reads();
}

#[tokio::test]
async fn failed_finalize_keeps_binding_for_the_next_sweep() {
    let h = harness();
    for key in ["player_34", "player_35"] {
        h.service
            .binding(STORE, key)
            .bind("profile", shared(Profile::default()), profile_schema())
            .open_and_fetch()
            .await
            .unwrap();
    }
    assert_eq!(h.service.registry().len(), 2);

    h.store.fail_next_writes(1);
    let first = h.service.finalize_all().await;
    assert_eq!(first.written, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(h.service.registry().len(), 1);

    let second = h.service.finalize_all().await;
    assert_eq!(second.attempted, 1);
    assert_eq!(second.written, 1);
    assert!(h.service.registry().is_empty());
}

#[tokio::test]
async fn shutdown_hook_drains_registry_once() {
    let h = harness_with(fast_autosave());
    let profile = shared(Profile::default());
    h.service
        .binding(STORE, "player_36")
        .bind("profile", profile.clone(), profile_schema())
        .open_and_fetch()
        .await
        .unwrap();
    assert!(h.service.start_autosave().await);

    let lifecycle = ManualLifecycle::new();
    let hook = h
        .service
        .install_shutdown_hook(lifecycle.clone())
        .unwrap()
        .expect("first install");
    assert!(
        h.service
            .install_shutdown_hook(ManualLifecycle::new())
            .unwrap()
            .is_none()
    );

    profile.lock().await.title = "departed".to_string();
    lifecycle.trigger();
    let report = hook.await.unwrap();

    assert_eq!(report.attempted, 1);
    assert_eq!(report.written, 1);
    assert!(h.service.registry().is_empty());
    assert!(!h.service.is_autosave_running().await);

    let stored = stored_sub_record(&h.store, "player_36", "profile")
        .await
        .unwrap();
    assert_eq!(stored.get_str("title"), Some("departed"));
}

#[tokio::test]
async fn shutdown_leaves_suppressed_bindings_registered() {
    let h = harness();
    h.store.fail_next_reads(1);
    let binding = h
        .service
        .binding(STORE, "player_37")
        .bind("profile", shared(Profile::default()), profile_schema())
        .open_and_fetch()
        .await
        .unwrap();

    let report = h.service.shutdown().await;
    assert_eq!(report.skipped, 1);
    assert!(binding.is_registered());
    assert_eq!(h.store.write_count(), 0);
}

#[test]
fn shutdown_hook_requires_a_runtime() {
    let h = harness();
    let err = h
        .service
        .install_shutdown_hook(ManualLifecycle::new())
        .unwrap_err();
    assert!(matches!(err, BindError::NoRuntime(_)));

    // The failed attempt does not use up the one allowed install.
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let lifecycle = ManualLifecycle::new();
        let hook = h
            .service
            .install_shutdown_hook(lifecycle.clone())
            .unwrap()
            .expect("install inside a runtime");
        lifecycle.trigger();
        let report = hook.await.unwrap();
        assert_eq!(report.attempted, 0);
    });
}
