mod common;

use bindstore::{
    DataService, DataServiceConfig, FileBackend, RemoteStore, StoreBackend, Table, VERSION_FIELD,
    shared,
};
use common::{Inventory, Profile, STORE, inventory_schema, profile_schema};
use std::sync::Arc;
use tempfile::tempdir;

fn file_service(root: &std::path::Path) -> Arc<DataService> {
    DataService::new(
        Arc::new(FileBackend::new(root)),
        DataServiceConfig::new().autosave_enabled(false),
    )
}

#[tokio::test]
async fn saved_bindings_survive_a_new_service() {
    let dir = tempdir().unwrap();

    {
        let service = file_service(dir.path());
        let profile = shared(Profile::default());
        let inventory = shared(Inventory::default());
        let binding = service
            .binding(STORE, "player/40")
            .bind("profile", profile.clone(), profile_schema())
            .bind("inventory", inventory.clone(), inventory_schema())
            .open_and_fetch()
            .await
            .unwrap();

        {
            let mut profile = profile.lock().await;
            profile.coins = 1_250;
            profile.title = "cartographer".to_string();
        }
        inventory.lock().await.items = vec!["compass".to_string(), "quill".to_string()];

        let report = service.shutdown().await;
        assert_eq!(report.written, 1);
        assert!(!binding.is_registered());
    }

    let service = file_service(dir.path());
    let profile = shared(Profile::default());
    let inventory = shared(Inventory::default());
    service
        .binding(STORE, "player/40")
        .bind("profile", profile.clone(), profile_schema())
        .bind("inventory", inventory.clone(), inventory_schema())
        .open_and_fetch()
        .await
        .unwrap();

    let profile = profile.lock().await;
    assert_eq!(profile.coins, 1_250);
    assert_eq!(profile.title, "cartographer");
    assert_eq!(profile.loaded_from.as_deref(), Some("v2"));
    assert_eq!(
        inventory.lock().await.items,
        vec!["compass".to_string(), "quill".to_string()]
    );
}

#[tokio::test]
async fn missing_record_reads_as_none() {
    let dir = tempdir().unwrap();
    let store = FileBackend::new(dir.path()).open_store(STORE).unwrap();
    assert_eq!(store.name(), STORE);
    assert!(store.get_record("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn record_is_one_json_document_per_key() {
    let dir = tempdir().unwrap();
    let backend = FileBackend::new(dir.path());
    let store = backend.store(STORE).unwrap();

    let record = Table::new().with(
        "player_41",
        Table::new().with(
            "inventory",
            Table::new()
                .with("items", Table::list(["a", "b"]))
                .with(VERSION_FIELD, "1"),
        ),
    );
    store.put_record("player_41", &record).await.unwrap();

    let path = store.record_path("player_41");
    assert!(path.starts_with(dir.path().join(STORE)));
    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(
        document,
        serde_json::json!({"player_41": {"inventory": {"items": ["a", "b"], "__VERSION": "1"}}})
    );

    assert_eq!(store.get_record("player_41").await.unwrap(), Some(record));
}

#[test]
fn store_names_cannot_escape_the_root() {
    let backend = FileBackend::new("/tmp/bindstore");
    for name in ["", "..", "a/b", "a\\b"] {
        assert!(backend.store(name).is_err(), "accepted {:?}", name);
    }
}
