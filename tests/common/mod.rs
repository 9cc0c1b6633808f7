#![allow(dead_code)]

use bindstore::{
    BindingContext, DataService, DataServiceConfig, MemoryBackend, MemoryStore, Schema, Table,
    VersionTable,
};
use std::sync::Arc;
use std::time::Duration;

pub const STORE: &str = "PlayerData";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Profile {
    pub coins: i64,
    pub title: String,
    pub loaded_from: Option<String>,
}

/// v1 stored `gold`/`name`; v2 renamed them to `coins`/`title`.
pub fn profile_schema() -> Schema<Profile> {
    Schema::new()
        .serializer(|p: &Profile| {
            Ok(Table::new()
                .with("coins", p.coins)
                .with("title", p.title.as_str()))
        })
        .versions(
            VersionTable::new()
                .latest("v2")
                .version("v1", |p: &mut Profile, stored: Table, _ctx: &BindingContext| {
                    p.coins = stored.get_i64("gold").unwrap_or_default();
                    p.title = stored.get_str("name").unwrap_or("newcomer").to_string();
                    p.loaded_from = Some("v1".to_string());
                    Ok(())
                })
                .version("v2", |p: &mut Profile, stored: Table, _ctx: &BindingContext| {
                    p.coins = stored.get_i64("coins").unwrap_or_default();
                    p.title = stored.get_str("title").unwrap_or("newcomer").to_string();
                    p.loaded_from = Some("v2".to_string());
                    Ok(())
                }),
        )
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Inventory {
    pub items: Vec<String>,
}

pub fn inventory_schema() -> Schema<Inventory> {
    Schema::new()
        .serializer(|inv: &Inventory| {
            Ok(Table::new().with("items", Table::list(inv.items.iter().map(String::as_str))))
        })
        .versions(VersionTable::new().latest("1").version(
            "1",
            |inv: &mut Inventory, stored: Table, _ctx: &BindingContext| {
                inv.items = stored
                    .get_table("items")
                    .map(|items| {
                        items
                            .values()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(())
            },
        ))
}

/// Serializes to `{ [1] = "a", ["x"] = "b" }`, which no store can encode.
pub fn mixed_key_schema() -> Schema<Inventory> {
    Schema::new()
        .serializer(|_inv: &Inventory| Ok(Table::new().with(1u64, "a").with("x", "b")))
        .versions(VersionTable::new().latest("1").version(
            "1",
            |_inv: &mut Inventory, _stored: Table, _ctx: &BindingContext| Ok(()),
        ))
}

pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub store: Arc<MemoryStore>,
    pub service: Arc<DataService>,
}

pub fn harness() -> Harness {
    harness_with(DataServiceConfig::default().autosave_enabled(false))
}

pub fn harness_with(config: DataServiceConfig) -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    let store = backend.store(STORE);
    let service = DataService::new(backend.clone(), config);
    Harness {
        backend,
        store,
        service,
    }
}

/// Sub-record `sub_key` of the master record stored under `key`.
pub async fn stored_sub_record(store: &MemoryStore, key: &str, sub_key: &str) -> Option<Table> {
    let record = store.peek(key).await.unwrap()?;
    record.get_table(key)?.get_table(sub_key).cloned()
}

pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}
