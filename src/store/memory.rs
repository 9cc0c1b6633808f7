use super::{RemoteStore, StoreBackend, wire};
use crate::core::{BindError, Result, Table};
use async_trait::async_trait;
use log::debug;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, watch};

/// Process-local backend. Every store keeps the JSON wire form of its records
/// so reads observe exactly what a remote store would hand back.
#[derive(Default)]
pub struct MemoryBackend {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the typed store, creating it on first use.
    pub fn store(&self, store_name: &str) -> Arc<MemoryStore> {
        let mut stores = self.stores.lock().unwrap_or_else(|err| err.into_inner());
        stores
            .entry(store_name.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new(store_name)))
            .clone()
    }
}

impl StoreBackend for MemoryBackend {
    fn open_store(&self, store_name: &str) -> Result<Arc<dyn RemoteStore>> {
        let store: Arc<dyn RemoteStore> = self.store(store_name);
        Ok(store)
    }
}

/// In-memory store with fault injection for reads and writes.
pub struct MemoryStore {
    name: String,
    records: AsyncMutex<HashMap<String, JsonValue>>,
    failing_reads: AtomicU32,
    failing_writes: AtomicU32,
    reads_paused: watch::Sender<bool>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        let (reads_paused, _) = watch::channel(false);
        Self {
            name: name.into(),
            records: AsyncMutex::new(HashMap::new()),
            failing_reads: AtomicU32::new(0),
            failing_writes: AtomicU32::new(0),
            reads_paused,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// The next `count` reads fail with a store error.
    pub fn fail_next_reads(&self, count: u32) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// The next `count` writes fail with a store error.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Holds every read until [`resume_reads`](Self::resume_reads).
    pub fn pause_reads(&self) {
        self.reads_paused.send_replace(true);
    }

    pub fn resume_reads(&self) {
        self.reads_paused.send_replace(false);
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of writes that reached the store, failed ones included.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw wire document stored under `key`.
    pub async fn raw(&self, key: &str) -> Option<JsonValue> {
        self.records.lock().await.get(key).cloned()
    }

    pub async fn peek(&self, key: &str) -> Result<Option<Table>> {
        self.raw(key).await.map(wire::table_from_json).transpose()
    }

    pub async fn seed(&self, key: &str, record: &Table) -> Result<()> {
        let encoded = wire::table_to_json(record)?;
        self.records.lock().await.insert(key.to_string(), encoded);
        Ok(())
    }

    pub async fn seed_json(&self, key: &str, document: JsonValue) {
        self.records.lock().await.insert(key.to_string(), document);
    }
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_record(&self, key: &str) -> Result<Option<Table>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let mut paused = self.reads_paused.subscribe();
        paused
            .wait_for(|is_paused| !*is_paused)
            .await
            .map(|_| ())
            .map_err(|err| BindError::Store(format!("read gate closed: {}", err)))?;

        if take_failure(&self.failing_reads) {
            debug!("injected read failure: store='{}' key='{}'", self.name, key);
            return Err(BindError::Store(format!(
                "injected read failure for '{}'",
                key
            )));
        }

        self.peek(key).await
    }

    async fn put_record(&self, key: &str, record: &Table) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if take_failure(&self.failing_writes) {
            debug!("injected write failure: store='{}' key='{}'", self.name, key);
            return Err(BindError::Store(format!(
                "injected write failure for '{}'",
                key
            )));
        }

        self.seed(key, record).await
    }
}
