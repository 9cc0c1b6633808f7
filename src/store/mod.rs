use crate::core::{Result, Table};
use async_trait::async_trait;
use std::sync::Arc;

pub mod file;
mod lenient;
pub mod memory;
pub mod wire;

pub use file::{FileBackend, FileStore};
pub use memory::{MemoryBackend, MemoryStore};

/// Remote key-value store holding master records.
///
/// Both calls may suspend for as long as the backend needs; neither is
/// cancelled by the caller once issued. Errors are opaque to bindings and
/// only ever logged.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name this store was opened under.
    fn name(&self) -> &str;

    /// Reads the record stored under `key`, `None` if nothing was ever written.
    async fn get_record(&self, key: &str) -> Result<Option<Table>>;

    /// Replaces the record stored under `key`.
    async fn put_record(&self, key: &str, record: &Table) -> Result<()>;
}

/// Hands out named stores, the equivalent of a data-store service.
pub trait StoreBackend: Send + Sync {
    fn open_store(&self, store_name: &str) -> Result<Arc<dyn RemoteStore>>;
}
