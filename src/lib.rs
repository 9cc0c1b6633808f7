// ============================================================================
// bindstore library
// ============================================================================

pub mod binding;
pub mod config;
pub mod core;
pub mod lifecycle;
pub mod prelude;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use binding::{
    BindingBuilder, BindingContext, BindingId, BindingStats, DataBinding, Parent, RetrievalState,
    SaveReport, SaveStatus, Schema, VERSION_FIELD, VersionTable,
};
pub use config::{DataServiceConfig, HostEnvironment};
pub use core::{BindError, RecordKey, RecordValue, Result, Table, is_well_formed};
pub use lifecycle::{CtrlCLifecycle, ManualLifecycle, ProcessLifecycle};
pub use registry::BindingRegistry;
pub use scheduler::{AutosaveWorker, SweepReport, spawn_autosave_worker};
pub use service::DataService;
pub use store::{FileBackend, MemoryBackend, MemoryStore, RemoteStore, StoreBackend};

/// Wraps an object so it can be shared between the caller and a binding.
///
/// # Examples
///
/// ```
/// use bindstore::{DataService, DataServiceConfig, MemoryBackend, Schema, shared};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Wallet {
///     coins: i64,
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> bindstore::Result<()> {
/// let service = DataService::new(Arc::new(MemoryBackend::new()), DataServiceConfig::default());
/// let wallet = shared(Wallet::default());
///
/// let binding = service
///     .binding("PlayerData", "player_1")
///     .bind("wallet", wallet.clone(), Schema::serde("1"))
///     .open_and_fetch()
///     .await?;
///
/// wallet.lock().await.coins += 25;
/// binding.save().await?;
/// # Ok(())
/// # }
/// ```
pub fn shared<T>(value: T) -> std::sync::Arc<tokio::sync::Mutex<T>> {
    std::sync::Arc::new(tokio::sync::Mutex::new(value))
}
