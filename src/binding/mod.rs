//! Data bindings: one master record, many versioned sub-records.
//!
//! A binding is created through [`BindingBuilder`]. Building registers it and
//! issues the one authoritative fetch; saves are refused until that fetch has
//! completed, and a binding whose fetch failed never saves at all.

use crate::core::{BindError, Result, Table, find_mixed_table};
use crate::registry::BindingRegistry;
use crate::store::{RemoteStore, StoreBackend};
use chrono::{DateTime, Utc};
use log::warn;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

pub mod codec;
pub mod schema;
mod slot;

pub use codec::VERSION_FIELD;
pub use schema::{DeserializeFn, Schema, SerializeFn, VersionTable};
use slot::{BoundSlot, TypedSlot};

// Fetch and save paths live in separate files but share this module's scope.
include!("binding_impl/fetch_and_decode.rs");
include!("binding_impl/save_and_finalize.rs");

/// Opaque value handed back to the load hook.
pub type Parent = Arc<dyn Any + Send + Sync>;

/// Called after every trusted fetch completes.
pub type LoadedHook = Arc<dyn Fn(&DataBinding, Option<&Parent>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(Uuid);

impl BindingId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the record a binding reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingContext {
    pub store_name: String,
    pub master_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalState {
    NotRetrieved,
    Retrieved,
}

/// Point-in-time view of a binding's bookkeeping.
#[derive(Debug, Clone)]
pub struct BindingStats {
    pub retrieval: RetrievalState,
    pub suppress_save: bool,
    pub fetches_completed: u64,
    pub saves_written: u64,
    pub save_failures: u64,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BindingState {
    retrieval: RetrievalState,
    suppress_save: bool,
    fetch_generation: u64,
    fetch_in_flight: bool,
    fetches_completed: u64,
    saves_written: u64,
    save_failures: u64,
    last_fetched_at: Option<DateTime<Utc>>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl Default for BindingState {
    fn default() -> Self {
        Self {
            retrieval: RetrievalState::NotRetrieved,
            suppress_save: false,
            fetch_generation: 0,
            fetch_in_flight: false,
            fetches_completed: 0,
            saves_written: 0,
            save_failures: 0,
            last_fetched_at: None,
            last_saved_at: None,
        }
    }
}

pub struct DataBinding {
    id: BindingId,
    context: BindingContext,
    slots: Vec<Box<dyn BoundSlot>>,
    parent: Option<Parent>,
    on_loaded: Option<LoadedHook>,
    store: Arc<dyn RemoteStore>,
    registry: Weak<BindingRegistry>,
    saving_enabled: bool,
    state: Mutex<BindingState>,
    save_gate: AsyncMutex<()>,
    retrieved_tx: watch::Sender<bool>,
}

impl fmt::Debug for DataBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataBinding")
            .field("id", &self.id)
            .field("store_name", &self.context.store_name)
            .field("master_key", &self.context.master_key)
            .field("sub_keys", &self.sub_keys())
            .field("state", &*self.state())
            .finish()
    }
}

impl DataBinding {
    fn state(&self) -> MutexGuard<'_, BindingState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn context(&self) -> &BindingContext {
        &self.context
    }

    pub fn store_name(&self) -> &str {
        &self.context.store_name
    }

    pub fn master_key(&self) -> &str {
        &self.context.master_key
    }

    pub fn sub_keys(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.sub_key()).collect()
    }

    pub fn parent(&self) -> Option<&Parent> {
        self.parent.as_ref()
    }

    pub fn retrieval_state(&self) -> RetrievalState {
        self.state().retrieval
    }

    pub fn is_retrieved(&self) -> bool {
        self.retrieval_state() == RetrievalState::Retrieved
    }

    pub fn is_save_suppressed(&self) -> bool {
        self.state().suppress_save
    }

    /// Whether the object under `sub_key` was populated by a fetch.
    pub fn is_sub_record_retrieved(&self, sub_key: &str) -> Option<bool> {
        self.slot(sub_key).map(|slot| slot.is_retrieved())
    }

    pub fn is_registered(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }

    pub fn stats(&self) -> BindingStats {
        let state = self.state();
        BindingStats {
            retrieval: state.retrieval,
            suppress_save: state.suppress_save,
            fetches_completed: state.fetches_completed,
            saves_written: state.saves_written,
            save_failures: state.save_failures,
            last_fetched_at: state.last_fetched_at,
            last_saved_at: state.last_saved_at,
        }
    }

    /// Suspends until the binding has completed a trusted fetch.
    pub async fn wait_until_retrieved(&self) {
        let mut rx = self.retrieved_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|retrieved| *retrieved).await.map(|_| ());
    }

    fn slot(&self, sub_key: &str) -> Option<&dyn BoundSlot> {
        self.slots
            .iter()
            .find(|slot| slot.sub_key() == sub_key)
            .map(|slot| slot.as_ref())
    }
}

/// Collects sub-records for a binding and validates them before anything is
/// registered. The first invalid object aborts the whole construction.
pub struct BindingBuilder {
    backend: Arc<dyn StoreBackend>,
    registry: Arc<BindingRegistry>,
    context: BindingContext,
    saving_enabled: bool,
    slots: Vec<Box<dyn BoundSlot>>,
    parent: Option<Parent>,
    on_loaded: Option<LoadedHook>,
    error: Option<BindError>,
}

impl BindingBuilder {
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        registry: Arc<BindingRegistry>,
        store_name: impl Into<String>,
        master_key: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            registry,
            context: BindingContext {
                store_name: store_name.into(),
                master_key: master_key.into(),
            },
            saving_enabled: true,
            slots: Vec::new(),
            parent: None,
            on_loaded: None,
            error: None,
        }
    }

    /// Host-level switch; when false every save is skipped.
    pub fn saving_enabled(mut self, enabled: bool) -> Self {
        self.saving_enabled = enabled;
        self
    }

    pub fn bind<T>(
        mut self,
        sub_key: impl Into<String>,
        handle: Arc<AsyncMutex<T>>,
        schema: Schema<T>,
    ) -> Self
    where
        T: Send + 'static,
    {
        if self.error.is_some() {
            return self;
        }

        let sub_key = sub_key.into();
        if let Err(err) = self.check_candidate(&sub_key, &schema) {
            self.error = Some(err);
            return self;
        }

        self.slots
            .push(Box::new(TypedSlot::new(sub_key, handle, schema)));
        self
    }

    pub fn parent<P>(mut self, parent: P) -> Self
    where
        P: Any + Send + Sync,
    {
        self.parent = Some(Arc::new(parent));
        self
    }

    pub fn on_loaded<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DataBinding, Option<&Parent>) + Send + Sync + 'static,
    {
        self.on_loaded = Some(Arc::new(hook));
        self
    }

    /// Registers the binding and spawns its fetch on the current runtime.
    pub fn open(self) -> Result<Arc<DataBinding>> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| BindError::NoRuntime(err.to_string()))?;
        let (binding, generation) = self.build()?;

        let for_fetch = binding.clone();
        handle.spawn(async move {
            for_fetch.run_fetch(generation).await;
        });
        Ok(binding)
    }

    /// Registers the binding and completes its fetch before returning.
    pub async fn open_and_fetch(self) -> Result<Arc<DataBinding>> {
        let (binding, generation) = self.build()?;
        binding.run_fetch(generation).await;
        Ok(binding)
    }

    fn check_candidate<T>(&self, sub_key: &str, schema: &Schema<T>) -> Result<()> {
        if sub_key.is_empty() {
            return Err(BindError::InvalidName("sub-key must not be empty".to_string()));
        }
        if sub_key == VERSION_FIELD {
            return Err(BindError::InvalidName(format!(
                "'{}' is reserved",
                VERSION_FIELD
            )));
        }
        if self.slots.iter().any(|slot| slot.sub_key() == sub_key) {
            return Err(BindError::DuplicateSubKey(sub_key.to_string()));
        }
        schema.validate(sub_key)
    }

    fn build(self) -> Result<(Arc<DataBinding>, u64)> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.context.store_name.is_empty() {
            return Err(BindError::InvalidName("store name must not be empty".to_string()));
        }
        if self.context.master_key.is_empty() {
            return Err(BindError::InvalidName("master key must not be empty".to_string()));
        }

        let store = self.backend.open_store(&self.context.store_name)?;
        let (retrieved_tx, _) = watch::channel(false);
        let binding = Arc::new(DataBinding {
            id: BindingId::new(),
            context: self.context,
            slots: self.slots,
            parent: self.parent,
            on_loaded: self.on_loaded,
            store,
            registry: Arc::downgrade(&self.registry),
            saving_enabled: self.saving_enabled,
            state: Mutex::new(BindingState::default()),
            save_gate: AsyncMutex::new(()),
            retrieved_tx,
        });

        // Claim the construction fetch before anyone else can see the binding.
        let generation = binding
            .begin_fetch(false)
            .ok_or_else(|| BindError::Store("construction fetch could not start".to_string()))?;
        self.registry.register(binding.clone());
        Ok((binding, generation))
    }
}
