use crate::binding::BindingBuilder;
use crate::config::DataServiceConfig;
use crate::core::{BindError, Result};
use crate::lifecycle::ProcessLifecycle;
use crate::registry::BindingRegistry;
use crate::scheduler::{self, AutosaveWorker, SweepReport};
use crate::store::StoreBackend;
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Process-wide owner of the binding registry and the autosave worker.
///
/// Create one per process at startup; it starts empty. Tear it down with
/// [`shutdown`](Self::shutdown), either directly or through the hook
/// installed by [`install_shutdown_hook`](Self::install_shutdown_hook).
pub struct DataService {
    config: DataServiceConfig,
    backend: Arc<dyn StoreBackend>,
    registry: Arc<BindingRegistry>,
    autosave: Mutex<Option<AutosaveWorker>>,
    shutdown_hooked: AtomicBool,
}

impl DataService {
    pub fn new(backend: Arc<dyn StoreBackend>, config: DataServiceConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            backend,
            registry: Arc::new(BindingRegistry::new()),
            autosave: Mutex::new(None),
            shutdown_hooked: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &DataServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    /// Starts a binding for `master_key` in `store_name`.
    pub fn binding(
        &self,
        store_name: impl Into<String>,
        master_key: impl Into<String>,
    ) -> BindingBuilder {
        BindingBuilder::new(
            self.backend.clone(),
            self.registry.clone(),
            store_name,
            master_key,
        )
        .saving_enabled(self.config.saving_allowed())
    }

    /// Starts the autosave worker. Returns `false` when autosave is disabled
    /// or the worker is already running.
    pub async fn start_autosave(&self) -> bool {
        if !self.config.autosave_enabled {
            return false;
        }

        let mut slot = self.autosave.lock().await;
        if slot.as_ref().is_some_and(|worker| !worker.is_finished()) {
            return false;
        }

        let interval = self.config.autosave_interval();
        *slot = Some(scheduler::spawn_autosave_worker(
            self.registry.clone(),
            interval,
        ));
        info!("autosave started: interval_ms={}", interval.as_millis());
        true
    }

    pub async fn stop_autosave(&self) -> Result<()> {
        let worker = self.autosave.lock().await.take();
        match worker {
            Some(worker) => worker.stop().await,
            None => Ok(()),
        }
    }

    pub async fn is_autosave_running(&self) -> bool {
        self.autosave
            .lock()
            .await
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    pub async fn save_all(&self) -> SweepReport {
        scheduler::save_all(&self.registry).await
    }

    pub async fn finalize_all(&self) -> SweepReport {
        scheduler::finalize_all(&self.registry).await
    }

    /// Stops autosave, then finalizes every live binding.
    pub async fn shutdown(&self) -> SweepReport {
        if let Err(err) = self.stop_autosave().await {
            warn!("autosave worker did not stop cleanly: {}", err);
        }
        let report = self.finalize_all().await;
        info!(
            "shutdown flush: attempted={} written={} skipped={} failed={} remaining={}",
            report.attempted,
            report.written,
            report.skipped,
            report.failed,
            self.registry.len()
        );
        report
    }

    /// Subscribes [`shutdown`](Self::shutdown) to the host's termination
    /// notification on the current Tokio runtime. Only the first call
    /// installs a hook; later calls return `Ok(None)`.
    pub fn install_shutdown_hook<L>(
        self: &Arc<Self>,
        lifecycle: L,
    ) -> Result<Option<JoinHandle<SweepReport>>>
    where
        L: ProcessLifecycle,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| BindError::NoRuntime(err.to_string()))?;

        if self.shutdown_hooked.swap(true, Ordering::SeqCst) {
            warn!("shutdown hook already installed, ignoring");
            return Ok(None);
        }

        let service = self.clone();
        Ok(Some(handle.spawn(async move {
            lifecycle.terminating().await;
            service.shutdown().await
        })))
    }
}
