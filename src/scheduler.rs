//! Autosave and shutdown sweeps over every registered binding.

use crate::binding::SaveReport;
use crate::core::{BindError, Result};
use crate::registry::BindingRegistry;
use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub written: usize,
    /// Suppressed, disabled, or not yet retrieved.
    pub skipped: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: &Result<SaveReport>) {
        self.attempted += 1;
        match outcome {
            Ok(report) if report.is_written() => self.written += 1,
            Ok(_) | Err(BindError::NotRetrieved(_)) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Saves every registered binding once, in registration order.
pub async fn save_all(registry: &BindingRegistry) -> SweepReport {
    let mut report = SweepReport::default();
    for binding in registry.snapshot() {
        let outcome = binding.save().await;
        if let Err(err) = &outcome {
            debug!(
                "autosave skipped binding: store='{}' key='{}' error='{}'",
                binding.store_name(),
                binding.master_key(),
                err
            );
        }
        report.record(&outcome);
    }
    report
}

/// Finalizes every registered binding. Successful ones leave the registry,
/// failed ones stay for the next sweep.
pub async fn finalize_all(registry: &BindingRegistry) -> SweepReport {
    let bindings = registry.snapshot();
    let outcomes = join_all(bindings.iter().map(|binding| binding.finalize())).await;

    let mut report = SweepReport::default();
    for (binding, outcome) in bindings.iter().zip(&outcomes) {
        if let Err(err) = outcome {
            warn!(
                "finalize failed: store='{}' key='{}' error='{}'",
                binding.store_name(),
                binding.master_key(),
                err
            );
        }
        report.record(outcome);
    }
    report
}

/// Background task running [`save_all`] on a fixed period.
pub struct AutosaveWorker {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl AutosaveWorker {
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Signals the worker to stop and waits for a tick in progress to end.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| BindError::Store(format!("autosave worker join: {}", err)))?;
        }
        Ok(())
    }
}

impl Drop for AutosaveWorker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Spawns the autosave loop on the current Tokio runtime.
pub fn spawn_autosave_worker(registry: Arc<BindingRegistry>, interval: Duration) -> AutosaveWorker {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = sleep(interval) => {
                    let report = save_all(&registry).await;
                    if report.failed > 0 {
                        warn!(
                            "autosave tick: attempted={} written={} skipped={} failed={}",
                            report.attempted, report.written, report.skipped, report.failed
                        );
                    } else {
                        debug!(
                            "autosave tick: attempted={} written={} skipped={}",
                            report.attempted, report.written, report.skipped
                        );
                    }
                }
            }
        }
        info!("autosave worker stopped");
    });

    AutosaveWorker {
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}
