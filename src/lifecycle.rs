use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use tokio::sync::watch;

/// The host's "about to terminate" notification.
#[async_trait]
pub trait ProcessLifecycle: Send + Sync + 'static {
    /// Resolves once the process is shutting down.
    async fn terminating(&self);
}

/// Treats Ctrl-C / SIGINT as the termination signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtrlCLifecycle;

#[async_trait]
impl ProcessLifecycle for CtrlCLifecycle {
    async fn terminating(&self) {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c listener unavailable, shutdown hook disabled: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

/// Termination triggered by the embedding host. Once triggered it stays
/// triggered, so late subscribers resolve immediately.
#[derive(Debug, Clone)]
pub struct ManualLifecycle {
    tx: Arc<watch::Sender<bool>>,
}

impl ManualLifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ManualLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessLifecycle for ManualLifecycle {
    async fn terminating(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|triggered| *triggered).await.map(|_| ());
    }
}
