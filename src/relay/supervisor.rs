//! Ingestion supervisor
//!
//! Periodically scans the stream registry and starts a relay instance
//! for every primary stream that does not have one yet. Discovery is
//! polling-based; the poll interval bounds the startup latency of a new
//! stream, which is acceptable against stream lifetimes of minutes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::registry::StreamRegistry;
use crate::relay::active::ActiveRelaySet;
use crate::relay::instance::{RelayHandle, RelayLauncher};
use crate::stats::RelayCounters;

/// Discovers unrelayed streams and launches relay instances for them
pub struct Supervisor<L: RelayLauncher> {
    registry: Arc<StreamRegistry>,
    launcher: L,
    active: Arc<ActiveRelaySet>,
    counters: Arc<RelayCounters>,
    instances: Mutex<HashMap<String, RelayHandle>>,
    poll_interval: Duration,
    viewer_delimiter: char,
}

impl<L: RelayLauncher> Supervisor<L> {
    pub fn new(
        config: &RelayConfig,
        registry: Arc<StreamRegistry>,
        launcher: L,
        active: Arc<ActiveRelaySet>,
        counters: Arc<RelayCounters>,
    ) -> Self {
        Self {
            registry,
            launcher,
            active,
            counters,
            instances: Mutex::new(HashMap::new()),
            poll_interval: config.poll_interval,
            viewer_delimiter: config.viewer_delimiter,
        }
    }

    /// Names of the streams with a tracked relay instance
    pub async fn relayed_streams(&self) -> Vec<String> {
        self.instances.lock().await.keys().cloned().collect()
    }

    /// One scan of the registry
    ///
    /// Prunes finished instances, then reserves and launches every
    /// primary stream not yet relayed. A failed launch releases its
    /// reservation so the next tick retries it.
    pub async fn tick(&self) {
        self.instances
            .lock()
            .await
            .retain(|_, handle| !handle.is_finished());

        for name in self.registry.snapshot().await {
            // Derived per-viewer streams are never primary sources
            if name.contains(self.viewer_delimiter) {
                continue;
            }

            if !self.active.try_reserve(&name).await {
                continue;
            }

            tracing::info!(stream = %name, "Starting relay for stream");
            match self.launcher.launch(&name).await {
                Ok(handle) => {
                    self.instances.lock().await.insert(name, handle);
                }
                Err(e) => {
                    tracing::error!(stream = %name, error = %e, "Relay startup failed");
                    self.counters.record_failed_launch();
                    // The reservation must not outlive the failed attempt
                    self.active.release(&name).await;
                }
            }
        }
    }

    /// Scan at the configured interval until cancelled
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        tracing::info!("Supervisor stopped");
    }

    /// Spawn the scan loop as a background task
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move { supervisor.run(cancel).await })
    }

    /// Request shutdown of every tracked instance and wait for each
    pub async fn shutdown_all(&self) {
        let handles: Vec<RelayHandle> = {
            let mut instances = self.instances.lock().await;
            instances.drain().map(|(_, handle)| handle).collect()
        };

        for handle in handles {
            handle.shutdown();
            handle.join().await;
        }
    }
}
