//! Delivery engine lifecycle: owns the dispatcher and maintenance sweeps.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::error::WebhookError;
use crate::services::delivery_client::DeliveryClient;
use crate::sweeper::{ReclaimSweeper, RetentionPurger};

/// Engine tuning knobs, grouped for the composition root.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub dispatcher: DispatcherConfig,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Lock age after which an in_progress row counts as stuck.
    pub stuck_after: Duration,
    /// Reclaim sweep cadence.
    pub reclaim_interval: Duration,
    /// How long succeeded rows are kept.
    pub retention: Duration,
    /// Retention purge cadence.
    pub purge_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            request_timeout: Duration::from_secs(3),
            stuck_after: Duration::from_secs(300),
            reclaim_interval: Duration::from_secs(120),
            retention: Duration::from_secs(7 * 24 * 3600),
            purge_interval: Duration::from_secs(3600),
        }
    }
}

/// Running delivery engine: dispatcher, reclaim sweeper, retention purger.
pub struct DeliveryEngine {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl DeliveryEngine {
    /// Spawn the background tasks and return a handle for shutdown.
    pub fn start(pool: PgPool, config: EngineConfig) -> Result<Self, WebhookError> {
        let cancel = CancellationToken::new();
        let client = DeliveryClient::new(config.request_timeout)?;

        let dispatcher = Arc::new(Dispatcher::new(
            pool.clone(),
            client,
            config.dispatcher.clone(),
        ));
        let sweeper = Arc::new(ReclaimSweeper::new(
            pool.clone(),
            config.stuck_after,
            config.reclaim_interval,
        ));
        let purger = Arc::new(RetentionPurger::new(
            pool,
            config.retention,
            config.purge_interval,
        ));

        let handles = vec![
            tokio::spawn(dispatcher.run(cancel.child_token())),
            tokio::spawn(sweeper.run(cancel.child_token())),
            tokio::spawn(purger.run(cancel.child_token())),
        ];

        info!(target: "webhook_delivery", "Delivery engine started");

        Ok(Self { cancel, handles })
    }

    /// Signal all tasks to stop and wait for them to finish.
    ///
    /// The dispatcher finishes marking any in-flight batch before exiting,
    /// so a clean shutdown leaves no rows stranded in in_progress.
    pub async fn stop(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
        info!(target: "webhook_delivery", "Delivery engine stopped");
    }
}
