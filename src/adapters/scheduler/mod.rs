//! Periodic lifecycle sweeps.
//!
//! Drives the two scheduled transitions that are not gateway-driven: the
//! hourly stale-checkout cancellation and the daily period-expiry sweep.
//! The loop listens for a shutdown signal and finishes the current sweep
//! before stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::handlers::{ExpireSubscriptionsHandler, SweepStalePendingHandler};

/// Configuration for the sweep scheduler.
#[derive(Debug, Clone)]
pub struct SweepSchedulerConfig {
    /// How often to cancel abandoned checkouts.
    pub stale_pending_interval: Duration,

    /// How often to expire lapsed subscriptions.
    pub expiry_interval: Duration,
}

impl Default for SweepSchedulerConfig {
    fn default() -> Self {
        Self {
            stale_pending_interval: Duration::from_secs(60 * 60),
            expiry_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Background service running the lifecycle sweeps.
pub struct SweepScheduler {
    stale_pending: Arc<SweepStalePendingHandler>,
    expiry: Arc<ExpireSubscriptionsHandler>,
    config: SweepSchedulerConfig,
}

impl SweepScheduler {
    /// Creates a scheduler with the default cadence (hourly / daily).
    pub fn new(
        stale_pending: Arc<SweepStalePendingHandler>,
        expiry: Arc<ExpireSubscriptionsHandler>,
    ) -> Self {
        Self {
            stale_pending,
            expiry,
            config: SweepSchedulerConfig::default(),
        }
    }

    /// Creates a scheduler with a custom cadence.
    pub fn with_config(
        stale_pending: Arc<SweepStalePendingHandler>,
        expiry: Arc<ExpireSubscriptionsHandler>,
        config: SweepSchedulerConfig,
    ) -> Self {
        Self {
            stale_pending,
            expiry,
            config,
        }
    }

    /// Run both sweep loops until shutdown is signalled.
    ///
    /// A failing sweep run is logged and the loop continues; the next tick
    /// retries naturally.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut stale_tick = time::interval(self.config.stale_pending_interval);
        let mut expiry_tick = time::interval(self.config.expiry_interval);

        // First tick of tokio intervals fires immediately; consume both so
        // the sweeps run on cadence, not at startup
        stale_tick.tick().await;
        expiry_tick.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }

                _ = stale_tick.tick() => {
                    if let Err(e) = self.stale_pending.handle().await {
                        tracing::error!(error = %e, "stale-pending sweep run failed");
                    }
                }

                _ = expiry_tick.tick() => {
                    if let Err(e) = self.expiry.handle().await {
                        tracing::error!(error = %e, "expiry sweep run failed");
                    }
                }
            }
        }
    }
}
