use hudini_core::PmsResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::ProviderRegistry;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Result of one provider's refresh attempt
#[derive(Debug)]
pub struct ProviderRefresh {
    pub provider: String,
    pub result: PmsResult<()>,
}

/// Periodically renews every registered provider's session.
///
/// Reads the registry, never changes it. One provider failing does not stop
/// the others from being refreshed.
#[derive(Clone)]
pub struct TokenRefreshScheduler {
    registry: Arc<ProviderRegistry>,
    interval: Duration,
}

impl TokenRefreshScheduler {
    pub fn new(registry: Arc<ProviderRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            // tokio::time::interval panics on zero
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One pass over a snapshot of the registry.
    pub async fn refresh_all(&self) -> Vec<ProviderRefresh> {
        let providers = self.registry.snapshot();
        let mut report = Vec::with_capacity(providers.len());

        for (name, adapter) in providers {
            let result = adapter.refresh_session_if_needed().await;
            match &result {
                Ok(()) => debug!(provider = %name, "session checked"),
                Err(e) => warn!(provider = %name, error = %e, "token refresh failed"),
            }
            report.push(ProviderRefresh { provider: name, result });
        }
        report
    }

    /// Tick until `shutdown` fires. The first tick is skipped: providers
    /// were just authenticated at startup.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs(), "token refresh scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("token refresh scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.refresh_all().await;
                    let failed = report.iter().filter(|r| r.result.is_err()).count();
                    debug!(providers = report.len(), failed, "token refresh pass complete");
                }
            }
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
