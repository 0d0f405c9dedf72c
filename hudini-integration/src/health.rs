use chrono::{DateTime, Utc};
use hudini_core::{PmsError, PmsProvider, PmsResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::registry::ProviderRegistry;

pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn from_counts(total: usize, failed: usize) -> Self {
        match failed {
            0 => HealthStatus::Healthy,
            f if f == total => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl ProviderHealth {
    fn from_result(result: PmsResult<()>, latency: Duration) -> Self {
        Self {
            healthy: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn unfinished() -> Self {
        Self {
            healthy: false,
            error: Some("health probe did not complete".to_string()),
            latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub providers: BTreeMap<String, ProviderHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.providers
            .iter()
            .filter(|(_, health)| !health.healthy)
            .map(|(name, _)| name.as_str())
    }
}

/// Probes every provider concurrently. Never fails as a whole: a provider
/// that fails or panics is recorded as unhealthy.
#[derive(Clone)]
pub struct HealthAggregator {
    registry: Arc<ProviderRegistry>,
    timeout: Duration,
}

impl HealthAggregator {
    pub fn new(registry: Arc<ProviderRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub async fn check_all(&self) -> HealthReport {
        let providers = self.registry.snapshot();

        // Pre-filled so a panicked probe still shows up as a failure
        let mut results: BTreeMap<String, ProviderHealth> = providers
            .iter()
            .map(|(name, _)| (name.clone(), ProviderHealth::unfinished()))
            .collect();

        let mut probes = JoinSet::new();
        for (name, adapter) in providers {
            let limit = self.timeout;
            probes.spawn(async move {
                let started = Instant::now();
                let result = probe(adapter.as_ref(), limit).await;
                (name, ProviderHealth::from_result(result, started.elapsed()))
            });
        }

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((name, health)) => {
                    if let Some(error) = &health.error {
                        warn!(provider = %name, error = %error, "provider health check failed");
                    }
                    results.insert(name, health);
                }
                Err(e) => warn!(error = %e, "health probe task aborted"),
            }
        }

        let failed = results.values().filter(|h| !h.healthy).count();
        let status = HealthStatus::from_counts(results.len(), failed);
        debug!(providers = results.len(), failed, status = ?status, "health check complete");

        HealthReport {
            status,
            providers: results,
            checked_at: Utc::now(),
        }
    }

    /// Probe a single provider by name.
    pub async fn test_connection(&self, name: &str) -> PmsResult<()> {
        let adapter = self.registry.get(name)?;
        probe(adapter.as_ref(), self.timeout).await
    }
}

async fn probe(adapter: &dyn PmsProvider, limit: Duration) -> PmsResult<()> {
    match tokio::time::timeout(limit, adapter.health_check()).await {
        Ok(result) => result,
        Err(_) => Err(PmsError::timeout(format!(
            "{}: health check exceeded {:?}",
            adapter.name(),
            limit
        ))),
    }
}
