use anyhow::Context;
use hudini_integration::PmsIntegrationService;
use hudini_shared::models::events::PmsEvent;
use hudini_store::Config;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` wins; otherwise the configured filter.
pub fn init_tracing(fallback: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Forward integration events to the log until the channel closes or
/// `shutdown` fires. Returns how many events were forwarded.
pub async fn drain_events(mut events: broadcast::Receiver<PmsEvent>, shutdown: CancellationToken) -> usize {
    let mut forwarded = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => {
                    forwarded += 1;
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    info!(topic = event.topic(), event_id = %event.event_id(), payload = %payload, "pms event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event drain lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!(forwarded, "event drain stopped");
    forwarded
}

/// Bring up the integration core and keep it running until `shutdown`.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let service = PmsIntegrationService::from_config(&config.pms)
        .await
        .context("failed to initialise PMS providers")?;

    for provider in service.describe_providers() {
        info!(
            provider = %provider.name,
            kind = %provider.kind,
            authenticated = provider.authenticated,
            is_default = provider.is_default,
            "provider status"
        );
    }

    let drain = tokio::spawn(drain_events(service.subscribe(), shutdown.clone()));
    let scheduler = service.scheduler();
    info!(interval_secs = scheduler.interval().as_secs(), "starting token refresh");
    let refresher = scheduler.spawn(shutdown.clone());

    let report = service.health_check().await;
    info!(status = ?report.status, providers = report.providers.len(), "initial health check");

    shutdown.cancelled().await;
    info!("shutting down");

    refresher.await.context("token refresh task failed")?;
    drain.await.context("event drain task failed")?;
    Ok(())
}
