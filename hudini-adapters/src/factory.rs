use chrono::Duration as ChronoDuration;
use hudini_core::session::DEFAULT_REFRESH_MARGIN_SECS;
use hudini_core::{Clock, Credentials, PmsError, PmsProvider, PmsResult, ProviderKind, SystemClock};
use hudini_store::{PmsConfig, ProviderConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::opera::OperaAdapter;
use crate::oracle_ohip::OracleOhipAdapter;

/// Transport and session knobs handed to every adapter
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub timeout: Duration,
    pub bulk_timeout: Duration,
    pub session_margin: ChronoDuration,
    pub clock: Arc<dyn Clock>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            bulk_timeout: Duration::from_secs(300),
            session_margin: ChronoDuration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            clock: Arc::new(SystemClock),
        }
    }
}

impl AdapterSettings {
    pub fn for_provider(pms: &PmsConfig, provider: &ProviderConfig) -> Self {
        Self {
            timeout: provider.request_timeout(),
            bulk_timeout: provider.bulk_request_timeout(),
            session_margin: ChronoDuration::from_std(pms.session_margin())
                .unwrap_or_else(|_| ChronoDuration::seconds(DEFAULT_REFRESH_MARGIN_SECS)),
            ..Default::default()
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// One enabled provider, built but not yet registered
pub struct ConfiguredProvider {
    pub name: String,
    pub adapter: Arc<dyn PmsProvider>,
    pub credentials: Credentials,
}

/// Map a vendor type string to an adapter instance.
pub fn build_adapter(
    name: &str,
    provider: &ProviderConfig,
    settings: &AdapterSettings,
) -> PmsResult<Arc<dyn PmsProvider>> {
    let kind = provider.provider_kind()?;
    let credentials = provider.credentials();

    match kind {
        ProviderKind::OracleOhip => Ok(Arc::new(OracleOhipAdapter::new(name, credentials, settings)?)),
        ProviderKind::Opera => Ok(Arc::new(OperaAdapter::new(name, credentials, settings)?)),
        ProviderKind::Fidelio => Err(PmsError::Configuration(format!(
            "provider '{}' has type fidelio, which has no adapter in this build",
            name
        ))),
    }
}

/// Build every enabled provider in declaration order. Any bad entry fails
/// startup.
pub fn build_adapters(pms: &PmsConfig) -> PmsResult<Vec<ConfiguredProvider>> {
    let mut built = Vec::new();

    for (name, provider) in &pms.providers {
        if !provider.enabled {
            info!(provider = %name, "provider disabled, skipping");
            continue;
        }

        let settings = AdapterSettings::for_provider(pms, provider);
        let adapter = build_adapter(name, provider, &settings).map_err(|e| {
            error!(provider = %name, error = %e, "invalid provider configuration");
            e
        })?;

        info!(
            provider = %name,
            kind = %adapter.kind(),
            environment = %provider.environment,
            "provider configured"
        );
        built.push(ConfiguredProvider {
            name: name.clone(),
            adapter,
            credentials: provider.credentials(),
        });
    }

    if built.is_empty() {
        warn!("no PMS providers enabled");
    }
    Ok(built)
}

/// Log every provider in. Failures are logged and reported, never fatal:
/// the provider stays registered and the scheduler keeps retrying it.
pub async fn authenticate_all(providers: &[ConfiguredProvider]) -> Vec<(String, PmsResult<()>)> {
    let mut results = Vec::with_capacity(providers.len());

    for provider in providers {
        let result = provider.adapter.authenticate(&provider.credentials).await;
        if let Err(e) = &result {
            warn!(provider = %provider.name, error = %e, "initial authentication failed");
        }
        results.push((provider.name.clone(), result));
    }
    results
}
