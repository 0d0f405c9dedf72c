use hudini_core::{Credentials, PmsResult, ProviderKind};
use hudini_shared::pii::Masked;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

const ENV_PREFIX: &str = "HUDINI";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub pms: PmsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "hudini_server=debug,hudini_integration=debug,hudini_adapters=info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PmsConfig {
    /// Explicit default; when absent or unknown the first registered provider wins
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Property charges are booked against when the caller names none
    #[serde(default)]
    pub property_id: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_session_margin_secs")]
    pub session_margin_secs: u64,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
    #[serde(default)]
    pub breakfast: BreakfastChargeConfig,
    /// Declaration order is registration order
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
}

fn default_refresh_interval_secs() -> u64 { 900 }
fn default_session_margin_secs() -> u64 { 300 }
fn default_health_timeout_secs() -> u64 { 30 }

impl PmsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn session_margin(&self) -> Duration {
        Duration::from_secs(self.session_margin_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs.max(1))
    }

    pub fn enabled_providers(&self) -> impl Iterator<Item = (&String, &ProviderConfig)> {
        self.providers.iter().filter(|(_, p)| p.enabled)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BreakfastChargeConfig {
    #[serde(default = "default_charge_code")]
    pub charge_code: String,
    #[serde(default = "default_department_code")]
    pub department_code: String,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_charge_code() -> String { "BREAKFAST".to_string() }
fn default_department_code() -> String { "F&B".to_string() }
fn default_description() -> String { "Breakfast Package Charge".to_string() }

impl Default for BreakfastChargeConfig {
    fn default() -> Self {
        Self {
            charge_code: default_charge_code(),
            department_code: default_department_code(),
            description: default_description(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Vendor type string: oracle_ohip, opera, fidelio
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Masked<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Masked<String>,
    #[serde(default)]
    pub api_key: Masked<String>,
    #[serde(default)]
    pub property_id: String,
    /// Seconds, point reads and writes
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Seconds, property-wide listings
    #[serde(default = "default_bulk_timeout")]
    pub bulk_timeout: u64,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub additional: HashMap<String, String>,
}

fn default_timeout() -> u64 { 30 }
fn default_bulk_timeout() -> u64 { 300 }
fn default_environment() -> String { "sandbox".to_string() }
fn default_enabled() -> bool { true }

impl ProviderConfig {
    pub fn provider_kind(&self) -> PmsResult<ProviderKind> {
        self.kind.parse()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            property_id: self.property_id.clone(),
            additional: self.additional.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn bulk_request_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout.max(self.timeout))
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. HUDINI_PMS__PROVIDERS__ORACLE_OHIP__PASSWORD=...
            .add_source(environment())
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Same layering as [`Config::load`] but with the file layer given inline.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Shape checks only. Vendor types and credentials are checked when the
    /// adapters are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pms.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "pms.refresh_interval_secs must be greater than zero".into(),
            ));
        }
        for (name, provider) in &self.pms.providers {
            if provider.timeout == 0 {
                return Err(ConfigError::Invalid(format!(
                    "pms.providers.{}.timeout must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
