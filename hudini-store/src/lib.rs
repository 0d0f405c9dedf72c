pub mod app_config;

pub use app_config::{ConfigError, BreakfastChargeConfig, Config, LoggingConfig, PmsConfig, ProviderConfig};
