pub mod charge;
pub mod health;
pub mod registry;
pub mod scheduler;
pub mod service;

pub use charge::{breakfast_reference, BreakfastCharge, ChargeOutcome, ChargePostingWorkflow};
pub use health::{HealthAggregator, HealthReport, HealthStatus, ProviderHealth};
pub use registry::{ProviderDescriptor, ProviderRegistry};
pub use scheduler::{ProviderRefresh, TokenRefreshScheduler};
pub use service::{PmsIntegrationService, SyncSummary};
