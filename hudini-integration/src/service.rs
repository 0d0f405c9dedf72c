use chrono::NaiveDate;
use hudini_adapters::{authenticate_all, build_adapters};
use hudini_core::{
    Clock, Folio, GuestProfile, PmsResult, Reservation, RoomStatus, SystemClock,
};
use hudini_shared::models::events::{PmsEvent, ProviderSwitchedEvent, RoomsSyncedEvent};
use hudini_store::PmsConfig;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::charge::{BreakfastCharge, ChargeOutcome, ChargePostingWorkflow};
use crate::health::{HealthAggregator, HealthReport};
use crate::registry::{ProviderDescriptor, ProviderRegistry};
use crate::scheduler::{ProviderRefresh, TokenRefreshScheduler};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of pulling a property's rooms and in-house guests
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub provider: String,
    pub property_id: String,
    pub rooms: Vec<RoomStatus>,
    pub guests: Vec<GuestProfile>,
    pub breakfast_guests: usize,
}

/// Entry point for everything outside the integration core. All reads go
/// through the registry's current default provider.
#[derive(Clone)]
pub struct PmsIntegrationService {
    registry: Arc<ProviderRegistry>,
    workflow: ChargePostingWorkflow,
    health: HealthAggregator,
    scheduler: TokenRefreshScheduler,
    events: broadcast::Sender<PmsEvent>,
    property_id: String,
    clock: Arc<dyn Clock>,
}

impl PmsIntegrationService {
    pub fn new(registry: Arc<ProviderRegistry>, pms: &PmsConfig) -> Self {
        Self::with_clock(registry, pms, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: Arc<ProviderRegistry>, pms: &PmsConfig, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            workflow: ChargePostingWorkflow::new(
                registry.clone(),
                pms.breakfast.clone(),
                pms.property_id.clone(),
                events.clone(),
                clock.clone(),
            ),
            health: HealthAggregator::new(registry.clone(), pms.health_timeout()),
            scheduler: TokenRefreshScheduler::new(registry.clone(), pms.refresh_interval()),
            events,
            property_id: pms.property_id.clone(),
            registry,
            clock,
        }
    }

    /// Build, log in and register every enabled provider, then pin the
    /// configured default. Login failures are logged and left to the
    /// refresh scheduler; bad configuration fails.
    pub async fn from_config(pms: &PmsConfig) -> PmsResult<Self> {
        let providers = build_adapters(pms)?;
        let registry = Arc::new(ProviderRegistry::new());

        for (name, result) in authenticate_all(&providers).await {
            if result.is_ok() {
                info!(provider = %name, "provider ready");
            }
        }
        for provider in providers {
            registry.register(provider.name, provider.adapter);
        }

        if let Some(default) = pms.default_provider.as_deref() {
            if let Err(e) = registry.set_default(default) {
                warn!(provider = %default, error = %e, "configured default provider not available, using first registered");
            }
        }

        Ok(Self::new(registry, pms))
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Scheduler over this service's registry, ready to be spawned
    pub fn scheduler(&self) -> TokenRefreshScheduler {
        self.scheduler.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PmsEvent> {
        self.events.subscribe()
    }

    // Guests

    #[instrument(skip(self))]
    pub async fn get_guest_profile(&self, room_number: &str) -> PmsResult<GuestProfile> {
        self.registry.get_default()?.get_guest_profile(room_number).await
    }

    #[instrument(skip(self))]
    pub async fn get_guest_by_reservation(&self, reservation_id: &str) -> PmsResult<GuestProfile> {
        self.registry.get_default()?.get_guest_by_reservation(reservation_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_guests_by_property(&self, property_id: &str) -> PmsResult<Vec<GuestProfile>> {
        let property_id = self.property_or_default(property_id);
        self.registry.get_default()?.get_guests_by_property(property_id).await
    }

    // Rooms

    #[instrument(skip(self))]
    pub async fn get_room_status(&self, room_number: &str) -> PmsResult<RoomStatus> {
        self.registry.get_default()?.get_room_status(room_number).await
    }

    #[instrument(skip(self))]
    pub async fn get_rooms_by_property(&self, property_id: &str) -> PmsResult<Vec<RoomStatus>> {
        let property_id = self.property_or_default(property_id);
        self.registry.get_default()?.get_rooms_by_property(property_id).await
    }

    // Reservations & folios

    pub async fn get_reservation(&self, reservation_id: &str) -> PmsResult<Reservation> {
        self.registry.get_default()?.get_reservation(reservation_id).await
    }

    pub async fn get_reservations_by_date(&self, date: NaiveDate) -> PmsResult<Vec<Reservation>> {
        self.registry.get_default()?.get_reservations_by_date(date).await
    }

    pub async fn get_folio(&self, guest_id: &str) -> PmsResult<Folio> {
        self.registry.get_default()?.get_folio(guest_id).await
    }

    // Charges

    pub async fn post_breakfast_charge(&self, charge: &BreakfastCharge) -> PmsResult<ChargeOutcome> {
        self.workflow.post_breakfast_charge(charge).await
    }

    /// Pull rooms, then in-house guests, for a property.
    #[instrument(skip(self))]
    pub async fn sync_room_data(&self, property_id: &str) -> PmsResult<SyncSummary> {
        let property_id = self.property_or_default(property_id);
        let adapter = self.registry.get_default()?;

        let rooms = adapter.get_rooms_by_property(property_id).await?;
        let guests = adapter.get_guests_by_property(property_id).await?;
        let breakfast_guests = guests.iter().filter(|g| g.breakfast_package).count();

        info!(
            provider = %adapter.name(),
            property_id = %property_id,
            rooms = rooms.len(),
            guests = guests.len(),
            breakfast_guests,
            "room data synced"
        );

        let _ = self.events.send(PmsEvent::RoomsSynced(RoomsSyncedEvent {
            event_id: Uuid::new_v4(),
            provider: adapter.name().to_string(),
            property_id: property_id.to_string(),
            rooms: rooms.len(),
            guests: guests.len(),
            timestamp: self.clock.now().timestamp(),
        }));

        Ok(SyncSummary {
            provider: adapter.name().to_string(),
            property_id: property_id.to_string(),
            rooms,
            guests,
            breakfast_guests,
        })
    }

    // Providers

    pub async fn health_check(&self) -> HealthReport {
        self.health.check_all().await
    }

    pub async fn test_connection(&self, name: &str) -> PmsResult<()> {
        self.health.test_connection(name).await
    }

    pub fn list_providers(&self) -> Vec<String> {
        self.registry.list()
    }

    pub fn describe_providers(&self) -> Vec<ProviderDescriptor> {
        self.registry.describe()
    }

    pub fn switch_provider(&self, name: &str) -> PmsResult<()> {
        let previous = self.registry.switch_to(name)?;

        let _ = self.events.send(PmsEvent::ProviderSwitched(ProviderSwitchedEvent {
            event_id: Uuid::new_v4(),
            previous,
            current: name.to_string(),
            timestamp: self.clock.now().timestamp(),
        }));
        Ok(())
    }

    /// Best effort: failures are logged and reported, never raised.
    pub async fn refresh_provider_tokens(&self) -> Vec<ProviderRefresh> {
        self.scheduler.refresh_all().await
    }

    fn property_or_default<'a>(&'a self, property_id: &'a str) -> &'a str {
        if property_id.trim().is_empty() {
            &self.property_id
        } else {
            property_id
        }
    }
}
