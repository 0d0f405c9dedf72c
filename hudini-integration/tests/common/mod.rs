#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hudini_core::{
    Charge, ChargeRequest, ChargeResponse, Credentials, Folio, GuestProfile, PmsError, PmsProvider,
    PmsResult, ProviderKind, Reservation, RoomStatus,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted in-memory provider
pub struct FakeProvider {
    name: String,
    kind: ProviderKind,
    authenticated: AtomicBool,
    refresh_error: Mutex<Option<PmsError>>,
    refresh_calls: AtomicUsize,
    health: Mutex<HealthScript>,
    charge: Mutex<Option<PmsResult<ChargeResponse>>>,
    posted: Mutex<Vec<ChargeRequest>>,
    rooms: Mutex<Vec<RoomStatus>>,
    guests: Mutex<Vec<GuestProfile>>,
}

#[derive(Clone)]
pub enum HealthScript {
    Ok,
    Fail(PmsError),
    Hang(Duration),
    Panic,
}

impl FakeProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ProviderKind::OracleOhip,
            authenticated: AtomicBool::new(true),
            refresh_error: Mutex::new(None),
            refresh_calls: AtomicUsize::new(0),
            health: Mutex::new(HealthScript::Ok),
            charge: Mutex::new(None),
            posted: Mutex::new(Vec::new()),
            rooms: Mutex::new(Vec::new()),
            guests: Mutex::new(Vec::new()),
        }
    }

    pub fn unauthenticated(self) -> Self {
        self.authenticated.store(false, Ordering::SeqCst);
        self
    }

    pub fn with_health(self, script: HealthScript) -> Self {
        *self.health.lock().unwrap() = script;
        self
    }

    pub fn with_refresh_error(self, error: PmsError) -> Self {
        *self.refresh_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_charge(self, result: PmsResult<ChargeResponse>) -> Self {
        *self.charge.lock().unwrap() = Some(result);
        self
    }

    pub fn with_rooms(self, rooms: Vec<RoomStatus>) -> Self {
        *self.rooms.lock().unwrap() = rooms;
        self
    }

    pub fn with_guests(self, guests: Vec<GuestProfile>) -> Self {
        *self.guests.lock().unwrap() = guests;
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn posted(&self) -> Vec<ChargeRequest> {
        self.posted.lock().unwrap().clone()
    }
}

pub fn posted(reference: &str, transaction_id: &str) -> ChargeResponse {
    ChargeResponse {
        success: true,
        transaction_id: transaction_id.to_string(),
        status: "posted".to_string(),
        reference: reference.to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl PmsProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn authenticate(&self, _credentials: &Credentials) -> PmsResult<()> {
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh_session_if_needed(&self) -> PmsResult<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match self.refresh_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn session_expires_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    async fn get_guest_profile(&self, room_number: &str) -> PmsResult<GuestProfile> {
        self.guests
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.room_number == room_number)
            .cloned()
            .ok_or_else(|| PmsError::not_found("guest in room", room_number))
    }

    async fn get_guest_by_reservation(&self, reservation_id: &str) -> PmsResult<GuestProfile> {
        Err(PmsError::not_found("reservation", reservation_id))
    }

    async fn get_guests_by_property(&self, _property_id: &str) -> PmsResult<Vec<GuestProfile>> {
        Ok(self.guests.lock().unwrap().clone())
    }

    async fn update_guest_profile(&self, _guest_id: &str, _profile: &GuestProfile) -> PmsResult<()> {
        Ok(())
    }

    async fn get_room_status(&self, room_number: &str) -> PmsResult<RoomStatus> {
        Err(PmsError::not_found("room", room_number))
    }

    async fn get_rooms_by_property(&self, property_id: &str) -> PmsResult<Vec<RoomStatus>> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn update_room_status(&self, _room_number: &str, _status: &RoomStatus) -> PmsResult<()> {
        Ok(())
    }

    async fn post_charge(&self, charge: &ChargeRequest) -> PmsResult<ChargeResponse> {
        self.posted.lock().unwrap().push(charge.clone());
        self.charge
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(posted(&charge.reference, "TXN-1")))
    }

    async fn get_charges(&self, _guest_id: &str) -> PmsResult<Vec<Charge>> {
        Ok(Vec::new())
    }

    async fn void_charge(&self, _charge_id: &str) -> PmsResult<()> {
        Ok(())
    }

    async fn get_reservation(&self, reservation_id: &str) -> PmsResult<Reservation> {
        Err(PmsError::not_found("reservation", reservation_id))
    }

    async fn get_reservations_by_date(&self, _date: NaiveDate) -> PmsResult<Vec<Reservation>> {
        Ok(Vec::new())
    }

    async fn update_reservation(&self, _reservation_id: &str, _reservation: &Reservation) -> PmsResult<()> {
        Ok(())
    }

    async fn get_folio(&self, guest_id: &str) -> PmsResult<Folio> {
        Err(PmsError::not_found("folio for guest", guest_id))
    }

    async fn update_folio(&self, _guest_id: &str, _folio: &Folio) -> PmsResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> PmsResult<()> {
        let script = self.health.lock().unwrap().clone();
        match script {
            HealthScript::Ok => Ok(()),
            HealthScript::Fail(e) => Err(e),
            HealthScript::Hang(d) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
            HealthScript::Panic => panic!("probe exploded"),
        }
    }
}
