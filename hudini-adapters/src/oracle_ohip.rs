//! Oracle Hospitality Integration Platform (OHIP) adapter.
//!
//! OAuth2 token from `POST {base}/oauth2/token`, resources under
//! `{base}/api/v1/...` with snake_case JSON bodies.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hudini_core::provider::includes_breakfast;
use hudini_core::{
    Charge, ChargeRequest, ChargeResponse, Credentials, Folio, GuestProfile, Payment, PmsError,
    PmsProvider, PmsResult, ProviderKind, Reservation, RoomStatus, SessionStore, TokenGrant,
};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::factory::AdapterSettings;
use crate::http::{auth_failure, segment, vendor_error, Deadline, Target, VendorHttp};
use crate::rooms::retain_property;
use crate::wire::{nullable, optional_timestamp};

pub struct OracleOhipAdapter {
    name: String,
    credentials: RwLock<Credentials>,
    http: VendorHttp,
    session: SessionStore,
}

impl OracleOhipAdapter {
    pub fn new(name: impl Into<String>, credentials: Credentials, settings: &AdapterSettings) -> PmsResult<Self> {
        let name = name.into();
        credentials.validate(ProviderKind::OracleOhip)?;

        Ok(Self {
            http: VendorHttp::new(name.clone(), settings.timeout, settings.bulk_timeout)?,
            session: SessionStore::new(name.clone(), settings.session_margin, settings.clock.clone()),
            credentials: RwLock::new(credentials),
            name,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn credentials(&self) -> Credentials {
        self.credentials.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn url(&self, path: &str) -> String {
        let credentials = self.credentials.read().unwrap_or_else(PoisonError::into_inner);
        format!("{}/api/v1{}", credentials.base_url(), path)
    }

    async fn login(&self, credentials: &Credentials) -> PmsResult<TokenGrant> {
        let body = TokenRequest {
            username: &credentials.username,
            password: credentials.password.expose(),
            client_id: &credentials.client_id,
            client_secret: credentials.client_secret.expose(),
            grant_type: "client_credentials",
        };

        let request = self
            .http
            .request(Method::POST, &format!("{}/oauth2/token", credentials.base_url()), Deadline::Point)
            .json(&body);
        let response = self.http.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(auth_failure(&self.name, status, &text));
        }

        let token: TokenResponse = response.json().await.map_err(|e| PmsError::AuthenticationFailed {
            provider: self.name.clone(),
            reason: format!("unreadable token response: {}", e),
        })?;
        debug!(provider = %self.name, token_type = %token.token_type, expires_in = token.expires_in, "token issued");

        Ok(TokenGrant::from_seconds(token.access_token, token.expires_in))
    }

    /// Renew if needed, then build an authorized request.
    async fn authorized(&self, method: Method, path: &str, deadline: Deadline) -> PmsResult<RequestBuilder> {
        self.refresh_session_if_needed().await?;
        let bearer = self.session.bearer()?;
        Ok(self.http.request(method, &self.url(path), deadline).header(AUTHORIZATION, bearer))
    }
}

#[async_trait]
impl PmsProvider for OracleOhipAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OracleOhip
    }

    async fn authenticate(&self, credentials: &Credentials) -> PmsResult<()> {
        credentials.validate(ProviderKind::OracleOhip)?;
        self.session.establish(|| self.login(credentials)).await?;
        *self.credentials.write().unwrap_or_else(PoisonError::into_inner) = credentials.clone();
        info!(provider = %self.name, "authenticated with Oracle OHIP");
        Ok(())
    }

    async fn refresh_session_if_needed(&self) -> PmsResult<()> {
        let credentials = self.credentials();
        let renewed = self.session.refresh_if_needed(|| self.login(&credentials)).await?;
        if renewed {
            info!(provider = %self.name, "OHIP session renewed");
        }
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.session.is_valid()
    }

    fn session_expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.expires_at()
    }

    async fn get_guest_profile(&self, room_number: &str) -> PmsResult<GuestProfile> {
        let request = self
            .authorized(Method::GET, &format!("/reservations/room/{}", segment(room_number)), Deadline::Point)
            .await?;
        let guest: OhipGuest = self
            .http
            .json(request, &self.session, Target::new("guest in room", room_number))
            .await?;
        Ok(guest.into())
    }

    async fn get_guest_by_reservation(&self, reservation_id: &str) -> PmsResult<GuestProfile> {
        let request = self
            .authorized(Method::GET, &format!("/reservations/{}", segment(reservation_id)), Deadline::Point)
            .await?;
        let guest: OhipGuest = self
            .http
            .json(request, &self.session, Target::new("reservation", reservation_id))
            .await?;
        Ok(guest.into())
    }

    async fn get_guests_by_property(&self, property_id: &str) -> PmsResult<Vec<GuestProfile>> {
        let request = self
            .authorized(Method::GET, &format!("/properties/{}/reservations", segment(property_id)), Deadline::Bulk)
            .await?;
        let list: OhipReservationList<OhipGuest> = self
            .http
            .json(request, &self.session, Target::new("property", property_id))
            .await?;
        Ok(list.reservations.into_iter().map(GuestProfile::from).collect())
    }

    async fn update_guest_profile(&self, guest_id: &str, profile: &GuestProfile) -> PmsResult<()> {
        let body = OhipGuestUpdate {
            first_name: &profile.first_name,
            last_name: &profile.last_name,
            email: &profile.email,
            phone: &profile.phone,
            preferences: &profile.preferences,
        };
        let request = self
            .authorized(Method::PUT, &format!("/guests/{}", segment(guest_id)), Deadline::Point)
            .await?
            .json(&body);
        self.http.empty(request, &self.session, Target::new("guest", guest_id)).await
    }

    async fn get_room_status(&self, room_number: &str) -> PmsResult<RoomStatus> {
        let request = self
            .authorized(Method::GET, &format!("/rooms/{}/status", segment(room_number)), Deadline::Point)
            .await?;
        let room: OhipRoom = self.http.json(request, &self.session, Target::new("room", room_number)).await?;
        Ok(room.into())
    }

    async fn get_rooms_by_property(&self, property_id: &str) -> PmsResult<Vec<RoomStatus>> {
        let request = self
            .authorized(Method::GET, &format!("/properties/{}/rooms", segment(property_id)), Deadline::Bulk)
            .await?;
        let list: OhipRoomList = self
            .http
            .json(request, &self.session, Target::new("property", property_id))
            .await?;

        let rooms = list.rooms.into_iter().map(RoomStatus::from).collect();
        Ok(retain_property(&self.name, property_id, rooms))
    }

    async fn update_room_status(&self, room_number: &str, status: &RoomStatus) -> PmsResult<()> {
        let body = OhipRoomUpdate {
            status: &status.status,
            housekeeping_status: &status.housekeeping_status,
            maintenance_status: &status.maintenance_status,
        };
        let request = self
            .authorized(Method::PUT, &format!("/rooms/{}/status", segment(room_number)), Deadline::Point)
            .await?
            .json(&body);
        self.http.empty(request, &self.session, Target::new("room", room_number)).await
    }

    async fn post_charge(&self, charge: &ChargeRequest) -> PmsResult<ChargeResponse> {
        let request = self
            .authorized(Method::POST, "/charges", Deadline::Point)
            .await?
            .json(&OhipChargeRequest::from(charge));
        let response = self.http.send(request).await?;
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let body: OhipChargeResponse =
                    response.json().await.map_err(|e| self.http.transport_error(e))?;
                Ok(body.into_canonical(charge, status))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.session.invalidate();
                Err(PmsError::SessionExpired(self.name.clone()))
            }
            s if s.is_client_error() => {
                let text = response.text().await.unwrap_or_default();
                let (code, message) = vendor_error(&text);
                warn!(
                    provider = %self.name,
                    reference = %charge.reference,
                    status = %s,
                    error_code = %code,
                    "OHIP declined charge"
                );
                Ok(ChargeResponse::declined(&charge.reference, code, message, s.as_u16()))
            }
            s => Err(PmsError::transport(format!(
                "{}: charge {} answered {}, outcome unknown",
                self.name, charge.reference, s
            ))),
        }
    }

    async fn get_charges(&self, guest_id: &str) -> PmsResult<Vec<Charge>> {
        let request = self
            .authorized(Method::GET, &format!("/guests/{}/charges", segment(guest_id)), Deadline::Point)
            .await?;
        let list: OhipChargeList = self.http.json(request, &self.session, Target::new("guest", guest_id)).await?;
        Ok(list.charges.into_iter().map(Charge::from).collect())
    }

    async fn void_charge(&self, charge_id: &str) -> PmsResult<()> {
        let request = self
            .authorized(Method::POST, &format!("/charges/{}/void", segment(charge_id)), Deadline::Point)
            .await?;
        self.http.empty(request, &self.session, Target::new("charge", charge_id)).await?;
        info!(provider = %self.name, charge_id = %charge_id, "charge voided");
        Ok(())
    }

    async fn get_reservation(&self, reservation_id: &str) -> PmsResult<Reservation> {
        let request = self
            .authorized(Method::GET, &format!("/reservations/{}", segment(reservation_id)), Deadline::Point)
            .await?;
        let reservation: OhipReservation = self
            .http
            .json(request, &self.session, Target::new("reservation", reservation_id))
            .await?;
        Ok(reservation.into())
    }

    async fn get_reservations_by_date(&self, date: NaiveDate) -> PmsResult<Vec<Reservation>> {
        let day = date.format("%Y-%m-%d").to_string();
        let request = self
            .authorized(Method::GET, "/reservations", Deadline::Bulk)
            .await?
            .query(&[("date", day.as_str())]);
        let list: OhipReservationList<OhipReservation> = self
            .http
            .json(request, &self.session, Target::new("reservations on", &day))
            .await?;
        Ok(list.reservations.into_iter().map(Reservation::from).collect())
    }

    async fn update_reservation(&self, reservation_id: &str, reservation: &Reservation) -> PmsResult<()> {
        let request = self
            .authorized(Method::PUT, &format!("/reservations/{}", segment(reservation_id)), Deadline::Point)
            .await?
            .json(&OhipReservationUpdate::from(reservation));
        self.http
            .empty(request, &self.session, Target::new("reservation", reservation_id))
            .await
    }

    async fn get_folio(&self, guest_id: &str) -> PmsResult<Folio> {
        let request = self
            .authorized(Method::GET, &format!("/guests/{}/folio", segment(guest_id)), Deadline::Point)
            .await?;
        let folio: OhipFolio = self.http.json(request, &self.session, Target::new("folio for guest", guest_id)).await?;
        Ok(folio.into())
    }

    async fn update_folio(&self, guest_id: &str, folio: &Folio) -> PmsResult<()> {
        let request = self
            .authorized(Method::PUT, &format!("/guests/{}/folio", segment(guest_id)), Deadline::Point)
            .await?
            .json(&OhipFolioUpdate { status: &folio.status });
        self.http
            .empty(request, &self.session, Target::new("folio for guest", guest_id))
            .await
    }

    async fn health_check(&self) -> PmsResult<()> {
        let request = self.authorized(Method::GET, "/health", Deadline::Point).await?;
        self.http.empty(request, &self.session, Target::new("health endpoint", "")).await
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    expires_in: i64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OhipGuest {
    reservation_id: String,
    guest_id: String,
    room_number: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    #[serde(deserialize_with = "optional_timestamp")]
    check_in_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    check_out_date: Option<DateTime<Utc>>,
    status: String,
    property_id: String,
    vip_status: String,
    #[serde(deserialize_with = "nullable")]
    preferences: HashMap<String, String>,
    #[serde(deserialize_with = "nullable")]
    package_inclusions: Vec<String>,
}

impl From<OhipGuest> for GuestProfile {
    fn from(g: OhipGuest) -> Self {
        GuestProfile {
            breakfast_package: includes_breakfast(&g.package_inclusions),
            guest_id: g.guest_id,
            reservation_id: g.reservation_id,
            room_number: g.room_number,
            first_name: g.first_name,
            last_name: g.last_name,
            email: g.email,
            phone: g.phone,
            check_in: g.check_in_date,
            check_out: g.check_out_date,
            property_id: g.property_id,
            status: g.status,
            vip_status: g.vip_status,
            preferences: g.preferences,
            loyalty: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct OhipReservationList<T> {
    #[serde(default = "Vec::new", deserialize_with = "nullable")]
    reservations: Vec<T>,
}

#[derive(Serialize)]
struct OhipGuestUpdate<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone: &'a str,
    preferences: &'a HashMap<String, String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OhipRoom {
    room_number: String,
    status: String,
    room_type: String,
    guest_id: String,
    reservation_id: String,
    #[serde(deserialize_with = "optional_timestamp")]
    check_in_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    check_out_date: Option<DateTime<Utc>>,
    property_id: String,
    housekeeping_status: String,
    maintenance_status: String,
    #[serde(deserialize_with = "optional_timestamp")]
    last_updated: Option<DateTime<Utc>>,
}

impl From<OhipRoom> for RoomStatus {
    fn from(r: OhipRoom) -> Self {
        RoomStatus {
            room_number: r.room_number,
            status: r.status,
            room_type: r.room_type,
            guest_id: r.guest_id,
            reservation_id: r.reservation_id,
            check_in: r.check_in_date,
            check_out: r.check_out_date,
            property_id: r.property_id,
            housekeeping_status: r.housekeeping_status,
            maintenance_status: r.maintenance_status,
            last_updated: r.last_updated,
        }
    }
}

#[derive(Deserialize)]
struct OhipRoomList {
    #[serde(default, deserialize_with = "nullable")]
    rooms: Vec<OhipRoom>,
}

#[derive(Serialize)]
struct OhipRoomUpdate<'a> {
    status: &'a str,
    housekeeping_status: &'a str,
    maintenance_status: &'a str,
}

#[derive(Serialize)]
struct OhipChargeRequest<'a> {
    guest_id: &'a str,
    reservation_id: &'a str,
    room_number: &'a str,
    charge_code: &'a str,
    amount: Decimal,
    description: &'a str,
    transaction_date: String,
    department_code: &'a str,
    property_id: &'a str,
    reference: &'a str,
    tax_amount: Decimal,
    metadata: &'a HashMap<String, String>,
}

impl<'a> From<&'a ChargeRequest> for OhipChargeRequest<'a> {
    fn from(c: &'a ChargeRequest) -> Self {
        OhipChargeRequest {
            guest_id: &c.guest_id,
            reservation_id: &c.reservation_id,
            room_number: &c.room_number,
            charge_code: &c.charge_code,
            amount: c.amount,
            description: &c.description,
            transaction_date: c.transaction_date.to_rfc3339(),
            department_code: &c.department_code,
            property_id: &c.property_id,
            reference: &c.reference,
            tax_amount: c.tax_amount,
            metadata: &c.metadata,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OhipChargeResponse {
    success: bool,
    transaction_id: String,
    status: String,
    message: String,
    error_code: String,
    amount: Decimal,
    balance: Decimal,
    #[serde(deserialize_with = "optional_timestamp")]
    timestamp: Option<DateTime<Utc>>,
    reference: String,
    #[serde(deserialize_with = "nullable")]
    metadata: HashMap<String, String>,
}

impl OhipChargeResponse {
    fn into_canonical(self, request: &ChargeRequest, status: StatusCode) -> ChargeResponse {
        if !self.success {
            let mut declined =
                ChargeResponse::declined(&request.reference, self.error_code, self.message, status.as_u16());
            declined.status = if self.status.is_empty() { declined.status } else { self.status };
            declined.metadata = self.metadata;
            return declined;
        }

        ChargeResponse {
            success: true,
            transaction_id: self.transaction_id,
            status: self.status,
            message: self.message,
            error_code: self.error_code,
            amount: self.amount,
            balance: self.balance,
            timestamp: self.timestamp,
            reference: if self.reference.is_empty() { request.reference.clone() } else { self.reference },
            metadata: self.metadata,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OhipCharge {
    charge_id: String,
    guest_id: String,
    reservation_id: String,
    room_number: String,
    charge_code: String,
    amount: Decimal,
    description: String,
    #[serde(deserialize_with = "optional_timestamp")]
    transaction_date: Option<DateTime<Utc>>,
    department_code: String,
    status: String,
    reference: String,
    tax_amount: Decimal,
    #[serde(deserialize_with = "nullable")]
    metadata: HashMap<String, String>,
}

impl From<OhipCharge> for Charge {
    fn from(c: OhipCharge) -> Self {
        Charge {
            charge_id: c.charge_id,
            guest_id: c.guest_id,
            reservation_id: c.reservation_id,
            room_number: c.room_number,
            charge_code: c.charge_code,
            amount: c.amount,
            description: c.description,
            transaction_date: c.transaction_date,
            department_code: c.department_code,
            status: c.status,
            reference: c.reference,
            tax_amount: c.tax_amount,
            metadata: c.metadata,
        }
    }
}

#[derive(Deserialize)]
struct OhipChargeList {
    #[serde(default, deserialize_with = "nullable")]
    charges: Vec<OhipCharge>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OhipReservation {
    reservation_id: String,
    guest_id: String,
    room_number: String,
    room_type: String,
    #[serde(deserialize_with = "optional_timestamp")]
    check_in_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    check_out_date: Option<DateTime<Utc>>,
    adults: u32,
    children: u32,
    status: String,
    rate_code: String,
    rate: Decimal,
    property_id: String,
    #[serde(deserialize_with = "nullable")]
    preferences: HashMap<String, String>,
    #[serde(deserialize_with = "nullable")]
    special_requests: Vec<String>,
    #[serde(deserialize_with = "optional_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable")]
    package_inclusions: Vec<String>,
}

impl From<OhipReservation> for Reservation {
    fn from(r: OhipReservation) -> Self {
        Reservation {
            breakfast_package: includes_breakfast(&r.package_inclusions),
            reservation_id: r.reservation_id,
            guest_id: r.guest_id,
            room_number: r.room_number,
            room_type: r.room_type,
            check_in: r.check_in_date,
            check_out: r.check_out_date,
            adults: r.adults,
            children: r.children,
            status: r.status,
            rate_code: r.rate_code,
            rate: r.rate,
            property_id: r.property_id,
            preferences: r.preferences,
            special_requests: r.special_requests,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Serialize)]
struct OhipReservationUpdate<'a> {
    room_number: &'a str,
    room_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_in_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_out_date: Option<String>,
    adults: u32,
    children: u32,
    status: &'a str,
    rate_code: &'a str,
    rate: Decimal,
    preferences: &'a HashMap<String, String>,
    special_requests: &'a [String],
}

impl<'a> From<&'a Reservation> for OhipReservationUpdate<'a> {
    fn from(r: &'a Reservation) -> Self {
        OhipReservationUpdate {
            room_number: &r.room_number,
            room_type: &r.room_type,
            check_in_date: r.check_in.map(|d| d.to_rfc3339()),
            check_out_date: r.check_out.map(|d| d.to_rfc3339()),
            adults: r.adults,
            children: r.children,
            status: &r.status,
            rate_code: &r.rate_code,
            rate: r.rate,
            preferences: &r.preferences,
            special_requests: &r.special_requests,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OhipPayment {
    payment_id: String,
    amount: Decimal,
    payment_method: String,
    reference: String,
    #[serde(deserialize_with = "optional_timestamp")]
    transaction_date: Option<DateTime<Utc>>,
    status: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OhipFolio {
    folio_id: String,
    guest_id: String,
    reservation_id: String,
    room_number: String,
    balance: Decimal,
    status: String,
    #[serde(deserialize_with = "optional_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable")]
    charges: Vec<OhipCharge>,
    #[serde(deserialize_with = "nullable")]
    payments: Vec<OhipPayment>,
}

impl From<OhipFolio> for Folio {
    fn from(f: OhipFolio) -> Self {
        Folio {
            folio_id: f.folio_id,
            guest_id: f.guest_id,
            reservation_id: f.reservation_id,
            room_number: f.room_number,
            balance: f.balance,
            charges: f.charges.into_iter().map(Charge::from).collect(),
            payments: f
                .payments
                .into_iter()
                .map(|p| Payment {
                    payment_id: p.payment_id,
                    amount: p.amount,
                    payment_method: p.payment_method,
                    reference: p.reference,
                    transaction_date: p.transaction_date,
                    status: p.status,
                })
                .collect(),
            status: f.status,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Serialize)]
struct OhipFolioUpdate<'a> {
    status: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_wire_maps_breakfast_inclusion() {
        let guest: OhipGuest = serde_json::from_value(serde_json::json!({
            "reservation_id": "R1",
            "guest_id": "G100",
            "room_number": "305",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "check_in_date": "2024-03-14T15:00:00Z",
            "property_id": "HOTEL001",
            "preferences": null,
            "package_inclusions": ["Parking", "Full English Breakfast"]
        }))
        .unwrap();

        let profile = GuestProfile::from(guest);
        assert!(profile.breakfast_package);
        assert_eq!(profile.full_name(), "Ada Lovelace");
        assert!(profile.check_in.is_some());
        assert!(profile.check_out.is_none());
    }

    #[test]
    fn test_charge_request_wire_shape() {
        let request = ChargeRequest {
            guest_id: "G100".into(),
            room_number: "305".into(),
            charge_code: "BREAKFAST".into(),
            amount: Decimal::new(2500, 2),
            reference: "BREAKFAST-305-20240315".into(),
            ..Default::default()
        };

        let json = serde_json::to_value(OhipChargeRequest::from(&request)).unwrap();
        assert_eq!(json["amount"], serde_json::json!(25.0));
        assert_eq!(json["reference"], "BREAKFAST-305-20240315");
        assert!(json["transaction_date"].as_str().unwrap().starts_with("1970-01-01"));
    }

    #[test]
    fn test_unsuccessful_2xx_still_explains_itself() {
        let request = ChargeRequest {
            reference: "REF-1".into(),
            ..Default::default()
        };
        let response = OhipChargeResponse {
            success: false,
            ..Default::default()
        }
        .into_canonical(&request, StatusCode::OK);

        assert!(!response.success);
        assert_eq!(response.error_code, "HTTP_200");
        assert_eq!(response.reference, "REF-1");
    }
}
