//! OPERA Cloud adapter.
//!
//! Token from `POST {base}/oauth/v1/tokens` (form-encoded). Every call carries
//! the `x-app-key` and `x-hotelid` headers; payloads are camelCase and wrapped
//! in vendor envelopes. Module prefixes: `rsv` reservations, `hsk` housekeeping,
//! `csh` cashiering, `crm` profiles.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hudini_core::{
    Charge, ChargeRequest, ChargeResponse, Credentials, Folio, GuestProfile, LoyaltyProgram, Payment,
    PmsError, PmsProvider, PmsResult, ProviderKind, Reservation, RoomStatus, SessionStore, TokenGrant,
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

const APP_KEY_HEADER: &str = "x-app-key";
const HOTEL_HEADER: &str = "x-hotelid";
const DEFAULT_CURRENCY: &str = "USD";

/// Package codes that carry a breakfast entitlement
const BREAKFAST_PACKAGE_CODES: &[&str] = &["BKFST", "BB"];

pub struct OperaAdapter {
    name: String,
    credentials: RwLock<Credentials>,
    http: VendorHttp,
    session: SessionStore,
}

impl OperaAdapter {
    pub fn new(name: impl Into<String>, credentials: Credentials, settings: &AdapterSettings) -> PmsResult<Self> {
        let name = name.into();
        credentials.validate(ProviderKind::Opera)?;

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

    fn hotel_id(&self) -> String {
        self.credentials.read().unwrap_or_else(PoisonError::into_inner).property_id.clone()
    }

    fn currency(&self) -> String {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .additional
            .get("currency")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
    }

    /// `{base}/{module}/v1/hotels/{hotel}{rest}`
    fn hotel_url(&self, module: &str, hotel: &str, rest: &str) -> String {
        let credentials = self.credentials.read().unwrap_or_else(PoisonError::into_inner);
        format!("{}/{}/v1/hotels/{}{}", credentials.base_url(), module, segment(hotel), rest)
    }

    async fn login(&self, credentials: &Credentials) -> PmsResult<TokenGrant> {
        let form = [
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose().as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose().as_str()),
        ];

        let request = self
            .http
            .request(Method::POST, &format!("{}/oauth/v1/tokens", credentials.base_url()), Deadline::Point)
            .header(APP_KEY_HEADER, credentials.api_key.expose().as_str())
            .form(&form);
        let response = self.http.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(auth_failure(&self.name, status, &text));
        }

        let token: OperaToken = response.json().await.map_err(|e| PmsError::AuthenticationFailed {
            provider: self.name.clone(),
            reason: format!("unreadable token response: {}", e),
        })?;
        debug!(provider = %self.name, expires_in = token.expires_in, "OPERA token issued");

        Ok(TokenGrant::from_seconds(token.access_token, token.expires_in))
    }

    async fn authorized(&self, method: Method, url: &str, deadline: Deadline) -> PmsResult<RequestBuilder> {
        self.refresh_session_if_needed().await?;
        let bearer = self.session.bearer()?;
        let credentials = self.credentials();

        Ok(self
            .http
            .request(method, url, deadline)
            .header(AUTHORIZATION, bearer)
            .header(APP_KEY_HEADER, credentials.api_key.expose().as_str())
            .header(HOTEL_HEADER, credentials.property_id.as_str()))
    }

    async fn reservations(&self, url: String, deadline: Deadline, target: Target<'_>) -> PmsResult<Vec<OperaReservation>> {
        let request = self.authorized(Method::GET, &url, deadline).await?;
        let envelope: ReservationsEnvelope = self.http.json(request, &self.session, target).await?;
        Ok(envelope.reservations.reservation_info)
    }
}

#[async_trait]
impl PmsProvider for OperaAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Opera
    }

    async fn authenticate(&self, credentials: &Credentials) -> PmsResult<()> {
        credentials.validate(ProviderKind::Opera)?;
        self.session.establish(|| self.login(credentials)).await?;
        *self.credentials.write().unwrap_or_else(PoisonError::into_inner) = credentials.clone();
        info!(provider = %self.name, hotel = %credentials.property_id, "authenticated with OPERA Cloud");
        Ok(())
    }

    async fn refresh_session_if_needed(&self) -> PmsResult<()> {
        let credentials = self.credentials();
        if self.session.refresh_if_needed(|| self.login(&credentials)).await? {
            info!(provider = %self.name, "OPERA session renewed");
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
        let url = self.hotel_url("rsv", &self.hotel_id(), "/reservations");
        let request = self
            .authorized(Method::GET, &url, Deadline::Point)
            .await?
            .query(&[("roomId", room_number), ("reservationStatus", "InHouse")]);
        let envelope: ReservationsEnvelope = self
            .http
            .json(request, &self.session, Target::new("guest in room", room_number))
            .await?;

        // An empty in-house list is how OPERA says "nobody in that room"
        envelope
            .reservations
            .reservation_info
            .into_iter()
            .next()
            .map(OperaReservation::into_guest)
            .ok_or_else(|| PmsError::not_found("guest in room", room_number))
    }

    async fn get_guest_by_reservation(&self, reservation_id: &str) -> PmsResult<GuestProfile> {
        let url = self.hotel_url("rsv", &self.hotel_id(), &format!("/reservations/{}", segment(reservation_id)));
        self.reservations(url, Deadline::Point, Target::new("reservation", reservation_id))
            .await?
            .into_iter()
            .next()
            .map(OperaReservation::into_guest)
            .ok_or_else(|| PmsError::not_found("reservation", reservation_id))
    }

    async fn get_guests_by_property(&self, property_id: &str) -> PmsResult<Vec<GuestProfile>> {
        let url = self.hotel_url("rsv", property_id, "/reservations");
        let request = self
            .authorized(Method::GET, &url, Deadline::Bulk)
            .await?
            .query(&[("reservationStatus", "InHouse")]);
        let envelope: ReservationsEnvelope = self
            .http
            .json(request, &self.session, Target::new("property", property_id))
            .await?;
        Ok(envelope
            .reservations
            .reservation_info
            .into_iter()
            .map(OperaReservation::into_guest)
            .collect())
    }

    async fn update_guest_profile(&self, guest_id: &str, profile: &GuestProfile) -> PmsResult<()> {
        let credentials = self.credentials();
        let url = format!("{}/crm/v1/profiles/{}", credentials.base_url(), segment(guest_id));
        let body = ProfileUpdate {
            profile_details: ProfileDetails {
                given_name: &profile.first_name,
                surname: &profile.last_name,
                email: &profile.email,
                phone_number: &profile.phone,
                preferences: profile
                    .preferences
                    .iter()
                    .map(|(k, v)| OperaPreference {
                        preference_type: k.clone(),
                        preference_value: v.clone(),
                    })
                    .collect(),
            },
        };
        let request = self.authorized(Method::PUT, &url, Deadline::Point).await?.json(&body);
        self.http.empty(request, &self.session, Target::new("guest", guest_id)).await
    }

    async fn get_room_status(&self, room_number: &str) -> PmsResult<RoomStatus> {
        let hotel = self.hotel_id();
        let url = self.hotel_url("hsk", &hotel, &format!("/rooms/{}/status", segment(room_number)));
        let request = self.authorized(Method::GET, &url, Deadline::Point).await?;
        let envelope: RoomEnvelope = self.http.json(request, &self.session, Target::new("room", room_number)).await?;
        Ok(envelope.room.into_canonical(&hotel))
    }

    async fn get_rooms_by_property(&self, property_id: &str) -> PmsResult<Vec<RoomStatus>> {
        let url = self.hotel_url("hsk", property_id, "/rooms");
        let request = self.authorized(Method::GET, &url, Deadline::Bulk).await?;
        let envelope: RoomsEnvelope = self
            .http
            .json(request, &self.session, Target::new("property", property_id))
            .await?;

        // Rooms inherit the envelope's hotel when they do not name one
        let hotel = envelope.hotel_id;
        let rooms = envelope.rooms.into_iter().map(|room| room.into_canonical(&hotel)).collect();
        Ok(retain_property(&self.name, property_id, rooms))
    }

    async fn update_room_status(&self, room_number: &str, status: &RoomStatus) -> PmsResult<()> {
        let url = self.hotel_url("hsk", &self.hotel_id(), &format!("/rooms/{}/status", segment(room_number)));
        let body = RoomUpdate {
            housekeeping_status: opera_housekeeping(&status.housekeeping_status),
            out_of_order: status.status.eq_ignore_ascii_case("out_of_order")
                || status.maintenance_status.eq_ignore_ascii_case("out_of_order"),
        };
        let request = self.authorized(Method::PUT, &url, Deadline::Point).await?.json(&body);
        self.http.empty(request, &self.session, Target::new("room", room_number)).await
    }

    async fn post_charge(&self, charge: &ChargeRequest) -> PmsResult<ChargeResponse> {
        // Cashiering postings hang off a reservation folio
        if charge.reservation_id.trim().is_empty() {
            return Err(PmsError::VendorRejected {
                code: "RESERVATION_REQUIRED".to_string(),
                message: format!("{} posts charges against a reservation folio", self.name),
            });
        }

        // The x-hotelid header always carries the configured hotel
        let hotel = self.hotel_id();
        if !charge.property_id.is_empty() && charge.property_id != hotel {
            return Err(PmsError::VendorRejected {
                code: "PROPERTY_MISMATCH".to_string(),
                message: format!(
                    "{} is configured for hotel {}, not {}",
                    self.name, hotel, charge.property_id
                ),
            });
        }

        let url = self.hotel_url("csh", &hotel, &format!("/folios/{}/charges", segment(&charge.reservation_id)));
        let currency = self.currency();
        let body = PostingRequest::new(charge, &currency);

        let request = self.authorized(Method::POST, &url, Deadline::Point).await?.json(&body);
        let response = self.http.send(request).await?;
        let status = response.status();

        match status {
            s if s.is_success() => {
                let body: PostingResponse = response.json().await.map_err(|e| self.http.transport_error(e))?;
                Ok(body.into_canonical(charge, s))
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
                    "OPERA declined posting"
                );
                Ok(ChargeResponse::declined(&charge.reference, code, message, s.as_u16()))
            }
            s => Err(PmsError::transport(format!(
                "{}: posting {} answered {}, outcome unknown",
                self.name, charge.reference, s
            ))),
        }
    }

    async fn get_charges(&self, guest_id: &str) -> PmsResult<Vec<Charge>> {
        let url = self.hotel_url("csh", &self.hotel_id(), &format!("/profiles/{}/postings", segment(guest_id)));
        let request = self.authorized(Method::GET, &url, Deadline::Point).await?;
        let envelope: PostingsEnvelope = self.http.json(request, &self.session, Target::new("guest", guest_id)).await?;
        Ok(envelope.postings.into_iter().map(Charge::from).collect())
    }

    async fn void_charge(&self, charge_id: &str) -> PmsResult<()> {
        let url = self.hotel_url("csh", &self.hotel_id(), &format!("/postings/{}/reverse", segment(charge_id)));
        let request = self.authorized(Method::POST, &url, Deadline::Point).await?;
        self.http.empty(request, &self.session, Target::new("charge", charge_id)).await?;
        info!(provider = %self.name, charge_id = %charge_id, "posting reversed");
        Ok(())
    }

    async fn get_reservation(&self, reservation_id: &str) -> PmsResult<Reservation> {
        let url = self.hotel_url("rsv", &self.hotel_id(), &format!("/reservations/{}", segment(reservation_id)));
        self.reservations(url, Deadline::Point, Target::new("reservation", reservation_id))
            .await?
            .into_iter()
            .next()
            .map(Reservation::from)
            .ok_or_else(|| PmsError::not_found("reservation", reservation_id))
    }

    async fn get_reservations_by_date(&self, date: NaiveDate) -> PmsResult<Vec<Reservation>> {
        let day = date.format("%Y-%m-%d").to_string();
        let url = self.hotel_url("rsv", &self.hotel_id(), "/reservations");
        let request = self
            .authorized(Method::GET, &url, Deadline::Bulk)
            .await?
            .query(&[("arrivalDate", day.as_str())]);
        let envelope: ReservationsEnvelope = self
            .http
            .json(request, &self.session, Target::new("reservations on", &day))
            .await?;
        Ok(envelope.reservations.reservation_info.into_iter().map(Reservation::from).collect())
    }

    async fn update_reservation(&self, reservation_id: &str, reservation: &Reservation) -> PmsResult<()> {
        let url = self.hotel_url("rsv", &self.hotel_id(), &format!("/reservations/{}", segment(reservation_id)));
        let body = ReservationUpdate::from(reservation);
        let request = self.authorized(Method::PUT, &url, Deadline::Point).await?.json(&body);
        self.http
            .empty(request, &self.session, Target::new("reservation", reservation_id))
            .await
    }

    async fn get_folio(&self, guest_id: &str) -> PmsResult<Folio> {
        let url = self.hotel_url("csh", &self.hotel_id(), &format!("/profiles/{}/folio", segment(guest_id)));
        let request = self.authorized(Method::GET, &url, Deadline::Point).await?;
        let envelope: FolioEnvelope = self
            .http
            .json(request, &self.session, Target::new("folio for guest", guest_id))
            .await?;
        Ok(envelope.folio.into())
    }

    async fn update_folio(&self, guest_id: &str, folio: &Folio) -> PmsResult<()> {
        let url = self.hotel_url("csh", &self.hotel_id(), &format!("/profiles/{}/folio", segment(guest_id)));
        let body = FolioUpdate {
            folio_status: &folio.status,
        };
        let request = self.authorized(Method::PUT, &url, Deadline::Point).await?.json(&body);
        self.http
            .empty(request, &self.session, Target::new("folio for guest", guest_id))
            .await
    }

    async fn health_check(&self) -> PmsResult<()> {
        let hotel = self.hotel_id();
        let credentials = self.credentials();
        let url = format!("{}/hotel/v1/hotels/{}", credentials.base_url(), segment(&hotel));
        let request = self.authorized(Method::GET, &url, Deadline::Point).await?;
        self.http.empty(request, &self.session, Target::new("hotel", &hotel)).await
    }
}

fn is_breakfast_package(package: &OperaPackage) -> bool {
    BREAKFAST_PACKAGE_CODES
        .iter()
        .any(|code| package.package_code.eq_ignore_ascii_case(code))
        || package.package_code.to_lowercase().contains("breakfast")
        || package.description.to_lowercase().contains("breakfast")
}

fn canonical_reservation_status(status: &str) -> String {
    match status {
        "InHouse" => "checked_in".to_string(),
        "CheckedOut" => "checked_out".to_string(),
        "Reserved" | "DueIn" => "confirmed".to_string(),
        "Cancelled" => "cancelled".to_string(),
        "NoShow" => "no_show".to_string(),
        other => other.to_lowercase(),
    }
}

fn opera_reservation_status(status: &str) -> &'static str {
    match status {
        "checked_in" => "InHouse",
        "checked_out" => "CheckedOut",
        "cancelled" => "Cancelled",
        "no_show" => "NoShow",
        _ => "Reserved",
    }
}

fn opera_housekeeping(status: &str) -> &'static str {
    match status.to_ascii_lowercase().as_str() {
        "clean" => "Clean",
        "inspected" => "Inspected",
        "pickup" => "Pickup",
        _ => "Dirty",
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Deserialize)]
struct OperaToken {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaAmount {
    amount: Decimal,
    currency_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OperaAmountOut<'a> {
    amount: Decimal,
    currency_code: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ReservationsEnvelope {
    reservations: ReservationList,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ReservationList {
    #[serde(deserialize_with = "nullable")]
    reservation_info: Vec<OperaReservation>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaId {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaReservation {
    #[serde(deserialize_with = "nullable")]
    reservation_id_list: Vec<OperaId>,
    reservation_status: String,
    hotel_id: String,
    room_stay: RoomStay,
    reservation_guest: ReservationGuest,
    #[serde(deserialize_with = "nullable")]
    reservation_packages: Vec<OperaPackage>,
    #[serde(deserialize_with = "nullable")]
    preferences: Vec<OperaPreference>,
    #[serde(deserialize_with = "nullable")]
    comments: Vec<String>,
    #[serde(deserialize_with = "optional_timestamp")]
    create_date_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    last_modify_date_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RoomStay {
    room_id: String,
    room_type: String,
    #[serde(deserialize_with = "optional_timestamp")]
    arrival_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    departure_date: Option<DateTime<Utc>>,
    adult_count: u32,
    child_count: u32,
    rate_plan_code: String,
    rate_amount: OperaAmount,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ReservationGuest {
    id: String,
    given_name: String,
    surname: String,
    email: String,
    phone_number: String,
    vip: Option<OperaVip>,
    membership: Option<OperaMembership>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaVip {
    vip_code: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaMembership {
    program_code: String,
    membership_id: String,
    membership_level: String,
    points: i64,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaPackage {
    package_code: String,
    description: String,
}

#[derive(Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaPreference {
    preference_type: String,
    preference_value: String,
}

impl OperaReservation {
    fn reservation_id(&self) -> String {
        self.reservation_id_list
            .iter()
            .find(|id| id.kind.eq_ignore_ascii_case("Reservation"))
            .or_else(|| self.reservation_id_list.first())
            .map(|id| id.id.clone())
            .unwrap_or_default()
    }

    fn has_breakfast(&self) -> bool {
        self.reservation_packages.iter().any(is_breakfast_package)
    }

    fn preference_map(&self) -> HashMap<String, String> {
        self.preferences
            .iter()
            .map(|p| (p.preference_type.clone(), p.preference_value.clone()))
            .collect()
    }

    fn into_guest(self) -> GuestProfile {
        let reservation_id = self.reservation_id();
        let breakfast_package = self.has_breakfast();
        let preferences = self.preference_map();
        let guest = self.reservation_guest;

        GuestProfile {
            guest_id: guest.id,
            reservation_id,
            room_number: self.room_stay.room_id,
            first_name: guest.given_name,
            last_name: guest.surname,
            email: guest.email,
            phone: guest.phone_number,
            check_in: self.room_stay.arrival_date,
            check_out: self.room_stay.departure_date,
            breakfast_package,
            property_id: self.hotel_id,
            status: canonical_reservation_status(&self.reservation_status),
            vip_status: guest.vip.map(|v| v.vip_code).unwrap_or_default(),
            preferences,
            loyalty: guest.membership.map(|m| LoyaltyProgram {
                program_name: m.program_code,
                member_id: m.membership_id,
                level: m.membership_level,
                points: m.points,
            }),
        }
    }
}

impl From<OperaReservation> for Reservation {
    fn from(r: OperaReservation) -> Self {
        let reservation_id = r.reservation_id();
        let breakfast_package = r.has_breakfast();
        let preferences = r.preference_map();

        Reservation {
            reservation_id,
            guest_id: r.reservation_guest.id,
            room_number: r.room_stay.room_id,
            room_type: r.room_stay.room_type,
            check_in: r.room_stay.arrival_date,
            check_out: r.room_stay.departure_date,
            adults: r.room_stay.adult_count,
            children: r.room_stay.child_count,
            status: canonical_reservation_status(&r.reservation_status),
            rate_code: r.room_stay.rate_plan_code,
            rate: r.room_stay.rate_amount.amount,
            property_id: r.hotel_id,
            breakfast_package,
            preferences,
            special_requests: r.comments,
            created_at: r.create_date_time,
            updated_at: r.last_modify_date_time,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReservationUpdate<'a> {
    reservation_status: &'static str,
    room_stay: RoomStayUpdate<'a>,
    preferences: Vec<OperaPreference>,
    comments: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomStayUpdate<'a> {
    room_id: &'a str,
    room_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    arrival_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    departure_date: Option<String>,
    adult_count: u32,
    child_count: u32,
    rate_plan_code: &'a str,
}

impl<'a> From<&'a Reservation> for ReservationUpdate<'a> {
    fn from(r: &'a Reservation) -> Self {
        ReservationUpdate {
            reservation_status: opera_reservation_status(&r.status),
            room_stay: RoomStayUpdate {
                room_id: &r.room_number,
                room_type: &r.room_type,
                arrival_date: r.check_in.map(|d| d.format("%Y-%m-%d").to_string()),
                departure_date: r.check_out.map(|d| d.format("%Y-%m-%d").to_string()),
                adult_count: r.adults,
                child_count: r.children,
                rate_plan_code: &r.rate_code,
            },
            preferences: r
                .preferences
                .iter()
                .map(|(k, v)| OperaPreference {
                    preference_type: k.clone(),
                    preference_value: v.clone(),
                })
                .collect(),
            comments: &r.special_requests,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdate<'a> {
    profile_details: ProfileDetails<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDetails<'a> {
    given_name: &'a str,
    surname: &'a str,
    email: &'a str,
    phone_number: &'a str,
    preferences: Vec<OperaPreference>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RoomEnvelope {
    room: OperaRoom,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RoomsEnvelope {
    hotel_id: String,
    #[serde(deserialize_with = "nullable")]
    rooms: Vec<OperaRoom>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaRoom {
    room_id: String,
    room_type: String,
    hotel_id: String,
    /// Occupied / Vacant
    front_office_status: String,
    /// Clean / Dirty / Inspected / Pickup
    housekeeping_status: String,
    out_of_order: bool,
    reservation_id: String,
    guest_id: String,
    #[serde(deserialize_with = "optional_timestamp")]
    arrival_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    departure_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    last_updated: Option<DateTime<Utc>>,
}

impl OperaRoom {
    fn into_canonical(self, fallback_hotel: &str) -> RoomStatus {
        let housekeeping = self.housekeeping_status.to_lowercase();
        let status = if self.out_of_order {
            "out_of_order"
        } else if self.front_office_status.eq_ignore_ascii_case("Occupied") {
            "occupied"
        } else if housekeeping == "clean" || housekeeping == "inspected" {
            "vacant_clean"
        } else {
            "vacant_dirty"
        };

        RoomStatus {
            room_number: self.room_id,
            status: status.to_string(),
            room_type: self.room_type,
            guest_id: self.guest_id,
            reservation_id: self.reservation_id,
            check_in: self.arrival_date,
            check_out: self.departure_date,
            property_id: if self.hotel_id.is_empty() { fallback_hotel.to_string() } else { self.hotel_id },
            housekeeping_status: housekeeping,
            maintenance_status: if self.out_of_order { "out_of_order" } else { "ok" }.to_string(),
            last_updated: self.last_updated,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomUpdate {
    housekeeping_status: &'static str,
    out_of_order: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostingRequest<'a> {
    charges: Vec<PostingLine<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostingLine<'a> {
    transaction_code: &'a str,
    price: OperaAmountOut<'a>,
    tax_amount: OperaAmountOut<'a>,
    posting_reference: &'a str,
    posting_remark: &'a str,
    article_date: String,
    department_code: &'a str,
    guest_id: &'a str,
    room_id: &'a str,
    #[serde(skip_serializing_if = "no_metadata")]
    metadata: &'a HashMap<String, String>,
}

fn no_metadata(metadata: &&HashMap<String, String>) -> bool {
    metadata.is_empty()
}

impl<'a> PostingRequest<'a> {
    fn new(charge: &'a ChargeRequest, currency: &'a str) -> Self {
        PostingRequest {
            charges: vec![PostingLine {
                transaction_code: &charge.charge_code,
                price: OperaAmountOut {
                    amount: charge.amount,
                    currency_code: currency,
                },
                tax_amount: OperaAmountOut {
                    amount: charge.tax_amount,
                    currency_code: currency,
                },
                posting_reference: &charge.reference,
                posting_remark: &charge.description,
                article_date: charge.transaction_date.format("%Y-%m-%d").to_string(),
                department_code: &charge.department_code,
                guest_id: &charge.guest_id,
                room_id: &charge.room_number,
                metadata: &charge.metadata,
            }],
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct PostingResponse {
    transaction_no: String,
    status: String,
    posting_reference: String,
    price: OperaAmount,
    folio_balance: OperaAmount,
    #[serde(deserialize_with = "optional_timestamp")]
    posting_date: Option<DateTime<Utc>>,
    title: String,
    detail: String,
    #[serde(rename = "o:errorCode")]
    error_code: String,
}

impl PostingResponse {
    fn into_canonical(self, request: &ChargeRequest, status: StatusCode) -> ChargeResponse {
        // OPERA has no success flag: a 2xx with a transaction number is a posting
        if self.transaction_no.is_empty() && !(self.error_code.is_empty() && self.title.is_empty()) {
            let message = if self.detail.is_empty() { self.title } else { self.detail };
            return ChargeResponse::declined(&request.reference, self.error_code, message, status.as_u16());
        }

        ChargeResponse {
            success: true,
            transaction_id: self.transaction_no,
            status: if self.status.is_empty() { "posted".to_string() } else { self.status.to_lowercase() },
            message: String::new(),
            error_code: String::new(),
            amount: if self.price.amount.is_zero() { request.amount } else { self.price.amount },
            balance: self.folio_balance.amount,
            timestamp: self.posting_date,
            reference: if self.posting_reference.is_empty() {
                request.reference.clone()
            } else {
                self.posting_reference
            },
            metadata: HashMap::new(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PostingsEnvelope {
    #[serde(deserialize_with = "nullable")]
    postings: Vec<OperaPosting>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaPosting {
    transaction_no: String,
    transaction_code: String,
    guest_id: String,
    reservation_id: String,
    room_id: String,
    price: OperaAmount,
    tax_amount: OperaAmount,
    posting_remark: String,
    #[serde(deserialize_with = "optional_timestamp")]
    posting_date: Option<DateTime<Utc>>,
    department_code: String,
    status: String,
    posting_reference: String,
}

impl From<OperaPosting> for Charge {
    fn from(p: OperaPosting) -> Self {
        let mut metadata = HashMap::new();
        if !p.price.currency_code.is_empty() {
            metadata.insert("currency".to_string(), p.price.currency_code);
        }

        Charge {
            charge_id: p.transaction_no,
            guest_id: p.guest_id,
            reservation_id: p.reservation_id,
            room_number: p.room_id,
            charge_code: p.transaction_code,
            amount: p.price.amount,
            description: p.posting_remark,
            transaction_date: p.posting_date,
            department_code: p.department_code,
            status: p.status.to_lowercase(),
            reference: p.posting_reference,
            tax_amount: p.tax_amount.amount,
            metadata,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FolioEnvelope {
    folio: OperaFolio,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaFolio {
    folio_id: String,
    guest_id: String,
    reservation_id: String,
    room_id: String,
    balance: OperaAmount,
    folio_status: String,
    #[serde(deserialize_with = "nullable")]
    postings: Vec<OperaPosting>,
    #[serde(deserialize_with = "nullable")]
    payments: Vec<OperaPayment>,
    #[serde(deserialize_with = "optional_timestamp")]
    create_date_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "optional_timestamp")]
    last_modify_date_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OperaPayment {
    payment_id: String,
    amount: OperaAmount,
    payment_method: String,
    reference: String,
    #[serde(deserialize_with = "optional_timestamp")]
    posting_date: Option<DateTime<Utc>>,
    status: String,
}

impl From<OperaFolio> for Folio {
    fn from(f: OperaFolio) -> Self {
        Folio {
            folio_id: f.folio_id,
            guest_id: f.guest_id,
            reservation_id: f.reservation_id,
            room_number: f.room_id,
            balance: f.balance.amount,
            charges: f.postings.into_iter().map(Charge::from).collect(),
            payments: f
                .payments
                .into_iter()
                .map(|p| Payment {
                    payment_id: p.payment_id,
                    amount: p.amount.amount,
                    payment_method: p.payment_method,
                    reference: p.reference,
                    transaction_date: p.posting_date,
                    status: p.status.to_lowercase(),
                })
                .collect(),
            status: f.folio_status.to_lowercase(),
            created_at: f.create_date_time,
            updated_at: f.last_modify_date_time,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FolioUpdate<'a> {
    folio_status: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn in_house(packages: serde_json::Value) -> OperaReservation {
        serde_json::from_value(json!({
            "reservationIdList": [{"id": "CONF-9", "type": "Confirmation"}, {"id": "R77", "type": "Reservation"}],
            "reservationStatus": "InHouse",
            "hotelId": "HOTEL001",
            "roomStay": {
                "roomId": "305",
                "roomType": "KING",
                "arrivalDate": "2024-03-14",
                "departureDate": "2024-03-16",
                "adultCount": 2,
                "ratePlanCode": "BAR",
                "rateAmount": {"amount": 189.5, "currencyCode": "USD"}
            },
            "reservationGuest": {
                "id": "G100",
                "givenName": "Ada",
                "surname": "Lovelace",
                "vip": {"vipCode": "V1"},
                "membership": {"programCode": "ORS", "membershipId": "M-1", "membershipLevel": "GOLD", "points": 1200}
            },
            "reservationPackages": packages,
            "preferences": [{"preferenceType": "PILLOW", "preferenceValue": "Feather"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_reservation_maps_to_guest() {
        let guest = in_house(json!([{"packageCode": "BKFST"}])).into_guest();

        assert_eq!(guest.reservation_id, "R77");
        assert_eq!(guest.room_number, "305");
        assert_eq!(guest.status, "checked_in");
        assert_eq!(guest.vip_status, "V1");
        assert_eq!(guest.preferences["PILLOW"], "Feather");
        assert_eq!(guest.loyalty.as_ref().unwrap().level, "GOLD");
        assert!(guest.breakfast_package);
        assert!(guest.check_in.is_some());
    }

    #[test]
    fn test_breakfast_package_detection() {
        assert!(in_house(json!([{"packageCode": "bb"}])).has_breakfast());
        assert!(in_house(json!([{"packageCode": "PKG1", "description": "Continental Breakfast"}])).has_breakfast());
        assert!(!in_house(json!([{"packageCode": "PARK"}])).has_breakfast());
        assert!(!in_house(json!(null)).has_breakfast());
    }

    #[test]
    fn test_room_status_normalization() {
        let room: OperaRoom = serde_json::from_value(json!({
            "roomId": "101",
            "frontOfficeStatus": "Vacant",
            "housekeepingStatus": "Inspected"
        }))
        .unwrap();
        let status = room.into_canonical("HOTEL001");
        assert_eq!(status.status, "vacant_clean");
        assert_eq!(status.property_id, "HOTEL001");
        assert_eq!(status.maintenance_status, "ok");

        let room: OperaRoom = serde_json::from_value(json!({"roomId": "102", "outOfOrder": true})).unwrap();
        assert_eq!(room.into_canonical("HOTEL001").status, "out_of_order");
    }

    #[test]
    fn test_posting_request_shape() {
        let charge = ChargeRequest {
            charge_code: "BREAKFAST".into(),
            amount: Decimal::new(2500, 2),
            reference: "BREAKFAST-305-20240315".into(),
            description: "Breakfast Package Charge".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(PostingRequest::new(&charge, "EUR")).unwrap();
        let line = &json["charges"][0];

        assert_eq!(line["transactionCode"], "BREAKFAST");
        assert_eq!(line["postingReference"], "BREAKFAST-305-20240315");
        assert_eq!(line["price"]["currencyCode"], "EUR");
        assert!(line.get("metadata").is_none());
    }

    #[test]
    fn test_posting_response_without_transaction_is_declined() {
        let request = ChargeRequest {
            reference: "REF".into(),
            ..Default::default()
        };
        let body: PostingResponse =
            serde_json::from_value(json!({"title": "Folio closed", "o:errorCode": "FOLIO_CLOSED"})).unwrap();
        let response = body.into_canonical(&request, StatusCode::OK);

        assert!(!response.success);
        assert_eq!(response.error_code, "FOLIO_CLOSED");
        assert_eq!(response.message, "Folio closed");
    }
}
