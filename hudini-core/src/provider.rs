use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::credentials::{Credentials, ProviderKind};
use crate::error::PmsResult;
use crate::models::{
    Charge, ChargeRequest, ChargeResponse, Folio, GuestProfile, Reservation, RoomStatus,
};

/// Contract every vendor adapter implements.
///
/// Data operations renew the session first when it is inside the refresh
/// margin, then perform exactly one vendor call. Vendor payloads never leave
/// the adapter: everything crossing this trait is a canonical type or a
/// [`PmsError`](crate::error::PmsError).
#[async_trait]
pub trait PmsProvider: Send + Sync {
    /// Registry name this instance was configured under
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    // Authentication

    /// Log in with explicit credentials and install the resulting session
    async fn authenticate(&self, credentials: &Credentials) -> PmsResult<()>;

    /// Re-login with the configured credentials if the token is within the
    /// safety margin of expiry. No vendor call otherwise.
    async fn refresh_session_if_needed(&self) -> PmsResult<()>;

    fn is_authenticated(&self) -> bool;

    fn session_expires_at(&self) -> Option<DateTime<Utc>>;

    // Guests

    async fn get_guest_profile(&self, room_number: &str) -> PmsResult<GuestProfile>;

    async fn get_guest_by_reservation(&self, reservation_id: &str) -> PmsResult<GuestProfile>;

    async fn get_guests_by_property(&self, property_id: &str) -> PmsResult<Vec<GuestProfile>>;

    async fn update_guest_profile(&self, guest_id: &str, profile: &GuestProfile) -> PmsResult<()>;

    // Rooms

    async fn get_room_status(&self, room_number: &str) -> PmsResult<RoomStatus>;

    async fn get_rooms_by_property(&self, property_id: &str) -> PmsResult<Vec<RoomStatus>>;

    async fn update_room_status(&self, room_number: &str, status: &RoomStatus) -> PmsResult<()>;

    // Charges

    /// Post to the guest ledger. A definitive vendor decline is
    /// `Ok(ChargeResponse { success: false, .. })`; `Err(Transport)` means the
    /// outcome is unknown.
    async fn post_charge(&self, charge: &ChargeRequest) -> PmsResult<ChargeResponse>;

    async fn get_charges(&self, guest_id: &str) -> PmsResult<Vec<Charge>>;

    async fn void_charge(&self, charge_id: &str) -> PmsResult<()>;

    // Reservations

    async fn get_reservation(&self, reservation_id: &str) -> PmsResult<Reservation>;

    async fn get_reservations_by_date(&self, date: NaiveDate) -> PmsResult<Vec<Reservation>>;

    async fn update_reservation(&self, reservation_id: &str, reservation: &Reservation) -> PmsResult<()>;

    // Folio

    async fn get_folio(&self, guest_id: &str) -> PmsResult<Folio>;

    async fn update_folio(&self, guest_id: &str, folio: &Folio) -> PmsResult<()>;

    async fn health_check(&self) -> PmsResult<()>;
}

/// Case-insensitive scan for the breakfast marker in free-text package names.
pub fn includes_breakfast<I, S>(inclusions: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inclusions
        .into_iter()
        .any(|inclusion| inclusion.as_ref().to_lowercase().contains("breakfast"))
}
