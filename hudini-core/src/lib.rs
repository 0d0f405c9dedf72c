pub mod credentials;
pub mod error;
pub mod models;
pub mod provider;
pub mod session;

pub use credentials::{Credentials, ProviderKind};
pub use error::{ErrorKind, PmsError, PmsResult, UnavailableReason};
pub use models::{
    Charge, ChargeReceipt, ChargeRequest, ChargeResponse, Folio, GuestProfile, LoyaltyProgram,
    Payment, Reservation, RoomStatus,
};
pub use provider::PmsProvider;
pub use session::{AuthSession, Clock, ManualClock, SessionStore, SystemClock, TokenGrant};
