use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Guests & Rooms
// ============================================================================

/// A guest as seen by the hotel's PMS, normalized across vendors
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GuestProfile {
    pub guest_id: String,
    pub reservation_id: String,
    pub room_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub breakfast_package: bool,
    pub property_id: String,
    /// checked_in, checked_out, no_show, ...
    pub status: String,
    pub vip_status: String,
    pub preferences: HashMap<String, String>,
    pub loyalty: Option<LoyaltyProgram>,
}

impl GuestProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoyaltyProgram {
    pub program_name: String,
    pub member_id: String,
    pub level: String,
    pub points: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoomStatus {
    pub room_number: String,
    /// occupied, vacant_clean, vacant_dirty, out_of_order
    pub status: String,
    pub room_type: String,
    pub guest_id: String,
    pub reservation_id: String,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub property_id: String,
    pub housekeeping_status: String,
    pub maintenance_status: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RoomStatus {
    pub fn is_occupied(&self) -> bool {
        self.status.eq_ignore_ascii_case("occupied")
    }
}

// ============================================================================
// Charges
// ============================================================================

/// A charge to be posted to the guest folio. `reference` is the idempotency key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChargeRequest {
    pub guest_id: String,
    pub reservation_id: String,
    pub room_number: String,
    pub charge_code: String,
    pub amount: Decimal,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    pub department_code: String,
    pub property_id: String,
    pub reference: String,
    pub tax_amount: Decimal,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChargeResponse {
    pub success: bool,
    /// Vendor-assigned; only meaningful when `success` is true
    pub transaction_id: String,
    pub status: String,
    pub message: String,
    pub error_code: String,
    pub amount: Decimal,
    pub balance: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
    pub reference: String,
    pub metadata: HashMap<String, String>,
}

/// Identity of a booked posting. Two responses describe the same posting
/// iff their receipts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub reference: String,
    pub transaction_id: String,
}

impl ChargeResponse {
    /// Build a definitive decline. Falls back to `HTTP_<status>` so a decline
    /// always carries an error code or a message.
    pub fn declined(reference: &str, error_code: String, message: String, status_code: u16) -> Self {
        let error_code = if error_code.trim().is_empty() && message.trim().is_empty() {
            format!("HTTP_{}", status_code)
        } else {
            error_code
        };
        Self {
            success: false,
            status: "failed".to_string(),
            message,
            error_code,
            reference: reference.to_string(),
            ..Default::default()
        }
    }

    pub fn receipt(&self) -> Option<ChargeReceipt> {
        if !self.success || self.transaction_id.trim().is_empty() {
            return None;
        }
        Some(ChargeReceipt {
            reference: self.reference.clone(),
            transaction_id: self.transaction_id.clone(),
        })
    }

    pub fn is_same_posting(&self, other: &ChargeResponse) -> bool {
        match (self.receipt(), other.receipt()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// A posted line on a folio
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Charge {
    pub charge_id: String,
    pub guest_id: String,
    pub reservation_id: String,
    pub room_number: String,
    pub charge_code: String,
    pub amount: Decimal,
    pub description: String,
    pub transaction_date: Option<DateTime<Utc>>,
    pub department_code: String,
    /// posted, voided, adjusted
    pub status: String,
    pub reference: String,
    pub tax_amount: Decimal,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub payment_id: String,
    pub amount: Decimal,
    pub payment_method: String,
    pub reference: String,
    pub transaction_date: Option<DateTime<Utc>>,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Folio {
    pub folio_id: String,
    pub guest_id: String,
    pub reservation_id: String,
    pub room_number: String,
    pub balance: Decimal,
    pub charges: Vec<Charge>,
    pub payments: Vec<Payment>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Folio {
    pub fn find_by_reference(&self, reference: &str) -> Option<&Charge> {
        self.charges.iter().find(|c| c.reference == reference)
    }
}

// ============================================================================
// Reservations
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub reservation_id: String,
    pub guest_id: String,
    pub room_number: String,
    pub room_type: String,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub adults: u32,
    pub children: u32,
    /// confirmed, cancelled, no_show, checked_in, checked_out
    pub status: String,
    pub rate_code: String,
    pub rate: Decimal,
    pub property_id: String,
    pub breakfast_package: bool,
    pub preferences: HashMap<String, String>,
    pub special_requests: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
