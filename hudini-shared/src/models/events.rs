use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ChargePostedEvent {
    pub event_id: Uuid,
    pub provider: String,
    pub reference: String,
    pub transaction_id: String,
    pub guest_id: String,
    pub room_number: String,
    pub amount: Decimal,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ChargeRejectedEvent {
    pub event_id: Uuid,
    pub provider: String,
    pub reference: String,
    pub room_number: String,
    pub error_code: String,
    pub message: String,
    pub timestamp: i64,
}

/// The PMS may or may not have booked the charge. Needs reconciliation by reference.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ChargeIndeterminateEvent {
    pub event_id: Uuid,
    pub provider: String,
    pub reference: String,
    pub room_number: String,
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ProviderSwitchedEvent {
    pub event_id: Uuid,
    pub previous: Option<String>,
    pub current: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct RoomsSyncedEvent {
    pub event_id: Uuid,
    pub provider: String,
    pub property_id: String,
    pub rooms: usize,
    pub guests: usize,
    pub timestamp: i64,
}

/// Everything the integration core publishes to the real-time hub.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PmsEvent {
    ChargePosted(ChargePostedEvent),
    ChargeRejected(ChargeRejectedEvent),
    ChargeIndeterminate(ChargeIndeterminateEvent),
    ProviderSwitched(ProviderSwitchedEvent),
    RoomsSynced(RoomsSyncedEvent),
}

impl PmsEvent {
    pub fn event_id(&self) -> Uuid {
        match self {
            PmsEvent::ChargePosted(e) => e.event_id,
            PmsEvent::ChargeRejected(e) => e.event_id,
            PmsEvent::ChargeIndeterminate(e) => e.event_id,
            PmsEvent::ProviderSwitched(e) => e.event_id,
            PmsEvent::RoomsSynced(e) => e.event_id,
        }
    }

    /// Topic name used by the broadcast hub.
    pub fn topic(&self) -> &'static str {
        match self {
            PmsEvent::ChargePosted(_) => "pms.charge.posted",
            PmsEvent::ChargeRejected(_) => "pms.charge.rejected",
            PmsEvent::ChargeIndeterminate(_) => "pms.charge.indeterminate",
            PmsEvent::ProviderSwitched(_) => "pms.provider.switched",
            PmsEvent::RoomsSynced(_) => "pms.rooms.synced",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_by_type() {
        let event = PmsEvent::ProviderSwitched(ProviderSwitchedEvent {
            event_id: Uuid::new_v4(),
            previous: Some("oracle_ohip".to_string()),
            current: "opera".to_string(),
            timestamp: 1_700_000_000,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "provider_switched");
        assert_eq!(json["current"], "opera");
        assert_eq!(event.topic(), "pms.provider.switched");
    }
}
