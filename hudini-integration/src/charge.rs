use chrono::NaiveDate;
use hudini_core::{ChargeReceipt, ChargeRequest, ChargeResponse, Clock, PmsProvider, PmsResult};
use hudini_shared::models::events::{
    ChargeIndeterminateEvent, ChargePostedEvent, ChargeRejectedEvent, PmsEvent,
};
use hudini_store::BreakfastChargeConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::registry::ProviderRegistry;

/// A breakfast to bill to the guest's room
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BreakfastCharge {
    pub guest_id: String,
    pub room_number: String,
    pub amount: Decimal,
    pub property_id: Option<String>,
    pub reservation_id: Option<String>,
    /// Idempotency key; derived from room and service date when absent
    pub reference: Option<String>,
    pub service_date: Option<NaiveDate>,
}

impl BreakfastCharge {
    pub fn new(guest_id: impl Into<String>, room_number: impl Into<String>, amount: Decimal) -> Self {
        Self {
            guest_id: guest_id.into(),
            room_number: room_number.into(),
            amount,
            ..Default::default()
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_reservation(mut self, reservation_id: impl Into<String>) -> Self {
        self.reservation_id = Some(reservation_id.into());
        self
    }

    pub fn with_property(mut self, property_id: impl Into<String>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    pub fn on(mut self, service_date: NaiveDate) -> Self {
        self.service_date = Some(service_date);
        self
    }
}

/// `BREAKFAST-{room}-{YYYYMMDD}`: the same breakfast always gets the same key.
pub fn breakfast_reference(room_number: &str, service_date: NaiveDate) -> String {
    format!("BREAKFAST-{}-{}", room_number.trim(), service_date.format("%Y%m%d"))
}

/// What happened to a posting, as far as anyone can tell
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    /// Booked by the vendor
    Posted(ChargeResponse),
    /// Definitively declined; vendor code and message untouched
    Rejected {
        reference: String,
        error_code: String,
        message: String,
        response: ChargeResponse,
    },
    /// No definitive answer. Resubmitting with the same reference is safe.
    Indeterminate { reference: String, reason: String },
}

impl ChargeOutcome {
    pub fn reference(&self) -> &str {
        match self {
            ChargeOutcome::Posted(response) => &response.reference,
            ChargeOutcome::Rejected { reference, .. } | ChargeOutcome::Indeterminate { reference, .. } => reference,
        }
    }

    pub fn is_posted(&self) -> bool {
        matches!(self, ChargeOutcome::Posted(_))
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, ChargeOutcome::Indeterminate { .. })
    }

    pub fn receipt(&self) -> Option<ChargeReceipt> {
        match self {
            ChargeOutcome::Posted(response) => response.receipt(),
            _ => None,
        }
    }

    /// True when both outcomes describe one booked posting
    pub fn is_same_posting(&self, other: &ChargeOutcome) -> bool {
        match (self, other) {
            (ChargeOutcome::Posted(a), ChargeOutcome::Posted(b)) => a.is_same_posting(b),
            _ => false,
        }
    }
}

/// Posts breakfast charges through the registry's default provider.
///
/// Performs exactly one vendor call per request and never retries: the
/// caller decides whether to resubmit an indeterminate posting.
#[derive(Clone)]
pub struct ChargePostingWorkflow {
    registry: Arc<ProviderRegistry>,
    defaults: BreakfastChargeConfig,
    property_id: String,
    events: broadcast::Sender<PmsEvent>,
    clock: Arc<dyn Clock>,
}

impl ChargePostingWorkflow {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        defaults: BreakfastChargeConfig,
        property_id: impl Into<String>,
        events: broadcast::Sender<PmsEvent>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            defaults,
            property_id: property_id.into(),
            events,
            clock,
        }
    }

    /// Canonical request for `charge`, with defaults and reference filled in.
    pub fn build_request(&self, charge: &BreakfastCharge) -> ChargeRequest {
        let now = self.clock.now();
        let service_date = charge.service_date.unwrap_or_else(|| now.date_naive());
        let reference = charge
            .reference
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| breakfast_reference(&charge.room_number, service_date));

        ChargeRequest {
            guest_id: charge.guest_id.clone(),
            reservation_id: charge.reservation_id.clone().unwrap_or_default(),
            room_number: charge.room_number.clone(),
            charge_code: self.defaults.charge_code.clone(),
            amount: charge.amount,
            description: self.defaults.description.clone(),
            transaction_date: now,
            department_code: self.defaults.department_code.clone(),
            property_id: charge
                .property_id
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| self.property_id.clone()),
            reference,
            tax_amount: Decimal::ZERO,
            metadata: Default::default(),
        }
    }

    pub async fn post_breakfast_charge(&self, charge: &BreakfastCharge) -> PmsResult<ChargeOutcome> {
        let adapter = self.registry.get_default()?;
        let request = self.build_request(charge);
        self.post(adapter.as_ref(), &request).await
    }

    /// Submit `request` to `adapter` and classify the answer. Errors other
    /// than transport failures propagate unchanged.
    pub async fn post(&self, adapter: &dyn PmsProvider, request: &ChargeRequest) -> PmsResult<ChargeOutcome> {
        let provider = adapter.name().to_string();

        let outcome = match adapter.post_charge(request).await {
            Ok(response) if response.success && response.receipt().is_some() => {
                info!(
                    provider = %provider,
                    reference = %request.reference,
                    transaction_id = %response.transaction_id,
                    amount = %request.amount,
                    "breakfast charge posted"
                );
                ChargeOutcome::Posted(ChargeResponse {
                    reference: request.reference.clone(),
                    ..response
                })
            }
            Ok(response) if response.success => {
                warn!(
                    provider = %provider,
                    reference = %request.reference,
                    "vendor acknowledged posting without a transaction id"
                );
                ChargeOutcome::Indeterminate {
                    reference: request.reference.clone(),
                    reason: "vendor acknowledged the posting without a transaction id".to_string(),
                }
            }
            Ok(response) => {
                warn!(
                    provider = %provider,
                    reference = %request.reference,
                    error_code = %response.error_code,
                    message = %response.message,
                    "breakfast charge rejected"
                );
                ChargeOutcome::Rejected {
                    reference: request.reference.clone(),
                    error_code: response.error_code.clone(),
                    message: response.message.clone(),
                    response,
                }
            }
            Err(e) if e.is_transport() => {
                error!(
                    provider = %provider,
                    reference = %request.reference,
                    timed_out = e.is_timeout(),
                    error = %e,
                    "breakfast charge outcome unknown, needs reconciliation"
                );
                ChargeOutcome::Indeterminate {
                    reference: request.reference.clone(),
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                warn!(provider = %provider, reference = %request.reference, error = %e, "breakfast charge failed");
                return Err(e);
            }
        };

        self.publish(&provider, request, &outcome);
        Ok(outcome)
    }

    fn publish(&self, provider: &str, request: &ChargeRequest, outcome: &ChargeOutcome) {
        let timestamp = self.clock.now().timestamp();
        let event = match outcome {
            ChargeOutcome::Posted(response) => PmsEvent::ChargePosted(ChargePostedEvent {
                event_id: Uuid::new_v4(),
                provider: provider.to_string(),
                reference: request.reference.clone(),
                transaction_id: response.transaction_id.clone(),
                guest_id: request.guest_id.clone(),
                room_number: request.room_number.clone(),
                amount: request.amount,
                timestamp,
            }),
            ChargeOutcome::Rejected {
                error_code, message, ..
            } => PmsEvent::ChargeRejected(ChargeRejectedEvent {
                event_id: Uuid::new_v4(),
                provider: provider.to_string(),
                reference: request.reference.clone(),
                room_number: request.room_number.clone(),
                error_code: error_code.clone(),
                message: message.clone(),
                timestamp,
            }),
            ChargeOutcome::Indeterminate { reason, .. } => PmsEvent::ChargeIndeterminate(ChargeIndeterminateEvent {
                event_id: Uuid::new_v4(),
                provider: provider.to_string(),
                reference: request.reference.clone(),
                room_number: request.room_number.clone(),
                reason: reason.clone(),
                timestamp,
            }),
        };

        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hudini_core::ManualClock;

    fn workflow() -> ChargePostingWorkflow {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 15, 7, 45, 0).unwrap());
        let (events, _) = broadcast::channel(8);
        ChargePostingWorkflow::new(
            Arc::new(ProviderRegistry::new()),
            BreakfastChargeConfig::default(),
            "HOTEL001",
            events,
            Arc::new(clock),
        )
    }

    #[test]
    fn test_reference_is_derived_from_room_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(breakfast_reference("305", date), "BREAKFAST-305-20240315");
        assert_eq!(breakfast_reference(" 305 ", date), "BREAKFAST-305-20240315");
    }

    #[test]
    fn test_request_defaults() {
        let request = workflow().build_request(&BreakfastCharge::new("G100", "305", Decimal::new(2500, 2)));

        assert_eq!(request.reference, "BREAKFAST-305-20240315");
        assert_eq!(request.charge_code, "BREAKFAST");
        assert_eq!(request.department_code, "F&B");
        assert_eq!(request.description, "Breakfast Package Charge");
        assert_eq!(request.property_id, "HOTEL001");
        assert_eq!(request.tax_amount, Decimal::ZERO);
        assert!(request.reservation_id.is_empty());
    }

    #[test]
    fn test_caller_reference_and_property_win() {
        let charge = BreakfastCharge::new("G100", "305", Decimal::new(2500, 2))
            .with_reference("POS-42")
            .with_property("HOTEL002")
            .with_reservation("R77");
        let request = workflow().build_request(&charge);

        assert_eq!(request.reference, "POS-42");
        assert_eq!(request.property_id, "HOTEL002");
        assert_eq!(request.reservation_id, "R77");
    }

    #[test]
    fn test_service_date_drives_reference() {
        let charge = BreakfastCharge::new("G100", "305", Decimal::new(2500, 2))
            .on(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
        assert_eq!(workflow().build_request(&charge).reference, "BREAKFAST-305-20240314");
    }

    #[test]
    fn test_blank_reference_is_replaced() {
        let charge = BreakfastCharge::new("G100", "305", Decimal::new(2500, 2)).with_reference("  ");
        assert_eq!(workflow().build_request(&charge).reference, "BREAKFAST-305-20240315");
    }
}
