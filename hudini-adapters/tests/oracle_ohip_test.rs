//! OHIP adapter against a mock vendor.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use hudini_adapters::{AdapterSettings, OracleOhipAdapter};
use hudini_core::{ChargeRequest, Clock, Credentials, ManualClock, PmsError, PmsProvider};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

fn credentials(server: &MockServer) -> Credentials {
    Credentials {
        username: "svc".into(),
        password: "pw".into(),
        client_id: "client".into(),
        client_secret: "secret".into(),
        base_url: server.uri(),
        property_id: "HOTEL001".into(),
        ..Default::default()
    }
}

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 15, 6, 0, 0).unwrap())
}

fn settings(clock: &ManualClock) -> AdapterSettings {
    AdapterSettings {
        timeout: Duration::from_millis(500),
        bulk_timeout: Duration::from_secs(2),
        ..Default::default()
    }
    .with_clock(Arc::new(clock.clone()))
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": 1800
        })))
        .mount(server)
        .await;
}

async fn token_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/oauth2/token")
        .count()
}

async fn connected(server: &MockServer, clock: &ManualClock) -> OracleOhipAdapter {
    mount_token(server, "tok-1").await;
    let creds = credentials(server);
    let adapter = OracleOhipAdapter::new("oracle_ohip", creds.clone(), &settings(clock)).unwrap();
    adapter.authenticate(&creds).await.unwrap();
    adapter
}

fn room_body(number: &str, property: &str) -> serde_json::Value {
    json!({
        "room_number": number,
        "status": "occupied",
        "room_type": "KING",
        "property_id": property,
        "housekeeping_status": "clean",
        "maintenance_status": "ok",
        "last_updated": "2024-03-15T05:00:00Z"
    })
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_authenticate_sends_client_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_partial_json(json!({
            "client_id": "client",
            "client_secret": "secret",
            "grant_type": "client_credentials"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "Bearer",
            "expires_in": 1800
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clock = clock();
    let creds = credentials(&server);
    let adapter = OracleOhipAdapter::new("oracle_ohip", creds.clone(), &settings(&clock)).unwrap();
    assert!(!adapter.is_authenticated());

    adapter.authenticate(&creds).await.unwrap();

    assert!(adapter.is_authenticated());
    assert_eq!(
        adapter.session_expires_at(),
        Some(clock.now() + ChronoDuration::minutes(30))
    );
}

#[tokio::test]
async fn test_rejected_login_is_authentication_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "bad secret"
        })))
        .mount(&server)
        .await;

    let clock = clock();
    let creds = credentials(&server);
    let adapter = OracleOhipAdapter::new("oracle_ohip", creds.clone(), &settings(&clock)).unwrap();

    match adapter.authenticate(&creds).await {
        Err(PmsError::AuthenticationFailed { provider, reason }) => {
            assert_eq!(provider, "oracle_ohip");
            assert!(reason.contains("bad secret"));
        }
        other => panic!("expected AuthenticationFailed, got {:?}", other),
    }
    assert!(!adapter.is_authenticated());
}

#[tokio::test]
async fn test_absurd_token_lifetime_is_authentication_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-forever",
            "token_type": "Bearer",
            "expires_in": 10_000_000_000_000_i64
        })))
        .mount(&server)
        .await;

    let clock = clock();
    let creds = credentials(&server);
    let adapter = OracleOhipAdapter::new("oracle_ohip", creds.clone(), &settings(&clock)).unwrap();

    assert!(matches!(
        adapter.authenticate(&creds).await,
        Err(PmsError::AuthenticationFailed { .. })
    ));
    assert!(!adapter.is_authenticated());
}

#[tokio::test]
async fn test_refresh_respects_safety_margin() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/rooms/305/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(room_body("305", "HOTEL001")))
        .mount(&server)
        .await;
    let first_expiry = adapter.session_expires_at().unwrap();

    // 10 minutes into a 30 minute token: no renewal
    clock.advance(ChronoDuration::minutes(10));
    adapter.get_room_status("305").await.unwrap();
    assert_eq!(token_calls(&server).await, 1);
    assert_eq!(adapter.session_expires_at(), Some(first_expiry));

    // 26 minutes in: inside the 5 minute margin, exactly one renewal
    clock.advance(ChronoDuration::minutes(16));
    adapter.get_room_status("305").await.unwrap();
    assert_eq!(token_calls(&server).await, 2);
    assert!(adapter.session_expires_at().unwrap() > first_expiry);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_renewal() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = Arc::new(connected(&server, &clock).await);
    Mock::given(method("GET"))
        .and(path("/api/v1/rooms/305/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(room_body("305", "HOTEL001")))
        .mount(&server)
        .await;

    clock.advance(ChronoDuration::minutes(27));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let adapter = adapter.clone();
        handles.push(tokio::spawn(async move { adapter.get_room_status("305").await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(token_calls(&server).await, 2);
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_guest_profile_maps_breakfast_and_sends_bearer() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/reservations/room/305"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reservation_id": "R1",
            "guest_id": "G100",
            "room_number": "305",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "check_in_date": "2024-03-14T15:00:00Z",
            "check_out_date": "2024-03-16T11:00:00Z",
            "status": "checked_in",
            "property_id": "HOTEL001",
            "vip_status": "",
            "preferences": {"pillow": "feather"},
            "package_inclusions": ["Bed & Breakfast"]
        })))
        .mount(&server)
        .await;

    let guest = adapter.get_guest_profile("305").await.unwrap();
    assert_eq!(guest.guest_id, "G100");
    assert!(guest.breakfast_package);
    assert_eq!(guest.preferences["pillow"], "feather");
}

#[tokio::test]
async fn test_missing_guest_is_not_found() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/reservations/room/999"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    match adapter.get_guest_profile("999").await {
        Err(PmsError::NotFound { id, .. }) => assert_eq!(id, "999"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_vendor_is_a_transport_timeout() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/rooms/305/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(room_body("305", "HOTEL001"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = adapter.get_room_status("305").await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
}

#[tokio::test]
async fn test_server_error_is_transport() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/reservations/R1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = adapter.get_reservation("R1").await.unwrap_err();
    assert!(err.is_transport());
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn test_unauthorized_clears_session() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/guests/G100/folio"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(matches!(
        adapter.get_folio("G100").await,
        Err(PmsError::SessionExpired(_))
    ));
    assert!(!adapter.is_authenticated());
}

#[tokio::test]
async fn test_rooms_by_property_are_scoped() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/properties/HOTEL001/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rooms": [
                room_body("101", "HOTEL001"),
                room_body("102", ""),
                room_body("900", "HOTEL002")
            ]
        })))
        .mount(&server)
        .await;

    let rooms = adapter.get_rooms_by_property("HOTEL001").await.unwrap();
    assert_eq!(rooms.len(), 2);
    assert!(rooms.iter().all(|r| r.property_id == "HOTEL001"));
}

#[tokio::test]
async fn test_reservations_by_date_query() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/reservations"))
        .and(wiremock::matchers::query_param("date", "2024-03-15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reservations": [{
                "reservation_id": "R1",
                "room_number": "305",
                "adults": 2,
                "rate": 189.5,
                "package_inclusions": ["breakfast buffet"]
            }]
        })))
        .mount(&server)
        .await;

    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let reservations = adapter.get_reservations_by_date(date).await.unwrap();
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].adults, 2);
    assert_eq!(reservations[0].rate, Decimal::new(1895, 1));
    assert!(reservations[0].breakfast_package);
}

// =============================================================================
// Charges
// =============================================================================

fn breakfast_charge() -> ChargeRequest {
    ChargeRequest {
        guest_id: "G100".into(),
        reservation_id: "R1".into(),
        room_number: "305".into(),
        charge_code: "BREAKFAST".into(),
        amount: Decimal::new(2500, 2),
        description: "Breakfast Package Charge".into(),
        transaction_date: Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap(),
        department_code: "F&B".into(),
        property_id: "HOTEL001".into(),
        reference: "BREAKFAST-305-20240315".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_posted_charge_carries_transaction_id() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/charges"))
        .and(body_partial_json(json!({
            "reference": "BREAKFAST-305-20240315",
            "charge_code": "BREAKFAST",
            "amount": 25.0
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "transaction_id": "TXN-1",
            "status": "posted",
            "amount": 25.0,
            "balance": 125.0,
            "timestamp": "2024-03-15T08:00:01Z",
            "reference": "BREAKFAST-305-20240315",
            "metadata": null
        })))
        .mount(&server)
        .await;

    let response = adapter.post_charge(&breakfast_charge()).await.unwrap();
    assert!(response.success);
    assert_eq!(response.transaction_id, "TXN-1");
    assert_eq!(response.balance, Decimal::new(125, 0));
    assert!(response.receipt().is_some());
}

#[tokio::test]
async fn test_declined_charge_is_definitive() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/charges"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "error_code": "CREDIT_LIMIT",
            "message": "Credit limit exceeded"
        })))
        .mount(&server)
        .await;

    let response = adapter.post_charge(&breakfast_charge()).await.unwrap();
    assert!(!response.success);
    assert_eq!(response.error_code, "CREDIT_LIMIT");
    assert_eq!(response.message, "Credit limit exceeded");
    assert_eq!(response.reference, "BREAKFAST-305-20240315");
}

#[tokio::test]
async fn test_charge_gateway_error_has_no_outcome() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/charges"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = adapter.post_charge(&breakfast_charge()).await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_slow_charge_times_out_without_outcome() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/charges"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"success": true, "transaction_id": "TXN-LATE"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = adapter.post_charge(&breakfast_charge()).await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    let clock = clock();
    let adapter = connected(&server, &clock).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    adapter.health_check().await.unwrap();
}
