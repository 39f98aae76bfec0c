use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use staylink_api::{app, AppState};
use staylink_booking::test_support::{booking, InMemoryBookings, RecordingRefundGateway};
use staylink_catalog::test_support::{sample_inventory, summary, ScriptedAdapter, ScriptedConfirmation};
use staylink_catalog::{LocalAdapter, SupplierRegistry};
use staylink_core::{CoreError, ErrorClass, RateCheck, SupplierCode};
use staylink_store::app_config::BusinessRules;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    state: AppState,
    bookings: Arc<InMemoryBookings>,
    refunds: Arc<RecordingRefundGateway>,
}

fn test_app(bookings: InMemoryBookings) -> TestApp {
    let local = Arc::new(LocalAdapter::new(Arc::new(sample_inventory())));
    let mut registry = SupplierRegistry::new(local);
    registry.register(Arc::new(ScriptedAdapter::new(SupplierCode::Atlas).with_hotels(vec![
        summary(SupplierCode::Atlas, "atl-77", "Alfama House", Decimal::from(95)),
        summary(SupplierCode::Atlas, "atl-78", "Tejo Riverside", Decimal::from(140)),
    ])));
    registry.register_confirmation(SupplierCode::Atlas, ScriptedConfirmation::available_at(Decimal::new(10499, 2)));
    registry.register_confirmation(
        SupplierCode::Meridian,
        ScriptedConfirmation::new(Err(CoreError::supplier(SupplierCode::Meridian, ErrorClass::Transient, "HTTP 503"))),
    );

    let bookings = Arc::new(bookings);
    let refunds = Arc::new(RecordingRefundGateway::default());
    let state = AppState::new(Arc::new(registry), bookings.clone(), refunds.clone(), &BusinessRules::default());
    TestApp { state, bookings, refunds }
}

async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn stay() -> (String, String) {
    let check_in = Utc::now().date_naive() + Duration::days(30);
    (check_in.to_string(), (check_in + Duration::days(2)).to_string())
}

#[tokio::test]
async fn test_health() {
    let app = test_app(InMemoryBookings::default());
    let (status, body) = send(&app.state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suppliers"], json!(["LOCAL", "ATLAS"]));
}

#[tokio::test]
async fn test_multi_supplier_search_dedupes_by_name() {
    let app = test_app(InMemoryBookings::default());
    let (check_in, check_out) = stay();
    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/hotels/search",
        Some(json!({"destination": "lisbon", "checkIn": check_in, "checkOut": check_out, "adults": 2})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let hotels = body["hotels"].as_array().unwrap();
    let names: Vec<_> = hotels.iter().map(|h| h["name"].as_str().unwrap()).collect();
    assert_eq!(names.iter().filter(|n| **n == "Alfama House").count(), 1);
    assert!(names.contains(&"Baixa Grand Hotel"));
    assert!(names.contains(&"Tejo Riverside"));

    // Local Alfama House is 110 a night, Atlas offers 95
    let alfama = hotels.iter().find(|h| h["name"] == "Alfama House").unwrap();
    assert_eq!(alfama["supplier"], "ATLAS");
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_single_supplier_search_and_validation() {
    let app = test_app(InMemoryBookings::default());
    let (check_in, check_out) = stay();

    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/hotels/search",
        Some(json!({"supplier": "LOCAL", "destination": "Porto", "checkIn": check_in, "checkOut": check_out})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["hotels"][0]["id"], "hotel-ribeira");

    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/hotels/search",
        Some(json!({"destination": "Porto", "checkIn": check_in, "checkOut": check_in})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("check_out"));
}

#[tokio::test]
async fn test_hotel_details_and_rate_plan_lookup() {
    let app = test_app(InMemoryBookings::default());
    let (check_in, check_out) = stay();

    let uri = format!("/v1/hotels/alfama-house?supplier=local&check_in={}&check_out={}", check_in, check_out);
    let (status, body) = send(&app.state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "hotel-alfama");
    assert_eq!(body["roomTypes"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app.state, "GET", "/v1/hotels/hotel-nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/v1/hotels/hotel-alfama?check_in={}", check_in);
    let (status, _) = send(&app.state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app.state, "GET", "/v1/rate-plans/rp-baixa-suite", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nights"], 1);

    let (status, _) = send(&app.state, "GET", "/v1/rate-plans/rp-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.state, "GET", "/v1/rate-plans/rp-baixa-suite?supplier=expedia", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_selection_endpoint() {
    let app = test_app(InMemoryBookings::default());
    let (check_in, check_out) = stay();

    let request = json!({
        "hotelId": "hotel-alfama",
        "roomTypeId": "room-alfama-double",
        "ratePlanId": "rp-alfama-flex",
        "checkIn": check_in,
        "checkOut": check_out,
        "adults": 2,
        "addOns": [{"addOnId": "addon-parking"}]
    });
    let (status, body) = send(&app.state, "POST", "/v1/selections", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    // 220 for the stay plus 2 nights of parking at 15
    assert_eq!(body["pricing"]["grandTotal"], "250");
    assert_eq!(body["addOns"][0]["total"], "30");

    let mut unknown = request.clone();
    unknown["hotelId"] = json!("hotel-nowhere");
    let (status, _) = send(&app.state, "POST", "/v1/selections", Some(unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut crowded = request.clone();
    crowded["adults"] = json!(3);
    let (status, _) = send(&app.state, "POST", "/v1/selections", Some(crowded)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut oversized = request;
    oversized["adults"] = json!(3_000_000_000u32);
    oversized["rooms"] = json!(3_000_000_000u32);
    let (status, body) = send(&app.state, "POST", "/v1/selections", Some(oversized)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at most"));
}

#[tokio::test]
async fn test_prebook_status_codes() {
    let app = test_app(InMemoryBookings::default());

    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/prebook",
        Some(json!({"supplierCode": "ATLAS", "bookHash": "bh-1", "totalAmount": 100, "currency": "EUR", "hotelId": "atl-77"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["priceChanged"], true);
    assert_eq!(body["confirmedPrice"], "104.99");

    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/prebook",
        Some(json!({"supplierCode": "ATLAS", "totalAmount": 100, "currency": "EUR", "hotelId": "atl-77"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("bookHash"));

    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/prebook",
        Some(json!({"supplierCode": "ATLAS", "bookHash": "bh-1", "totalAmount": 100, "currency": "EUR"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("hotelId"));

    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/prebook",
        Some(json!({"bookHash": "bh-1", "totalAmount": 100, "currency": "EUR", "hotelId": "atl-77"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid request body"));

    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/prebook",
        Some(json!({"supplierCode": "MERIDIAN", "rateKey": "rk-1", "totalAmount": 100, "currency": "EUR", "hotelId": "10"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app.state,
        "POST",
        "/v1/prebook",
        Some(json!({"supplierCode": "MERIDIAN", "rateKey": "rk-1", "totalAmount": 100, "currency": "EUR", "hotelId": "test_hotel_1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confirmedPrice"], "100");
}

#[tokio::test]
async fn test_prebook_unavailable_is_422() {
    let local = Arc::new(LocalAdapter::new(Arc::new(sample_inventory())));
    let mut registry = SupplierRegistry::new(local);
    registry.register_confirmation(
        SupplierCode::Atlas,
        ScriptedConfirmation::new(Ok(RateCheck {
            available: false,
            current_price: None,
            currency: None,
            price_changed: false,
        })),
    );
    let state = AppState::new(
        Arc::new(registry),
        Arc::new(InMemoryBookings::default()),
        Arc::new(RecordingRefundGateway::default()),
        &BusinessRules::default(),
    );

    let (status, body) = send(
        &state,
        "POST",
        "/v1/prebook",
        Some(json!({"supplierCode": "ATLAS", "bookHash": "bh-1", "totalAmount": 100, "currency": "EUR", "hotelId": "atl-77"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_cancellation_flow() {
    let record = booking(Utc::now().date_naive() + Duration::days(10), true, Decimal::from(200));
    let id = record.id;
    let app = test_app(InMemoryBookings::with(vec![record]));

    let (status, body) = send(&app.state, "GET", &format!("/v1/bookings/{}/cancellation", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canCancel"], true);
    assert_eq!(body["refundAmount"], "200");

    let (status, body) = send(
        &app.state,
        "POST",
        &format!("/v1/bookings/{}/cancel", id),
        Some(json!({"reason": "plans changed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(app.refunds.requests().len(), 1);
    assert_eq!(app.bookings.activity().len(), 1);

    let (status, _) = send(&app.state, "POST", &format!("/v1/bookings/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app.state, "GET", &format!("/v1/bookings/{}/cancellation", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.state, "GET", "/v1/bookings/not-a-uuid/cancellation", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
