use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use bookd::api::create_router;
use bookd::engine::Engine;

fn test_router(name: &str) -> Router {
    let dir = std::env::temp_dir().join("bookd_test_api");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    create_router(Arc::new(Engine::new(path).unwrap()))
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn booking_body(property: &str, start: &str, end: &str) -> Value {
    json!({
        "propertyId": property,
        "guestName": "Ada Lovelace",
        "guestEmail": "ada@example.com",
        "startDate": start,
        "endDate": end,
    })
}

#[tokio::test]
async fn health_probe() {
    let app = test_router("health.wal");
    let (status, _) = send(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_booking_returns_created() {
    let app = test_router("create.wal");

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p1", "2025-06-01", "2025-06-03")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["propertyId"], "p1");
    assert_eq!(body["guestName"], "Ada Lovelace");
    assert_eq!(body["startDate"], "2025-06-01");
    assert_eq!(body["endDate"], "2025-06-03");
    assert_eq!(body["status"], "ACTIVE");
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn conflicting_booking_returns_409_with_details() {
    let app = test_router("conflict.wal");

    send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p1", "2025-06-01", "2025-06-03")),
    )
    .await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p1", "2025-06-02", "2025-06-04")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "allocation_conflict");
    assert_eq!(body["conflict"]["propertyId"], "p1");
    assert_eq!(body["conflict"]["startDate"], "2025-06-02");
    assert_eq!(body["conflict"]["endDate"], "2025-06-04");
    assert_eq!(body["conflict"]["conflictingKind"], "BOOKING");
}

#[tokio::test]
async fn invalid_input_returns_400() {
    let app = test_router("validation.wal");

    // Inverted date range.
    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p1", "2025-06-05", "2025-06-01")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    // Malformed email.
    let mut bad_email = booking_body("p1", "2025-06-01", "2025-06-03");
    bad_email["guestEmail"] = json!("not-an-email");
    let (status, body) = send(&app, "POST", "/api/bookings", Some(bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn unknown_booking_returns_404() {
    let app = test_router("not_found.wal");
    let id = ulid::Ulid::new();
    let (status, body) = send(&app, "GET", &format!("/api/bookings/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn cancel_rebook_lifecycle_over_http() {
    let app = test_router("lifecycle.wal");

    let (_, created) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p1", "2025-06-01", "2025-06-03")),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, canceled) =
        send(&app, "POST", &format!("/api/bookings/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(canceled["status"], "CANCELED");

    // The canceled dates are takeable by a block now.
    let (status, _) = send(
        &app,
        "POST",
        "/api/blocks",
        Some(json!({
            "propertyId": "p1",
            "startDate": "2025-06-02",
            "endDate": "2025-06-04",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Rebooking the original range now conflicts with the block.
    let (status, body) = send(&app, "POST", &format!("/api/bookings/{id}/rebook"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflict"]["conflictingKind"], "BLOCK");

    let (_, still) = send(&app, "GET", &format!("/api/bookings/{id}"), None).await;
    assert_eq!(still["status"], "CANCELED");
}

#[tokio::test]
async fn delete_booking_is_idempotent_over_http() {
    let app = test_router("delete.wal");

    let (_, created) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p1", "2025-06-01", "2025-06-03")),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/bookings/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/api/bookings/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/bookings/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_calendar_lists_month() {
    let app = test_router("calendar.wal");

    send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p1", "2025-06-10", "2025-06-12")),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p1", "2025-06-01", "2025-06-03")),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/bookings",
        Some(booking_body("p2", "2025-06-01", "2025-06-03")),
    )
    .await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/bookings/calendar?propertyId=p1&year=2025&month=6",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["startDate"], "2025-06-01"); // ordered by start

    let (status, body) = send(
        &app,
        "GET",
        "/api/bookings/calendar?propertyId=p1&year=2025&month=13",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn block_update_and_calendar() {
    let app = test_router("blocks.wal");

    let (status, created) = send(
        &app,
        "POST",
        "/api/blocks",
        Some(json!({
            "propertyId": "p1",
            "startDate": "2025-06-01",
            "endDate": "2025-06-03",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/blocks/{id}"),
        Some(json!({
            "propertyId": "p2",
            "startDate": "2025-06-05",
            "endDate": "2025-06-07",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["propertyId"], "p2");

    let (_, p1_list) = send(
        &app,
        "GET",
        "/api/blocks/calendar?propertyId=p1&year=2025&month=6",
        None,
    )
    .await;
    assert!(p1_list.as_array().unwrap().is_empty());

    let (_, p2_list) = send(
        &app,
        "GET",
        "/api/blocks/calendar?propertyId=p2&year=2025&month=6",
        None,
    )
    .await;
    assert_eq!(p2_list.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/api/blocks/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
