use rust_decimal_macros::dec;
use serde_json::{json, Value};
use spa_storefront::models::{CartSnapshot, CheckoutPayload, Notification, NotificationKind, Size};
use spa_storefront::services::SessionExpiry;
use std::time::Duration;

mod common;
use common::*;

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let test_env = TestEnvironment::new().await;

    let response = test_env
        .client
        .get(test_env.url("/health/status"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");

    let response = test_env
        .client
        .get(test_env.url("/metrics"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let text = response.text().await.expect("Failed to read metrics");
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let test_env = TestEnvironment::new().await;
    let client = &test_env.client;

    let response = client
        .get(test_env.url("/api/services"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total_count"], 3);
    assert_eq!(body["catalog_status"], "loaded");

    let response = client
        .get(test_env.url("/api/services?search=tow"))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let names: Vec<&str> = body["services"]
        .as_array()
        .expect("Expected services array")
        .iter()
        .filter_map(|s| s["ServiceName"].as_str())
        .collect();
    assert_eq!(names, vec!["Towel Service"]);

    let response = client
        .get(test_env.url("/api/services/rows"))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let rows = body["rows"].as_array().expect("Expected rows array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].as_array().map(|r| r.len()), Some(1));

    let response = client
        .get(test_env.url("/api/services/svc-2"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["ServiceName"], "Towel Service");

    let response = client
        .get(test_env.url("/api/services/missing"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_browse_add_and_checkout_journey() {
    let test_env = TestEnvironment::new().await;
    let client = &test_env.client;
    let session_id = test_env.open_session("journey").await;

    // Stateful search narrows the visible list
    let response = client
        .post(test_env.url(&format!("/api/sessions/{}/search", session_id)))
        .json(&json!({ "text": "MASSAGE" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total_count"], 1);

    // Confirm without a size is rejected with an alert
    client
        .post(test_env.url(&format!("/api/sessions/{}/detail/svc-1", session_id)))
        .send()
        .await
        .expect("Failed to send request");
    let response = client
        .post(test_env.url(&format!("/api/sessions/{}/detail/confirm", session_id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(test_env.add_to_cart(&session_id, "svc-1", "M").await, 201);
    assert_eq!(test_env.add_to_cart(&session_id, "svc-1", "L").await, 201);
    assert_eq!(test_env.add_to_cart(&session_id, "svc-1", "L").await, 409);
    assert_eq!(test_env.add_to_cart(&session_id, "svc-2", "3XL").await, 201);

    let cart: CartSnapshot = client
        .get(test_env.url(&format!("/api/sessions/{}/cart", session_id)))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse cart");
    assert_eq!(cart.item_count, 3);
    assert_eq!(cart.total_amount, dec!(245.50));

    let notifications: Vec<Notification> = client
        .get(test_env.url(&format!("/api/sessions/{}/notifications", session_id)))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse notifications");
    let kinds: Vec<NotificationKind> = notifications.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::MissingSize,
            NotificationKind::AddConfirmed,
            NotificationKind::AddConfirmed,
            NotificationKind::DuplicateEntry,
            NotificationKind::AddConfirmed,
        ]
    );

    let response = client
        .post(test_env.url(&format!("/api/sessions/{}/checkout", session_id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let payload: CheckoutPayload = response.json().await.expect("Failed to parse payload");
    assert_eq!(payload.total_amount, dec!(245.50));
    assert_eq!(payload.cart_items.len(), 3);
    assert!(payload.order_id.starts_with("ORD-"));

    let cart: CartSnapshot = client
        .get(test_env.url(&format!("/api/sessions/{}/cart", session_id)))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse cart");
    assert!(cart.items.is_empty());

    let delivered: Vec<CheckoutPayload> = client
        .get(test_env.url(&format!("/api/sessions/{}/checkouts", session_id)))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse checkouts");
    assert_eq!(delivered, vec![payload]);

    // The session is finished after checkout
    let response = client
        .post(test_env.url(&format!("/api/sessions/{}/checkout", session_id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn test_remove_all_sizes_and_single_variant() {
    let test_env = TestEnvironment::new().await;
    let client = &test_env.client;
    let session_id = test_env.open_session("removal").await;

    for size in ["S", "M", "XL"] {
        assert_eq!(test_env.add_to_cart(&session_id, "svc-3", size).await, 201);
    }
    assert_eq!(test_env.add_to_cart(&session_id, "svc-2", "M").await, 201);

    let response = client
        .delete(test_env.url(&format!(
            "/api/sessions/{}/cart/items/svc-3?size=M",
            session_id
        )))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["removed"], 1);
    assert_eq!(body["cart"]["item_count"], 3);

    let response = client
        .delete(test_env.url(&format!("/api/sessions/{}/cart/items/svc-3", session_id)))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["removed"], 2);

    let cart: CartSnapshot = serde_json::from_value(body["cart"].clone()).expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].size, Size::M);
    assert_eq!(cart.total_amount, dec!(45.50));
}

#[tokio::test]
async fn test_cart_survives_restart() {
    let first = TestEnvironment::new().await;
    let session_id = first.open_session("returning-guest").await;
    assert_eq!(first.add_to_cart(&session_id, "svc-1", "XXL").await, 201);

    let response = first
        .client
        .delete(first.url(&format!("/api/sessions/{}", session_id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 204);

    let second = TestEnvironment::with_storage(first.storage.clone()).await;
    let session_id = second.open_session("returning-guest").await;

    let cart: CartSnapshot = second
        .client
        .get(second.url(&format!("/api/sessions/{}/cart", session_id)))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse cart");
    assert_eq!(cart.item_count, 1);
    assert_eq!(cart.items[0].service.id, "svc-1");
    assert_eq!(cart.items[0].size, Size::XXL);
}

#[tokio::test]
async fn test_checked_out_sessions_leave_the_registry() {
    let test_env = TestEnvironment::with_expiry(SessionExpiry {
        idle_timeout: Duration::from_secs(3600),
        checked_out_retention: Duration::ZERO,
    })
    .await;
    let client = &test_env.client;

    for guest in ["guest-a", "guest-b", "guest-c"] {
        let session_id = test_env.open_session(guest).await;
        assert_eq!(test_env.add_to_cart(&session_id, "svc-2", "S").await, 201);
        let response = client
            .post(test_env.url(&format!("/api/sessions/{}/checkout", session_id)))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status().as_u16(), 200);
    }
    let browsing = test_env.open_session("still-browsing").await;
    assert_eq!(test_env.add_to_cart(&browsing, "svc-1", "M").await, 201);
    assert_eq!(test_env.registry.len().await, 4);

    assert_eq!(test_env.registry.evict_expired().await, 3);
    assert_eq!(test_env.registry.len().await, 1);

    let response = client
        .get(test_env.url("/api/sessions/guest-a"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);
    assert!(!test_env
        .storage
        .keys()
        .await
        .contains(&"@cart:guest-a".to_string()));

    // The same id starts over with an empty cart
    let session_id = test_env.open_session("guest-a").await;
    let cart: CartSnapshot = client
        .get(test_env.url(&format!("/api/sessions/{}/cart", session_id)))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse cart");
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn test_unknown_session_and_bad_payloads() {
    let test_env = TestEnvironment::new().await;
    let client = &test_env.client;

    let response = client
        .get(test_env.url("/api/sessions/nobody"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["error"].is_string());
    assert!(body["timestamp"].is_string());

    let session_id = test_env.open_session("bad-input").await;
    let response = client
        .put(test_env.url(&format!("/api/sessions/{}/detail/size", session_id)))
        .json(&json!({ "size": "M" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(test_env.url("/api/sessions"))
        .json(&json!({ "session_id": "   " }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 400);
}
