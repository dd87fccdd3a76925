// Integration tests for the Boxoffice API
// Run with: cargo test --test integration_test -- --ignored
// Requires a running server (DATABASE_URL set, `cargo run -p boxoffice-api`).

use serde_json::{json, Value};
use uuid::Uuid;

const API_BASE_URL: &str = "http://localhost:9000";

fn unique_key(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::now_v7())
}

#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_full_booking_workflow() {
    let client = reqwest::Client::new();

    println!("🧪 Testing full booking workflow...");

    // Step 1: Create an event
    println!("\n📝 Step 1: Creating event...");
    let create_response = client
        .post(format!("{}/v1/events", API_BASE_URL))
        .json(&json!({
            "name": "Integration Night",
            "description": "End to end run",
            "eventDate": "2026-12-31T20:00:00Z",
            "totalSeats": 100
        }))
        .send()
        .await
        .expect("Failed to create event");

    assert_eq!(
        create_response.status(),
        201,
        "Expected 201 Created, got {}",
        create_response.status()
    );

    let event: Value = create_response
        .json()
        .await
        .expect("Failed to parse event response");
    let event_id = event["id"].as_str().expect("event id").to_string();
    println!("✅ Created event: {}", event_id);
    assert_eq!(event["availableSeats"], 100);

    // Step 2: List events
    println!("\n📋 Step 2: Listing events...");
    let list_response = client
        .get(format!("{}/v1/events", API_BASE_URL))
        .send()
        .await
        .expect("Failed to list events");

    assert_eq!(list_response.status(), 200);
    let listed: Value = list_response.json().await.expect("Failed to parse list");
    assert!(!listed["data"].as_array().expect("data array").is_empty());
    println!("✅ Found {} event(s)", listed["data"].as_array().unwrap().len());

    // Step 3: Lock seats through the nested endpoint
    println!("\n🔒 Step 3: Locking seats...");
    let lock_key = unique_key("lock");
    let lock_body = json!({
        "seats": 4,
        "idempotencyKey": lock_key,
    });
    let lock_response = client
        .post(format!("{}/v1/events/{}/lock", API_BASE_URL, event_id))
        .json(&lock_body)
        .send()
        .await
        .expect("Failed to lock seats");

    assert_eq!(lock_response.status(), 201);
    let grant: Value = lock_response.json().await.expect("Failed to parse grant");
    let lock_id = grant["lockId"].as_str().expect("lock id").to_string();
    println!("✅ Locked seats, lock: {}", lock_id);

    // Step 4: Replay the same request, must return the same lock with 200
    println!("\n🔁 Step 4: Replaying lock request...");
    let replay_response = client
        .post(format!("{}/v1/events/{}/lock", API_BASE_URL, event_id))
        .json(&lock_body)
        .send()
        .await
        .expect("Failed to replay lock");

    assert_eq!(replay_response.status(), 200);
    let replay: Value = replay_response.json().await.expect("Failed to parse replay");
    assert_eq!(replay["lockId"].as_str().unwrap(), lock_id);
    println!("✅ Replay returned the same lock");

    let event_after_lock: Value = client
        .get(format!("{}/v1/events/{}", API_BASE_URL, event_id))
        .send()
        .await
        .expect("Failed to get event")
        .json()
        .await
        .expect("Failed to parse event");
    assert_eq!(event_after_lock["availableSeats"], 96);

    // Step 5: Confirm the booking
    println!("\n📒 Step 5: Confirming booking...");
    let confirm_response = client
        .post(format!("{}/v1/bookings/confirm", API_BASE_URL))
        .json(&json!({ "lockId": lock_id }))
        .send()
        .await
        .expect("Failed to confirm booking");

    assert_eq!(confirm_response.status(), 201);
    let booking: Value = confirm_response
        .json()
        .await
        .expect("Failed to parse booking");
    let booking_id = booking["id"].as_str().expect("booking id").to_string();
    assert_eq!(booking["status"], "PAYMENT_PENDING");
    println!("✅ Booking {} is payment pending", booking_id);

    // Step 6: Force a successful payment
    println!("\n💳 Step 6: Paying...");
    let payment_response = client
        .post(format!("{}/v1/payments/intent", API_BASE_URL))
        .json(&json!({ "bookingId": booking_id, "force": "success" }))
        .send()
        .await
        .expect("Failed to apply payment");

    assert_eq!(payment_response.status(), 200);
    let payment: Value = payment_response
        .json()
        .await
        .expect("Failed to parse payment");
    assert_eq!(payment["paymentStatus"], "SUCCESS");
    assert_eq!(payment["booking"]["status"], "CONFIRMED");
    println!("✅ Booking confirmed");

    // Step 7: A second outcome on the settled booking is rejected
    println!("\n🚫 Step 7: Re-paying the settled booking...");
    let repay_response = client
        .post(format!("{}/v1/payments/intent", API_BASE_URL))
        .json(&json!({ "bookingId": booking_id, "force": "failure" }))
        .send()
        .await
        .expect("Failed to send second payment");
    assert_eq!(repay_response.status(), 400);
    println!("✅ Second payment rejected");

    // Confirmed seats stay deducted
    let event_after_payment: Value = client
        .get(format!("{}/v1/events/{}", API_BASE_URL, event_id))
        .send()
        .await
        .expect("Failed to get event")
        .json()
        .await
        .expect("Failed to parse event");
    assert_eq!(event_after_payment["availableSeats"], 96);

    println!("\n🎉 Full booking workflow test passed!");
}

#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_failed_payment_restores_seats() {
    let client = reqwest::Client::new();

    let event: Value = client
        .post(format!("{}/v1/events", API_BASE_URL))
        .json(&json!({
            "name": "Refund Night",
            "eventDate": "2026-12-31T20:00:00Z",
            "totalSeats": 10
        }))
        .send()
        .await
        .expect("Failed to create event")
        .json()
        .await
        .expect("Failed to parse event");
    let event_id = event["id"].as_str().expect("event id").to_string();

    let lock: Value = client
        .post(format!("{}/v1/locks", API_BASE_URL))
        .json(&json!({
            "eventId": event_id,
            "userId": Uuid::now_v7(),
            "seats": 3,
            "idempotencyKey": unique_key("refund"),
        }))
        .send()
        .await
        .expect("Failed to lock seats")
        .json()
        .await
        .expect("Failed to parse lock");
    let lock_id = lock["id"].as_str().expect("lock id").to_string();

    let booking: Value = client
        .post(format!("{}/v1/bookings/{}/confirm", API_BASE_URL, lock_id))
        .send()
        .await
        .expect("Failed to confirm booking")
        .json()
        .await
        .expect("Failed to parse booking");
    let booking_id = booking["id"].as_str().expect("booking id").to_string();

    let payment: Value = client
        .post(format!("{}/v1/payments/intent", API_BASE_URL))
        .json(&json!({ "bookingId": booking_id, "force": "failure" }))
        .send()
        .await
        .expect("Failed to apply payment")
        .json()
        .await
        .expect("Failed to parse payment");
    assert_eq!(payment["paymentStatus"], "FAILED");
    assert_eq!(payment["booking"]["status"], "FAILED");

    let event_after: Value = client
        .get(format!("{}/v1/events/{}", API_BASE_URL, event_id))
        .send()
        .await
        .expect("Failed to get event")
        .json()
        .await
        .expect("Failed to parse event");
    assert_eq!(event_after["availableSeats"], 10);
}

#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_oversell_is_rejected() {
    let client = reqwest::Client::new();

    let event: Value = client
        .post(format!("{}/v1/events", API_BASE_URL))
        .json(&json!({
            "name": "Tiny Venue",
            "eventDate": "2026-12-31T20:00:00Z",
            "totalSeats": 5
        }))
        .send()
        .await
        .expect("Failed to create event")
        .json()
        .await
        .expect("Failed to parse event");
    let event_id = event["id"].as_str().expect("event id").to_string();

    let first = client
        .post(format!("{}/v1/events/{}/lock", API_BASE_URL, event_id))
        .json(&json!({ "seats": 4, "idempotencyKey": unique_key("a") }))
        .send()
        .await
        .expect("Failed to lock seats");
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/v1/events/{}/lock", API_BASE_URL, event_id))
        .json(&json!({ "seats": 4, "idempotencyKey": unique_key("b") }))
        .send()
        .await
        .expect("Failed to lock seats");
    assert_eq!(second.status(), 409);
}
