//! Gateway integration tests
//!
//! Every test runs the full router over in-memory collaborators; no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::TestServer;
use relay_common::HubConfig;
use relay_core::{Notification, NotificationKind, Snowflake};
use relay_gateway::protocol::{CloseCode, DispatchEvent, OpCode};
use serde_json::json;

const ROOM: i64 = 7;
const ALICE: i64 = 1;
const BOB: i64 = 2;
const MALLORY: i64 = 3;

fn fast_liveness() -> HubConfig {
    HubConfig {
        heartbeat_interval: Duration::from_millis(100),
        pong_timeout: Duration::from_millis(500),
        ..HubConfig::default()
    }
}

async fn room_server(hub: HubConfig) -> TestServer {
    let server = TestServer::start_with_hub(hub)
        .await
        .expect("Failed to start server");
    server.rooms.add_participants(
        Snowflake::new(ROOM),
        [Snowflake::new(ALICE), Snowflake::new(BOB)],
    );
    server
}

// ============================================================================
// Room delivery
// ============================================================================

#[tokio::test]
async fn test_room_broadcast_and_dead_peer_removal() {
    let server = room_server(fast_liveness()).await;

    let mut alice = server.connect_room(ROOM, ALICE).await.unwrap();
    let hello = alice.next_message().await.unwrap();
    assert_eq!(hello.op, OpCode::Hello);
    assert_eq!(hello.d.as_ref().unwrap()["heartbeat_interval"], 100);

    let mut bob = server.connect_room_raw(ROOM, BOB).await.unwrap();
    assert_eq!(bob.next_message().await.unwrap().op, OpCode::Hello);
    server
        .wait_for_connections(2, Duration::from_secs(5))
        .await
        .unwrap();

    alice
        .send_json(&json!({ "op": 2, "d": { "content": "hello", "nonce": "n-1" } }))
        .unwrap();

    let to_alice = alice.next_message().await.unwrap();
    assert_eq!(to_alice.event(), Some(DispatchEvent::MessageCreate));
    assert_eq!(to_alice.d.as_ref().unwrap()["content"], "hello");
    assert_eq!(to_alice.s, Some(1));

    let to_bob = bob.next_message().await.unwrap();
    assert_eq!(to_bob.event(), Some(DispatchEvent::MessageCreate));
    assert_eq!(to_bob.d, to_alice.d);

    let stored = server.chats.room_history(Snowflake::new(ROOM));
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sender_id, Snowflake::new(ALICE));

    // Bob stops reading and never answers another ping
    server
        .wait_for_connections(1, Duration::from_secs(5))
        .await
        .unwrap();

    alice
        .send_json(&json!({ "op": 2, "d": { "content": "anyone there?" } }))
        .unwrap();
    let again = alice.next_message().await.unwrap();
    assert_eq!(again.d.as_ref().unwrap()["content"], "anyone there?");
    assert_eq!(again.s, Some(2));

    assert_eq!(
        bob.next_close().await.unwrap(),
        Some(CloseCode::HeartbeatTimeout.as_u16())
    );

    let stats = server.health().await.unwrap();
    assert_eq!(stats["rooms"], 1);
    assert_eq!(stats["room_connections"], 1);
}

#[tokio::test]
async fn test_rooms_do_not_leak() {
    let server = room_server(HubConfig::default()).await;
    server
        .rooms
        .add_participants(Snowflake::new(8), [Snowflake::new(BOB)]);

    let mut alice = server.connect_room(ROOM, ALICE).await.unwrap();
    let mut bob = server.connect_room(8, BOB).await.unwrap();
    alice.next_message().await.unwrap();
    bob.next_message().await.unwrap();

    alice
        .send_json(&json!({ "op": 2, "d": { "content": "room seven only" } }))
        .unwrap();
    alice.next_message().await.unwrap();

    bob.send_json(&json!({ "op": 2, "d": { "content": "room eight only" } }))
        .unwrap();
    let first_for_bob = bob.next_message().await.unwrap();
    assert_eq!(first_for_bob.d.as_ref().unwrap()["content"], "room eight only");
}

#[tokio::test]
async fn test_heartbeat_is_acked() {
    let server = room_server(HubConfig::default()).await;
    let mut alice = server.connect_room(ROOM, ALICE).await.unwrap();
    alice.next_message().await.unwrap();

    alice.send_json(&json!({ "op": 1 })).unwrap();
    assert_eq!(alice.next_message().await.unwrap().op, OpCode::HeartbeatAck);
}

#[tokio::test]
async fn test_empty_message_is_rejected_with_nonce() {
    let server = room_server(HubConfig::default()).await;
    let mut alice = server.connect_room(ROOM, ALICE).await.unwrap();
    alice.next_message().await.unwrap();

    alice
        .send_json(&json!({ "op": 2, "d": { "content": "   ", "nonce": "n-9" } }))
        .unwrap();

    let rejected = alice.next_message().await.unwrap();
    assert_eq!(rejected.op, OpCode::MessageRejected);
    let d = rejected.d.unwrap();
    assert_eq!(d["nonce"], "n-9");
    assert_eq!(d["code"], "EMPTY_CONTENT");
    assert!(server.chats.is_empty());
}

#[tokio::test]
async fn test_malformed_frame_closes_with_decode_error() {
    let server = room_server(HubConfig::default()).await;
    let mut alice = server.connect_room(ROOM, ALICE).await.unwrap();
    alice.next_message().await.unwrap();

    alice.send_json(&json!("not a gateway message")).unwrap();
    assert_eq!(
        alice.next_close().await.unwrap(),
        Some(CloseCode::DecodeError.as_u16())
    );
    server
        .wait_for_connections(0, Duration::from_secs(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_full_room_refuses_with_close_code() {
    let server = room_server(HubConfig {
        max_room_size: 1,
        ..HubConfig::default()
    })
    .await;

    let mut alice = server.connect_room(ROOM, ALICE).await.unwrap();
    alice.next_message().await.unwrap();

    let mut bob = server.connect_room(ROOM, BOB).await.unwrap();
    assert_eq!(
        bob.next_close().await.unwrap(),
        Some(CloseCode::RoomFull.as_u16())
    );
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let server = room_server(HubConfig::default()).await;
    let status = server
        .refused_status(&server.ws_url("/ws/rooms/7"))
        .await
        .unwrap();
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let server = room_server(HubConfig::default()).await;
    let status = server
        .refused_status(&server.ws_url("/ws/notifications?token=not-a-jwt"))
        .await
        .unwrap();
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_non_member_is_forbidden() {
    let server = room_server(HubConfig::default()).await;
    let status = server
        .refused_status(&server.room_url(ROOM, MALLORY))
        .await
        .unwrap();
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_invalid_room_id_is_bad_request() {
    let server = room_server(HubConfig::default()).await;
    let url = server.ws_url(&format!(
        "/ws/rooms/seven?token={}",
        integration_tests::token_for(ALICE)
    ));
    assert_eq!(server.refused_status(&url).await.unwrap(), 400);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_notification_push() {
    let server = room_server(HubConfig::default()).await;
    let mut alice = server.connect_notifications(ALICE).await.unwrap();
    assert_eq!(alice.next_message().await.unwrap().op, OpCode::Hello);
    server
        .wait_for_connections(1, Duration::from_secs(5))
        .await
        .unwrap();

    let notification = Notification::new(
        Snowflake::new(500),
        Snowflake::new(ALICE),
        NotificationKind::System,
        json!({ "title": "maintenance at noon" }),
    );
    let report = server.state.hub().notify_user(&notification).await.unwrap();
    assert_eq!(report.delivered, 1);

    let pushed = alice.next_message().await.unwrap();
    assert_eq!(pushed.event(), Some(DispatchEvent::NotificationCreate));
    assert_eq!(pushed.d.unwrap()["data"]["title"], "maintenance at noon");
    assert_eq!(
        server.notifications.deliverable_for(Snowflake::new(ALICE)).len(),
        1
    );
}

#[tokio::test]
async fn test_notification_for_offline_user_is_stored() {
    let server = room_server(HubConfig::default()).await;

    let notification = Notification::new(
        Snowflake::new(501),
        Snowflake::new(BOB),
        NotificationKind::Billing,
        json!({}),
    );
    let report = server.state.hub().notify_user(&notification).await.unwrap();
    assert_eq!(report.recipients(), 0);
    assert_eq!(
        server.notifications.deliverable_for(Snowflake::new(BOB)).len(),
        1
    );
}

// ============================================================================
// Health and shutdown
// ============================================================================

#[tokio::test]
async fn test_health_reports_empty_hub() {
    let server = room_server(HubConfig::default()).await;
    let stats = server.health().await.unwrap();
    assert_eq!(stats["connections"], 0);
    assert_eq!(stats["rooms"], 0);
    assert_eq!(stats["users"], 0);
}

#[tokio::test]
async fn test_hub_shutdown_closes_connections() {
    let server = room_server(HubConfig::default()).await;
    let mut alice = server.connect_room(ROOM, ALICE).await.unwrap();
    let mut inbox = server.connect_notifications(BOB).await.unwrap();
    alice.next_message().await.unwrap();
    inbox.next_message().await.unwrap();
    server
        .wait_for_connections(2, Duration::from_secs(5))
        .await
        .unwrap();

    let closed = server.state.hub().shutdown().await.unwrap();
    assert_eq!(closed, 2);

    let code = Some(CloseCode::ServerShutdown.as_u16());
    assert_eq!(alice.next_close().await.unwrap(), code);
    assert_eq!(inbox.next_close().await.unwrap(), code);
}
