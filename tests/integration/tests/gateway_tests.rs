//! Gateway Integration Tests
//!
//! Runs a gateway on an ephemeral port against the in-memory backends and
//! drives it over a real WebSocket.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::atomic::Ordering;
use std::time::Duration;

use integration_tests::{eventually, test_gateway_config, Backends, TestGateway};
use like_common::{GatewayConfig, JwtService, TokenType};
use like_core::{AccountStatus, CounterToggle, LikeCounter, LikeUpdateMessage, TargetId, UserId};
use like_gateway::GatewayRuntime;
use serde_json::json;

const QUIET: Duration = Duration::from_millis(300);

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_ping_pong() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();

    let mut client = gateway.connect().await.unwrap();
    client.send("ping", json!({})).await.unwrap();

    let reply = client.recv().await.unwrap();
    assert_eq!(reply["type"], "pong");
    assert!(reply["payload"]["serverTime"].is_i64());
    assert!(reply["timestamp"].is_i64());
}

#[tokio::test]
async fn test_malformed_json_gets_error() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();

    let mut client = gateway.connect().await.unwrap();
    client.send_text("{not json").await.unwrap();

    let reply = client.recv().await.unwrap();
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["error"], "Invalid message format");

    // The connection survives
    client.send("ping", json!({})).await.unwrap();
    assert_eq!(client.recv().await.unwrap()["type"], "pong");
}

#[tokio::test]
async fn test_unknown_type_gets_error() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();

    let mut client = gateway.connect().await.unwrap();
    client.send("dance", json!({})).await.unwrap();

    let reply = client.recv().await.unwrap();
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["error"], "Unknown message type: dance");
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let backends = Backends::new();
    let config = GatewayConfig {
        idle_timeout_secs: 1,
        ..test_gateway_config()
    };
    let gateway = TestGateway::start_with(GatewayRuntime::start(backends.context("gw-1"), config))
        .await
        .unwrap();

    let mut client = gateway.connect().await.unwrap();
    assert!(client.closed_within(Duration::from_secs(5)).await);

    let manager = gateway.state().connection_manager().clone();
    assert!(eventually(Duration::from_secs(2), || manager.connection_count() == 0).await);
}

#[tokio::test]
async fn test_idle_close_lets_in_flight_like_finish() {
    let backends = Backends::new();
    let config = GatewayConfig {
        idle_timeout_secs: 1,
        ..test_gateway_config()
    };
    let gateway = TestGateway::start_with(GatewayRuntime::start(backends.context("gw-1"), config))
        .await
        .unwrap();
    let (user_id, token) = backends.active_user();
    let target = TargetId::random();

    let mut client = gateway.connect_as(&token).await.unwrap();
    // Hydration outlasts the idle timeout
    backends.redis.read_delay_ms.store(2000, Ordering::SeqCst);
    client
        .send("like", json!({ "targetId": target.to_string() }))
        .await
        .unwrap();

    assert!(client.closed_within(Duration::from_secs(5)).await);

    let service = gateway.state().like_service().clone();
    assert!(eventually(Duration::from_secs(3), || service.cache().has_liked(user_id, target)).await);
    let manager = gateway.state().connection_manager().clone();
    assert!(eventually(Duration::from_secs(2), || manager.connection_count() == 0).await);

    gateway.stop().await.unwrap();
    assert!(backends.store.has_row(user_id, target));
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_authenticate_success() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (user_id, token) = backends.active_user();

    let mut client = gateway.connect().await.unwrap();
    let reply = client.authenticate(&token).await.unwrap();

    assert_eq!(reply["type"], "auth_success");
    assert_eq!(reply["payload"]["userId"], user_id.to_string());

    let manager = gateway.state().connection_manager();
    assert_eq!(manager.user_count(), 1);
    assert_eq!(manager.get_user_connections(user_id).len(), 1);
}

#[tokio::test]
async fn test_authenticate_accepts_auth_alias() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token) = backends.active_user();

    let mut client = gateway.connect().await.unwrap();
    client.send("auth", json!({ "token": token })).await.unwrap();

    assert_eq!(client.recv().await.unwrap()["type"], "auth_success");
}

#[tokio::test]
async fn test_authenticate_missing_token() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();

    let mut client = gateway.connect().await.unwrap();
    client.send("authenticate", json!({})).await.unwrap();

    let reply = client.recv().await.unwrap();
    assert_eq!(reply["type"], "auth_error");
    assert_eq!(reply["payload"]["error"], "Token is required");
}

#[tokio::test]
async fn test_authenticate_revoked_token() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token) = backends.active_user();
    backends.redis.blacklist(&token);

    let mut client = gateway.connect().await.unwrap();
    let reply = client.authenticate(&token).await.unwrap();

    assert_eq!(reply["type"], "auth_error");
    assert_eq!(reply["payload"]["error"], "Token has been invalidated");
}

#[tokio::test]
async fn test_authenticate_foreign_signature() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (user_id, _) = backends.active_user();

    let forger = JwtService::new("some-other-secret-that-is-long-enough", 900);
    let token = forger.issue_token(user_id, TokenType::Access).unwrap();

    let mut client = gateway.connect().await.unwrap();
    let reply = client.authenticate(&token).await.unwrap();

    assert_eq!(reply["type"], "auth_error");
    assert_eq!(reply["payload"]["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_authenticate_inactive_or_unknown_account() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();

    let suspended = UserId::random();
    backends.store.add_account(suspended, AccountStatus::Suspended);
    let unknown = UserId::random();

    for user_id in [suspended, unknown] {
        let mut client = gateway.connect().await.unwrap();
        let reply = client.authenticate(&backends.token_for(user_id)).await.unwrap();

        assert_eq!(reply["type"], "auth_error");
        assert_eq!(reply["payload"]["error"], "User not found or inactive");
    }
}

#[tokio::test]
async fn test_authenticate_twice_is_rejected() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token) = backends.active_user();

    let mut client = gateway.connect_as(&token).await.unwrap();
    let reply = client.authenticate(&token).await.unwrap();

    assert_eq!(reply["type"], "auth_error");
    assert_eq!(reply["payload"]["error"], "Already authenticated");
}

#[tokio::test]
async fn test_authenticate_fails_closed_when_blacklist_unreachable() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token) = backends.active_user();
    backends.redis.down.store(true, Ordering::SeqCst);

    let mut client = gateway.connect().await.unwrap();
    let reply = client.authenticate(&token).await.unwrap();

    assert_eq!(reply["type"], "auth_error");
    assert_eq!(reply["payload"]["error"], "Authentication failed");
    assert_eq!(gateway.state().connection_manager().user_count(), 0);
}

// ============================================================================
// Subscription Tests
// ============================================================================

#[tokio::test]
async fn test_subscribe_and_unsubscribe() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();

    let mut client = gateway.connect().await.unwrap();
    client
        .send("subscribe", json!({ "topic": "likes:complaint" }))
        .await
        .unwrap();

    let reply = client.recv().await.unwrap();
    assert_eq!(reply["type"], "subscribed");
    assert_eq!(reply["payload"]["topic"], "likes:complaint");

    let manager = gateway.state().connection_manager();
    assert_eq!(manager.get_topic_connections("likes:complaint").len(), 1);

    client
        .send("unsubscribe", json!({ "topic": "likes:complaint" }))
        .await
        .unwrap();

    let reply = client.recv().await.unwrap();
    assert_eq!(reply["type"], "unsubscribed");
    assert_eq!(reply["payload"]["topic"], "likes:complaint");
    assert!(manager.get_topic_connections("likes:complaint").is_empty());
}

#[tokio::test]
async fn test_subscribe_validates_topic() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();

    let mut client = gateway.connect().await.unwrap();

    client.send("subscribe", json!({ "topic": "" })).await.unwrap();
    let reply = client.recv().await.unwrap();
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["error"], "Topic is required");

    client
        .send("subscribe", json!({ "topic": "t".repeat(129) }))
        .await
        .unwrap();
    let reply = client.recv().await.unwrap();
    assert_eq!(reply["type"], "error");
    assert_eq!(
        reply["payload"]["error"],
        "Topic must be at most 128 characters"
    );
}

// ============================================================================
// Like Tests
// ============================================================================

#[tokio::test]
async fn test_like_toggle_sequence() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token1) = backends.active_user();
    let (_, token2) = backends.active_user();
    let target = TargetId::random().to_string();

    let mut u1 = gateway.connect_as(&token1).await.unwrap();
    let mut u2 = gateway.connect_as(&token2).await.unwrap();

    let reply = u1.like(&target).await.unwrap();
    assert_eq!(reply["type"], "like_update");
    assert_eq!(reply["payload"]["targetId"], target);
    assert_eq!(reply["payload"]["liked"], true);
    assert_eq!(reply["payload"]["count"], 1);

    let reply = u2.like(&target).await.unwrap();
    assert_eq!(reply["payload"]["liked"], true);
    assert_eq!(reply["payload"]["count"], 2);

    let reply = u1.like(&target).await.unwrap();
    assert_eq!(reply["payload"]["liked"], false);
    assert_eq!(reply["payload"]["count"], 1);
}

#[tokio::test]
async fn test_like_requires_authentication() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let target = TargetId::random();

    let mut client = gateway.connect().await.unwrap();
    let reply = client.like(&target.to_string()).await.unwrap();

    assert_eq!(reply["type"], "like_error");
    assert_eq!(reply["payload"]["error"], "Authentication required");

    let stats = gateway.state().like_service().stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(backends.redis.count(target), None);
}

#[tokio::test]
async fn test_like_rejects_bad_target() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token) = backends.active_user();

    let mut client = gateway.connect_as(&token).await.unwrap();

    let reply = client.like("not-a-uuid").await.unwrap();
    assert_eq!(reply["type"], "like_error");
    assert_eq!(reply["payload"]["error"], "Invalid targetId format");

    let reply = client.like("").await.unwrap();
    assert_eq!(reply["type"], "like_error");
    assert_eq!(reply["payload"]["error"], "targetId is required");

    assert_eq!(gateway.state().like_service().stats().pending, 0);
}

#[tokio::test]
async fn test_like_accepts_complaint_id_alias() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token) = backends.active_user();
    let target = TargetId::random().to_string();

    let mut client = gateway.connect_as(&token).await.unwrap();
    client
        .send("like", json!({ "complaintId": target }))
        .await
        .unwrap();

    let reply = client.recv_type("like_update").await.unwrap();
    assert_eq!(reply["payload"]["targetId"], target);
    assert_eq!(reply["payload"]["liked"], true);
}

#[tokio::test]
async fn test_like_broadcasts_to_other_connections() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token1) = backends.active_user();
    let (_, token2) = backends.active_user();
    let target = TargetId::random().to_string();

    let mut sender = gateway.connect_as(&token1).await.unwrap();
    let mut watcher = gateway.connect_as(&token2).await.unwrap();

    let reply = sender.like(&target).await.unwrap();
    assert_eq!(reply["payload"]["count"], 1);

    let broadcast = watcher.recv_type("like_update").await.unwrap();
    assert_eq!(broadcast["payload"]["targetId"], target);
    assert_eq!(broadcast["payload"]["count"], 1);
    assert!(broadcast["payload"].get("liked").is_none());

    // The sender already has its own reply
    assert!(sender.recv_within(QUIET).await.unwrap().is_none());
}

#[tokio::test]
async fn test_late_own_echo_does_not_roll_back_count() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, watcher_token) = backends.active_user();
    let target = TargetId::random();
    let target_str = target.to_string();

    let mut watcher = gateway.connect_as(&watcher_token).await.unwrap();
    for expected in 1..=2 {
        let (_, token) = backends.active_user();
        let mut client = gateway.connect_as(&token).await.unwrap();
        let reply = client.like(&target_str).await.unwrap();
        assert_eq!(reply["payload"]["count"], expected);

        let broadcast = watcher.recv_type("like_update").await.unwrap();
        assert_eq!(broadcast["payload"]["count"], expected);
    }

    // Relayed result of the first toggle, delivered after the second one
    let late = LikeUpdateMessage::new(
        UserId::random(),
        target,
        CounterToggle {
            liked: true,
            new_count: 1,
        },
    )
    .with_origin("gw-1");
    backends.redis.publish_update(&late).await.unwrap();

    assert!(watcher.recv_within(QUIET).await.unwrap().is_none());
    assert_eq!(gateway.state().like_service().cache().get_count(target), 2);

    let (_, token) = backends.active_user();
    let mut third = gateway.connect_as(&token).await.unwrap();
    let reply = third.like(&target_str).await.unwrap();
    assert_eq!(reply["payload"]["count"], 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_of_likes_gets_distinct_counts() {
    const CLIENTS: u64 = 16;

    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let target_id = TargetId::random();
    let target = target_id.to_string();

    let mut clients = Vec::new();
    for _ in 0..CLIENTS {
        let (_, token) = backends.active_user();
        clients.push(gateway.connect_as(&token).await.unwrap());
    }
    for client in &mut clients {
        client.send("like", json!({ "targetId": target })).await.unwrap();
    }

    let mut counts = Vec::new();
    for client in &mut clients {
        let reply = client.like_reply().await.unwrap();
        assert_eq!(reply["payload"]["liked"], true);
        counts.push(reply["payload"]["count"].as_u64().unwrap());
    }
    counts.sort_unstable();
    assert_eq!(counts, (1..=CLIENTS).collect::<Vec<_>>());

    // Echoes of the burst have all been dispatched by now
    let redis = backends.redis.clone();
    assert!(eventually(Duration::from_secs(2), || redis.count(target_id) == Some(CLIENTS)).await);
    tokio::time::sleep(QUIET).await;

    let (_, token) = backends.active_user();
    let mut last = gateway.connect_as(&token).await.unwrap();
    let reply = last.like(&target).await.unwrap();
    assert_eq!(reply["payload"]["count"], CLIENTS + 1);
}

#[tokio::test]
async fn test_like_unlikes_a_like_from_storage() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (user_id, token) = backends.active_user();
    let target = TargetId::random();
    backends.store.seed_like(user_id, target);

    let mut client = gateway.connect_as(&token).await.unwrap();
    let reply = client.like(&target.to_string()).await.unwrap();

    assert_eq!(reply["payload"]["liked"], false);
    assert_eq!(reply["payload"]["count"], 0);

    let outcome = gateway.stop().await.unwrap();
    assert_eq!(outcome.deleted, 1);
    assert!(!backends.store.has_row(user_id, target));
    assert_eq!(backends.store.count(target), 0);
}

#[tokio::test]
async fn test_like_survives_redis_outage() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (user_id, token) = backends.active_user();
    let target = TargetId::random();

    let mut client = gateway.connect_as(&token).await.unwrap();
    backends.redis.down.store(true, Ordering::SeqCst);

    let reply = client.like(&target.to_string()).await.unwrap();
    assert_eq!(reply["type"], "like_update");
    assert_eq!(reply["payload"]["liked"], true);
    assert_eq!(reply["payload"]["count"], 1);

    let service = gateway.state().like_service().clone();
    assert!(eventually(Duration::from_secs(2), || service.is_counter_degraded()).await);

    let health = gateway.get_json("/health").await.unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["counterDegraded"], true);
    assert_eq!(health["storeDegraded"], false);

    // Persistence does not depend on Redis
    gateway.stop().await.unwrap();
    assert!(backends.store.has_row(user_id, target));
    assert_eq!(backends.store.count(target), 1);
}

#[tokio::test]
async fn test_disconnect_cleans_up() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (user_id, token) = backends.active_user();

    let client = gateway.connect_as(&token).await.unwrap();
    client.close().await.unwrap();

    let manager = gateway.state().connection_manager().clone();
    assert!(
        eventually(Duration::from_secs(2), || {
            manager.connection_count() == 0 && manager.get_user_connections(user_id).is_empty()
        })
        .await
    );
    assert_eq!(manager.topic_count(), 0);
}

// ============================================================================
// HTTP Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-health").await.unwrap();
    let _client = gateway.connect().await.unwrap();

    for path in ["/health", "/ws/health"] {
        let health = gateway.get_json(path).await.unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["type"], "websocket");
        assert_eq!(health["instanceId"], "gw-health");
        assert_eq!(health["connections"], 1);
        assert!(health["timestamp"].is_string());
    }
}

#[tokio::test]
async fn test_stats_endpoint() {
    let backends = Backends::new();
    let gateway = TestGateway::start(&backends, "gw-1").await.unwrap();
    let (_, token) = backends.active_user();
    let target = TargetId::random().to_string();

    let mut client = gateway.connect_as(&token).await.unwrap();
    client.like(&target).await.unwrap();

    for path in ["/stats", "/ws/stats"] {
        let stats = gateway.get_json(path).await.unwrap();
        assert_eq!(stats["users"], 1);
        assert_eq!(stats["targets"], 1);
        assert_eq!(stats["pending"], 1);
        assert_eq!(stats["likesTracked"], 1);
        assert_eq!(stats["connections"], 1);
        assert_eq!(stats["authenticatedUsers"], 1);
        assert_eq!(stats["topics"], 1);
    }
}
