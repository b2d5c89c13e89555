//! Storage-backed Integration Tests
//!
//! These tests require:
//! - Running PostgreSQL instance with the `users`, `complaints` and `upvotes` tables
//! - Running Redis instance
//! - Environment variables: DATABASE_URL, REDIS_URL, JWT_SECRET
//!
//! Run with: cargo test -p integration-tests --test storage_tests

use integration_tests::{check_test_env, test_config, test_gateway_config, TestGateway};
use like_gateway::create_gateway;

#[tokio::test]
async fn test_gateway_starts_against_real_backends() {
    if !check_test_env() {
        return;
    }

    let mut config = test_config().expect("Failed to load config");
    config.gateway = test_gateway_config();

    let runtime = create_gateway(&config)
        .await
        .expect("Failed to create gateway");
    let gateway = TestGateway::start_with(runtime)
        .await
        .expect("Failed to start server");

    let health = gateway.get_json("/health").await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["instanceId"], config.app.instance_id);

    let stats = gateway.get_json("/stats").await.unwrap();
    assert_eq!(stats["connections"], 0);

    let outcome = gateway.stop().await.unwrap();
    assert_eq!(outcome.mutations, 0);
}

#[tokio::test]
async fn test_invalid_token_rejected_against_real_backends() {
    if !check_test_env() {
        return;
    }

    let mut config = test_config().expect("Failed to load config");
    config.gateway = test_gateway_config();

    let runtime = create_gateway(&config)
        .await
        .expect("Failed to create gateway");
    let gateway = TestGateway::start_with(runtime)
        .await
        .expect("Failed to start server");

    let mut client = gateway.connect().await.unwrap();
    let reply = client.authenticate("not-a-jwt").await.unwrap();
    assert_eq!(reply["type"], "auth_error");
    assert_eq!(reply["payload"]["error"], "Invalid or expired token");

    gateway.stop().await.unwrap();
}
