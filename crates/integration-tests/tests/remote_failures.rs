//! Retry, stale-snapshot fallback, and unauthorized-session handling.
//!
//! The engine never strands a usable cart behind a broken remote: loads
//! fall back to the last local snapshot, rejected tokens demote the session
//! to anonymous instead of erroring, and transient failures are retried
//! with exponential backoff before anything is reported.

use std::time::Duration;

use cartsync_core::{CartSnapshot, SnapshotOrigin, SyncStatus};
use cartsync_engine::{
    RemoteCart, RetryPolicy, SessionHandle, SessionProvider, SnapshotStore, SyncError,
};
use cartsync_integration_tests::{TestCart, item};

// =============================================================================
// Load Fallback
// =============================================================================

#[tokio::test]
async fn test_initialize_falls_back_to_stale_snapshot() {
    let cart = TestCart::signed_in();
    cart.store
        .save(&CartSnapshot::now(
            vec![item("prod-7", 3)],
            vec![],
            SnapshotOrigin::Normal,
        ))
        .expect("Failed to seed the store");
    cart.remote.set_failures(u32::MAX);

    let result = cart.engine.initialize().await;

    assert!(matches!(result, Err(SyncError::RemoteUnavailable(_))));
    // Stale contents are shown, with the error surfaced alongside them
    assert_eq!(cart.engine.item_count(), 3);
    assert_eq!(cart.engine.sync_status(), SyncStatus::Error);
    assert!(cart.engine.last_error().is_some());
}

#[tokio::test]
async fn test_initialize_with_rejected_token_goes_anonymous() {
    let cart = TestCart::signed_in();
    cart.store
        .save(&CartSnapshot::now(
            vec![item("prod-1", 2)],
            vec![],
            SnapshotOrigin::Normal,
        ))
        .expect("Failed to seed the store");
    cart.remote.set_unauthorized(true);

    cart.engine.initialize().await.expect("Failed to initialize");

    assert!(!cart.session.is_active());
    assert_eq!(cart.engine.item_count(), 2);
    assert_eq!(cart.engine.sync_status(), SyncStatus::Idle);
}

#[tokio::test]
async fn test_load_retries_until_success() {
    let retry = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
    };
    let cart = TestCart::build(SessionHandle::signed_in("test-token"), retry, false);
    cart.remote
        .add(&"prod-1".into(), 2)
        .await
        .expect("Failed to seed the account cart");
    cart.remote.set_failures(2);

    cart.engine.initialize().await.expect("Failed to initialize");

    assert_eq!(cart.remote.load_calls(), 3);
    assert_eq!(cart.engine.item_count(), 2);
    assert_eq!(cart.engine.sync_status(), SyncStatus::Idle);
}

// =============================================================================
// Unauthorized Mutations
// =============================================================================

#[tokio::test]
async fn test_unauthorized_mutation_keeps_cart_and_continues_anonymously() {
    let cart = TestCart::signed_in();
    cart.engine
        .add_to_cart(item("prod-1", 1))
        .await
        .expect("Failed to add prod-1");

    cart.remote.set_unauthorized(true);
    cart.engine
        .add_to_cart(item("prod-2", 1))
        .await
        .expect("add should fall back to local persistence");

    // The session is demoted and the cart lands in the local store instead
    assert!(!cart.session.is_active());
    assert_eq!(cart.engine.sync_status(), SyncStatus::Idle);
    let snapshot = cart.store.load().expect("snapshot missing after fallback");
    assert_eq!(snapshot.items.len(), 2);

    // Follow-up mutations stay local; no further remote calls are attempted
    cart.engine
        .add_to_cart(item("prod-3", 1))
        .await
        .expect("Failed to add prod-3");
    assert_eq!(cart.remote.add_calls(), 2);
    assert_eq!(cart.engine.item_count(), 3);
}

// =============================================================================
// Clear Under Outage
// =============================================================================

#[tokio::test]
async fn test_clear_while_remote_down_then_recovery() {
    let cart = TestCart::signed_in();
    cart.engine
        .add_to_cart(item("prod-1", 1))
        .await
        .expect("Failed to add prod-1");
    cart.engine
        .add_to_cart(item("prod-2", 1))
        .await
        .expect("Failed to add prod-2");

    cart.remote.set_failures(u32::MAX);
    cart.engine.clear_cart().await.expect("clear should succeed despite the outage");

    // Locally the cart is gone; the remote delete just got logged
    assert!(cart.engine.state().is_empty());
    assert_eq!(cart.engine.sync_status(), SyncStatus::Idle);
    assert!(cart.store.load().is_none());

    // Once the remote recovers, its copy of the cart wins the next load
    cart.remote.set_failures(0);
    cart.engine.initialize().await.expect("Failed to initialize after recovery");
    assert_eq!(cart.engine.item_count(), 2);
}
