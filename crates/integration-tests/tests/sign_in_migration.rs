//! Guest cart replay into an account cart on sign-in.
//!
//! `handle_sign_in` replays the locally snapshotted guest cart into the
//! account cart line by line, consumes the snapshot once anything went
//! through, and then loads the authoritative merged cart from the remote.

use std::time::Duration;

use cartsync_core::{ProductId, SyncStatus};
use cartsync_engine::{RemoteCart, SessionProvider, SnapshotStore, SyncError};
use cartsync_integration_tests::{TestCart, item};

// =============================================================================
// Replay
// =============================================================================

#[tokio::test]
async fn test_guest_cart_replays_into_account_cart() {
    let cart = TestCart::anonymous();
    cart.engine
        .add_to_cart(item("prod-1", 2))
        .await
        .expect("Failed to add prod-1");
    cart.engine
        .add_to_cart(item("prod-2", 1))
        .await
        .expect("Failed to add prod-2");

    cart.session.sign_in("fresh-token");
    let report = cart.engine.handle_sign_in().await.expect("Failed to sign in");

    assert_eq!(report.migrated, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(cart.remote.quantity_of(&ProductId::new("prod-1")), 2);
    assert_eq!(cart.remote.quantity_of(&ProductId::new("prod-2")), 1);
    // The guest snapshot was consumed and the engine shows the account cart
    assert!(cart.store.load().is_none());
    assert_eq!(cart.engine.item_count(), 3);
    assert_eq!(cart.engine.sync_status(), SyncStatus::Idle);
}

#[tokio::test]
async fn test_replay_merges_into_existing_account_lines() {
    let cart = TestCart::anonymous();
    // The account cart already holds two units from another device
    cart.remote
        .add(&ProductId::new("prod-1"), 2)
        .await
        .expect("Failed to seed the account cart");
    cart.engine
        .add_to_cart(item("prod-1", 3))
        .await
        .expect("Failed to add prod-1");

    cart.session.sign_in("fresh-token");
    cart.engine.handle_sign_in().await.expect("Failed to sign in");

    assert_eq!(cart.remote.items().len(), 1);
    assert_eq!(cart.remote.quantity_of(&ProductId::new("prod-1")), 5);
    assert_eq!(cart.engine.item_count(), 5);
}

#[tokio::test]
async fn test_repeated_sign_in_has_nothing_to_replay() {
    let cart = TestCart::anonymous();
    cart.engine
        .add_to_cart(item("prod-1", 2))
        .await
        .expect("Failed to add prod-1");

    cart.session.sign_in("fresh-token");
    cart.engine.handle_sign_in().await.expect("Failed to sign in");
    let adds_after_first = cart.remote.add_calls();

    let report = cart.engine.handle_sign_in().await.expect("Failed to sign in again");

    assert_eq!(report.migrated, 0);
    assert_eq!(report.failed, 0);
    // No second replay happened, only the reload
    assert_eq!(cart.remote.add_calls(), adds_after_first);
    assert_eq!(cart.remote.quantity_of(&ProductId::new("prod-1")), 2);
}

// =============================================================================
// Failure Handling
// =============================================================================

#[tokio::test]
async fn test_lines_that_keep_failing_are_abandoned_not_queued() {
    let cart = TestCart::anonymous();
    cart.engine
        .add_to_cart(item("prod-1", 1))
        .await
        .expect("Failed to add prod-1");
    cart.engine
        .add_to_cart(item("prod-2", 4))
        .await
        .expect("Failed to add prod-2");

    cart.session.sign_in("fresh-token");
    cart.remote.set_failures(1);
    let report = cart.engine.handle_sign_in().await.expect("Failed to sign in");

    assert_eq!(report.migrated, 1);
    assert_eq!(report.failed, 1);
    // The snapshot is still consumed; abandoned lines are not retried later
    assert!(cart.store.load().is_none());
    assert_eq!(cart.remote.quantity_of(&ProductId::new("prod-1")), 0);
    assert_eq!(cart.remote.quantity_of(&ProductId::new("prod-2")), 4);
}

#[tokio::test]
async fn test_failed_account_load_does_not_fail_the_sign_in() {
    let cart = TestCart::anonymous();

    cart.session.sign_in("fresh-token");
    cart.remote.set_failures(u32::MAX);
    let report = cart.engine.handle_sign_in().await.expect("Failed to sign in");

    assert_eq!(report.migrated, 0);
    // The sign-in stands; the UI learns about the load problem via status
    assert_eq!(cart.engine.sync_status(), SyncStatus::Error);
    assert!(cart.engine.last_error().is_some());
    assert!(cart.session.is_active());
}

#[tokio::test]
async fn test_sign_in_rejected_while_mutation_in_flight() {
    let cart = TestCart::signed_in();
    cart.remote.set_latency(Some(Duration::from_millis(50)));

    let engine = cart.engine.clone();
    let push = tokio::spawn(async move { engine.add_to_cart(item("prod-1", 1)).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let result = cart.engine.handle_sign_in().await;
    assert!(matches!(result, Err(SyncError::Busy)));

    push.await.expect("add task panicked").expect("Failed to push the add");
}

#[tokio::test]
async fn test_sign_in_settling_mid_push_keeps_the_busy_gate_closed() {
    let cart = TestCart::signed_in();
    cart.remote.set_latency(Some(Duration::from_millis(50)));

    let engine = cart.engine.clone();
    let sign_in = tokio::spawn(async move { engine.handle_sign_in().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(cart.engine.sync_status(), SyncStatus::Loading);

    // Accepted mid-load; the account load is still on the wire
    let engine = cart.engine.clone();
    let push = tokio::spawn(async move { engine.add_to_cart(item("prod-1", 1)).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(cart.engine.sync_status(), SyncStatus::Mutating);

    sign_in
        .await
        .expect("sign-in task panicked")
        .expect("Failed to sign in");

    // The sign-in settled first; the push still owns the busy slot
    assert!(!push.is_finished());
    assert_eq!(cart.engine.sync_status(), SyncStatus::Mutating);
    let second = cart.engine.add_to_cart(item("prod-2", 1)).await;
    assert!(matches!(second, Err(SyncError::Busy)));

    push.await.expect("add task panicked").expect("Failed to push the add");
    assert_eq!(cart.engine.sync_status(), SyncStatus::Idle);
    assert_eq!(cart.remote.add_calls(), 1);
}
