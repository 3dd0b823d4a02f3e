//! Anonymous carts persist locally and survive restarts.
//!
//! Without a session every mutation lands in the snapshot store instead of
//! the remote. Restored snapshots are sanitized: zero-quantity lines are
//! dropped, duplicate line ids collapse keeping the freshest entry, and
//! selection is filtered down to lines that still exist.

use cartsync_core::{CartItem, CartSnapshot, SnapshotOrigin, SyncStatus};
use cartsync_engine::{SessionHandle, SnapshotStore, StoreError, SyncError};
use cartsync_integration_tests::{TestCart, item, line_id};
use rust_decimal::Decimal;

// =============================================================================
// Snapshot Round-Trips
// =============================================================================

#[tokio::test]
async fn test_cart_and_selection_survive_a_restart() {
    let cart = TestCart::anonymous();
    cart.engine
        .add_to_cart(item("prod-1", 2))
        .await
        .expect("Failed to add prod-1");
    cart.engine
        .add_to_cart(item("prod-2", 1))
        .await
        .expect("Failed to add prod-2");
    assert!(cart.engine.toggle_select(&line_id("prod-1")));

    let restarted = cart.restarted_engine(SessionHandle::anonymous());
    restarted.initialize().await.expect("Failed to initialize after restart");

    assert_eq!(restarted.item_count(), 3);
    assert!(restarted.state().is_selected(&line_id("prod-1")));
    assert!(!restarted.state().is_selected(&line_id("prod-2")));
    assert_eq!(restarted.sync_status(), SyncStatus::Idle);
    // Nothing ever reached the remote
    assert_eq!(cart.remote.add_calls(), 0);
}

#[tokio::test]
async fn test_emptied_cart_leaves_no_snapshot_behind() {
    let cart = TestCart::anonymous();
    cart.engine
        .add_to_cart(item("prod-1", 1))
        .await
        .expect("Failed to add prod-1");
    assert!(cart.store.load().is_some());

    cart.engine
        .remove_from_cart(&line_id("prod-1"))
        .await
        .expect("Failed to remove the line");
    assert!(cart.store.load().is_none());

    let restarted = cart.restarted_engine(SessionHandle::anonymous());
    restarted.initialize().await.expect("Failed to initialize after restart");
    assert!(restarted.state().is_empty());
}

// =============================================================================
// Restore Sanitization
// =============================================================================

#[tokio::test]
async fn test_restore_drops_stale_selection_ids() {
    let cart = TestCart::anonymous();
    let snapshot = CartSnapshot::now(
        vec![item("prod-1", 1)],
        vec![line_id("prod-1"), line_id("ghost")],
        SnapshotOrigin::Normal,
    );
    cart.store.save(&snapshot).expect("Failed to seed the store");

    cart.engine.initialize().await.expect("Failed to initialize");

    let state = cart.engine.state();
    assert!(state.is_selected(&line_id("prod-1")));
    assert!(!state.is_selected(&line_id("ghost")));
    assert_eq!(cart.engine.selected_count(), 1);
}

#[tokio::test]
async fn test_restore_drops_zero_quantity_lines() {
    let cart = TestCart::anonymous();
    let snapshot = CartSnapshot::now(
        vec![item("prod-1", 0), item("prod-2", 2)],
        vec![],
        SnapshotOrigin::Normal,
    );
    cart.store.save(&snapshot).expect("Failed to seed the store");

    cart.engine.initialize().await.expect("Failed to initialize");

    let state = cart.engine.state();
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items().first().expect("cart has no lines").quantity, 2);
}

#[tokio::test]
async fn test_restore_collapses_duplicate_line_ids_keeping_freshest() {
    let cart = TestCart::anonymous();
    let stale = CartItem::new("line-x", "prod-1", "Stale", Decimal::new(1000, 2), 1);
    let fresh = CartItem::new("line-x", "prod-1", "Fresh", Decimal::new(1000, 2), 7);
    let snapshot = CartSnapshot::now(vec![stale, fresh], vec![], SnapshotOrigin::Normal);
    cart.store.save(&snapshot).expect("Failed to seed the store");

    cart.engine.initialize().await.expect("Failed to initialize");

    let state = cart.engine.state();
    assert_eq!(state.items().len(), 1);
    let line = state.items().first().expect("cart has no lines");
    assert_eq!(line.name, "Fresh");
    assert_eq!(line.quantity, 7);
}

// =============================================================================
// Storage Failures
// =============================================================================

struct FailingStore;

impl SnapshotStore for FailingStore {
    fn save(&self, _snapshot: &CartSnapshot) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    fn load(&self) -> Option<CartSnapshot> {
        None
    }

    fn clear(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_snapshot_write_keeps_memory_and_reports_storage_error() {
    use std::sync::Arc;

    use cartsync_engine::{CartSyncEngine, MockCartService, RetryPolicy};

    let engine = CartSyncEngine::new(
        Arc::new(MockCartService::new()),
        Arc::new(FailingStore),
        Arc::new(SessionHandle::anonymous()),
        RetryPolicy::none(),
        false,
    );

    let err = engine
        .add_to_cart(item("prod-1", 2))
        .await
        .expect_err("add should fail when the snapshot write fails");

    assert!(matches!(err, SyncError::Storage(_)));
    // The in-memory change stays even though it could not be persisted
    assert_eq!(engine.item_count(), 2);
    assert_eq!(engine.sync_status(), SyncStatus::Error);
    assert!(engine.last_error().is_some());
}
