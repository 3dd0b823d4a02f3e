//! Integration tests for the cart synchronization engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartsync-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_mutations` - optimistic updates and the single-flight busy gate
//! - `anonymous_persistence` - snapshot round-trips across restarts
//! - `sign_in_migration` - guest cart replay into an account cart
//! - `sign_out_flow` - post-signout snapshots and the full session cycle
//! - `remote_failures` - retry, fallback, and unauthorized handling
//! - `engine_http` - the full stack against a stub HTTP cart service
//!
//! The harness below wires a [`CartSyncEngine`] to in-memory collaborators
//! with failure injection; the `engine_http` tests swap those for the real
//! HTTP client against a local stub server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use cartsync_core::{CartItem, ItemId};
use cartsync_engine::{
    CartSyncEngine, MemorySnapshotStore, MockCartService, RetryPolicy, SessionHandle,
};
use rust_decimal::Decimal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// A [`CartSyncEngine`] wired to inspectable in-memory collaborators.
pub struct TestCart {
    /// Engine under test.
    pub engine: CartSyncEngine,
    /// The injected remote, for failure switches and call counters.
    pub remote: Arc<MockCartService>,
    /// The injected snapshot store, for direct snapshot inspection.
    pub store: Arc<MemorySnapshotStore>,
    /// The injected session; flipping it simulates sign-in and sign-out.
    pub session: SessionHandle,
}

impl TestCart {
    /// An engine with no signed-in user and no retries.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::build(SessionHandle::anonymous(), RetryPolicy::none(), false)
    }

    /// An engine with an active session and no retries.
    #[must_use]
    pub fn signed_in() -> Self {
        Self::build(SessionHandle::signed_in("test-token"), RetryPolicy::none(), false)
    }

    /// Full control over session, retry policy, and the rollback flag.
    #[must_use]
    pub fn build(session: SessionHandle, retry: RetryPolicy, rollback: bool) -> Self {
        init_logging();
        let remote = Arc::new(MockCartService::new());
        let store = Arc::new(MemorySnapshotStore::new());
        let engine = CartSyncEngine::new(
            remote.clone(),
            store.clone(),
            Arc::new(session.clone()),
            retry,
            rollback,
        );
        Self {
            engine,
            remote,
            store,
            session,
        }
    }

    /// A fresh engine over the same store and remote, simulating a process
    /// restart with the given session.
    #[must_use]
    pub fn restarted_engine(&self, session: SessionHandle) -> CartSyncEngine {
        CartSyncEngine::new(
            self.remote.clone(),
            self.store.clone(),
            Arc::new(session),
            RetryPolicy::none(),
            false,
        )
    }
}

/// An in-stock test item priced at 10.00 per unit.
///
/// The line id is `line-{product}`, matching the ids [`MockCartService`]
/// assigns, so local and server-side lines line up in assertions.
#[must_use]
pub fn item(product: &str, quantity: u32) -> CartItem {
    CartItem::new(
        format!("line-{product}"),
        product,
        product,
        Decimal::new(1000, 2),
        quantity,
    )
}

/// The line id [`item`] and [`MockCartService`] assign for a product.
#[must_use]
pub fn line_id(product: &str) -> ItemId {
    ItemId::new(format!("line-{product}"))
}

/// Route engine logs through the test writer. Idempotent.
pub fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartsync_engine=debug".into());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
