//! Sync orchestrator.
//!
//! [`CartSyncEngine`] is the entry point for every cart operation. It owns
//! the [`CartState`], pushes mutations to the remote for signed-in users,
//! persists snapshots for anonymous ones, and keeps `sync_status` and
//! `last_error` in step so a UI can render the whole picture from
//! [`CartSyncEngine::state`].
//!
//! # Mutation protocol
//!
//! Every mutating call walks the same path:
//!
//! 1. Under one lock acquisition: reject with [`SyncError::Busy`] if a
//!    mutation is already in flight, otherwise flip `sync_status` to
//!    `Mutating`, clear `last_error`, and apply the transition locally.
//!    The caller's UI can re-render immediately.
//! 2. Signed in: push the matching remote operation through the retry
//!    policy. Anonymous: write the snapshot instead.
//! 3. Settle: success returns the status to `Idle`. A terminal push failure
//!    sets `Error` and `last_error` but keeps the optimistic local change
//!    (unless rollback is configured). An unauthorized push invalidates the
//!    session and falls through to the anonymous path with a warning.
//!
//! The busy gate makes mutations single-flight for the whole cart: a second
//! call while one is in flight is rejected, not queued. Callers are expected
//! to disable the triggering control while `sync_status` is `Mutating`.
//! Loads do not hold the gate: a mutation accepted while `initialize` or
//! `handle_sign_in` is in flight owns `sync_status` from then on, and the
//! load settles only while its `Loading` claim is still intact.
//!
//! The state mutex is only ever held for synchronous transitions, never
//! across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cartsync_core::{CartItem, CartState, ItemId, SnapshotOrigin, SyncStatus};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::migrate::{MigrationReport, Migrator};
use crate::remote::{CartPayload, HttpCartClient, RemoteCart, RemoteCartError};
use crate::retry::RetryPolicy;
use crate::session::SessionProvider;
use crate::store::{FileSnapshotStore, SnapshotStore, StoreError};

// =============================================================================
// CartSyncEngine
// =============================================================================

struct EngineInner {
    state: Mutex<CartState>,
    remote: Arc<dyn RemoteCart>,
    store: Arc<dyn SnapshotStore>,
    session: Arc<dyn SessionProvider>,
    retry: RetryPolicy,
    rollback_on_failure: bool,
}

/// Orchestrates the cart across memory, local snapshot, and remote service.
///
/// Cheap to clone; clones share one cart.
#[derive(Clone)]
pub struct CartSyncEngine {
    inner: Arc<EngineInner>,
}

/// A mutation, carried from the optimistic local transition to the matching
/// remote push.
enum Mutation {
    Add(CartItem),
    Remove(ItemId),
    SetQuantity(ItemId, u32),
    Clear,
}

impl Mutation {
    /// Apply the transition locally. Returns whether anything changed; a
    /// no-op (unknown id, zero-quantity add) skips the push entirely.
    fn apply(&self, state: &mut CartState) -> bool {
        match self {
            Self::Add(item) => {
                if item.quantity == 0 {
                    return false;
                }
                state.add(item.clone());
                true
            }
            Self::Remove(id) => state.remove(id),
            Self::SetQuantity(id, quantity) => state.set_quantity(id, *quantity),
            Self::Clear => {
                state.clear();
                true
            }
        }
    }

    fn op_name(&self) -> &'static str {
        match self {
            Self::Add(_) => "cart.add",
            Self::Remove(_) => "cart.remove",
            Self::SetQuantity(..) => "cart.set_quantity",
            Self::Clear => "cart.clear",
        }
    }

    async fn push(&self, remote: &dyn RemoteCart) -> Result<(), RemoteCartError> {
        match self {
            Self::Add(item) => remote.add(&item.product_id, item.quantity).await,
            Self::Remove(id) => remote.remove(id).await,
            Self::SetQuantity(id, quantity) => remote.set_quantity(id, *quantity).await,
            Self::Clear => remote.clear().await,
        }
    }
}

impl CartSyncEngine {
    /// Assemble an engine from its collaborators.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteCart>,
        store: Arc<dyn SnapshotStore>,
        session: Arc<dyn SessionProvider>,
        retry: RetryPolicy,
        rollback_on_failure: bool,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(CartState::new()),
                remote,
                store,
                session,
                retry,
                rollback_on_failure,
            }),
        }
    }

    /// Wire up the production collaborators: an [`HttpCartClient`] against
    /// the configured service and a [`FileSnapshotStore`] at the configured
    /// path.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteCartError::Http`] when the HTTP client cannot be
    /// constructed.
    pub fn from_config(
        config: &SyncConfig,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, RemoteCartError> {
        let remote = HttpCartClient::new(&config.remote, session.clone())?;
        let store = FileSnapshotStore::new(config.snapshot_path.clone());
        Ok(Self::new(
            Arc::new(remote),
            Arc::new(store),
            session,
            config.retry,
            config.rollback_on_failure,
        ))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the cart at startup.
    ///
    /// Signed in, the authoritative copy comes from the remote; anonymous,
    /// from the local snapshot (absent or malformed snapshot means an empty
    /// cart). When the remote stays unreachable after retries the local
    /// snapshot is loaded as a stale fallback, but the failure is still
    /// reported: `sync_status` ends at `Error` and the call returns
    /// [`SyncError::RemoteUnavailable`] so the UI can warn.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), SyncError> {
        {
            let mut state = self.lock_state();
            if state.sync_status == SyncStatus::Mutating {
                return Err(SyncError::Busy);
            }
            state.sync_status = SyncStatus::Loading;
            state.last_error = None;
        }

        if !self.inner.session.is_active() {
            self.restore_from_store();
            self.settle_loading(SyncStatus::Idle, None);
            return Ok(());
        }

        match self.load_remote().await {
            Ok(payload) => {
                let mut state = self.lock_state();
                state.load_snapshot(payload.items, vec![]);
                if state.sync_status == SyncStatus::Loading {
                    state.sync_status = SyncStatus::Idle;
                }
                Ok(())
            }
            Err(RemoteCartError::Unauthorized) => {
                warn!("session rejected by remote, loading local snapshot instead");
                self.inner.session.invalidate();
                self.restore_from_store();
                self.settle_loading(SyncStatus::Idle, None);
                Ok(())
            }
            Err(err) => {
                // A stale cart beats an empty one while the remote is down
                self.restore_from_store();
                self.settle_loading(SyncStatus::Error, Some(err.to_string()));
                Err(SyncError::RemoteUnavailable(err))
            }
        }
    }

    /// Migrate the guest cart and pull the account cart after the host
    /// signed the user in.
    ///
    /// Returns the migration tally. A failed post-migration load never
    /// fails the sign-in: the report is still returned, the in-memory cart
    /// keeps its current contents, and `sync_status` ends at `Error` for
    /// the UI to surface.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Busy`] when a mutation is in flight.
    #[instrument(skip(self))]
    pub async fn handle_sign_in(&self) -> Result<MigrationReport, SyncError> {
        {
            let mut state = self.lock_state();
            if state.sync_status == SyncStatus::Mutating {
                return Err(SyncError::Busy);
            }
            state.sync_status = SyncStatus::Loading;
            state.last_error = None;
        }

        let report = Migrator::new(
            self.inner.remote.clone(),
            self.inner.store.clone(),
            self.inner.retry,
        )
        .run()
        .await;

        match self.load_remote().await {
            Ok(payload) => {
                let mut state = self.lock_state();
                state.load_snapshot(payload.items, vec![]);
                if state.sync_status == SyncStatus::Loading {
                    state.sync_status = SyncStatus::Idle;
                }
            }
            Err(err) => {
                if matches!(err, RemoteCartError::Unauthorized) {
                    self.inner.session.invalidate();
                }
                warn!(error = %err, "account cart load failed after migration");
                self.settle_loading(SyncStatus::Error, Some(err.to_string()));
            }
        }

        Ok(report)
    }

    /// Snapshot the cart locally as the host tears the session down.
    ///
    /// Writes a `post-signout` snapshot (or deletes the snapshot when the
    /// cart is empty) so an anonymous follow-up session can pick the cart
    /// up. The in-memory cart is untouched; clearing the UI is the host's
    /// call. A failed write only logs, nothing else depends on it.
    pub fn handle_sign_out(&self) {
        let snapshot = self.lock_state().snapshot(SnapshotOrigin::PostSignout);
        let result = if snapshot.is_empty() {
            self.inner.store.clear()
        } else {
            self.inner.store.save(&snapshot)
        };
        if let Err(err) = result {
            warn!(error = %err, "post-signout cart snapshot failed");
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add an item to the cart. An existing line for the same product
    /// accumulates quantity instead of duplicating.
    ///
    /// # Errors
    ///
    /// [`SyncError::Busy`] when a mutation is in flight,
    /// [`SyncError::RemoteUnavailable`] when the push kept failing,
    /// [`SyncError::Storage`] when the anonymous snapshot write failed.
    #[instrument(
        skip(self, item),
        fields(product_id = %item.product_id, quantity = item.quantity)
    )]
    pub async fn add_to_cart(&self, item: CartItem) -> Result<(), SyncError> {
        self.run_mutation(Mutation::Add(item)).await
    }

    /// Remove a line from the cart. Unknown ids are a no-op.
    ///
    /// # Errors
    ///
    /// Same contract as [`CartSyncEngine::add_to_cart`].
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_from_cart(&self, item_id: &ItemId) -> Result<(), SyncError> {
        self.run_mutation(Mutation::Remove(item_id.clone())).await
    }

    /// Set a line's quantity. Zero removes the line; unknown ids are a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Same contract as [`CartSyncEngine::add_to_cart`].
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_quantity(&self, item_id: &ItemId, quantity: u32) -> Result<(), SyncError> {
        if quantity == 0 {
            return self.run_mutation(Mutation::Remove(item_id.clone())).await;
        }
        self.run_mutation(Mutation::SetQuantity(item_id.clone(), quantity))
            .await
    }

    /// Empty the cart.
    ///
    /// The local snapshot is deleted no matter what, and a failed remote
    /// clear is only a warning: the user-visible cart is already empty, and
    /// the remote copy goes away on its next successful clear or load.
    ///
    /// # Errors
    ///
    /// Same contract as [`CartSyncEngine::add_to_cart`], minus the remote
    /// failure case described above.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), SyncError> {
        self.run_mutation(Mutation::Clear).await
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Toggle the selection mark on a line, returning whether it is now
    /// selected. Unknown ids return `false`.
    ///
    /// Selection is local-only UI state: no busy gate, no remote push. For
    /// anonymous sessions the refreshed snapshot is persisted best-effort.
    #[must_use]
    pub fn toggle_select(&self, item_id: &ItemId) -> bool {
        let selected = self.lock_state().toggle_select(item_id);
        self.persist_selection();
        selected
    }

    /// Select every in-stock line.
    pub fn select_all(&self) {
        self.lock_state().select_all();
        self.persist_selection();
    }

    /// Clear the selection.
    pub fn deselect_all(&self) {
        self.lock_state().deselect_all();
        self.persist_selection();
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A consistent copy of the cart for rendering.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.lock_state().clone()
    }

    /// Current position in the sync state machine.
    #[must_use]
    pub fn sync_status(&self) -> SyncStatus {
        self.lock_state().sync_status
    }

    /// Message from the most recent failure, cleared when the next
    /// operation starts.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock_state().item_count()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lock_state().total_price()
    }

    /// Total units across selected lines.
    #[must_use]
    pub fn selected_count(&self) -> u64 {
        self.lock_state().selected_count()
    }

    /// Sum of line totals over selected, in-stock lines.
    #[must_use]
    pub fn selected_total(&self) -> Decimal {
        self.lock_state().selected_total()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn run_mutation(&self, mutation: Mutation) -> Result<(), SyncError> {
        // Gate, status flip, and optimistic apply under one acquisition
        let pre_image = {
            let mut state = self.lock_state();
            if state.sync_status == SyncStatus::Mutating {
                return Err(SyncError::Busy);
            }
            state.sync_status = SyncStatus::Mutating;
            state.last_error = None;

            let pre_image = self.inner.rollback_on_failure.then(|| state.clone());
            if !mutation.apply(&mut state) {
                debug!(operation = mutation.op_name(), "no-op transition, skipping push");
                state.sync_status = SyncStatus::Idle;
                return Ok(());
            }
            pre_image
        };

        // The snapshot goes away on clear no matter which path follows
        if matches!(mutation, Mutation::Clear)
            && let Err(err) = self.inner.store.clear()
        {
            warn!(error = %err, "local snapshot could not be cleared");
        }

        if self.inner.session.is_active() {
            self.push_authenticated(&mutation, pre_image).await
        } else {
            self.settle_local(mutation.op_name())
        }
    }

    /// Push a mutation to the remote and settle the status.
    async fn push_authenticated(
        &self,
        mutation: &Mutation,
        pre_image: Option<CartState>,
    ) -> Result<(), SyncError> {
        let pushed = self
            .inner
            .retry
            .run(mutation.op_name(), || {
                mutation.push(self.inner.remote.as_ref())
            })
            .await;

        match pushed {
            Ok(()) => {
                self.set_idle();
                Ok(())
            }
            Err(RemoteCartError::Unauthorized) => {
                warn!(
                    operation = mutation.op_name(),
                    "session rejected by remote, continuing anonymously"
                );
                self.inner.session.invalidate();
                self.settle_local(mutation.op_name())
            }
            Err(err) if matches!(mutation, Mutation::Clear) => {
                // Cart and snapshot are already empty locally
                warn!(error = %err, "remote cart clear failed after local clear");
                self.set_idle();
                Ok(())
            }
            Err(err) => {
                let mut state = self.lock_state();
                if let Some(pre_image) = pre_image {
                    *state = pre_image;
                }
                state.sync_status = SyncStatus::Error;
                state.last_error = Some(err.to_string());
                Err(SyncError::RemoteUnavailable(err))
            }
        }
    }

    /// Persist the anonymous cart and settle the status.
    fn settle_local(&self, op_name: &str) -> Result<(), SyncError> {
        match self.persist_local() {
            Ok(()) => {
                self.set_idle();
                Ok(())
            }
            Err(err) => {
                tracing::error!(operation = op_name, error = %err, "cart snapshot write failed");
                let mut state = self.lock_state();
                state.sync_status = SyncStatus::Error;
                state.last_error = Some(err.to_string());
                Err(SyncError::Storage(err))
            }
        }
    }

    /// Write the current cart to the snapshot store, deleting the snapshot
    /// outright when the cart is empty.
    fn persist_local(&self) -> Result<(), StoreError> {
        let snapshot = {
            let state = self.lock_state();
            if state.is_empty() {
                None
            } else {
                Some(state.snapshot(SnapshotOrigin::Normal))
            }
        };
        match snapshot {
            Some(snapshot) => self.inner.store.save(&snapshot),
            None => self.inner.store.clear(),
        }
    }

    fn persist_selection(&self) {
        if self.inner.session.is_active() {
            return;
        }
        if let Err(err) = self.persist_local() {
            warn!(error = %err, "selection change not persisted");
        }
    }

    /// Replace cart contents with the local snapshot, or empty the cart
    /// when no usable snapshot exists.
    fn restore_from_store(&self) {
        let snapshot = self.inner.store.load();
        let mut state = self.lock_state();
        match snapshot {
            Some(snapshot) => {
                let count = snapshot.items.len();
                state.load_snapshot(snapshot.items, snapshot.selection);
                debug!(items = count, "cart restored from local snapshot");
            }
            None => {
                // Same content gate as load_snapshot: a mutation in flight
                // keeps its cart
                if matches!(state.sync_status, SyncStatus::Idle | SyncStatus::Loading) {
                    state.clear();
                }
            }
        }
    }

    async fn load_remote(&self) -> Result<CartPayload, RemoteCartError> {
        self.inner
            .retry
            .run("cart.load", || self.inner.remote.load())
            .await
    }

    fn set_idle(&self) {
        self.lock_state().sync_status = SyncStatus::Idle;
    }

    /// Settle a load's outcome, unless a mutation accepted mid-load took
    /// the status over. That push is still in flight and settles last;
    /// writing over `Mutating` here would reopen the busy gate mid-push.
    fn settle_loading(&self, status: SyncStatus, error: Option<String>) {
        let mut state = self.lock_state();
        if state.sync_status == SyncStatus::Loading {
            state.sync_status = status;
            state.last_error = error;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
