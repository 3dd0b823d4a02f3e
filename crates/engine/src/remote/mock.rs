//! Configurable in-memory cart service for tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cartsync_core::{CartItem, ItemId, ProductId};
use rust_decimal::Decimal;

use super::{CartPayload, RemoteCart, RemoteCartError};

/// In-memory [`RemoteCart`] with failure injection.
///
/// Behavior switches can be set at construction (`with_*` builders) or
/// flipped mid-test (`set_*` methods), and every operation keeps a call
/// counter so tests can assert on retry and replay behavior.
#[derive(Debug, Default)]
pub struct MockCartService {
    items: Mutex<Vec<CartItem>>,
    fail_remaining: AtomicU32,
    unauthorized: AtomicBool,
    latency: Mutex<Option<Duration>>,
    load_calls: AtomicU32,
    add_calls: AtomicU32,
    remove_calls: AtomicU32,
    set_quantity_calls: AtomicU32,
    clear_calls: AtomicU32,
}

impl MockCartService {
    /// An empty, always-succeeding service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given server-side cart contents.
    #[must_use]
    pub fn with_items(self, items: Vec<CartItem>) -> Self {
        *self.lock_items() = items;
        self
    }

    /// Fail the next `n` operations with a 503 service error.
    #[must_use]
    pub fn with_failures(self, n: u32) -> Self {
        self.fail_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Reject every operation as unauthorized.
    #[must_use]
    pub fn with_unauthorized(self) -> Self {
        self.unauthorized.store(true, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` operations with a 503 service error.
    pub fn set_failures(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Toggle unauthorized rejection.
    pub fn set_unauthorized(&self, on: bool) {
        self.unauthorized.store(on, Ordering::SeqCst);
    }

    /// Delay every operation, holding it in flight for the duration.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Current server-side cart contents.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.lock_items().clone()
    }

    /// Server-side quantity for a product, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lock_items()
            .iter()
            .find(|i| i.product_id == *product_id)
            .map_or(0, |i| i.quantity)
    }

    /// Calls made to `load`.
    #[must_use]
    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Calls made to `add`.
    #[must_use]
    pub fn add_calls(&self) -> u32 {
        self.add_calls.load(Ordering::SeqCst)
    }

    /// Calls made to `remove`.
    #[must_use]
    pub fn remove_calls(&self) -> u32 {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// Calls made to `set_quantity`.
    #[must_use]
    pub fn set_quantity_calls(&self) -> u32 {
        self.set_quantity_calls.load(Ordering::SeqCst)
    }

    /// Calls made to `clear`.
    #[must_use]
    pub fn clear_calls(&self) -> u32 {
        self.clear_calls.load(Ordering::SeqCst)
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<CartItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, apply latency, then apply any failure switch.
    async fn begin_call(&self, counter: &AtomicU32) -> Result<(), RemoteCartError> {
        counter.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }

        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(RemoteCartError::Unauthorized);
        }
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RemoteCartError::Service {
                status: 503,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCart for MockCartService {
    async fn load(&self) -> Result<CartPayload, RemoteCartError> {
        self.begin_call(&self.load_calls).await?;
        Ok(CartPayload { items: self.items() })
    }

    async fn add(&self, product_id: &ProductId, quantity: u32) -> Result<(), RemoteCartError> {
        self.begin_call(&self.add_calls).await?;

        let mut items = self.lock_items();
        if let Some(existing) = items.iter_mut().find(|i| i.product_id == *product_id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            items.push(CartItem::new(
                format!("line-{product_id}"),
                product_id.clone(),
                product_id.as_str(),
                Decimal::ZERO,
                quantity,
            ));
        }
        Ok(())
    }

    async fn remove(&self, item_id: &ItemId) -> Result<(), RemoteCartError> {
        self.begin_call(&self.remove_calls).await?;
        // Removing an unknown line succeeds, like deleting an absent resource
        self.lock_items().retain(|i| i.id != *item_id);
        Ok(())
    }

    async fn set_quantity(&self, item_id: &ItemId, quantity: u32) -> Result<(), RemoteCartError> {
        self.begin_call(&self.set_quantity_calls).await?;

        let mut items = self.lock_items();
        if quantity == 0 {
            items.retain(|i| i.id != *item_id);
        } else if let Some(item) = items.iter_mut().find(|i| i.id == *item_id) {
            item.quantity = quantity;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), RemoteCartError> {
        self.begin_call(&self.clear_calls).await?;
        self.lock_items().clear();
        Ok(())
    }
}
