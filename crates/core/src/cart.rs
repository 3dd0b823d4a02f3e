//! The cart state machine.
//!
//! [`CartState`] is the single in-memory source of truth for cart contents,
//! selection state, and sync status. All writes go through the transition
//! methods here; nothing in this module performs I/O, so every transition is
//! synchronous and cheap enough to run under a lock.
//!
//! # Invariants
//!
//! - No two items share an [`ItemId`]; adding an existing id accumulates
//!   quantity on the existing line.
//! - `selection` is always a subset of the current item ids; removing an
//!   item removes it from the selection in the same transition.
//! - Quantities are never zero: a zero target quantity deletes the line,
//!   and zero-quantity entries are dropped when loading snapshots.
//!
//! Transitions are total over their inputs. Malformed snapshot contents are
//! auto-corrected (duplicates dropped, selection filtered) rather than
//! rejected, so a stale or hand-edited snapshot can never wedge the cart.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{CartItem, CartSnapshot, ItemId, SnapshotOrigin, SyncStatus};

/// In-memory cart contents plus the engine-facing status fields.
///
/// `items` and `selection` are private so the invariants above cannot be
/// broken from outside; `sync_status` and `last_error` are plain fields
/// written by the sync orchestrator as part of its protocol.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    items: Vec<CartItem>,
    selection: HashSet<ItemId>,
    /// Where the engine currently is in its request cycle.
    pub sync_status: SyncStatus,
    /// Diagnostic for the most recent failure, cleared when the next
    /// operation starts.
    pub last_error: Option<String>,
}

impl CartState {
    /// An empty cart in [`SyncStatus::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Add an item, accumulating quantity if the line already exists.
    ///
    /// A zero-quantity add is a no-op. New lines append at the end so
    /// insertion order is preserved for rendering.
    pub fn add(&mut self, item: CartItem) {
        if item.quantity == 0 {
            return;
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Remove a line. Returns `false` if the id is not in the cart.
    ///
    /// The id leaves the selection in the same transition, keeping the
    /// subset invariant without a separate cleanup pass.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != *id);
        if self.items.len() == before {
            return false;
        }
        self.selection.remove(id);
        true
    }

    /// Set a line's quantity. A quantity of zero deletes the line.
    ///
    /// Returns `false` if the id is not in the cart.
    pub fn set_quantity(&mut self, id: &ItemId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id);
        }
        match self.items.iter_mut().find(|i| i.id == *id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Empty the cart and the selection.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selection.clear();
    }

    /// Select a line. Returns `false` if the id is not in the cart.
    pub fn select(&mut self, id: &ItemId) -> bool {
        if self.items.iter().any(|i| i.id == *id) {
            self.selection.insert(id.clone());
            true
        } else {
            false
        }
    }

    /// Deselect a line. Returns `false` if it was not selected.
    pub fn deselect(&mut self, id: &ItemId) -> bool {
        self.selection.remove(id)
    }

    /// Flip a line's selection. Returns whether the line is now selected
    /// (`false` for ids not in the cart).
    pub fn toggle_select(&mut self, id: &ItemId) -> bool {
        if self.selection.contains(id) {
            self.selection.remove(id);
            false
        } else {
            self.select(id)
        }
    }

    /// Select every in-stock line. Out-of-stock lines stay visible in the
    /// cart but cannot be bulk-selected for checkout.
    pub fn select_all(&mut self) {
        self.selection = self
            .items
            .iter()
            .filter(|i| i.in_stock)
            .map(|i| i.id.clone())
            .collect();
    }

    /// Empty the selection.
    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Replace items and selection wholesale from a loaded snapshot or a
    /// remote payload.
    ///
    /// Returns `false` without applying anything unless the status is
    /// `Idle` or `Loading`; a load must never clobber an in-flight
    /// mutation's optimistic state.
    ///
    /// Incoming data is repaired rather than trusted: zero-quantity entries
    /// are dropped, duplicate ids keep the last occurrence (at the first
    /// occurrence's position), and the selection is filtered down to ids
    /// that survived.
    pub fn load_snapshot(&mut self, items: Vec<CartItem>, selection: Vec<ItemId>) -> bool {
        if !matches!(self.sync_status, SyncStatus::Idle | SyncStatus::Loading) {
            return false;
        }

        let mut deduped: Vec<CartItem> = Vec::with_capacity(items.len());
        let mut positions: HashMap<ItemId, usize> = HashMap::new();
        for item in items {
            if item.quantity == 0 {
                continue;
            }
            match positions.get(&item.id) {
                Some(&idx) => {
                    if let Some(slot) = deduped.get_mut(idx) {
                        *slot = item;
                    }
                }
                None => {
                    positions.insert(item.id.clone(), deduped.len());
                    deduped.push(item);
                }
            }
        }

        let ids: HashSet<&ItemId> = deduped.iter().map(|i| &i.id).collect();
        self.selection = selection.into_iter().filter(|id| ids.contains(id)).collect();
        self.items = deduped;
        true
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a line is currently selected.
    #[must_use]
    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.selection.contains(id)
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum of line totals across all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |acc, i| acc + i.line_total())
    }

    /// Total units across selected lines.
    #[must_use]
    pub fn selected_count(&self) -> u64 {
        self.selected_items().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum of line totals across selected lines, skipping out-of-stock
    /// lines since they cannot be checked out.
    #[must_use]
    pub fn selected_total(&self) -> Decimal {
        self.selected_items()
            .filter(|i| i.in_stock)
            .fold(Decimal::ZERO, |acc, i| acc + i.line_total())
    }

    /// Selected lines, in cart order.
    #[must_use]
    pub fn selected_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|i| self.selection.contains(&i.id))
    }

    /// Capture the current contents as a persistable snapshot.
    ///
    /// Selection is emitted in cart order so snapshots of equal states are
    /// byte-identical.
    #[must_use]
    pub fn snapshot(&self, origin: SnapshotOrigin) -> CartSnapshot {
        let selection = self
            .items
            .iter()
            .filter(|i| self.selection.contains(&i.id))
            .map(|i| i.id.clone())
            .collect();
        CartSnapshot::now(self.items.clone(), selection, origin)
    }
}
