//! In-memory snapshot store for tests and ephemeral hosts.

use std::sync::{Mutex, PoisonError};

use cartsync_core::CartSnapshot;

use super::{SnapshotStore, StoreError};

/// Keeps the snapshot in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<CartSnapshot>>,
}

impl MemorySnapshotStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &CartSnapshot) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> Option<CartSnapshot> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
