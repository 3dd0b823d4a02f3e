//! Local snapshot persistence.
//!
//! The engine keeps the last known cart in a [`SnapshotStore`] so an
//! anonymous cart survives restarts and a signed-in cart has a fallback when
//! the remote is unreachable. Stores are synchronous; snapshots are small.
//!
//! A stored snapshot that fails to parse is treated as absent:
//! [`SnapshotStore::load`] logs a warning, discards the bad data where it
//! can, and returns `None`. Corruption never surfaces as an error.

pub mod file;
pub mod memory;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use cartsync_core::CartSnapshot;
use thiserror::Error;

/// Errors from snapshot persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The snapshot could not be read or written.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be serialized.
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Local persistence for the cart snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Persist the snapshot, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be serialized or
    /// written.
    fn save(&self, snapshot: &CartSnapshot) -> Result<(), StoreError>;

    /// Load the stored snapshot.
    ///
    /// Returns `None` when no snapshot exists or the stored bytes are
    /// malformed.
    fn load(&self) -> Option<CartSnapshot>;

    /// Delete the stored snapshot. Deleting an absent snapshot succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when an existing snapshot cannot be removed.
    fn clear(&self) -> Result<(), StoreError>;
}
