//! Core types for cartsync.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod item;
pub mod snapshot;
pub mod status;

pub use id::*;
pub use item::CartItem;
pub use snapshot::{CartSnapshot, SnapshotOrigin};
pub use status::SyncStatus;
