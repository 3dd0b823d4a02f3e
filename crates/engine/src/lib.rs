//! Cart synchronization engine.
//!
//! Keeps an in-memory [`cartsync_core::CartState`] in step with a remote
//! cart service and a local snapshot file. Mutations apply locally first,
//! then push to the remote within the same call; a failed push keeps the
//! optimistic local result unless rollback is enabled in [`SyncConfig`].
//!
//! # Architecture
//!
//! - [`sync`] - the [`CartSyncEngine`] orchestrator, entry point for every
//!   cart operation
//! - [`remote`] - the [`RemoteCart`] trait, its HTTP binding, and an
//!   in-memory test double
//! - [`store`] - local [`SnapshotStore`] implementations (file-backed and
//!   in-memory)
//! - [`migrate`] - replays an anonymous cart into a fresh session's account
//!   cart
//! - [`session`] - session capability injected by the host application
//! - [`retry`] - bounded exponential backoff for remote calls
//! - [`config`] - environment-driven configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cartsync_engine::{CartSyncEngine, SessionHandle, SyncConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::from_env()?;
//! let session = SessionHandle::anonymous();
//! let engine = CartSyncEngine::from_config(&config, Arc::new(session))?;
//!
//! engine.initialize().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod migrate;
pub mod remote;
pub mod retry;
pub mod session;
pub mod store;
pub mod sync;

pub use config::{ConfigError, RemoteConfig, SyncConfig};
pub use error::SyncError;
pub use migrate::{MigrationReport, Migrator};
pub use remote::{CartPayload, HttpCartClient, MockCartService, RemoteCart, RemoteCartError};
pub use retry::RetryPolicy;
pub use session::{SessionHandle, SessionProvider};
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, StoreError};
pub use sync::CartSyncEngine;
