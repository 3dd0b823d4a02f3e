//! Engine error taxonomy.

use thiserror::Error;

use crate::remote::RemoteCartError;
use crate::store::StoreError;

/// Errors surfaced by cart synchronization operations.
///
/// Only operations that genuinely did not take effect produce an error.
/// Conditions the engine absorbs on its own (a rejected session token
/// falling back to anonymous persistence, a malformed snapshot treated as
/// absent, a failed remote clear after the local clear succeeded) are
/// reported through `sync_status`, `last_error`, and logs instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another cart operation is in flight; this call was not applied.
    #[error("another cart operation is in flight")]
    Busy,

    /// The remote stayed unreachable after retries. The local cart still
    /// holds the optimistic result unless rollback is enabled.
    #[error("remote cart unavailable: {0}")]
    RemoteUnavailable(#[source] RemoteCartError),

    /// The local snapshot could not be written or removed.
    #[error("local snapshot storage failed: {0}")]
    Storage(#[from] StoreError),
}
