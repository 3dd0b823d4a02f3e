//! Synchronization status for the cart state machine.

use serde::{Deserialize, Serialize};

/// Where the engine currently is in its request cycle.
///
/// Rendered directly by UI embedders (spinners, disabled buttons), so this
/// stays a flat enum with no payload; the diagnostic detail lives in
/// `CartState::last_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No operation in flight.
    #[default]
    Idle,
    /// Initial cart population in flight.
    Loading,
    /// A mutating operation in flight. Further mutations are rejected
    /// until it settles.
    Mutating,
    /// The last operation failed terminally. The cart stays usable; the
    /// status resets when the next operation starts.
    Error,
}
