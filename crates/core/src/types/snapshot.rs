//! Persisted cart snapshot records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CartItem, ItemId};

/// Why a snapshot was written.
///
/// Diagnostic only: no load path branches on it. `PostSignout` marks
/// snapshots written while tearing down an authenticated session, which
/// helps when investigating "my cart disappeared after logout" reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotOrigin {
    /// Written during normal anonymous-session activity.
    #[default]
    Normal,
    /// Written as part of a sign-out.
    PostSignout,
}

/// A full-replace copy of cart contents, as persisted locally.
///
/// This is an internal storage format, not a compatibility contract across
/// versions; loaders treat anything unparseable as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Cart lines at the time of the write.
    pub items: Vec<CartItem>,
    /// Ids of selected lines. Filtered back to a subset of `items` on load.
    #[serde(default)]
    pub selection: Vec<ItemId>,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
    /// Why the snapshot was written.
    #[serde(default)]
    pub origin: SnapshotOrigin,
}

impl CartSnapshot {
    /// Snapshot the given contents at the current instant.
    #[must_use]
    pub fn now(items: Vec<CartItem>, selection: Vec<ItemId>, origin: SnapshotOrigin) -> Self {
        Self {
            items,
            selection,
            saved_at: Utc::now(),
            origin,
        }
    }

    /// Whether the snapshot carries no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn sample_item() -> CartItem {
        CartItem::new("line-1", "prod-1", "Socks", Decimal::new(450, 2), 2)
    }

    #[test]
    fn test_origin_tag_serialized_form() {
        // The on-disk tag values are load-bearing for diagnostics; pin them.
        assert_eq!(
            serde_json::to_string(&SnapshotOrigin::Normal).unwrap(),
            "\"normal\""
        );
        assert_eq!(
            serde_json::to_string(&SnapshotOrigin::PostSignout).unwrap(),
            "\"post-signout\""
        );
    }

    #[test]
    fn test_snapshot_round_trips_camel_case() {
        let snapshot = CartSnapshot::now(
            vec![sample_item()],
            vec![ItemId::new("line-1")],
            SnapshotOrigin::PostSignout,
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("savedAt").is_some());
        assert_eq!(
            json.get("origin").and_then(serde_json::Value::as_str),
            Some("post-signout")
        );

        let back: CartSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_snapshot_tolerates_missing_optional_fields() {
        // Older snapshots predate selection and origin.
        let snapshot: CartSnapshot = serde_json::from_str(
            r#"{"items":[],"savedAt":"2026-01-15T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.selection.is_empty());
        assert_eq!(snapshot.origin, SnapshotOrigin::Normal);
    }
}
