//! Guest cart migration.
//!
//! When a user signs in, whatever they gathered anonymously is replayed into
//! their account cart line by line. The remote accumulates by product, so a
//! replay into an account cart that already holds a product merges the
//! quantities instead of duplicating the line. Once at least one line made
//! it across, the local snapshot is deleted; a repeated sign-in then has
//! nothing left to replay.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::remote::RemoteCart;
use crate::retry::RetryPolicy;
use crate::store::SnapshotStore;

/// Outcome of a migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Lines replayed into the account cart.
    pub migrated: usize,
    /// Lines that kept failing after retries and were skipped.
    pub failed: usize,
}

impl MigrationReport {
    /// Whether any line made it across.
    #[must_use]
    pub const fn any_migrated(&self) -> bool {
        self.migrated > 0
    }
}

/// Replays a locally snapshotted guest cart into the account cart.
pub struct Migrator {
    remote: Arc<dyn RemoteCart>,
    store: Arc<dyn SnapshotStore>,
    retry: RetryPolicy,
}

impl Migrator {
    /// Create a migrator over the given collaborators.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteCart>,
        store: Arc<dyn SnapshotStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            remote,
            store,
            retry,
        }
    }

    /// Replay the local snapshot into the account cart.
    ///
    /// Never fails as a whole: each line is pushed independently with
    /// retries, lines that keep failing are skipped and counted, and the
    /// snapshot survives untouched when nothing went through so the next
    /// sign-in can try again.
    #[instrument(skip(self))]
    pub async fn run(&self) -> MigrationReport {
        let Some(snapshot) = self.store.load() else {
            return MigrationReport::default();
        };
        if snapshot.is_empty() {
            return MigrationReport::default();
        }

        let mut report = MigrationReport::default();
        for item in &snapshot.items {
            let replayed = self
                .retry
                .run("cart.migrate_item", || {
                    self.remote.add(&item.product_id, item.quantity)
                })
                .await;
            match replayed {
                Ok(()) => report.migrated += 1,
                Err(err) => {
                    warn!(
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        error = %err,
                        "cart line failed to migrate, skipping"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.any_migrated() {
            if let Err(err) = self.store.clear() {
                warn!(error = %err, "migrated cart snapshot could not be removed");
            }
        }

        info!(
            migrated = report.migrated,
            failed = report.failed,
            "guest cart migration finished"
        );
        report
    }
}
