//! Outcome notifications for snapshot operations.
//!
//! A [`Notifier`] is told about every publish and pull, successful or not. It
//! is fire-and-forget: implementations must return promptly and cannot fail
//! the operation. A desktop front end might play a sound here; the default
//! [`TracingNotifier`] writes a log line.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::snapshot::SnapshotReceipt;

/// What happened during a snapshot operation.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Published(SnapshotReceipt),
    Pulled(SnapshotReceipt),
    Failed {
        operation: &'static str,
        path: PathBuf,
        message: String,
    },
}

/// Receives [`SyncEvent`]s.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &SyncEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Published(receipt) => info!(
                path = %receipt.path.display(),
                bytes = receipt.bytes,
                sha256 = %receipt.sha256,
                "Snapshot published"
            ),
            SyncEvent::Pulled(receipt) => info!(
                path = %receipt.path.display(),
                bytes = receipt.bytes,
                "Snapshot pulled"
            ),
            SyncEvent::Failed {
                operation,
                path,
                message,
            } => warn!(operation, path = %path.display(), "Snapshot {operation} failed: {message}"),
        }
    }
}
