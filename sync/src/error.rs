//! Error types for snapshot synchronization.
//!
//! Every [`SyncError`] is recoverable: the working database is never left
//! modified by a failed publish or pull, so the caller may report the failure
//! and retry.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tower_inventory_sqlite::StoreError;

/// Errors that can occur while publishing or pulling a snapshot.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The shared folder does not exist or is not a directory.
    #[error("shared folder unavailable: {}", .0.display())]
    FolderUnavailable(PathBuf),

    /// No snapshot has been published to the shared folder.
    #[error("no snapshot found at {}", .0.display())]
    SnapshotMissing(PathBuf),

    /// The working database to publish does not exist.
    #[error("working database not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// The configuration file is empty or unreadable as a path.
    #[error("invalid configuration in {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    /// A copy did not finish within the configured bound and was cancelled.
    #[error("{operation} timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite failure while locking the working database.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store could not be opened after switching modes.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for results with [`SyncError`].
pub type Result<T> = std::result::Result<T, SyncError>;
