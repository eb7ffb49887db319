//! One open store at a time, tied to the active mode.
//!
//! A [`Session`] owns the [`InventoryStore`] for its mode. Switching modes
//! consumes the session and closes its store before the next one is opened,
//! so maintenance and office never hold the same file at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tower_inventory_core::{Clock, Mode, SystemClock};
use tower_inventory_sqlite::InventoryStore;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::notify::{Notifier, TracingNotifier};
use crate::snapshot::{SnapshotManager, SnapshotReceipt};

/// Where each mode keeps its database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    /// Read-write file used in maintenance mode.
    pub working: PathBuf,
    /// Local copy of the published snapshot, read in office mode.
    pub snapshot: PathBuf,
}

impl SessionPaths {
    /// The default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            working: dir.join(Mode::Maintenance.default_db_file()),
            snapshot: dir.join(Mode::Office.default_db_file()),
        }
    }

    pub fn for_mode(&self, mode: Mode) -> &Path {
        match mode {
            Mode::Maintenance => &self.working,
            Mode::Office => &self.snapshot,
        }
    }
}

/// The active mode, its store, and the snapshot manager if a shared folder is
/// configured.
pub struct Session {
    store: InventoryStore,
    paths: SessionPaths,
    snapshots: Option<SnapshotManager>,
    clock: Arc<dyn Clock>,
    pull_error: Option<SyncError>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("paths", &self.paths)
            .field("pull_error", &self.pull_error)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Opens a session in `mode`.
    ///
    /// In office mode with a shared folder configured, the latest snapshot is
    /// pulled first. If the pull fails, the existing local copy is opened
    /// instead and the failure is kept on the session; see
    /// [`pull_error`](Self::pull_error). Office mode without a local copy
    /// fails with the pull's error, or [`SyncError::SnapshotMissing`] when no
    /// shared folder is configured.
    pub fn open(mode: Mode, paths: SessionPaths, config: Option<SyncConfig>) -> Result<Self> {
        Self::open_with(
            mode,
            paths,
            config,
            Arc::new(SystemClock),
            Arc::new(TracingNotifier),
        )
    }

    /// Like [`open`](Self::open), with the caller's clock and the notifier
    /// that receives every snapshot outcome.
    pub fn open_with(
        mode: Mode,
        paths: SessionPaths,
        config: Option<SyncConfig>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let snapshots = config.map(|c| {
            SnapshotManager::new(c)
                .with_clock(clock.clone())
                .with_notifier(notifier)
        });
        Self::start(mode, paths, snapshots, clock)
    }

    fn start(
        mode: Mode,
        paths: SessionPaths,
        snapshots: Option<SnapshotManager>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut pull_error = None;
        if mode == Mode::Office {
            if let Some(manager) = &snapshots {
                if let Err(e) = manager.pull(&paths.snapshot) {
                    debug!(error = %e, "Falling back to local snapshot copy");
                    pull_error = Some(e);
                }
            }
            if !paths.snapshot.is_file() {
                return Err(pull_error
                    .unwrap_or_else(|| SyncError::SnapshotMissing(paths.snapshot.clone())));
            }
        }
        let store = InventoryStore::open_with_clock(paths.for_mode(mode), mode, clock.clone())?;
        info!(%mode, path = %paths.for_mode(mode).display(), "Session started");
        Ok(Self {
            store,
            paths,
            snapshots,
            clock,
            pull_error,
        })
    }

    pub fn mode(&self) -> Mode {
        self.store.mode()
    }

    pub fn store(&self) -> &InventoryStore {
        &self.store
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    pub fn snapshots(&self) -> Option<&SnapshotManager> {
        self.snapshots.as_ref()
    }

    /// The pull that failed when this office session started. When set, the
    /// store shows an older local copy.
    pub fn pull_error(&self) -> Option<&SyncError> {
        self.pull_error.as_ref()
    }

    /// Reopens the current mode, pulling the snapshot again in office mode.
    pub fn refresh(self) -> Result<Self> {
        let mode = self.mode();
        self.switch_mode(mode)
    }

    /// Publishes the working database. Only meaningful in maintenance mode;
    /// returns `None` when no shared folder is configured.
    pub fn publish(&self) -> Option<Result<SnapshotReceipt>> {
        self.snapshots
            .as_ref()
            .map(|manager| manager.publish(&self.paths.working))
    }

    /// Closes the current store and opens `mode`.
    pub fn switch_mode(self, mode: Mode) -> Result<Self> {
        let Self {
            store,
            paths,
            snapshots,
            clock,
            ..
        } = self;
        info!(from = %store.mode(), to = %mode, "Switching mode");
        store.close()?;
        Self::start(mode, paths, snapshots, clock)
    }
}
