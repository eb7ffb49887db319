//! Publishing and pulling read-only snapshots of the working database.
//!
//! A publish copies the working file into the shared folder while holding a
//! SQLite `RESERVED` lock (`BEGIN IMMEDIATE`) on it, so no writer can be part
//! way through a transaction when the bytes are read. Both directions copy
//! into a temporary file next to the destination, fsync it, and rename it
//! over the target, so a reader never observes a half-written snapshot.
//!
//! Copies run on a worker thread. The caller waits at most
//! [`SyncConfig::copy_timeout`]; past that the worker is told to stop, the
//! temporary file is removed, and [`SyncError::Timeout`] is returned.
//!
//! # Example
//!
//! ```no_run
//! use tower_inventory_sync::{SnapshotManager, SyncConfig};
//!
//! let manager = SnapshotManager::new(SyncConfig::new("/mnt/share/inventory"));
//! let receipt = manager.publish("working.db").unwrap();
//! println!("published {} bytes, sha256 {}", receipt.bytes, receipt.sha256);
//!
//! manager.pull("inventory_snapshot.db").unwrap();
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tower_inventory_core::{Clock, SystemClock};
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::notify::{Notifier, SyncEvent, TracingNotifier};

const CHUNK_SIZE: usize = 64 * 1024;

/// Result of a completed publish or pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotReceipt {
    /// File that was written.
    pub path: PathBuf,
    pub bytes: u64,
    /// SHA-256 hex digest of the copied bytes.
    pub sha256: String,
    pub completed_at: NaiveDateTime,
}

/// The published snapshot as seen in the shared folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub path: PathBuf,
    pub bytes: u64,
    pub modified: NaiveDateTime,
}

/// Moves snapshots between a local database file and the shared folder.
pub struct SnapshotManager {
    config: SyncConfig,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl SnapshotManager {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Copies the working database at `source` into the shared folder as
    /// `inventory_snapshot.db`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::FolderUnavailable`] if the shared folder is missing.
    /// - [`SyncError::SourceMissing`] if `source` does not exist.
    /// - [`SyncError::Database`] if the working file cannot be locked within
    ///   the copy timeout.
    /// - [`SyncError::Timeout`] if the copy itself takes too long.
    pub fn publish(&self, source: impl AsRef<Path>) -> Result<SnapshotReceipt> {
        let source = source.as_ref();
        let target = self.config.snapshot_path();
        let result = self.publish_inner(source, &target);
        self.report("publish", &target, result, SyncEvent::Published)
    }

    fn publish_inner(&self, source: &Path, target: &Path) -> Result<SnapshotReceipt> {
        self.config.ensure_folder()?;
        if !source.is_file() {
            return Err(SyncError::SourceMissing(source.to_path_buf()));
        }

        let conn = Connection::open(source)?;
        conn.busy_timeout(self.config.copy_timeout)?;
        conn.execute_batch("BEGIN IMMEDIATE;")?;
        debug!(source = %source.display(), "Locked working database for publish");

        let copied = self.copy_replacing("publish", source, target);
        // The lock is released whether or not the copy succeeded.
        if let Err(e) = conn.execute_batch("ROLLBACK;") {
            warn!(error = %e, "Failed to release publish lock");
        }
        let (bytes, sha256) = copied?;

        Ok(SnapshotReceipt {
            path: target.to_path_buf(),
            bytes,
            sha256,
            completed_at: self.clock.now(),
        })
    }

    /// Copies the published snapshot to `local`, replacing any previous copy.
    ///
    /// # Errors
    ///
    /// - [`SyncError::FolderUnavailable`] if the shared folder is missing.
    /// - [`SyncError::SnapshotMissing`] if nothing has been published.
    /// - [`SyncError::Timeout`] if the copy takes too long. `local` is left
    ///   as it was.
    pub fn pull(&self, local: impl AsRef<Path>) -> Result<SnapshotReceipt> {
        let local = local.as_ref();
        let result = self.pull_inner(local);
        self.report("pull", local, result, SyncEvent::Pulled)
    }

    fn pull_inner(&self, local: &Path) -> Result<SnapshotReceipt> {
        self.config.ensure_folder()?;
        let source = self.config.snapshot_path();
        if !source.is_file() {
            return Err(SyncError::SnapshotMissing(source));
        }
        let (bytes, sha256) = self.copy_replacing("pull", &source, local)?;
        Ok(SnapshotReceipt {
            path: local.to_path_buf(),
            bytes,
            sha256,
            completed_at: self.clock.now(),
        })
    }

    /// Describes the published snapshot, or `None` if there is none yet.
    pub fn info(&self) -> Result<Option<SnapshotInfo>> {
        self.config.ensure_folder()?;
        let path = self.config.snapshot_path();
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = DateTime::<Local>::from(metadata.modified()?).naive_local();
        Ok(Some(SnapshotInfo {
            path,
            bytes: metadata.len(),
            modified,
        }))
    }

    fn report(
        &self,
        operation: &'static str,
        path: &Path,
        result: Result<SnapshotReceipt>,
        success: fn(SnapshotReceipt) -> SyncEvent,
    ) -> Result<SnapshotReceipt> {
        match &result {
            Ok(receipt) => self.notifier.notify(&success(receipt.clone())),
            Err(e) => self.notifier.notify(&SyncEvent::Failed {
                operation,
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
        result
    }

    /// Copies `from` to a temporary sibling of `to`, then renames it into
    /// place. Returns the byte count and SHA-256 digest.
    fn copy_replacing(&self, operation: &'static str, from: &Path, to: &Path) -> Result<(u64, String)> {
        let partial = partial_path(to);
        let job = {
            let from = from.to_path_buf();
            let partial = partial.clone();
            move |cancel: &AtomicBool| copy_file(&from, &partial, cancel)
        };

        match run_with_timeout(operation, self.config.copy_timeout, job) {
            Ok((bytes, sha256)) => {
                std::fs::rename(&partial, to)?;
                debug!(operation, to = %to.display(), bytes, "Copy complete");
                Ok((bytes, sha256))
            }
            Err(e) => {
                // The worker removes its own partial file when it sees the
                // cancel flag; this covers a worker that never gets to it.
                let _ = std::fs::remove_file(&partial);
                Err(e)
            }
        }
    }
}

/// Temporary file used while writing `target`, in the same directory so the
/// final rename stays on one filesystem.
fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    target.with_file_name(format!(".{name}.{}.partial", std::process::id()))
}

/// Streams `from` into a new file at `to`, hashing as it goes, and fsyncs
/// the result. Stops with `Interrupted` and removes `to` once `cancel` is
/// set.
fn copy_file(from: &Path, to: &Path, cancel: &AtomicBool) -> Result<(u64, String)> {
    let mut reader = File::open(from)?;
    let mut writer = File::create(to)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        if cancel.load(Ordering::Relaxed) {
            drop(writer);
            let _ = std::fs::remove_file(to);
            return Err(std::io::Error::from(std::io::ErrorKind::Interrupted).into());
        }
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    writer.sync_all()?;
    Ok((total, format!("{:x}", hasher.finalize())))
}

/// Runs `job` on a worker thread and waits at most `timeout` for it.
///
/// On timeout the job's cancel flag is raised and the worker is left to wind
/// down on its own.
fn run_with_timeout<T, F>(operation: &'static str, timeout: Duration, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&AtomicBool) -> Result<T> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let flag = Arc::clone(&cancel);
    thread::Builder::new()
        .name(format!("snapshot-{operation}"))
        .spawn(move || {
            // The receiver is gone after a timeout; nothing left to tell.
            let _ = tx.send(job(&flag));
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            warn!(operation, timeout_secs = timeout.as_secs_f64(), "Copy timed out; cancelling");
            Err(SyncError::Timeout { operation, timeout })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(std::io::Error::other(format!(
            "{operation} worker exited without a result"
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_run_with_timeout_returns_result() {
        let value = run_with_timeout("test", Duration::from_secs(5), |_| Ok(42)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_run_with_timeout_cancels_stalled_job() {
        let (done_tx, done_rx) = mpsc::channel();
        let err = run_with_timeout("pull", Duration::from_millis(50), move |cancel| {
            while !cancel.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(5));
            }
            done_tx.send(()).unwrap();
            Ok(())
        })
        .unwrap_err();

        assert!(matches!(err, SyncError::Timeout { operation: "pull", .. }));
        // The worker saw the cancel flag and stopped.
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_copy_file_hashes_content() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.db");
        let to = dir.path().join("b.db");
        std::fs::write(&from, b"abc").unwrap();

        let (bytes, sha256) = copy_file(&from, &to, &AtomicBool::new(false)).unwrap();
        assert_eq!(bytes, 3);
        assert_eq!(
            sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(std::fs::read(&to).unwrap(), b"abc");
    }

    #[test]
    fn test_cancelled_copy_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.db");
        let to = dir.path().join("b.db");
        std::fs::write(&from, vec![7u8; CHUNK_SIZE * 3]).unwrap();

        assert!(copy_file(&from, &to, &AtomicBool::new(true)).is_err());
        assert!(!to.exists());
    }

    #[test]
    fn test_failed_publish_is_reported() {
        struct Counting(AtomicUsize);
        impl Notifier for Counting {
            fn notify(&self, event: &SyncEvent) {
                if let SyncEvent::Failed { operation, .. } = event {
                    assert_eq!(*operation, "publish");
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let manager =
            SnapshotManager::new(SyncConfig::new(dir.path())).with_notifier(counter.clone());
        let err = manager.publish(dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, SyncError::SourceMissing(_)));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        let partial = partial_path(Path::new("/share/inventory_snapshot.db"));
        assert_eq!(partial.parent(), Some(Path::new("/share")));
        let name = partial.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".inventory_snapshot.db."));
        assert!(name.ends_with(".partial"));
    }
}
