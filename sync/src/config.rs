//! Shared-folder configuration.
//!
//! The shared folder is the directory both modes agree on: maintenance
//! publishes `inventory_snapshot.db` into it, office pulls from it. Its path
//! is kept in a local plain-text file (`shared_folder.txt`, never committed)
//! whose trimmed content is the path:
//!
//! ```text
//! /mnt/share/inventory
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, SyncError};

/// Default name of the local configuration file.
pub const CONFIG_FILE: &str = "shared_folder.txt";

/// File name of the published snapshot inside the shared folder.
pub const SNAPSHOT_FILE: &str = "inventory_snapshot.db";

/// Upper bound on a single snapshot copy.
pub const DEFAULT_COPY_TIMEOUT: Duration = Duration::from_secs(30);

/// Where snapshots are exchanged and how long a copy may take.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tower_inventory_sync::SyncConfig;
///
/// let config = SyncConfig::new("/mnt/share/inventory").with_copy_timeout(Duration::from_secs(5));
/// assert!(config.snapshot_path().ends_with("inventory_snapshot.db"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Directory holding the published snapshot.
    pub shared_folder: PathBuf,
    /// Maximum time a publish or pull copy may run before it is cancelled.
    pub copy_timeout: Duration,
}

impl SyncConfig {
    pub fn new(shared_folder: impl Into<PathBuf>) -> Self {
        Self {
            shared_folder: shared_folder.into(),
            copy_timeout: DEFAULT_COPY_TIMEOUT,
        }
    }

    pub fn with_copy_timeout(mut self, timeout: Duration) -> Self {
        self.copy_timeout = timeout;
        self
    }

    /// Path of the published snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.shared_folder.join(SNAPSHOT_FILE)
    }

    /// Loads the shared-folder path from a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](SyncError::Io) if the file cannot be read, or
    /// [`InvalidConfig`](SyncError::InvalidConfig) if it holds no path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let folder = content.trim();
        if folder.is_empty() {
            return Err(SyncError::InvalidConfig {
                path: path.to_path_buf(),
                reason: "file is empty".into(),
            });
        }
        debug!(config = %path.display(), shared_folder = folder, "Loaded sync configuration");
        Ok(Self::new(folder))
    }

    /// Like [`load`](Self::load), but a missing file is `Ok(None)`.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>> {
        match Self::load(&path) {
            Ok(config) => Ok(Some(config)),
            Err(SyncError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes the shared-folder path to a configuration file.
    ///
    /// Only the path is persisted; the copy timeout is a runtime setting.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut content = self.shared_folder.to_string_lossy().into_owned();
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fails with [`FolderUnavailable`](SyncError::FolderUnavailable) unless
    /// the shared folder is an existing directory.
    pub fn ensure_folder(&self) -> Result<()> {
        if self.shared_folder.is_dir() {
            Ok(())
        } else {
            Err(SyncError::FolderUnavailable(self.shared_folder.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        std::fs::write(&file, "  /mnt/share/inventory \n\n").unwrap();

        let config = SyncConfig::load(&file).unwrap();
        assert_eq!(config.shared_folder, PathBuf::from("/mnt/share/inventory"));
        assert_eq!(config.copy_timeout, DEFAULT_COPY_TIMEOUT);
    }

    #[test]
    fn test_empty_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        std::fs::write(&file, "   \n").unwrap();
        assert!(matches!(
            SyncConfig::load(&file).unwrap_err(),
            SyncError::InvalidConfig { .. }
        ));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            SyncConfig::load_optional(dir.path().join(CONFIG_FILE))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        let config = SyncConfig::new(dir.path().join("share"));
        config.save(&file).unwrap();
        assert_eq!(SyncConfig::load(&file).unwrap(), config);
    }

    #[test]
    fn test_ensure_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SyncConfig::new(dir.path()).ensure_folder().is_ok());
        assert!(matches!(
            SyncConfig::new(dir.path().join("gone")).ensure_folder(),
            Err(SyncError::FolderUnavailable(_))
        ));
    }
}
