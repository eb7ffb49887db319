//! Snapshot synchronization for tower inventory.
//!
//! Maintenance mode edits a working database; office mode reports from a
//! read-only copy of it. This crate moves that copy through a shared folder
//! and manages which store is open for the active mode.
//!
//! # Quick start
//!
//! ```no_run
//! use tower_inventory_core::Mode;
//! use tower_inventory_sync::{CONFIG_FILE, Session, SessionPaths, SyncConfig};
//!
//! let config = SyncConfig::load_optional(CONFIG_FILE).unwrap();
//! let session = Session::open(Mode::Maintenance, SessionPaths::in_dir("."), config).unwrap();
//!
//! // ... record transactions through session.store() ...
//!
//! if let Some(published) = session.publish() {
//!     println!("sha256 {}", published.unwrap().sha256);
//! }
//! let office = session.switch_mode(Mode::Office).unwrap();
//! assert!(office.mode() == Mode::Office);
//! ```

mod config;
mod error;
mod notify;
mod session;
mod snapshot;

pub use config::{CONFIG_FILE, DEFAULT_COPY_TIMEOUT, SNAPSHOT_FILE, SyncConfig};
pub use error::{Result, SyncError};
pub use notify::{Notifier, SyncEvent, TracingNotifier};
pub use session::{Session, SessionPaths};
pub use snapshot::{SnapshotInfo, SnapshotManager, SnapshotReceipt};
