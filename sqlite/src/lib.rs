//! SQLite storage backend for tower inventory.
//!
//! This crate owns the on-disk layout of an inventory database and every
//! read and write against it. It includes a declarative schema, an additive
//! migration that upgrades any earlier layout in place, and a data-access
//! layer that enforces stock and referential invariants.
//!
//! # Architecture
//!
//! The crate is organized into six modules:
//!
//! - **`schema`**: declared tables, columns, and indexes
//! - **`migration`**: diff-and-apply upgrade plus status counts
//! - **`convert`**: SQL row to domain type mapping
//! - **`store`**: [`InventoryStore`], CRUD and transaction recording
//! - **`report`**: per-action, per-technician, and per-day summaries
//! - **`seed`**: sample data for an empty database
//!
//! # Quick start
//!
//! ```no_run
//! use tower_inventory_core::{Mode, TransactionFilter};
//! use tower_inventory_sqlite::InventoryStore;
//!
//! let store = InventoryStore::open("working.db", Mode::Maintenance).unwrap();
//! for summary in store.summary_by_action(&TransactionFilter::default()).unwrap() {
//!     println!("{}: {} units", summary.action_type, summary.totals.quantity);
//! }
//! ```
//!
//! # Upgrading old files
//!
//! Opening a store always migrates first. Tables and columns the current
//! model needs are created; nothing is dropped. A layout that cannot be
//! reconciled this way fails with [`SchemaError`] and the file is left as it
//! was.

mod convert;
mod error;
mod migration;
mod report;
pub mod schema;
mod seed;
mod store;

pub use error::{Result, SchemaError, StoreError};
pub use migration::{Migration, MigrationReport, MigrationStatus, open_and_migrate};
pub use seed::SeedReport;
pub use store::InventoryStore;
