//! Core domain types and validation for field-service inventory tracking.
//!
//! This crate defines what the rest of the workspace stores and reports:
//!
//! - Entities: [`Technician`], [`InventoryLocation`], [`LocationDetail`],
//!   [`InventoryItem`], [`ServiceOrder`], [`Transaction`], with `New*`
//!   counterparts for creation.
//! - [`ServiceRef`], the optional link from a transaction to a service order.
//! - Validators ([`validate_service_number`], [`validate_apartment`] and the
//!   `check_*` family) returning [`ValidationError`].
//! - [`Clock`], the time source, with [`SystemClock`] and [`FixedClock`].
//! - Report shapes ([`TransactionFilter`], [`ActionSummary`], ...).
//!
//! # Example
//!
//! ```
//! use tower_inventory_core::*;
//!
//! let tx = NewTransaction::new(1, 1, 1, ActionType::Remove, 2)
//!     .with_service_number("54321-7");
//!
//! assert_eq!(tx.stock_delta(), -2);
//! assert!(validate_service_number(tx.service_number.as_deref().unwrap()));
//! ```

mod clock;
mod report;
mod types;
mod validate;

pub use clock::{Clock, FixedClock, SystemClock, TIMESTAMP_FORMAT, format_timestamp, parse_timestamp};
pub use report::{
    ActionSummary, DailySummary, TechnicianSummary, Totals, TransactionFilter, TransactionRecord,
};
pub use types::*;
pub use validate::{
    ValidationError, check_apartment, check_non_negative, check_not_empty, check_price,
    check_quantity, check_service_number, validate_apartment, validate_service_number,
};
