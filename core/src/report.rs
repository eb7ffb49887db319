//! Query filters and read-only report shapes used by office mode.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::{ActionType, Id};

/// Narrows a transaction listing. Unset fields match everything.
///
/// `date_from` and `date_to` are inclusive.
///
/// # Examples
///
/// ```
/// use tower_inventory_core::{ActionType, TransactionFilter};
///
/// let filter = TransactionFilter::default()
///     .technician(2)
///     .action(ActionType::Install);
/// assert_eq!(filter.technician_id, Some(2));
/// assert!(filter.location_id.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub technician_id: Option<Id>,
    pub location_id: Option<Id>,
    pub item_id: Option<Id>,
    pub service_id: Option<Id>,
    pub action_type: Option<ActionType>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    /// Case-insensitive substring of the service number.
    pub service_number_contains: Option<String>,
}

impl TransactionFilter {
    pub fn technician(mut self, id: Id) -> Self {
        self.technician_id = Some(id);
        self
    }

    pub fn location(mut self, id: Id) -> Self {
        self.location_id = Some(id);
        self
    }

    pub fn item(mut self, id: Id) -> Self {
        self.item_id = Some(id);
        self
    }

    pub fn action(mut self, action: ActionType) -> Self {
        self.action_type = Some(action);
        self
    }

    /// Restricts to the whole days `from..=to`.
    pub fn days(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = from.and_hms_opt(0, 0, 0);
        self.date_to = to.and_hms_micro_opt(23, 59, 59, 999_999);
        self
    }
}

/// A transaction joined with the names it references, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Id,
    pub timestamp: NaiveDateTime,
    pub action_type: ActionType,
    pub quantity: i64,
    pub unit_price: f64,
    pub item_name: String,
    pub technician_name: String,
    pub location_name: String,
    pub service_number: Option<String>,
    pub linked_service_id: Option<Id>,
    pub service_address: String,
    pub service_apartment: String,
}

/// Totals for a group of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub count: i64,
    pub quantity: i64,
    /// Sum of `unit_price * quantity`.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub action_type: ActionType,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicianSummary {
    pub technician_id: Id,
    pub technician_name: String,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub day: NaiveDate,
    pub totals: Totals,
}
