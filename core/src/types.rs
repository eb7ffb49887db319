//! Domain types for inventory tracking.
//!
//! Persisted entities come in pairs: the stored row (`Technician`,
//! `InventoryItem`, ...) carrying its database id, and a `New*` value used to
//! create one. Transactions additionally carry a [`ServiceRef`], the explicit
//! form of the optional link between a transaction and a service order.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Database row identifier.
pub type Id = i64;

/// Operating mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Read-write access to the working database.
    Maintenance,
    /// Read-only access to a pulled snapshot.
    Office,
}

impl Mode {
    /// Default database file name used by this mode.
    pub fn default_db_file(self) -> &'static str {
        match self {
            Self::Maintenance => "working.db",
            Self::Office => "inventory_snapshot.db",
        }
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Office)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maintenance => f.write_str("maintenance"),
            Self::Office => f.write_str("office"),
        }
    }
}

/// What a technician did with an item.
///
/// # Examples
///
/// ```
/// use tower_inventory_core::ActionType;
///
/// let action: ActionType = "Remove".parse().unwrap();
/// assert_eq!(action, ActionType::Remove);
/// assert!("Replace".parse::<ActionType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Install,
    Remove,
    Repair,
}

impl ActionType {
    pub const ALL: [ActionType; 3] = [Self::Install, Self::Remove, Self::Repair];

    /// Stored and displayed name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "Install",
            Self::Remove => "Remove",
            Self::Repair => "Repair",
        }
    }

    /// Signed stock change caused by a transaction of this type.
    ///
    /// Install adds `quantity`, Remove takes `quantity` away, and Repair
    /// consumes only the replaced parts.
    pub fn stock_delta(self, quantity: i64, replacement_quantity: i64) -> i64 {
        match self {
            Self::Install => quantity,
            Self::Remove => -quantity,
            Self::Repair => -replacement_quantity,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownActionType {
                field: "action_type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
    pub id: Id,
    pub name: String,
}

/// A stock-holding place such as a warehouse or a truck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLocation {
    pub id: Id,
    pub name: String,
    pub address: String,
    pub apartment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryLocation {
    pub name: String,
    pub address: String,
    pub apartment: String,
}

/// A work site: the service address and unit where a job happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDetail {
    pub id: Id,
    pub address: String,
    pub apartment: String,
}

impl LocationDetail {
    /// Human-readable label, e.g. `"12 Oak St - Unit 4B"`.
    pub fn label(&self) -> String {
        if self.apartment.is_empty() {
            self.address.clone()
        } else {
            format!("{} - Unit {}", self.address, self.apartment)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocationDetail {
    pub address: String,
    pub apartment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub unit_price: f64,
    pub stock: i64,
}

/// Values for creating an item, including its opening stock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub description: String,
    pub unit_price: f64,
    pub stock: i64,
}

/// Editable item fields. Stock is deliberately absent: it only moves through
/// transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: String,
    pub description: String,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: Id,
    pub service_number: Option<String>,
    pub address: String,
    pub date_created: NaiveDateTime,
    pub technician_id: Option<Id>,
    pub location_id: Option<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewServiceOrder {
    pub service_number: Option<String>,
    pub address: String,
    pub technician_id: Option<Id>,
    pub location_id: Option<Id>,
}

/// How a transaction relates to a service order.
///
/// Service numbers are free text: several orders may share one, and a
/// transaction may cite a number no order carries. `Linked` records the order
/// the number resolved to when the transaction was entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceRef {
    /// No service number given.
    #[default]
    None,
    /// Bound to an existing order.
    Linked { service_id: Id, service_number: String },
    /// A valid number with no matching order.
    Unlinked(String),
}

impl ServiceRef {
    pub fn service_id(&self) -> Option<Id> {
        match self {
            Self::Linked { service_id, .. } => Some(*service_id),
            _ => None,
        }
    }

    pub fn service_number(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Linked { service_number, .. } => Some(service_number),
            Self::Unlinked(number) => Some(number),
        }
    }

    /// Rebuilds the reference from its two stored columns.
    pub fn from_columns(service_id: Option<Id>, service_number: Option<String>) -> Self {
        match (service_id, service_number) {
            (Some(service_id), number) => Self::Linked {
                service_id,
                service_number: number.unwrap_or_default(),
            },
            (None, Some(number)) if !number.is_empty() => Self::Unlinked(number),
            (None, _) => Self::None,
        }
    }
}

/// A recorded install, removal, or repair. Transactions are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Id,
    pub item_id: Id,
    pub technician_id: Id,
    pub location_id: Id,
    pub service: ServiceRef,
    pub action_type: ActionType,
    pub quantity: i64,
    pub unit_price: f64,
    pub replacement_quantity: i64,
    pub timestamp: NaiveDateTime,
    /// Service address as it read when the transaction was entered.
    pub service_address: String,
    pub service_apartment: String,
}

/// Values for recording a transaction.
///
/// # Examples
///
/// ```
/// use tower_inventory_core::{ActionType, LocationDetail, NewTransaction};
///
/// let site = LocationDetail { id: 3, address: "12 Oak St".into(), apartment: "4B".into() };
/// let tx = NewTransaction::new(1, 2, 5, ActionType::Install, 4)
///     .with_service_number("12345-3")
///     .at_site(&site);
///
/// assert_eq!(tx.stock_delta(), 4);
/// assert_eq!(tx.service_apartment, "4B");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub item_id: Id,
    pub technician_id: Id,
    pub location_id: Id,
    pub action_type: ActionType,
    pub quantity: i64,
    /// Price per unit; the item's current price when absent.
    pub unit_price: Option<f64>,
    /// Parts consumed by a repair. Ignored for other action types.
    pub replacement_quantity: i64,
    pub service_number: Option<String>,
    pub service_address: String,
    pub service_apartment: String,
}

impl NewTransaction {
    pub fn new(
        item_id: Id,
        technician_id: Id,
        location_id: Id,
        action_type: ActionType,
        quantity: i64,
    ) -> Self {
        Self {
            item_id,
            technician_id,
            location_id,
            action_type,
            quantity,
            unit_price: None,
            replacement_quantity: 0,
            service_number: None,
            service_address: String::new(),
            service_apartment: String::new(),
        }
    }

    pub fn with_service_number(mut self, number: impl Into<String>) -> Self {
        self.service_number = Some(number.into());
        self
    }

    pub fn with_unit_price(mut self, price: f64) -> Self {
        self.unit_price = Some(price);
        self
    }

    pub fn with_replacement_quantity(mut self, quantity: i64) -> Self {
        self.replacement_quantity = quantity;
        self
    }

    /// Copies the site's address and unit into the transaction.
    pub fn at_site(mut self, site: &LocationDetail) -> Self {
        self.service_address = site.address.clone();
        self.service_apartment = site.apartment.clone();
        self
    }

    /// Signed change this transaction makes to the item's stock.
    pub fn stock_delta(&self) -> i64 {
        let replaced = match self.action_type {
            ActionType::Repair => self.replacement_quantity,
            _ => 0,
        };
        self.action_type.stock_delta(self.quantity, replaced)
    }
}
