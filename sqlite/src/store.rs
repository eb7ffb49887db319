//! Data-access layer over the inventory database.
//!
//! [`InventoryStore`] is the only component that reads or writes rows. It
//! enforces the model's invariants itself rather than leaning on SQLite
//! constraints: inputs are validated before any statement runs, referenced
//! rows must exist, deletes are refused while dependents remain, and stock
//! can never go negative. Every operation that touches more than one row runs
//! inside a single SQLite transaction.
//!
//! # Example
//!
//! ```no_run
//! use tower_inventory_core::{ActionType, Mode, NewInventoryItem, NewInventoryLocation, NewTransaction};
//! use tower_inventory_sqlite::InventoryStore;
//!
//! let store = InventoryStore::open("working.db", Mode::Maintenance).unwrap();
//! let tech = store.create_technician("Jane Doe").unwrap();
//! let truck = store
//!     .create_location(&NewInventoryLocation { name: "Truck 4".into(), ..Default::default() })
//!     .unwrap();
//! let item = store
//!     .create_item(&NewInventoryItem {
//!         name: "Door Lock".into(),
//!         unit_price: 149.99,
//!         stock: 30,
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! store
//!     .record_transaction(&NewTransaction::new(item.id, tech.id, truck.id, ActionType::Remove, 2))
//!     .unwrap();
//! assert_eq!(store.get_item(item.id).unwrap().stock, 28);
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tower_inventory_core::{
    ActionType, Clock, Id, InventoryItem, InventoryLocation, ItemUpdate, LocationDetail, Mode,
    NewInventoryItem, NewInventoryLocation, NewLocationDetail, NewServiceOrder, NewTransaction,
    ServiceOrder, ServiceRef, SystemClock, Technician, Transaction, TransactionFilter,
    TransactionRecord, ValidationError, check_apartment, check_non_negative, check_not_empty, check_price,
    check_quantity, check_service_number, format_timestamp,
};
use tracing::{debug, info};

use crate::convert::{self, count_where, load_by_id, non_empty};
use crate::error::{Result, StoreError};
use crate::migration::{Migration, MigrationReport, MigrationStatus, open_and_migrate, status_of};
use crate::schema::{
    INVENTORY_ITEMS, LOCATION_DETAILS, LOCATIONS, SERVICE_ORDERS, TECHNICIANS, TRANSACTIONS,
};

/// Read/write access to one inventory database file.
///
/// Opened in [`Mode::Maintenance`] the store accepts mutations; opened in
/// [`Mode::Office`] it is read-only and every mutation returns
/// [`StoreError::ReadOnly`].
pub struct InventoryStore {
    conn: Connection,
    mode: Mode,
    clock: Arc<dyn Clock>,
    migration: MigrationReport,
}

impl fmt::Debug for InventoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryStore")
            .field("mode", &self.mode)
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

impl InventoryStore {
    /// Opens the database at `path` in `mode`, migrating it first.
    pub fn open(path: impl AsRef<Path>, mode: Mode) -> Result<Self> {
        Self::open_with_clock(path, mode, Arc::new(SystemClock))
    }

    /// Like [`open`](Self::open) with an explicit time source.
    pub fn open_with_clock(path: impl AsRef<Path>, mode: Mode, clock: Arc<dyn Clock>) -> Result<Self> {
        let (conn, migration) = open_and_migrate(&path)?;
        info!(path = %path.as_ref().display(), %mode, "Opened inventory store");
        Self::finish_open(conn, mode, clock, migration)
    }

    /// Wraps an already open connection, migrating it first.
    pub fn from_connection(conn: Connection, mode: Mode, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut migration = Migration::new(conn)?;
        let report = migration.up()?;
        Self::finish_open(migration.into_connection(), mode, clock, report)
    }

    fn finish_open(
        conn: Connection,
        mode: Mode,
        clock: Arc<dyn Clock>,
        migration: MigrationReport,
    ) -> Result<Self> {
        if mode.is_read_only() {
            conn.execute_batch("PRAGMA query_only = ON;")?;
        }
        Ok(Self {
            conn,
            mode,
            clock,
            migration,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Changes made to the file when it was opened.
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    /// Row counts for every table of the model.
    pub fn status(&self) -> Result<MigrationStatus> {
        status_of(&self.conn)
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection, reporting any error SQLite raises while doing so.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| StoreError::from(e))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.mode.is_read_only() {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Fails with [`StoreError::ReferentialIntegrity`] if any dependent row
    /// references `id`.
    fn guard_delete(
        conn: &Connection,
        entity: &'static str,
        id: Id,
        dependents: &[(&'static str, &'static str)],
    ) -> Result<()> {
        for &(table, column) in dependents {
            let count = count_where(conn, table, column, id)?;
            if count > 0 {
                return Err(StoreError::ReferentialIntegrity {
                    entity,
                    id,
                    dependent: table,
                    count,
                });
            }
        }
        Ok(())
    }

    fn delete_row(
        &self,
        entity: &'static str,
        table: &str,
        key: &str,
        id: Id,
        dependents: &[(&'static str, &'static str)],
    ) -> Result<()> {
        self.ensure_writable()?;
        let tx = self.conn.unchecked_transaction()?;
        if count_where(&tx, table, key, id)? == 0 {
            return Err(StoreError::NotFound { entity, id });
        }
        Self::guard_delete(&tx, entity, id, dependents)?;
        tx.execute(&format!("DELETE FROM {table} WHERE {key} = ?1"), params![id])?;
        tx.commit()?;
        info!(entity, id, "Deleted row");
        Ok(())
    }

    fn ensure_unique_name(
        &self,
        entity: &'static str,
        table: &str,
        key: &str,
        name: &str,
        except: Option<Id>,
    ) -> Result<()> {
        let clash: Option<Id> = self
            .conn
            .query_row(
                &format!("SELECT {key} FROM {table} WHERE name = ?1"),
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match clash {
            Some(found) if Some(found) != except => Err(StoreError::AlreadyExists {
                entity,
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn require<T>(
        conn: &Connection,
        entity: &'static str,
        table: &str,
        key: &str,
        id: Id,
        map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T> {
        load_by_id(conn, table, key, id, map)?.ok_or(StoreError::NotFound { entity, id })
    }

    // =========================================================================
    // Technicians
    // =========================================================================

    pub fn create_technician(&self, name: &str) -> Result<Technician> {
        self.ensure_writable()?;
        check_not_empty("name", name)?;
        let name = name.trim();
        self.ensure_unique_name("technician", TECHNICIANS, "technician_id", name, None)?;
        self.conn
            .execute("INSERT INTO technicians (name) VALUES (?1)", params![name])?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name, "Created technician");
        Ok(Technician {
            id,
            name: name.to_string(),
        })
    }

    pub fn get_technician(&self, id: Id) -> Result<Technician> {
        Self::require(&self.conn, "technician", TECHNICIANS, "technician_id", id, convert::technician)
    }

    pub fn list_technicians(&self) -> Result<Vec<Technician>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM technicians ORDER BY name, technician_id")?;
        let rows = stmt
            .query_map([], convert::technician)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn rename_technician(&self, id: Id, name: &str) -> Result<Technician> {
        self.ensure_writable()?;
        check_not_empty("name", name)?;
        let name = name.trim();
        self.get_technician(id)?;
        self.ensure_unique_name("technician", TECHNICIANS, "technician_id", name, Some(id))?;
        self.conn.execute(
            "UPDATE technicians SET name = ?1 WHERE technician_id = ?2",
            params![name, id],
        )?;
        self.get_technician(id)
    }

    /// Deletes a technician no service order or transaction references.
    pub fn delete_technician(&self, id: Id) -> Result<()> {
        self.delete_row(
            "technician",
            TECHNICIANS,
            "technician_id",
            id,
            &[(SERVICE_ORDERS, "technician_id"), (TRANSACTIONS, "technician_id")],
        )
    }

    // =========================================================================
    // Inventory locations
    // =========================================================================

    fn check_location(location: &NewInventoryLocation) -> Result<()> {
        check_not_empty("name", &location.name)?;
        check_apartment("apartment", location.apartment.trim())?;
        Ok(())
    }

    pub fn create_location(&self, location: &NewInventoryLocation) -> Result<InventoryLocation> {
        self.ensure_writable()?;
        Self::check_location(location)?;
        let name = location.name.trim();
        self.ensure_unique_name("location", LOCATIONS, "location_id", name, None)?;
        self.conn.execute(
            "INSERT INTO locations (name, address, apartment_number) VALUES (?1, ?2, ?3)",
            params![name, location.address.trim(), location.apartment.trim()],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name, "Created location");
        self.get_location(id)
    }

    pub fn get_location(&self, id: Id) -> Result<InventoryLocation> {
        Self::require(&self.conn, "location", LOCATIONS, "location_id", id, convert::location)
    }

    pub fn list_locations(&self) -> Result<Vec<InventoryLocation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM locations ORDER BY name, location_id")?;
        let rows = stmt
            .query_map([], convert::location)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_location(&self, id: Id, location: &NewInventoryLocation) -> Result<InventoryLocation> {
        self.ensure_writable()?;
        Self::check_location(location)?;
        self.get_location(id)?;
        let name = location.name.trim();
        self.ensure_unique_name("location", LOCATIONS, "location_id", name, Some(id))?;
        self.conn.execute(
            "UPDATE locations SET name = ?1, address = ?2, apartment_number = ?3 WHERE location_id = ?4",
            params![name, location.address.trim(), location.apartment.trim(), id],
        )?;
        self.get_location(id)
    }

    /// Deletes a location no service order or transaction references.
    pub fn delete_location(&self, id: Id) -> Result<()> {
        self.delete_row(
            "location",
            LOCATIONS,
            "location_id",
            id,
            &[(SERVICE_ORDERS, "location_id"), (TRANSACTIONS, "location_id")],
        )
    }

    // =========================================================================
    // Location details (service addresses)
    // =========================================================================

    fn check_location_detail(detail: &NewLocationDetail) -> Result<()> {
        check_not_empty("address", &detail.address)?;
        check_apartment("apartment", detail.apartment.trim())?;
        Ok(())
    }

    pub fn create_location_detail(&self, detail: &NewLocationDetail) -> Result<LocationDetail> {
        self.ensure_writable()?;
        Self::check_location_detail(detail)?;
        self.conn.execute(
            "INSERT INTO location_details (address, apartment_number) VALUES (?1, ?2)",
            params![detail.address.trim(), detail.apartment.trim()],
        )?;
        self.get_location_detail(self.conn.last_insert_rowid())
    }

    pub fn get_location_detail(&self, id: Id) -> Result<LocationDetail> {
        Self::require(
            &self.conn,
            "location detail",
            LOCATION_DETAILS,
            "detail_id",
            id,
            convert::location_detail,
        )
    }

    pub fn list_location_details(&self) -> Result<Vec<LocationDetail>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM location_details ORDER BY address, apartment_number, detail_id")?;
        let rows = stmt
            .query_map([], convert::location_detail)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Updates a service address. Transactions already recorded keep the
    /// address they copied.
    pub fn update_location_detail(&self, id: Id, detail: &NewLocationDetail) -> Result<LocationDetail> {
        self.ensure_writable()?;
        Self::check_location_detail(detail)?;
        self.get_location_detail(id)?;
        self.conn.execute(
            "UPDATE location_details SET address = ?1, apartment_number = ?2 WHERE detail_id = ?3",
            params![detail.address.trim(), detail.apartment.trim(), id],
        )?;
        self.get_location_detail(id)
    }

    /// Deletes a service address. Nothing links to it, so this never blocks.
    pub fn delete_location_detail(&self, id: Id) -> Result<()> {
        self.delete_row("location detail", LOCATION_DETAILS, "detail_id", id, &[])
    }

    // =========================================================================
    // Inventory items
    // =========================================================================

    pub fn create_item(&self, item: &NewInventoryItem) -> Result<InventoryItem> {
        self.ensure_writable()?;
        check_not_empty("name", &item.name)?;
        check_price("unit_price", item.unit_price)?;
        check_non_negative("stock", item.stock)?;
        self.conn.execute(
            "INSERT INTO inventory_items (name, description, unit_price, stock) VALUES (?1, ?2, ?3, ?4)",
            params![item.name.trim(), item.description.trim(), item.unit_price, item.stock],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name = item.name.trim(), stock = item.stock, "Created item");
        self.get_item(id)
    }

    pub fn get_item(&self, id: Id) -> Result<InventoryItem> {
        Self::require(&self.conn, "item", INVENTORY_ITEMS, "item_id", id, convert::item)
    }

    pub fn list_items(&self) -> Result<Vec<InventoryItem>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM inventory_items ORDER BY name, item_id")?;
        let rows = stmt
            .query_map([], convert::item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Updates name, description, and price. Stock is left alone.
    pub fn update_item(&self, id: Id, update: &ItemUpdate) -> Result<InventoryItem> {
        self.ensure_writable()?;
        check_not_empty("name", &update.name)?;
        check_price("unit_price", update.unit_price)?;
        self.get_item(id)?;
        self.conn.execute(
            "UPDATE inventory_items SET name = ?1, description = ?2, unit_price = ?3 WHERE item_id = ?4",
            params![update.name.trim(), update.description.trim(), update.unit_price, id],
        )?;
        self.get_item(id)
    }

    /// Deletes an item no transaction references.
    pub fn delete_item(&self, id: Id) -> Result<()> {
        self.delete_row("item", INVENTORY_ITEMS, "item_id", id, &[(TRANSACTIONS, "item_id")])
    }

    // =========================================================================
    // Service orders
    // =========================================================================

    /// Creates a service order stamped with the current time.
    ///
    /// The service number is optional and need not be unique.
    pub fn create_service_order(&self, order: &NewServiceOrder) -> Result<ServiceOrder> {
        self.ensure_writable()?;
        let number = non_empty(order.service_number.as_deref());
        if let Some(number) = number {
            check_service_number("service_number", number)?;
        }
        check_not_empty("address", &order.address)?;
        if let Some(id) = order.technician_id {
            self.get_technician(id)?;
        }
        if let Some(id) = order.location_id {
            self.get_location(id)?;
        }

        let created = self.clock.now();
        self.conn.execute(
            "INSERT INTO service_orders (service_number, address, date_created, technician_id, location_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                number,
                order.address.trim(),
                format_timestamp(&created),
                order.technician_id,
                order.location_id,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, service_number = ?number, "Created service order");
        self.get_service_order(id)
    }

    pub fn get_service_order(&self, id: Id) -> Result<ServiceOrder> {
        Self::require(
            &self.conn,
            "service order",
            SERVICE_ORDERS,
            "service_id",
            id,
            convert::service_order,
        )
    }

    /// Lists service orders, newest first.
    pub fn list_service_orders(&self) -> Result<Vec<ServiceOrder>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM service_orders ORDER BY date_created DESC, service_id DESC")?;
        let rows = stmt
            .query_map([], convert::service_order)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Most recently created order carrying exactly `number`.
    ///
    /// Ties on creation time go to the higher id.
    pub fn find_latest_service_order(&self, number: &str) -> Result<Option<ServiceOrder>> {
        latest_service_order(&self.conn, number)
    }

    /// Resolves a service number into a [`ServiceRef`].
    ///
    /// Empty input gives [`ServiceRef::None`]; a number some order carries is
    /// linked to the most recent such order; any other valid number stays
    /// [`ServiceRef::Unlinked`].
    pub fn resolve_service_ref(&self, number: Option<&str>) -> Result<ServiceRef> {
        resolve_service_ref(&self.conn, number)
    }

    /// Deletes a service order no transaction is linked to.
    pub fn delete_service_order(&self, id: Id) -> Result<()> {
        self.delete_row(
            "service order",
            SERVICE_ORDERS,
            "service_id",
            id,
            &[(TRANSACTIONS, "service_id")],
        )
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Records a transaction and applies its stock change atomically.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] for a non-positive quantity, a negative
    ///   replacement quantity or price, a malformed service number or
    ///   apartment, or a change that overflows the stock count.
    /// - [`StoreError::NotFound`] if the item, technician, or location does
    ///   not exist.
    /// - [`StoreError::InsufficientStock`] if a decrease would take stock
    ///   below zero. Nothing is written in that case.
    pub fn record_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        self.ensure_writable()?;
        check_quantity("quantity", new.quantity)?;
        if new.action_type == ActionType::Repair {
            check_non_negative("replacement_quantity", new.replacement_quantity)?;
        }
        let number = non_empty(new.service_number.as_deref());
        if let Some(number) = number {
            check_service_number("service_number", number)?;
        }
        check_apartment("service_apartment", new.service_apartment.trim())?;
        if let Some(price) = new.unit_price {
            check_price("unit_price", price)?;
        }

        let tx = self.conn.unchecked_transaction()?;
        let item = Self::require(&tx, "item", INVENTORY_ITEMS, "item_id", new.item_id, convert::item)?;
        Self::require(
            &tx,
            "technician",
            TECHNICIANS,
            "technician_id",
            new.technician_id,
            convert::technician,
        )?;
        Self::require(&tx, "location", LOCATIONS, "location_id", new.location_id, convert::location)?;
        let service = resolve_service_ref(&tx, number)?;

        let delta = new.stock_delta();
        let stock = item
            .stock
            .checked_add(delta)
            .ok_or(ValidationError::OutOfRange {
                field: "quantity",
                value: new.quantity,
            })?;
        // Only decreases are held to zero; increases always apply.
        if delta < 0 && stock < 0 {
            return Err(StoreError::InsufficientStock {
                item_id: item.id,
                available: item.stock,
                requested: -delta,
            });
        }

        let replacement = match new.action_type {
            ActionType::Repair => new.replacement_quantity,
            _ => 0,
        };
        let timestamp = self.clock.now();
        tx.execute(
            "INSERT INTO transactions (
                item_id, technician_id, service_id, location_id, action_type, quantity, price,
                timestamp, service_number, service_address, service_apartment, replacement_quantity
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                new.item_id,
                new.technician_id,
                service.service_id(),
                new.location_id,
                new.action_type.as_str(),
                new.quantity,
                new.unit_price.unwrap_or(item.unit_price),
                format_timestamp(&timestamp),
                service.service_number(),
                new.service_address.trim(),
                new.service_apartment.trim(),
                replacement,
            ],
        )?;
        let id = tx.last_insert_rowid();
        if delta != 0 {
            tx.execute(
                "UPDATE inventory_items SET stock = stock + ?1 WHERE item_id = ?2",
                params![delta, item.id],
            )?;
        }
        tx.commit()?;

        info!(
            id,
            item = item.id,
            action = %new.action_type,
            quantity = new.quantity,
            stock,
            "Recorded transaction"
        );
        self.get_transaction(id)
    }

    pub fn get_transaction(&self, id: Id) -> Result<Transaction> {
        Self::require(
            &self.conn,
            "transaction",
            TRANSACTIONS,
            "transaction_id",
            id,
            convert::transaction,
        )
    }

    /// Lists transactions matching `filter`, newest first, joined with the
    /// names they reference.
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<TransactionRecord>> {
        let (clause, values) = filter_clause(filter);
        let sql = format!(
            "SELECT t.transaction_id, t.timestamp, t.action_type, t.quantity, t.price,
                    t.service_id, t.service_number, t.service_address, t.service_apartment,
                    i.name AS item_name, tech.name AS technician_name, l.name AS location_name
             FROM transactions t
             JOIN inventory_items i ON t.item_id = i.item_id
             JOIN technicians tech ON t.technician_id = tech.technician_id
             JOIN locations l ON t.location_id = l.location_id
             {clause}
             ORDER BY t.timestamp DESC, t.transaction_id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), convert::transaction_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn latest_service_order(conn: &Connection, number: &str) -> Result<Option<ServiceOrder>> {
    let order = conn
        .query_row(
            "SELECT * FROM service_orders WHERE service_number = ?1
             ORDER BY date_created DESC, service_id DESC LIMIT 1",
            params![number],
            convert::service_order,
        )
        .optional()?;
    Ok(order)
}

fn resolve_service_ref(conn: &Connection, number: Option<&str>) -> Result<ServiceRef> {
    let Some(number) = non_empty(number) else {
        return Ok(ServiceRef::None);
    };
    check_service_number("service_number", number)?;
    Ok(match latest_service_order(conn, number)? {
        Some(order) => ServiceRef::Linked {
            service_id: order.id,
            service_number: number.to_string(),
        },
        None => ServiceRef::Unlinked(number.to_string()),
    })
}

/// Builds a `WHERE` clause (over alias `t`) and its parameters.
///
/// Each condition carries one `?`, renumbered as it is added.
pub(crate) fn filter_clause(filter: &TransactionFilter) -> (String, Vec<rusqlite::types::Value>) {
    use rusqlite::types::Value;

    let mut conditions = Vec::new();
    let mut values = Vec::new();
    let mut push = |condition: &str, value: Value| {
        values.push(value);
        conditions.push(condition.replace('?', &format!("?{}", values.len())));
    };

    if let Some(id) = filter.technician_id {
        push("t.technician_id = ?", Value::Integer(id));
    }
    if let Some(id) = filter.location_id {
        push("t.location_id = ?", Value::Integer(id));
    }
    if let Some(id) = filter.item_id {
        push("t.item_id = ?", Value::Integer(id));
    }
    if let Some(id) = filter.service_id {
        push("t.service_id = ?", Value::Integer(id));
    }
    if let Some(action) = filter.action_type {
        push("t.action_type = ?", Value::Text(action.as_str().to_string()));
    }
    if let Some(from) = &filter.date_from {
        push("t.timestamp >= ?", Value::Text(format_timestamp(from)));
    }
    if let Some(to) = &filter.date_to {
        push("t.timestamp <= ?", Value::Text(format_timestamp(to)));
    }
    if let Some(needle) = non_empty(filter.service_number_contains.as_deref()) {
        push(
            "instr(lower(COALESCE(t.service_number, '')), lower(?)) > 0",
            Value::Text(needle.to_string()),
        );
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}
