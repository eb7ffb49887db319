//! Conversion between SQLite rows and domain types.
//!
//! Row mappers take columns by name so they work for any `SELECT` that
//! aliases its columns to the names used here. Text columns that older
//! layouts left nullable are read as empty strings.

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tower_inventory_core::{
    ActionType, Id, InventoryItem, InventoryLocation, LocationDetail, ServiceOrder, ServiceRef,
    Technician, Transaction, TransactionRecord, parse_timestamp,
};

use crate::error::Result;

/// Reads a nullable text column as a `String`, mapping `NULL` to empty.
fn text(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(column)?.unwrap_or_default())
}

fn conversion_failure(column: &str, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{column}: {message}"),
        )),
    )
}

fn timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<chrono::NaiveDateTime> {
    let raw: String = row.get(column)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_failure(column, format!("bad timestamp '{raw}'")))
}

fn action_type(row: &Row<'_>, column: &str) -> rusqlite::Result<ActionType> {
    let raw: String = row.get(column)?;
    raw.parse()
        .map_err(|_| conversion_failure(column, format!("unknown action type '{raw}'")))
}

/// Empty strings are stored as `NULL`.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn technician(row: &Row<'_>) -> rusqlite::Result<Technician> {
    Ok(Technician {
        id: row.get("technician_id")?,
        name: row.get("name")?,
    })
}

pub(crate) fn location(row: &Row<'_>) -> rusqlite::Result<InventoryLocation> {
    Ok(InventoryLocation {
        id: row.get("location_id")?,
        name: row.get("name")?,
        address: text(row, "address")?,
        apartment: text(row, "apartment_number")?,
    })
}

pub(crate) fn location_detail(row: &Row<'_>) -> rusqlite::Result<LocationDetail> {
    Ok(LocationDetail {
        id: row.get("detail_id")?,
        address: row.get("address")?,
        apartment: text(row, "apartment_number")?,
    })
}

pub(crate) fn item(row: &Row<'_>) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get("item_id")?,
        name: row.get("name")?,
        description: text(row, "description")?,
        unit_price: row.get("unit_price")?,
        stock: row.get("stock")?,
    })
}

pub(crate) fn service_order(row: &Row<'_>) -> rusqlite::Result<ServiceOrder> {
    Ok(ServiceOrder {
        id: row.get("service_id")?,
        service_number: row
            .get::<_, Option<String>>("service_number")?
            .filter(|n| !n.is_empty()),
        address: row.get("address")?,
        date_created: timestamp(row, "date_created")?,
        technician_id: row.get("technician_id")?,
        location_id: row.get("location_id")?,
    })
}

pub(crate) fn transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get("transaction_id")?,
        item_id: row.get("item_id")?,
        technician_id: row.get("technician_id")?,
        location_id: row.get("location_id")?,
        service: ServiceRef::from_columns(row.get("service_id")?, row.get("service_number")?),
        action_type: action_type(row, "action_type")?,
        quantity: row.get("quantity")?,
        unit_price: row.get("price")?,
        replacement_quantity: row.get("replacement_quantity")?,
        timestamp: timestamp(row, "timestamp")?,
        service_address: text(row, "service_address")?,
        service_apartment: text(row, "service_apartment")?,
    })
}

/// Maps a row of the joined transaction listing.
pub(crate) fn transaction_record(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    Ok(TransactionRecord {
        id: row.get("transaction_id")?,
        timestamp: timestamp(row, "timestamp")?,
        action_type: action_type(row, "action_type")?,
        quantity: row.get("quantity")?,
        unit_price: row.get("price")?,
        item_name: row.get("item_name")?,
        technician_name: row.get("technician_name")?,
        location_name: row.get("location_name")?,
        service_number: row
            .get::<_, Option<String>>("service_number")?
            .filter(|n| !n.is_empty()),
        linked_service_id: row.get("service_id")?,
        service_address: text(row, "service_address")?,
        service_apartment: text(row, "service_apartment")?,
    })
}

/// Loads one row by primary key.
pub(crate) fn load_by_id<T>(
    conn: &Connection,
    table: &str,
    key: &str,
    id: Id,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Option<T>> {
    let row = conn
        .query_row(
            &format!("SELECT * FROM {table} WHERE {key} = ?1"),
            params![id],
            map,
        )
        .optional()?;
    Ok(row)
}

/// Counts rows in `table` whose `column` equals `value`.
pub(crate) fn count_where<V: rusqlite::ToSql>(
    conn: &Connection,
    table: &str,
    column: &str,
    value: V,
) -> Result<i64> {
    let n = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1"),
        params![value],
        |row| row.get(0),
    )?;
    Ok(n)
}
