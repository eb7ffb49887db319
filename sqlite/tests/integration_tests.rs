//! Integration tests for the tower-inventory-sqlite crate.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rusqlite::Connection;
use tower_inventory_core::{
    ActionType, FixedClock, InventoryItem, InventoryLocation, Mode, NewInventoryItem,
    NewInventoryLocation, NewLocationDetail, NewServiceOrder, NewTransaction, ServiceRef,
    Technician, TransactionFilter, ValidationError,
};
use tower_inventory_sqlite::{InventoryStore, SchemaError, StoreError, open_and_migrate};

/// Layout written by the first release: no apartment columns, no service
/// snapshot on transactions.
const LEGACY_LAYOUT: &str = "
    CREATE TABLE technicians (
        technician_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE locations (
        location_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        address TEXT
    );
    CREATE TABLE location_details (
        detail_id INTEGER PRIMARY KEY AUTOINCREMENT,
        address TEXT NOT NULL,
        apartment_number TEXT
    );
    CREATE TABLE inventory_items (
        item_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        unit_price REAL NOT NULL,
        stock INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE service_orders (
        service_id INTEGER PRIMARY KEY AUTOINCREMENT,
        service_number TEXT,
        address TEXT NOT NULL,
        date_created TEXT NOT NULL,
        technician_id INTEGER,
        location_id INTEGER
    );
    CREATE TABLE transactions (
        transaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id INTEGER NOT NULL,
        technician_id INTEGER NOT NULL,
        service_id INTEGER,
        location_id INTEGER NOT NULL,
        action_type TEXT NOT NULL CHECK(action_type IN ('Install', 'Remove', 'Repair')),
        quantity INTEGER NOT NULL,
        price REAL NOT NULL,
        timestamp TEXT NOT NULL
    );
    CREATE TABLE properties (property_id INTEGER PRIMARY KEY, label TEXT);

    INSERT INTO technicians (name) VALUES ('John Smith');
    INSERT INTO locations (name, address) VALUES ('Main Warehouse', '456 Industrial Ave');
    INSERT INTO inventory_items (name, description, unit_price, stock)
        VALUES ('Smoke Detector', 'Battery powered', 29.99, 40);
    INSERT INTO transactions (item_id, technician_id, location_id, action_type, quantity, price, timestamp)
        VALUES (1, 1, 1, 'Remove', 2, 29.99, '2023-11-02T14:30:00.000000');
";

fn start_of_march() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

struct Fixture {
    store: InventoryStore,
    clock: Arc<FixedClock>,
    tech: Technician,
    truck: InventoryLocation,
    lock: InventoryItem,
}

fn fixture() -> Fixture {
    let clock = Arc::new(FixedClock::new(start_of_march()));
    let conn = Connection::open_in_memory().unwrap();
    let store = InventoryStore::from_connection(conn, Mode::Maintenance, clock.clone()).unwrap();
    let tech = store.create_technician("Jane Doe").unwrap();
    let truck = store
        .create_location(&NewInventoryLocation {
            name: "Truck 4".into(),
            ..Default::default()
        })
        .unwrap();
    let lock = store
        .create_item(&NewInventoryItem {
            name: "Door Lock".into(),
            description: "Keyed deadbolt".into(),
            unit_price: 149.99,
            stock: 10,
        })
        .unwrap();
    Fixture {
        store,
        clock,
        tech,
        truck,
        lock,
    }
}

// ============================================================================
// Migration on disk
// ============================================================================

#[test]
fn test_reopen_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("working.db");

    let (_, first) = open_and_migrate(&path).unwrap();
    assert_eq!(first.created_tables.len(), 6);

    let (conn, second) = open_and_migrate(&path).unwrap();
    assert!(second.is_empty());
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(tables, 6);
}

#[test]
fn test_legacy_file_upgrades_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("working.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch(LEGACY_LAYOUT)
        .unwrap();

    let store = InventoryStore::open(&path, Mode::Maintenance).unwrap();
    let report = store.migration_report();
    assert!(report.created_tables.is_empty());
    assert!(report.added_columns.contains(&"locations.apartment_number".to_string()));
    assert!(report.added_columns.contains(&"transactions.service_address".to_string()));
    assert!(report.added_columns.contains(&"transactions.replacement_quantity".to_string()));
    assert_eq!(report.ignored_tables, vec!["properties".to_string()]);

    // Existing rows survive with defaults in the new columns.
    let warehouse = store.get_location(1).unwrap();
    assert_eq!(warehouse.address, "456 Industrial Ave");
    assert_eq!(warehouse.apartment, "");
    let old = store.get_transaction(1).unwrap();
    assert_eq!(old.service, ServiceRef::None);
    assert_eq!(old.replacement_quantity, 0);
    assert_eq!(old.service_address, "");
    assert_eq!(store.get_item(1).unwrap().stock, 40);

    let listed = store.list_transactions(&TransactionFilter::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].technician_name, "John Smith");
}

#[test]
fn test_unique_service_number_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("working.db");
    let layout = LEGACY_LAYOUT.replace(
        "service_number TEXT,\n        address",
        "service_number TEXT NOT NULL UNIQUE,\n        address",
    );
    Connection::open(&path).unwrap().execute_batch(&layout).unwrap();

    let err = InventoryStore::open(&path, Mode::Maintenance).unwrap_err();
    match err {
        StoreError::Schema(schema) => {
            assert_eq!(schema.table(), "service_orders");
            assert_eq!(schema.column(), "service_number");
            assert!(matches!(schema, SchemaError::UnexpectedNotNull { .. }));
        }
        other => panic!("expected schema error, got {other:?}"),
    }

    // Nothing was applied.
    let conn = Connection::open(&path).unwrap();
    let columns: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('locations') WHERE name = 'apartment_number'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(columns, 0);
}

// ============================================================================
// Stock
// ============================================================================

#[test]
fn test_stock_follows_actions() {
    let f = fixture();
    let record = |action, quantity| {
        f.store
            .record_transaction(&NewTransaction::new(
                f.lock.id, f.tech.id, f.truck.id, action, quantity,
            ))
            .unwrap()
    };

    record(ActionType::Install, 5);
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, 15);
    record(ActionType::Remove, 4);
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, 11);
    record(ActionType::Repair, 3);
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, 11);

    f.store
        .record_transaction(
            &NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Repair, 1)
                .with_replacement_quantity(2),
        )
        .unwrap();
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, 9);
}

#[test]
fn test_insufficient_stock_writes_nothing() {
    let f = fixture();
    let err = f
        .store
        .record_transaction(&NewTransaction::new(
            f.lock.id,
            f.tech.id,
            f.truck.id,
            ActionType::Remove,
            11,
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientStock {
            available: 10,
            requested: 11,
            ..
        }
    ));
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, 10);
    assert_eq!(f.store.status().unwrap().transaction_count, 0);

    // Removing everything is fine.
    f.store
        .record_transaction(&NewTransaction::new(
            f.lock.id,
            f.tech.id,
            f.truck.id,
            ActionType::Remove,
            10,
        ))
        .unwrap();
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, 0);
}

#[test]
fn test_invalid_transactions_are_rejected() {
    let f = fixture();
    let base = NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Install, 1);

    let zero = NewTransaction { quantity: 0, ..base.clone() };
    assert!(matches!(
        f.store.record_transaction(&zero).unwrap_err(),
        StoreError::Validation(ValidationError::NonPositive { .. })
    ));

    let bad_number = base.clone().with_service_number("1234-1");
    assert!(matches!(
        f.store.record_transaction(&bad_number).unwrap_err(),
        StoreError::Validation(ValidationError::ServiceNumberFormat { .. })
    ));

    let bad_suffix = base.clone().with_service_number("12345-21");
    assert!(f.store.record_transaction(&bad_suffix).is_err());

    let missing_item = NewTransaction { item_id: 999, ..base };
    assert!(matches!(
        f.store.record_transaction(&missing_item).unwrap_err(),
        StoreError::NotFound { entity: "item", id: 999 }
    ));
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, 10);
}

#[test]
fn test_quantity_overflowing_stock_is_rejected() {
    let f = fixture();
    let huge = NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Install, i64::MAX);
    assert!(matches!(
        f.store.record_transaction(&huge).unwrap_err(),
        StoreError::Validation(ValidationError::OutOfRange { field: "quantity", .. })
    ));
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, 10);
    assert_eq!(f.store.status().unwrap().transaction_count, 0);
}

#[test]
fn test_install_restocks_negative_legacy_stock() {
    let f = fixture();
    f.store
        .connection()
        .execute("UPDATE inventory_items SET stock = -5 WHERE item_id = ?1", [f.lock.id])
        .unwrap();

    let install = NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Install, 2);
    f.store.record_transaction(&install).unwrap();
    assert_eq!(f.store.get_item(f.lock.id).unwrap().stock, -3);

    // Decreases are still refused while stock is below zero.
    let remove = NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Remove, 1);
    assert!(matches!(
        f.store.record_transaction(&remove).unwrap_err(),
        StoreError::InsufficientStock { available: -3, requested: 1, .. }
    ));
}

#[test]
fn test_explicit_price_overrides_item_price() {
    let f = fixture();
    let tx = f
        .store
        .record_transaction(
            &NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Install, 1)
                .with_unit_price(120.0),
        )
        .unwrap();
    assert_eq!(tx.unit_price, 120.0);

    let default_priced = f
        .store
        .record_transaction(&NewTransaction::new(
            f.lock.id,
            f.tech.id,
            f.truck.id,
            ActionType::Install,
            1,
        ))
        .unwrap();
    assert_eq!(default_priced.unit_price, 149.99);
}

// ============================================================================
// Service orders
// ============================================================================

#[test]
fn test_transaction_binds_to_latest_order() {
    let f = fixture();
    let order = |address: &str| NewServiceOrder {
        service_number: Some("12345-1".into()),
        address: address.into(),
        technician_id: Some(f.tech.id),
        location_id: None,
    };

    let first = f.store.create_service_order(&order("1 First St")).unwrap();
    f.clock.advance(TimeDelta::hours(2));
    let second = f.store.create_service_order(&order("2 Second St")).unwrap();
    assert!(second.date_created > first.date_created);

    let latest = f.store.find_latest_service_order("12345-1").unwrap().unwrap();
    assert_eq!(latest.id, second.id);

    let site = f
        .store
        .create_location_detail(&NewLocationDetail {
            address: "2 Second St".into(),
            apartment: "4B".into(),
        })
        .unwrap();
    let tx = f
        .store
        .record_transaction(
            &NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Install, 1)
                .with_service_number("12345-1")
                .at_site(&site),
        )
        .unwrap();
    assert_eq!(
        tx.service,
        ServiceRef::Linked {
            service_id: second.id,
            service_number: "12345-1".into()
        }
    );
    assert_eq!(tx.service_apartment, "4B");

    let unlinked = f
        .store
        .record_transaction(
            &NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Install, 1)
                .with_service_number("99999-20"),
        )
        .unwrap();
    assert_eq!(unlinked.service, ServiceRef::Unlinked("99999-20".into()));
}

#[test]
fn test_orders_tie_break_on_id() {
    let f = fixture();
    let order = NewServiceOrder {
        service_number: Some("54321-3".into()),
        address: "9 Elm".into(),
        ..Default::default()
    };
    f.store.create_service_order(&order).unwrap();
    let later = f.store.create_service_order(&order).unwrap();
    assert_eq!(
        f.store.find_latest_service_order("54321-3").unwrap().unwrap().id,
        later.id
    );
    assert_eq!(f.store.list_service_orders().unwrap()[0].id, later.id);
}

#[test]
fn test_order_without_number() {
    let f = fixture();
    let order = f
        .store
        .create_service_order(&NewServiceOrder {
            service_number: Some(String::new()),
            address: "77 Pine".into(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(order.service_number, None);
    assert!(matches!(
        f.store
            .create_service_order(&NewServiceOrder {
                address: "77 Pine".into(),
                technician_id: Some(404),
                ..Default::default()
            })
            .unwrap_err(),
        StoreError::NotFound { entity: "technician", .. }
    ));
}

// ============================================================================
// Referential integrity
// ============================================================================

#[test]
fn test_referenced_technician_cannot_be_deleted() {
    let f = fixture();
    f.store
        .record_transaction(&NewTransaction::new(
            f.lock.id,
            f.tech.id,
            f.truck.id,
            ActionType::Install,
            1,
        ))
        .unwrap();

    let err = f.store.delete_technician(f.tech.id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::ReferentialIntegrity {
            entity: "technician",
            dependent: "transactions",
            count: 1,
            ..
        }
    ));
    assert_eq!(f.store.get_technician(f.tech.id).unwrap().name, "Jane Doe");
    assert!(f.store.delete_item(f.lock.id).is_err());
    assert!(f.store.delete_location(f.truck.id).is_err());

    let idle = f.store.create_technician("Idle Ian").unwrap();
    f.store.delete_technician(idle.id).unwrap();
    assert!(matches!(
        f.store.get_technician(idle.id).unwrap_err(),
        StoreError::NotFound { .. }
    ));
}

#[test]
fn test_order_with_transactions_cannot_be_deleted() {
    let f = fixture();
    let order = f
        .store
        .create_service_order(&NewServiceOrder {
            service_number: Some("11111-1".into()),
            address: "1 Main".into(),
            technician_id: Some(f.tech.id),
            ..Default::default()
        })
        .unwrap();

    // The order alone blocks deleting its technician.
    assert!(matches!(
        f.store.delete_technician(f.tech.id).unwrap_err(),
        StoreError::ReferentialIntegrity { dependent: "service_orders", .. }
    ));

    f.store
        .record_transaction(
            &NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Repair, 1)
                .with_service_number("11111-1"),
        )
        .unwrap();
    assert!(f.store.delete_service_order(order.id).is_err());
}

#[test]
fn test_location_detail_delete_never_blocks() {
    let f = fixture();
    let site = f
        .store
        .create_location_detail(&NewLocationDetail {
            address: "5 Oak".into(),
            apartment: String::new(),
        })
        .unwrap();
    f.store
        .record_transaction(
            &NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Install, 1)
                .at_site(&site),
        )
        .unwrap();
    f.store.delete_location_detail(site.id).unwrap();
    assert!(f.store.list_location_details().unwrap().is_empty());
    // The transaction kept its own copy of the address.
    let listed = f.store.list_transactions(&TransactionFilter::default()).unwrap();
    assert_eq!(listed[0].service_address, "5 Oak");
}

// ============================================================================
// Office mode
// ============================================================================

#[test]
fn test_office_mode_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory_snapshot.db");
    {
        let store = InventoryStore::open(&path, Mode::Maintenance).unwrap();
        store.create_technician("Jane Doe").unwrap();
        store.close().unwrap();
    }

    let office = InventoryStore::open(&path, Mode::Office).unwrap();
    assert_eq!(office.list_technicians().unwrap().len(), 1);
    assert!(matches!(
        office.create_technician("Bob").unwrap_err(),
        StoreError::ReadOnly
    ));
    assert!(matches!(
        office.delete_technician(1).unwrap_err(),
        StoreError::ReadOnly
    ));
    // Raw writes are refused by SQLite as well.
    assert!(
        office
            .connection()
            .execute("DELETE FROM technicians", [])
            .is_err()
    );
}

// ============================================================================
// Listing and reports
// ============================================================================

#[test]
fn test_filters_and_summaries() {
    let f = fixture();
    let bob = f.store.create_technician("Bob Brown").unwrap();
    let smoke = f
        .store
        .create_item(&NewInventoryItem {
            name: "Smoke Detector".into(),
            unit_price: 20.0,
            stock: 50,
            ..Default::default()
        })
        .unwrap();

    f.store
        .record_transaction(
            &NewTransaction::new(f.lock.id, f.tech.id, f.truck.id, ActionType::Install, 2)
                .with_unit_price(100.0)
                .with_service_number("12345-4"),
        )
        .unwrap();
    f.clock.advance(TimeDelta::days(1));
    f.store
        .record_transaction(&NewTransaction::new(
            smoke.id,
            bob.id,
            f.truck.id,
            ActionType::Remove,
            5,
        ))
        .unwrap();
    f.store
        .record_transaction(&NewTransaction::new(
            smoke.id,
            f.tech.id,
            f.truck.id,
            ActionType::Remove,
            1,
        ))
        .unwrap();

    let all = f.store.list_transactions(&TransactionFilter::default()).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].technician_name, "Jane Doe");
    assert_eq!(all[2].item_name, "Door Lock");

    let bobs = f
        .store
        .list_transactions(&TransactionFilter::default().technician(bob.id))
        .unwrap();
    assert_eq!(bobs.len(), 1);
    let by_number = f
        .store
        .list_transactions(&TransactionFilter {
            service_number_contains: Some("345-4".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].service_number.as_deref(), Some("12345-4"));

    let first_day = start_of_march().date();
    let day_one = f
        .store
        .list_transactions(&TransactionFilter::default().days(first_day, first_day))
        .unwrap();
    assert_eq!(day_one.len(), 1);

    let by_action = f.store.summary_by_action(&TransactionFilter::default()).unwrap();
    assert_eq!(by_action.len(), 3);
    assert_eq!(by_action[0].action_type, ActionType::Install);
    assert_eq!(by_action[0].totals.quantity, 2);
    assert_eq!(by_action[0].totals.value, 200.0);
    assert_eq!(by_action[1].totals.count, 2);
    assert_eq!(by_action[1].totals.quantity, 6);
    assert_eq!(by_action[2].totals.count, 0);

    let by_tech = f
        .store
        .summary_by_technician(&TransactionFilter::default())
        .unwrap();
    let names: Vec<_> = by_tech.iter().map(|s| s.technician_name.as_str()).collect();
    assert_eq!(names, ["Bob Brown", "Jane Doe"]);
    assert_eq!(by_tech[1].totals.count, 2);

    let by_day = f.store.summary_by_day(&TransactionFilter::default()).unwrap();
    assert_eq!(by_day.len(), 2);
    assert_eq!(by_day[0].day, first_day);
    assert_eq!(by_day[1].totals.quantity, 6);
}
