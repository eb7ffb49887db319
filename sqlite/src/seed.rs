//! Sample data for trying out an empty database.
//!
//! [`InventoryStore::seed_sample_data`] adds a small crew, a few stock
//! locations, a catalog, three service orders, and installs against them.
//! Rows whose name or service number already exists are skipped, so running
//! it twice adds nothing the second time.

use tower_inventory_core::{
    ActionType, NewInventoryItem, NewInventoryLocation, NewServiceOrder, NewTransaction,
};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::InventoryStore;

const TECHNICIANS: &[&str] = &["John Smith", "Jane Doe", "Mike Johnson", "Sarah Williams"];

const LOCATIONS: &[(&str, &str)] = &[
    ("Main Office", "123 Main St, City, State 12345"),
    ("Warehouse", "456 Industrial Ave, City, State 12345"),
    ("Remote Site A", "789 Country Road, Town, State 67890"),
    ("Remote Site B", "321 Highway 1, Village, State 11111"),
];

/// `(name, description, unit_price, opening stock)`
const ITEMS: &[(&str, &str, f64, i64)] = &[
    ("Security Camera", "HD 1080p IP Camera", 299.99, 50),
    ("Door Lock", "Electronic keypad lock", 149.99, 30),
    ("Motion Sensor", "PIR motion detector", 49.99, 100),
    ("Network Cable", "Cat6 Ethernet cable per foot", 0.99, 5000),
    ("Power Supply", "12V 2A power adapter", 24.99, 75),
    ("Junction Box", "Weatherproof junction box", 19.99, 60),
    ("Control Panel", "Security system main panel", 599.99, 15),
    ("Siren", "Outdoor alarm siren", 89.99, 40),
];

/// `(service number, address, technician index, location index)`
const ORDERS: &[(&str, &str, usize, usize)] = &[
    ("12345-1", "123 Oak Street, Residential", 0, 0),
    ("12345-2", "456 Elm Avenue, Commercial Building", 1, 1),
    ("12345-3", "789 Pine Road, Industrial Complex", 0, 2),
];

/// `(item index, technician index, location index, quantity, order index)`
const INSTALLS: &[(usize, usize, usize, i64, usize)] = &[
    (0, 0, 0, 2, 0),
    (1, 0, 0, 3, 0),
    (2, 1, 1, 5, 1),
    (3, 1, 1, 150, 1),
    (4, 0, 2, 4, 2),
    (5, 0, 2, 2, 2),
];

/// Rows added by [`InventoryStore::seed_sample_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub technicians_inserted: usize,
    pub locations_inserted: usize,
    pub items_inserted: usize,
    pub service_orders_inserted: usize,
    pub transactions_inserted: usize,
    /// Rows left alone because they already existed.
    pub skipped: usize,
}

impl SeedReport {
    pub fn total_inserted(&self) -> usize {
        self.technicians_inserted
            + self.locations_inserted
            + self.items_inserted
            + self.service_orders_inserted
            + self.transactions_inserted
    }
}

impl InventoryStore {
    /// Adds the sample crew, locations, catalog, orders, and installs.
    ///
    /// Installs are only recorded when every order was newly created, so a
    /// second run never moves stock again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadOnly`](crate::StoreError::ReadOnly) in
    /// office mode, or the first store error encountered.
    pub fn seed_sample_data(&self) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        let existing_techs = self.list_technicians()?;
        let mut techs = Vec::with_capacity(TECHNICIANS.len());
        for name in TECHNICIANS {
            if let Some(tech) = existing_techs.iter().find(|t| t.name == *name) {
                report.skipped += 1;
                techs.push(tech.id);
                continue;
            }
            techs.push(self.create_technician(name)?.id);
            report.technicians_inserted += 1;
        }

        let existing_locations = self.list_locations()?;
        let mut locations = Vec::with_capacity(LOCATIONS.len());
        for (name, address) in LOCATIONS {
            if let Some(location) = existing_locations.iter().find(|l| l.name == *name) {
                report.skipped += 1;
                locations.push(location.id);
                continue;
            }
            let location = self.create_location(&NewInventoryLocation {
                name: name.to_string(),
                address: address.to_string(),
                ..Default::default()
            })?;
            report.locations_inserted += 1;
            locations.push(location.id);
        }

        let existing_items = self.list_items()?;
        let mut items = Vec::with_capacity(ITEMS.len());
        for (name, description, unit_price, stock) in ITEMS {
            if let Some(item) = existing_items.iter().find(|i| i.name == *name) {
                report.skipped += 1;
                items.push(item.id);
                continue;
            }
            let item = self.create_item(&NewInventoryItem {
                name: name.to_string(),
                description: description.to_string(),
                unit_price: *unit_price,
                stock: *stock,
            })?;
            report.items_inserted += 1;
            items.push(item.id);
        }

        for (number, address, tech, location) in ORDERS {
            if self.find_latest_service_order(number)?.is_some() {
                report.skipped += 1;
                continue;
            }
            self.create_service_order(&NewServiceOrder {
                service_number: Some(number.to_string()),
                address: address.to_string(),
                technician_id: Some(techs[*tech]),
                location_id: Some(locations[*location]),
            })?;
            report.service_orders_inserted += 1;
        }

        if report.service_orders_inserted == ORDERS.len() {
            for (item, tech, location, quantity, order) in INSTALLS {
                let new = NewTransaction::new(
                    items[*item],
                    techs[*tech],
                    locations[*location],
                    ActionType::Install,
                    *quantity,
                )
                .with_service_number(ORDERS[*order].0);
                self.record_transaction(&new)?;
                report.transactions_inserted += 1;
            }
        } else {
            debug!("Sample orders already present; skipping sample installs");
            report.skipped += INSTALLS.len();
        }

        info!(
            inserted = report.total_inserted(),
            skipped = report.skipped,
            "Seeded sample data"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rusqlite::Connection;
    use tower_inventory_core::{Mode, SystemClock, TransactionFilter};

    use super::*;
    use crate::error::StoreError;

    fn store() -> InventoryStore {
        InventoryStore::from_connection(
            Connection::open_in_memory().unwrap(),
            Mode::Maintenance,
            Arc::new(SystemClock),
        )
        .unwrap()
    }

    #[test]
    fn test_seed_fills_every_table() {
        let store = store();
        let report = store.seed_sample_data().unwrap();
        assert_eq!(report.technicians_inserted, 4);
        assert_eq!(report.locations_inserted, 4);
        assert_eq!(report.items_inserted, 8);
        assert_eq!(report.service_orders_inserted, 3);
        assert_eq!(report.transactions_inserted, 6);
        assert_eq!(report.skipped, 0);

        // Installs add to the opening stock and link to their orders.
        let camera = store
            .list_items()
            .unwrap()
            .into_iter()
            .find(|i| i.name == "Security Camera")
            .unwrap();
        assert_eq!(camera.stock, 52);
        let records = store.list_transactions(&TransactionFilter::default()).unwrap();
        assert!(records.iter().all(|r| r.linked_service_id.is_some()));
    }

    #[test]
    fn test_seed_twice_adds_nothing() {
        let store = store();
        store.seed_sample_data().unwrap();
        let before = store.status().unwrap();

        let second = store.seed_sample_data().unwrap();
        assert_eq!(second.total_inserted(), 0);
        assert_eq!(second.skipped, 4 + 4 + 8 + 3 + 6);
        assert_eq!(store.status().unwrap(), before);
    }

    #[test]
    fn test_seed_is_refused_in_office_mode() {
        let store = InventoryStore::from_connection(
            Connection::open_in_memory().unwrap(),
            Mode::Office,
            Arc::new(SystemClock),
        )
        .unwrap();
        assert!(matches!(store.seed_sample_data().unwrap_err(), StoreError::ReadOnly));
    }
}
