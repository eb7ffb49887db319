//! Declarative target schema.
//!
//! The current model is described once, as data, in [`TABLES`] and
//! [`INDEXES`]. Table creation SQL is generated from it, and the migration
//! diffs an existing file against it column by column. Adding a field means
//! adding a [`ColumnDef`] here; nothing else needs an upgrade step.
//!
//! # Table structure
//!
//! - `technicians`: people who perform work
//! - `locations`: stock-holding places (warehouse, truck)
//! - `location_details`: service addresses and units
//! - `inventory_items`: stocked parts with unit price and quantity
//! - `service_orders`: jobs, keyed by a free-text, non-unique service number
//! - `transactions`: append-only install/remove/repair records
//!
//! Columns that were not part of the first released layout carry a default so
//! that they can be added to older files with `ALTER TABLE .. ADD COLUMN`.

/// SQLite type affinity, used to compare declared column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    /// Applies SQLite's affinity rules to a declared type name.
    pub(crate) fn of(declared: &str) -> Self {
        let t = declared.to_ascii_uppercase();
        if t.contains("INT") {
            Self::Integer
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            Self::Text
        } else if t.is_empty() || t.contains("BLOB") {
            Self::Blob
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            Self::Real
        } else {
            Self::Numeric
        }
    }
}

/// One column of the target schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    /// SQL literal used as the column default.
    pub default: Option<&'static str>,
    /// `table(column)` this column references.
    pub references: Option<&'static str>,
    /// Body of a `CHECK (...)` constraint.
    pub check: Option<&'static str>,
}

impl ColumnDef {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            not_null: false,
            unique: false,
            default: None,
            references: None,
            check: None,
        }
    }

    /// `INTEGER PRIMARY KEY AUTOINCREMENT` column.
    pub const fn id(name: &'static str) -> Self {
        let mut col = Self::new(name, "INTEGER");
        col.primary_key = true;
        col
    }

    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn default(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    pub const fn references(mut self, target: &'static str) -> Self {
        self.references = Some(target);
        self
    }

    pub const fn check(mut self, expr: &'static str) -> Self {
        self.check = Some(expr);
        self
    }

    /// Column definition as it appears inside `CREATE TABLE` or `ADD COLUMN`.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if let Some(check) = self.check {
            sql.push_str(&format!(" CHECK ({check})"));
        }
        if let Some(target) = self.references {
            sql.push_str(" REFERENCES ");
            sql.push_str(target);
        }
        sql
    }

    /// Why this column cannot be added to an existing table, if it cannot.
    pub(crate) fn add_column_blocker(&self) -> Option<&'static str> {
        if self.primary_key {
            Some("primary key")
        } else if self.unique {
            Some("unique constraint")
        } else if self.not_null && self.default.is_none() {
            Some("NOT NULL without default")
        } else if self.references.is_some() && self.default.is_some_and(|d| d != "NULL") {
            Some("foreign key with non-NULL default")
        } else {
            None
        }
    }

    pub(crate) fn affinity(&self) -> Affinity {
        Affinity::of(self.sql_type)
    }
}

/// One table of the target schema.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.to_sql()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.name,
            columns.join(",\n")
        )
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Secondary index of the target schema.
#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static str,
}

impl IndexDef {
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            self.name, self.table, self.columns
        )
    }
}

pub const TECHNICIANS: &str = "technicians";
pub const LOCATIONS: &str = "locations";
pub const LOCATION_DETAILS: &str = "location_details";
pub const INVENTORY_ITEMS: &str = "inventory_items";
pub const SERVICE_ORDERS: &str = "service_orders";
pub const TRANSACTIONS: &str = "transactions";

/// Tables of the current model, in dependency order.
pub const TABLES: &[TableDef] = &[
    TableDef {
        name: TECHNICIANS,
        columns: &[
            ColumnDef::id("technician_id"),
            ColumnDef::new("name", "TEXT").not_null().unique(),
        ],
    },
    TableDef {
        name: LOCATIONS,
        columns: &[
            ColumnDef::id("location_id"),
            ColumnDef::new("name", "TEXT").not_null().unique(),
            ColumnDef::new("address", "TEXT"),
            ColumnDef::new("apartment_number", "TEXT").default("''"),
        ],
    },
    TableDef {
        name: LOCATION_DETAILS,
        columns: &[
            ColumnDef::id("detail_id"),
            ColumnDef::new("address", "TEXT").not_null(),
            ColumnDef::new("apartment_number", "TEXT"),
        ],
    },
    TableDef {
        name: INVENTORY_ITEMS,
        columns: &[
            ColumnDef::id("item_id"),
            ColumnDef::new("name", "TEXT").not_null(),
            ColumnDef::new("description", "TEXT"),
            ColumnDef::new("unit_price", "REAL").not_null(),
            ColumnDef::new("stock", "INTEGER").not_null().default("0").check("stock >= 0"),
        ],
    },
    TableDef {
        name: SERVICE_ORDERS,
        columns: &[
            ColumnDef::id("service_id"),
            ColumnDef::new("service_number", "TEXT"),
            ColumnDef::new("address", "TEXT").not_null(),
            ColumnDef::new("date_created", "TEXT").not_null(),
            ColumnDef::new("technician_id", "INTEGER").references("technicians(technician_id)"),
            ColumnDef::new("location_id", "INTEGER").references("locations(location_id)"),
        ],
    },
    TableDef {
        name: TRANSACTIONS,
        columns: &[
            ColumnDef::id("transaction_id"),
            ColumnDef::new("item_id", "INTEGER")
                .not_null()
                .references("inventory_items(item_id)"),
            ColumnDef::new("technician_id", "INTEGER")
                .not_null()
                .references("technicians(technician_id)"),
            ColumnDef::new("service_id", "INTEGER").references("service_orders(service_id)"),
            ColumnDef::new("location_id", "INTEGER")
                .not_null()
                .references("locations(location_id)"),
            ColumnDef::new("action_type", "TEXT")
                .not_null()
                .check("action_type IN ('Install', 'Remove', 'Repair')"),
            ColumnDef::new("quantity", "INTEGER").not_null(),
            ColumnDef::new("price", "REAL").not_null().default("0"),
            ColumnDef::new("timestamp", "TEXT").not_null(),
            ColumnDef::new("service_number", "TEXT"),
            ColumnDef::new("service_address", "TEXT").not_null().default("''"),
            ColumnDef::new("service_apartment", "TEXT").not_null().default("''"),
            ColumnDef::new("replacement_quantity", "INTEGER").not_null().default("0"),
        ],
    },
];

pub const INDEXES: &[IndexDef] = &[
    IndexDef {
        name: "idx_service_orders_number",
        table: SERVICE_ORDERS,
        columns: "service_number, date_created",
    },
    IndexDef {
        name: "idx_transactions_timestamp",
        table: TRANSACTIONS,
        columns: "timestamp",
    },
    IndexDef {
        name: "idx_transactions_technician",
        table: TRANSACTIONS,
        columns: "technician_id",
    },
    IndexDef {
        name: "idx_transactions_item",
        table: TRANSACTIONS,
        columns: "item_id",
    },
    IndexDef {
        name: "idx_transactions_location",
        table: TRANSACTIONS,
        columns: "location_id",
    },
];

/// Looks up a table of the target schema by name.
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

/// Generates the complete SQL for a fresh database.
pub fn generate_schema_sql() -> String {
    let mut statements: Vec<String> = TABLES.iter().map(TableDef::create_sql).collect();
    statements.extend(INDEXES.iter().map(IndexDef::create_sql));
    statements.join(";\n") + ";\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_rules() {
        assert_eq!(Affinity::of("INTEGER"), Affinity::Integer);
        assert_eq!(Affinity::of("bigint"), Affinity::Integer);
        assert_eq!(Affinity::of("VARCHAR(20)"), Affinity::Text);
        assert_eq!(Affinity::of("TEXT"), Affinity::Text);
        assert_eq!(Affinity::of("REAL"), Affinity::Real);
        assert_eq!(Affinity::of("DOUBLE PRECISION"), Affinity::Real);
        assert_eq!(Affinity::of(""), Affinity::Blob);
        assert_eq!(Affinity::of("DECIMAL(10,2)"), Affinity::Numeric);
    }

    #[test]
    fn test_column_sql() {
        let col = ColumnDef::new("stock", "INTEGER").not_null().default("0").check("stock >= 0");
        assert_eq!(col.to_sql(), "stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0)");
        assert_eq!(
            ColumnDef::id("item_id").to_sql(),
            "item_id INTEGER PRIMARY KEY AUTOINCREMENT"
        );
    }

    #[test]
    fn test_add_column_blockers() {
        assert!(ColumnDef::id("x").add_column_blocker().is_some());
        assert!(ColumnDef::new("x", "TEXT").unique().add_column_blocker().is_some());
        assert!(ColumnDef::new("x", "TEXT").not_null().add_column_blocker().is_some());
        assert!(
            ColumnDef::new("x", "INTEGER")
                .references("t(id)")
                .default("1")
                .add_column_blocker()
                .is_some()
        );
        assert!(ColumnDef::new("x", "TEXT").not_null().default("''").add_column_blocker().is_none());
        assert!(ColumnDef::new("x", "INTEGER").references("t(id)").add_column_blocker().is_none());
    }

    #[test]
    fn test_every_column_added_after_first_layout_is_addable() {
        for (table, column) in [
            (LOCATIONS, "apartment_number"),
            (TRANSACTIONS, "price"),
            (TRANSACTIONS, "service_number"),
            (TRANSACTIONS, "service_address"),
            (TRANSACTIONS, "service_apartment"),
            (TRANSACTIONS, "replacement_quantity"),
        ] {
            let col = super::table(table).unwrap().column(column).unwrap();
            assert!(col.add_column_blocker().is_none(), "{table}.{column}");
        }
    }

    #[test]
    fn test_generated_schema_executes() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&generate_schema_sql()).unwrap();
        for table in TABLES {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table.name],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "{}", table.name);
        }
    }

    #[test]
    fn test_action_type_check_constraint() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&generate_schema_sql()).unwrap();
        conn.execute_batch(
            "INSERT INTO technicians (name) VALUES ('T');
             INSERT INTO locations (name) VALUES ('L');
             INSERT INTO inventory_items (name, unit_price, stock) VALUES ('I', 1.0, 5);",
        )
        .unwrap();
        let insert = |action: &str| {
            conn.execute(
                "INSERT INTO transactions (item_id, technician_id, location_id, action_type, quantity, timestamp)
                 VALUES (1, 1, 1, ?1, 1, '2024-01-01T00:00:00.000000')",
                [action],
            )
        };
        assert!(insert("Install").is_ok());
        assert!(insert("Replace").is_err());
    }
}
