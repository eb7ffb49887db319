//! Additive migration from any earlier layout to the declared schema.
//!
//! [`Migration`] inspects an existing database (`sqlite_master`,
//! `PRAGMA table_info`, `PRAGMA index_list`), diffs it against
//! [`TABLES`](crate::schema::TABLES), and applies the difference:
//! missing tables are created, missing columns are added with their declared
//! default. Nothing is ever dropped or renamed. Structures that cannot be
//! reconciled additively are reported as [`SchemaError`] and nothing is
//! applied.
//!
//! Running the migration on an up-to-date file is a no-op.
//!
//! # Example
//!
//! ```no_run
//! use tower_inventory_sqlite::Migration;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("working.db").unwrap();
//! let mut migration = Migration::new(conn).unwrap();
//!
//! let report = migration.up().unwrap();
//! println!("created {} tables, added {} columns",
//!     report.created_tables.len(), report.added_columns.len());
//!
//! let status = migration.status().unwrap();
//! println!("transactions: {}", status.transaction_count);
//! ```

use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, SchemaError};
use crate::schema::{
    self, ColumnDef, INDEXES, INVENTORY_ITEMS, LOCATION_DETAILS, LOCATIONS, SERVICE_ORDERS,
    TABLES, TECHNICIANS, TRANSACTIONS, TableDef,
};

/// Opens (or creates) the database at `path` and migrates it.
///
/// # Errors
///
/// Returns [`StoreError::Schema`](crate::StoreError::Schema) when the file
/// holds a structure that conflicts with the declared schema; the file is
/// left untouched in that case.
pub fn open_and_migrate(path: impl AsRef<Path>) -> Result<(Connection, MigrationReport)> {
    let path = path.as_ref();
    let conn = Connection::open(path)?;
    let mut migration = Migration::new(conn)?;
    let report = migration.up()?;
    if report.is_empty() {
        debug!(path = %path.display(), "Schema up to date");
    } else {
        info!(
            path = %path.display(),
            created = report.created_tables.len(),
            added = report.added_columns.len(),
            "Migrated database schema"
        );
    }
    Ok((migration.into_connection(), report))
}

/// A single additive change.
#[derive(Debug, Clone, Copy)]
enum Step {
    CreateTable(&'static TableDef),
    AddColumn(&'static TableDef, &'static ColumnDef),
}

/// Column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone)]
struct ExistingColumn {
    name: String,
    declared_type: String,
    not_null: bool,
    has_default: bool,
    primary_key: bool,
}

/// Manages the schema of an inventory database.
pub struct Migration {
    conn: Connection,
}

impl Migration {
    /// Wraps a connection and enables foreign key enforcement on it.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Brings the database up to the declared schema.
    ///
    /// All steps run in one transaction: on any error the database is
    /// unchanged.
    pub fn up(&mut self) -> Result<MigrationReport> {
        let (steps, ignored_tables) = self.plan()?;

        let tx = self.conn.transaction()?;
        let mut report = MigrationReport {
            ignored_tables,
            ..MigrationReport::default()
        };
        for step in steps {
            match step {
                Step::CreateTable(table) => {
                    debug!(table = table.name, "Creating table");
                    tx.execute_batch(&table.create_sql())?;
                    report.created_tables.push(table.name.to_string());
                }
                Step::AddColumn(table, column) => {
                    debug!(table = table.name, column = column.name, "Adding column");
                    tx.execute_batch(&format!(
                        "ALTER TABLE {} ADD COLUMN {}",
                        table.name,
                        column.to_sql()
                    ))?;
                    report
                        .added_columns
                        .push(format!("{}.{}", table.name, column.name));
                }
            }
        }
        for index in INDEXES {
            tx.execute_batch(&index.create_sql())?;
        }
        tx.commit()?;

        for table in &report.ignored_tables {
            debug!(table = %table, "Ignoring table outside the current model");
        }
        Ok(report)
    }

    /// Computes the pending steps without applying them.
    ///
    /// Returns `(steps, ignored_tables)`, or the first conflict found.
    fn plan(&self) -> Result<(Vec<Step>, Vec<String>)> {
        let existing = existing_tables(&self.conn)?;
        let mut steps = Vec::new();

        for table in TABLES {
            if !existing.contains(table.name) {
                steps.push(Step::CreateTable(table));
                continue;
            }
            let columns = table_columns(&self.conn, table.name)?;
            let unique = unique_columns(&self.conn, table.name)?;

            for target in table.columns {
                match columns.iter().find(|c| c.name.eq_ignore_ascii_case(target.name)) {
                    Some(found) => check_compatible(table, target, found, &unique)?,
                    None => {
                        if let Some(reason) = target.add_column_blocker() {
                            return Err(SchemaError::CannotAddColumn {
                                table: table.name.to_string(),
                                column: target.name.to_string(),
                                reason,
                            }
                            .into());
                        }
                        steps.push(Step::AddColumn(table, target));
                    }
                }
            }

            // Extra columns are kept, but inserts cannot fill a required one.
            for found in &columns {
                let declared = table
                    .columns
                    .iter()
                    .any(|c| c.name.eq_ignore_ascii_case(&found.name));
                if !declared
                    && found.not_null
                    && !found.has_default
                    && !found.primary_key
                {
                    return Err(SchemaError::UnknownRequiredColumn {
                        table: table.name.to_string(),
                        column: found.name.clone(),
                    }
                    .into());
                }
            }
        }

        let mut ignored: Vec<String> = existing
            .into_iter()
            .filter(|name| schema::table(name).is_none())
            .collect();
        ignored.sort();
        Ok((steps, ignored))
    }

    /// Returns whether the model's tables exist and how many rows each holds.
    pub fn status(&self) -> Result<MigrationStatus> {
        status_of(&self.conn)
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

pub(crate) fn status_of(conn: &Connection) -> Result<MigrationStatus> {
    let existing = existing_tables(conn)?;
    let count = |table: &str| -> Result<usize> {
        if !existing.contains(table) {
            return Ok(0);
        }
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n as usize)
    };

    Ok(MigrationStatus {
        tables_exist: TABLES.iter().all(|t| existing.contains(t.name)),
        technician_count: count(TECHNICIANS)?,
        location_count: count(LOCATIONS)?,
        location_detail_count: count(LOCATION_DETAILS)?,
        item_count: count(INVENTORY_ITEMS)?,
        service_order_count: count(SERVICE_ORDERS)?,
        transaction_count: count(TRANSACTIONS)?,
    })
}

fn check_compatible(
    table: &TableDef,
    target: &ColumnDef,
    found: &ExistingColumn,
    unique: &HashSet<String>,
) -> Result<()> {
    let conflict = |make: fn(String, String) -> SchemaError| -> Result<()> {
        Err(make(table.name.to_string(), target.name.to_string()).into())
    };

    if target.primary_key && !found.primary_key {
        return conflict(|table, column| SchemaError::PrimaryKeyMismatch { table, column });
    }
    if schema::Affinity::of(&found.declared_type) != target.affinity() {
        return Err(SchemaError::TypeMismatch {
            table: table.name.to_string(),
            column: target.name.to_string(),
            expected: target.sql_type.to_string(),
            found: found.declared_type.clone(),
        }
        .into());
    }
    if found.not_null && !target.not_null && !found.primary_key {
        return conflict(|table, column| SchemaError::UnexpectedNotNull { table, column });
    }
    let found_unique = unique.contains(&found.name.to_ascii_lowercase());
    if found_unique && !target.unique {
        return conflict(|table, column| SchemaError::UnexpectedUnique { table, column });
    }
    if target.unique && !found_unique {
        warn!(
            table = table.name,
            column = target.name,
            "UNIQUE constraint missing on existing table; uniqueness is checked by the store"
        );
    }
    Ok(())
}

fn existing_tables(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<HashSet<_>, _>>()?;
    Ok(names)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ExistingColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ExistingColumn {
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                not_null: row.get::<_, i64>(3)? != 0,
                has_default: row.get::<_, Value>(4)? != Value::Null,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Lower-cased names of columns covered by a single-column unique index.
fn unique_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA index_list({table})"))?;
    let indexes = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)? != 0,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut unique = HashSet::new();
    for (name, is_unique, origin) in indexes {
        if !is_unique || origin == "pk" {
            continue;
        }
        let mut info = conn.prepare(&format!("PRAGMA index_info('{}')", name.replace('\'', "''")))?;
        let columns = info
            .query_map([], |row| row.get::<_, Option<String>>(2))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if let [Some(column)] = columns.as_slice() {
            unique.insert(column.to_ascii_lowercase());
        }
    }
    Ok(unique)
}

/// Changes applied by [`Migration::up`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Tables created from scratch.
    pub created_tables: Vec<String>,
    /// Columns added, as `table.column`.
    pub added_columns: Vec<String>,
    /// Tables present in the file but not part of the model. Left in place.
    pub ignored_tables: Vec<String>,
}

impl MigrationReport {
    /// `true` when the migration changed nothing.
    pub fn is_empty(&self) -> bool {
        self.created_tables.is_empty() && self.added_columns.is_empty()
    }
}

/// Snapshot of the schema state and row counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Whether every table of the model exists.
    pub tables_exist: bool,
    pub technician_count: usize,
    pub location_count: usize,
    pub location_detail_count: usize,
    pub item_count: usize,
    pub service_order_count: usize,
    pub transaction_count: usize,
}
