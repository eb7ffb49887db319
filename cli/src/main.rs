use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tower_inventory_core::{
    ActionType, Id, ItemUpdate, Mode, NewInventoryItem, NewInventoryLocation, NewLocationDetail,
    NewServiceOrder, NewTransaction, Totals, TransactionFilter,
};
use tower_inventory_sync::{CONFIG_FILE, Session, SessionPaths, SnapshotManager, SyncConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliMode {
    Maintenance,
    Office,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Maintenance => Self::Maintenance,
            CliMode::Office => Self::Office,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tower-inventory")]
#[command(about = "Field-service inventory tracking with snapshot publishing")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Operating mode. Office mode is read-only and works on the snapshot.
    #[arg(long, global = true, value_enum, default_value = "maintenance")]
    mode: CliMode,
    /// Directory holding working.db and inventory_snapshot.db.
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,
    /// Shared folder for snapshots. Overrides the configuration file.
    #[arg(long, global = true)]
    shared_folder: Option<PathBuf>,
    /// Save --shared-folder to the configuration file.
    #[arg(long, global = true, requires = "shared_folder")]
    remember: bool,
    /// Configuration file holding the shared-folder path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage technicians.
    #[command(subcommand)]
    Technician(TechnicianCommand),
    /// Manage stock-holding locations (warehouses, trucks).
    #[command(subcommand)]
    Location(LocationCommand),
    /// Manage service addresses.
    #[command(subcommand)]
    Site(SiteCommand),
    /// Manage inventory items.
    #[command(subcommand)]
    Item(ItemCommand),
    /// Manage service orders.
    #[command(subcommand)]
    Order(OrderCommand),
    /// Record and list transactions.
    #[command(subcommand)]
    Txn(TxnCommand),
    /// Summaries over transactions.
    Report(ReportArgs),
    /// Publish, pull, or inspect the shared snapshot.
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
    /// Schema migration state and sample data.
    #[command(subcommand)]
    Migrate(MigrateCommand),
}

#[derive(Debug, Subcommand)]
enum TechnicianCommand {
    Add { name: String },
    List,
    Rename { id: Id, name: String },
    Delete { id: Id },
}

#[derive(Debug, Args)]
struct LocationFields {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    apartment: String,
}

impl From<LocationFields> for NewInventoryLocation {
    fn from(f: LocationFields) -> Self {
        Self {
            name: f.name,
            address: f.address,
            apartment: f.apartment,
        }
    }
}

#[derive(Debug, Subcommand)]
enum LocationCommand {
    Add(LocationFields),
    List,
    Update {
        id: Id,
        #[command(flatten)]
        fields: LocationFields,
    },
    Delete {
        id: Id,
    },
}

#[derive(Debug, Args)]
struct SiteFields {
    #[arg(long)]
    address: String,
    #[arg(long, default_value = "")]
    apartment: String,
}

impl From<SiteFields> for NewLocationDetail {
    fn from(f: SiteFields) -> Self {
        Self {
            address: f.address,
            apartment: f.apartment,
        }
    }
}

#[derive(Debug, Subcommand)]
enum SiteCommand {
    Add(SiteFields),
    List,
    Update {
        id: Id,
        #[command(flatten)]
        fields: SiteFields,
    },
    Delete {
        id: Id,
    },
}

#[derive(Debug, Subcommand)]
enum ItemCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 0)]
        stock: i64,
    },
    List,
    /// Change name, description, and price. Stock only moves via transactions.
    Update {
        id: Id,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        price: f64,
    },
    Delete {
        id: Id,
    },
}

#[derive(Debug, Subcommand)]
enum OrderCommand {
    Add {
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        address: String,
        #[arg(long)]
        technician: Option<Id>,
        #[arg(long)]
        location: Option<Id>,
    },
    List,
    /// Most recent order carrying a service number.
    Latest { number: String },
    Delete { id: Id },
}

#[derive(Debug, Args)]
struct FilterArgs {
    #[arg(long)]
    technician: Option<Id>,
    #[arg(long)]
    location: Option<Id>,
    #[arg(long)]
    item: Option<Id>,
    #[arg(long)]
    order: Option<Id>,
    #[arg(long, value_parser = parse_action)]
    action: Option<ActionType>,
    /// First day to include (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Case-insensitive substring of the service number.
    #[arg(long)]
    service_number: Option<String>,
}

impl From<FilterArgs> for TransactionFilter {
    fn from(f: FilterArgs) -> Self {
        Self {
            technician_id: f.technician,
            location_id: f.location,
            item_id: f.item,
            service_id: f.order,
            action_type: f.action,
            date_from: f.from.and_then(|d| d.and_hms_opt(0, 0, 0)),
            date_to: f.to.and_then(|d| d.and_hms_micro_opt(23, 59, 59, 999_999)),
            service_number_contains: f.service_number,
        }
    }
}

#[derive(Debug, Subcommand)]
enum TxnCommand {
    Record(RecordArgs),
    List(FilterArgs),
    Show { id: Id },
}

#[derive(Debug, Args)]
struct RecordArgs {
    #[arg(long)]
    item: Id,
    #[arg(long)]
    technician: Id,
    #[arg(long)]
    location: Id,
    /// Install, Remove, or Repair.
    #[arg(long, value_parser = parse_action)]
    action: ActionType,
    #[arg(long)]
    quantity: i64,
    /// Unit price; defaults to the item's price.
    #[arg(long)]
    price: Option<f64>,
    /// Parts consumed by a repair.
    #[arg(long, default_value_t = 0)]
    replacement: i64,
    #[arg(long)]
    service_number: Option<String>,
    /// Service address (site id) the work was done at.
    #[arg(long)]
    site: Option<Id>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupBy {
    Action,
    Technician,
    Day,
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(long, value_enum, default_value = "action")]
    by: GroupBy,
    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Debug, Subcommand)]
enum SnapshotCommand {
    /// Copy working.db to the shared folder.
    Publish,
    /// Copy the published snapshot into --dir.
    Pull,
    /// Show the published snapshot's size and age.
    Info,
}

#[derive(Debug, Subcommand)]
enum MigrateCommand {
    /// Migrate the database for --mode and show row counts.
    Status,
    /// Add sample technicians, locations, items, orders, and installs.
    Seed,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = run(cli);

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let global = cli.global;
    let config = resolve_config(&global)?;
    let out = Output { json: global.json };
    match cli.command {
        Command::Snapshot(c) => run_snapshot(c, &global, config),
        Command::Technician(c) => run_technician(c, &open_session(&global, config)?, out),
        Command::Location(c) => run_location(c, &open_session(&global, config)?, out),
        Command::Site(c) => run_site(c, &open_session(&global, config)?, out),
        Command::Item(c) => run_item(c, &open_session(&global, config)?, out),
        Command::Order(c) => run_order(c, &open_session(&global, config)?, out),
        Command::Txn(c) => run_txn(c, &open_session(&global, config)?, out),
        Command::Report(args) => run_report(args, &open_session(&global, config)?, out),
        Command::Migrate(MigrateCommand::Status) => {
            run_migrate_status(&open_session(&global, config)?, out)
        }
        Command::Migrate(MigrateCommand::Seed) => {
            run_migrate_seed(&open_session(&global, config)?, out)
        }
    }
}

fn open_session(global: &GlobalArgs, config: Option<SyncConfig>) -> Result<Session, String> {
    let mode = Mode::from(global.mode);
    let session = Session::open(mode, SessionPaths::in_dir(&global.dir), config)
        .map_err(|e| format!("Failed to open {mode} database: {e}"))?;
    if let Some(err) = session.pull_error() {
        eprintln!(
            "warning: could not pull the latest snapshot ({err}); you may be viewing outdated data"
        );
    }
    Ok(session)
}

/// `--shared-folder` wins over the configuration file; `--remember` saves it.
fn resolve_config(global: &GlobalArgs) -> Result<Option<SyncConfig>, String> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(|| global.dir.join(CONFIG_FILE));

    if let Some(folder) = &global.shared_folder {
        let config = SyncConfig::new(folder);
        if global.remember {
            config
                .save(&path)
                .map_err(|e| format!("Failed to save '{}': {e}", path.display()))?;
            debug!(path = %path.display(), "Saved shared folder");
        }
        return Ok(Some(config));
    }
    SyncConfig::load_optional(&path).map_err(|e| format!("Failed to read '{}': {e}", path.display()))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    /// Prints `value` as JSON, or through `human` otherwise.
    fn emit<T: Serialize>(self, value: &T, human: impl FnOnce(&T)) -> Result<(), String> {
        if self.json {
            let text = serde_json::to_string_pretty(value)
                .map_err(|e| format!("Failed to serialize output: {e}"))?;
            println!("{text}");
        } else {
            human(value);
        }
        Ok(())
    }

    fn done(self, message: &str) -> Result<(), String> {
        self.emit(&serde_json::json!({ "ok": true, "message": message }), |_| {
            println!("{message}")
        })
    }
}

fn totals_line(totals: &Totals) -> String {
    format!(
        "{:>5} txns {:>7} units {:>12.2}",
        totals.count, totals.quantity, totals.value
    )
}

// ---------------------------------------------------------------------------
// Entity commands
// ---------------------------------------------------------------------------

fn run_technician(command: TechnicianCommand, session: &Session, out: Output) -> Result<(), String> {
    let store = session.store();
    match command {
        TechnicianCommand::Add { name } => {
            let tech = store.create_technician(&name).map_err(|e| e.to_string())?;
            out.emit(&tech, |t| println!("Added technician {} ({})", t.id, t.name))
        }
        TechnicianCommand::List => {
            let techs = store.list_technicians().map_err(|e| e.to_string())?;
            out.emit(&techs, |techs| {
                for t in techs {
                    println!("{:>4}  {}", t.id, t.name);
                }
            })
        }
        TechnicianCommand::Rename { id, name } => {
            let tech = store.rename_technician(id, &name).map_err(|e| e.to_string())?;
            out.emit(&tech, |t| println!("Renamed technician {} to {}", t.id, t.name))
        }
        TechnicianCommand::Delete { id } => {
            store.delete_technician(id).map_err(|e| e.to_string())?;
            out.done(&format!("Deleted technician {id}"))
        }
    }
}

fn run_location(command: LocationCommand, session: &Session, out: Output) -> Result<(), String> {
    let store = session.store();
    match command {
        LocationCommand::Add(fields) => {
            let location = store
                .create_location(&fields.into())
                .map_err(|e| e.to_string())?;
            out.emit(&location, |l| println!("Added location {} ({})", l.id, l.name))
        }
        LocationCommand::List => {
            let locations = store.list_locations().map_err(|e| e.to_string())?;
            out.emit(&locations, |locations| {
                for l in locations {
                    println!("{:>4}  {:<24} {} {}", l.id, l.name, l.address, l.apartment);
                }
            })
        }
        LocationCommand::Update { id, fields } => {
            let location = store
                .update_location(id, &fields.into())
                .map_err(|e| e.to_string())?;
            out.emit(&location, |l| println!("Updated location {} ({})", l.id, l.name))
        }
        LocationCommand::Delete { id } => {
            store.delete_location(id).map_err(|e| e.to_string())?;
            out.done(&format!("Deleted location {id}"))
        }
    }
}

fn run_site(command: SiteCommand, session: &Session, out: Output) -> Result<(), String> {
    let store = session.store();
    match command {
        SiteCommand::Add(fields) => {
            let site = store
                .create_location_detail(&fields.into())
                .map_err(|e| e.to_string())?;
            out.emit(&site, |s| println!("Added site {} ({})", s.id, s.label()))
        }
        SiteCommand::List => {
            let sites = store.list_location_details().map_err(|e| e.to_string())?;
            out.emit(&sites, |sites| {
                for s in sites {
                    println!("{:>4}  {}", s.id, s.label());
                }
            })
        }
        SiteCommand::Update { id, fields } => {
            let site = store
                .update_location_detail(id, &fields.into())
                .map_err(|e| e.to_string())?;
            out.emit(&site, |s| println!("Updated site {} ({})", s.id, s.label()))
        }
        SiteCommand::Delete { id } => {
            store.delete_location_detail(id).map_err(|e| e.to_string())?;
            out.done(&format!("Deleted site {id}"))
        }
    }
}

fn run_item(command: ItemCommand, session: &Session, out: Output) -> Result<(), String> {
    let store = session.store();
    match command {
        ItemCommand::Add {
            name,
            description,
            price,
            stock,
        } => {
            let item = store
                .create_item(&NewInventoryItem {
                    name,
                    description,
                    unit_price: price,
                    stock,
                })
                .map_err(|e| e.to_string())?;
            out.emit(&item, |i| {
                println!("Added item {} ({}), stock {}", i.id, i.name, i.stock)
            })
        }
        ItemCommand::List => {
            let items = store.list_items().map_err(|e| e.to_string())?;
            out.emit(&items, |items| {
                for i in items {
                    println!("{:>4}  {:<28} {:>10.2} {:>6}", i.id, i.name, i.unit_price, i.stock);
                }
            })
        }
        ItemCommand::Update {
            id,
            name,
            description,
            price,
        } => {
            let item = store
                .update_item(
                    id,
                    &ItemUpdate {
                        name,
                        description,
                        unit_price: price,
                    },
                )
                .map_err(|e| e.to_string())?;
            out.emit(&item, |i| println!("Updated item {} ({})", i.id, i.name))
        }
        ItemCommand::Delete { id } => {
            store.delete_item(id).map_err(|e| e.to_string())?;
            out.done(&format!("Deleted item {id}"))
        }
    }
}

fn run_order(command: OrderCommand, session: &Session, out: Output) -> Result<(), String> {
    let store = session.store();
    match command {
        OrderCommand::Add {
            number,
            address,
            technician,
            location,
        } => {
            let order = store
                .create_service_order(&NewServiceOrder {
                    service_number: number,
                    address,
                    technician_id: technician,
                    location_id: location,
                })
                .map_err(|e| e.to_string())?;
            out.emit(&order, |o| {
                println!(
                    "Added service order {} ({})",
                    o.id,
                    o.service_number.as_deref().unwrap_or("no number")
                )
            })
        }
        OrderCommand::List => {
            let orders = store.list_service_orders().map_err(|e| e.to_string())?;
            out.emit(&orders, |orders| {
                for o in orders {
                    println!(
                        "{:>4}  {:<10} {}  {}",
                        o.id,
                        o.service_number.as_deref().unwrap_or("-"),
                        o.date_created.format("%Y-%m-%d %H:%M"),
                        o.address
                    );
                }
            })
        }
        OrderCommand::Latest { number } => {
            let order = store
                .find_latest_service_order(&number)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("No service order with number {number}"))?;
            out.emit(&order, |o| {
                println!("{}  {}  {}", o.id, o.date_created.format("%Y-%m-%d %H:%M"), o.address)
            })
        }
        OrderCommand::Delete { id } => {
            store.delete_service_order(id).map_err(|e| e.to_string())?;
            out.done(&format!("Deleted service order {id}"))
        }
    }
}

fn run_txn(command: TxnCommand, session: &Session, out: Output) -> Result<(), String> {
    let store = session.store();
    match command {
        TxnCommand::Record(args) => {
            let mut new = NewTransaction::new(
                args.item,
                args.technician,
                args.location,
                args.action,
                args.quantity,
            )
            .with_replacement_quantity(args.replacement);
            new.unit_price = args.price;
            new.service_number = args.service_number;
            if let Some(site) = args.site {
                let site = store.get_location_detail(site).map_err(|e| e.to_string())?;
                new = new.at_site(&site);
            }
            let tx = store.record_transaction(&new).map_err(|e| e.to_string())?;
            let stock = store.get_item(tx.item_id).map_err(|e| e.to_string())?.stock;
            out.emit(&tx, |t| {
                println!(
                    "Recorded {} of {} (transaction {}), stock now {stock}",
                    t.action_type, t.quantity, t.id
                )
            })
        }
        TxnCommand::List(filter) => {
            let records = store
                .list_transactions(&filter.into())
                .map_err(|e| e.to_string())?;
            out.emit(&records, |records| {
                for r in records {
                    println!(
                        "{:>5}  {}  {:<7} {:>4} x {:<24} {:<16} {:<16} {}",
                        r.id,
                        r.timestamp.format("%Y-%m-%d %H:%M"),
                        r.action_type,
                        r.quantity,
                        r.item_name,
                        r.technician_name,
                        r.location_name,
                        r.service_number.as_deref().unwrap_or("")
                    );
                }
            })
        }
        TxnCommand::Show { id } => {
            let tx = store.get_transaction(id).map_err(|e| e.to_string())?;
            out.emit(&tx, |t| println!("{t:#?}"))
        }
    }
}

fn run_report(args: ReportArgs, session: &Session, out: Output) -> Result<(), String> {
    let store = session.store();
    let filter: TransactionFilter = args.filter.into();
    match args.by {
        GroupBy::Action => {
            let rows = store.summary_by_action(&filter).map_err(|e| e.to_string())?;
            out.emit(&rows, |rows| {
                for r in rows {
                    println!("{:<8} {}", r.action_type, totals_line(&r.totals));
                }
            })
        }
        GroupBy::Technician => {
            let rows = store
                .summary_by_technician(&filter)
                .map_err(|e| e.to_string())?;
            out.emit(&rows, |rows| {
                for r in rows {
                    println!("{:<20} {}", r.technician_name, totals_line(&r.totals));
                }
            })
        }
        GroupBy::Day => {
            let rows = store.summary_by_day(&filter).map_err(|e| e.to_string())?;
            out.emit(&rows, |rows| {
                for r in rows {
                    println!("{} {}", r.day, totals_line(&r.totals));
                }
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot and migration
// ---------------------------------------------------------------------------

fn run_snapshot(
    command: SnapshotCommand,
    global: &GlobalArgs,
    config: Option<SyncConfig>,
) -> Result<(), String> {
    let config = config.ok_or_else(|| {
        format!("No shared folder configured. Pass --shared-folder or create {CONFIG_FILE}")
    })?;
    let manager = SnapshotManager::new(config);
    let paths = SessionPaths::in_dir(&global.dir);
    let out = Output { json: global.json };

    match command {
        SnapshotCommand::Publish => {
            let receipt = manager
                .publish(&paths.working)
                .map_err(|e| format!("Publish failed: {e}"))?;
            out.emit(&receipt, |r| {
                println!("Published {} bytes to {}", r.bytes, r.path.display());
                println!("  sha256: {}", r.sha256);
            })
        }
        SnapshotCommand::Pull => {
            let receipt = manager
                .pull(&paths.snapshot)
                .map_err(|e| format!("Pull failed: {e}"))?;
            out.emit(&receipt, |r| {
                println!("Pulled {} bytes to {}", r.bytes, r.path.display())
            })
        }
        SnapshotCommand::Info => {
            let info = manager.info().map_err(|e| e.to_string())?;
            out.emit(&info, |info| match info {
                Some(i) => println!(
                    "{}  {} bytes  modified {}",
                    i.path.display(),
                    i.bytes,
                    i.modified.format("%Y-%m-%d %H:%M:%S")
                ),
                None => println!("No snapshot published yet"),
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    mode: Mode,
    created_tables: Vec<String>,
    added_columns: Vec<String>,
    ignored_tables: Vec<String>,
    tables_exist: bool,
    technicians: usize,
    locations: usize,
    sites: usize,
    items: usize,
    service_orders: usize,
    transactions: usize,
}

fn run_migrate_status(session: &Session, out: Output) -> Result<(), String> {
    let store = session.store();
    let report = store.migration_report().clone();
    let status = store
        .status()
        .map_err(|e| format!("Failed to get migration status: {e}"))?;
    let output = StatusOutput {
        mode: store.mode(),
        created_tables: report.created_tables,
        added_columns: report.added_columns,
        ignored_tables: report.ignored_tables,
        tables_exist: status.tables_exist,
        technicians: status.technician_count,
        locations: status.location_count,
        sites: status.location_detail_count,
        items: status.item_count,
        service_orders: status.service_order_count,
        transactions: status.transaction_count,
    };
    out.emit(&output, |s| {
        println!("Migration Status ({} mode):", s.mode);
        println!("  Tables exist: {}", if s.tables_exist { "yes" } else { "no" });
        for table in &s.created_tables {
            println!("  Created table: {table}");
        }
        for column in &s.added_columns {
            println!("  Added column: {column}");
        }
        for table in &s.ignored_tables {
            println!("  Ignored table: {table}");
        }
        println!("  Technicians: {}", s.technicians);
        println!("  Locations: {}", s.locations);
        println!("  Sites: {}", s.sites);
        println!("  Items: {}", s.items);
        println!("  Service orders: {}", s.service_orders);
        println!("  Transactions: {}", s.transactions);
    })
}

fn run_migrate_seed(session: &Session, out: Output) -> Result<(), String> {
    let report = session
        .store()
        .seed_sample_data()
        .map_err(|e| format!("Seed failed: {e}"))?;
    let output = serde_json::json!({
        "technicians": report.technicians_inserted,
        "locations": report.locations_inserted,
        "items": report.items_inserted,
        "service_orders": report.service_orders_inserted,
        "transactions": report.transactions_inserted,
        "skipped": report.skipped,
    });
    out.emit(&output, |_| {
        println!("Seed complete:");
        println!("  Technicians: {}", report.technicians_inserted);
        println!("  Locations: {}", report.locations_inserted);
        println!("  Items: {}", report.items_inserted);
        println!("  Service orders: {}", report.service_orders_inserted);
        println!("  Transactions: {}", report.transactions_inserted);
        println!("  Skipped (already present): {}", report.skipped);
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accepts action names in any case.
fn parse_action(s: &str) -> Result<ActionType, String> {
    ActionType::ALL
        .into_iter()
        .find(|a| a.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("'{s}' is not one of Install, Remove, Repair"))
}
