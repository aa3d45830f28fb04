use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Use library instead of local modules
use trip_ledger::{
    load_trip_csv, ExportFormat, ExportSerializer, FilterCriteria, InputValidator,
    RawTripInput, RecordFilter, Settings, SqliteStore, TripStore, TripView,
};

#[derive(Parser)]
#[command(name = "trip-ledger", version, about = "Truck trip expense ledger")]
struct Cli {
    /// Settings file (JSON). Defaults to $TRIP_LEDGER_CONFIG or built-in settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a truck by vehicle number
    AddTruck { vehicle_number: String },
    /// List registered trucks
    Trucks,
    /// Remove a truck (its trips stay, flagged as unresolved)
    DeleteTruck { id: String },
    /// Record a trip
    AddTrip {
        #[arg(long)]
        date: String,
        /// Vehicle number or truck id
        #[arg(long)]
        truck: String,
        #[arg(long)]
        destination: String,
        /// Monetary field, e.g. --set dieselAmount=3000 (repeatable)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        amounts: Vec<String>,
    },
    /// Change fields of a stored trip and re-derive its totals
    EditTrip {
        id: String,
        /// Any trip field, e.g. --set destination=Salem (repeatable)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        changes: Vec<String>,
    },
    /// Delete a stored trip
    DeleteTrip { id: String },
    /// Validate and store trips from a CSV file
    Import { csv: PathBuf },
    /// Show trips matching the filters
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Export trips matching the filters
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// csv or xlsx (defaults to the settings file)
        #[arg(long)]
        format: Option<ExportFormat>,
        /// Output file (defaults to TripRecords.<format>)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Recompute totals of every stored trip with the formula it was tagged with
    Rederive,
}

#[derive(Args)]
struct FilterArgs {
    /// Vehicle number or truck id
    #[arg(long)]
    truck: Option<String>,
    /// First date, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Last date, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{}: {}", s, e))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())?;
    let store = SqliteStore::open(&settings.database_path)?;

    match cli.command {
        Command::AddTruck { vehicle_number } => {
            let truck = store.add_truck(&vehicle_number)?;
            println!("✓ Truck {} added ({})", truck.vehicle_number, truck.id);
        }
        Command::Trucks => {
            let trucks = store.list_trucks()?;
            if trucks.is_empty() {
                println!("No trucks found.");
            }
            for (idx, truck) in trucks.iter().enumerate() {
                println!("{:>3}  {:<14} {}", idx + 1, truck.vehicle_number, truck.id);
            }
        }
        Command::DeleteTruck { id } => {
            if store.delete_truck(&id)? {
                println!("✓ Truck {} deleted", id);
            } else {
                println!("Truck {} not found", id);
            }
        }
        Command::AddTrip {
            date,
            truck,
            destination,
            amounts,
        } => {
            let fleet = store.fleet()?;
            let mut raw = RawTripInput::new()
                .with("date", date)
                .with("truckRef", fleet.reference_for(&truck))
                .with("destination", destination);
            for (field, value) in parse_assignments(&amounts)? {
                raw = raw.with(field, value);
            }

            let trip = InputValidator::new().validate(&raw)?;
            let trip = settings.formula_registry()?.derive_current(&trip);

            let stored = store.insert_trip(&trip)?;
            println!(
                "✓ Trip added ({}): total expense {:.2}, balance {:.2}",
                stored.id.unwrap_or_default(),
                stored.total_expense,
                stored.balance_amount
            );
        }
        Command::EditTrip { id, changes } => {
            let existing = store
                .get_trip(&id)?
                .ok_or_else(|| anyhow!("Trip not found: {}", id))?;

            let changes = RawTripInput::from_pairs(parse_assignments(&changes)?);
            let trip = InputValidator::new().validate_edit(&existing, &changes, &store.fleet()?)?;
            let trip = settings.formula_registry()?.derive_current(&trip);
            store.update_trip(&trip)?;

            println!(
                "✓ Trip {} updated: total expense {:.2}, balance {:.2}",
                id, trip.total_expense, trip.balance_amount
            );
        }
        Command::DeleteTrip { id } => {
            if store.delete_trip(&id)? {
                println!("✓ Trip {} deleted", id);
            } else {
                println!("Trip {} not found", id);
            }
        }
        Command::Import { csv } => {
            let report = load_trip_csv(&csv)?;
            for rejection in &report.rejected {
                eprintln!("✗ line {}: {}", rejection.line, rejection.error);
            }

            let registry = settings.formula_registry()?;
            let derived = registry.active_calculator().derive_all(&report.accepted);
            let inserted = store.insert_trips(&derived)?;

            println!(
                "✓ Imported {} trips ({} duplicates, {} rejected)",
                inserted,
                derived.len() - inserted,
                report.rejected.len()
            );
        }
        Command::List { filter } => {
            let view = read_view(&store, &filter)?;
            print_view(&view);
        }
        Command::Export {
            filter,
            format,
            out,
        } => {
            let view = read_view(&store, &filter)?;
            let format = format.unwrap_or(settings.export_format);
            let out = out.unwrap_or_else(|| PathBuf::from(format.default_file_name()));

            let bytes = ExportSerializer::encode(&view.rows, format)?;
            fs::write(&out, &bytes).with_context(|| format!("Failed to write {:?}", out))?;

            info!(rows = view.len(), format = %format, "export written");
            println!("✓ Exported {} trips to {}", view.len(), out.display());
        }
        Command::Rederive => {
            let registry = settings.formula_registry()?;
            let validator = InputValidator::new();
            let mut updated = 0;
            for trip in store.list_trips()? {
                if let Err(error) = validator.validate_existing(&trip) {
                    warn!(id = ?trip.id, %error, "stored trip fails validation, left as is");
                    continue;
                }
                let rederived = registry.rederive_recorded(&trip)?;
                if rederived != trip {
                    store.update_trip(&rederived)?;
                    updated += 1;
                }
            }
            println!("✓ Re-derived {} trips", updated);
        }
    }

    Ok(())
}

fn parse_assignments(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| anyhow!("Expected FIELD=VALUE, got '{}'", pair))
        })
        .collect()
}

fn read_view(store: &SqliteStore, args: &FilterArgs) -> Result<TripView> {
    let fleet = store.fleet()?;
    let criteria = FilterCriteria {
        truck_id: args.truck.as_deref().map(|t| fleet.reference_for(t)),
        date_from: args.from,
        date_to: args.to,
    };

    let trips = store.list_trips()?;
    Ok(RecordFilter::read(&trips, &fleet, &criteria))
}

fn print_view(view: &TripView) {
    if view.is_empty() {
        println!("No trips found.");
        return;
    }

    println!(
        "{:<10}  {:<12} {:<16} {:>12} {:>12} {:>12} {:>12}",
        "Date", "Truck", "Destination", "Freight", "Expense", "Advance", "Balance"
    );
    for row in &view.rows {
        let trip = &row.trip;
        println!(
            "{:<10}  {:<12} {:<16} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            trip.date.format("%Y-%m-%d"),
            row.vehicle_number.as_deref().unwrap_or("?"),
            trip.destination,
            trip.freight_amount,
            trip.total_expense,
            trip.advance_amount,
            trip.balance_amount
        );
    }

    let totals = view.totals();
    println!(
        "{:<10}  {:<12} {:<16} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
        "Total",
        format!("{} trips", totals.trip_count),
        "",
        totals.freight_amount,
        totals.total_expense,
        totals.advance_amount,
        totals.balance_amount
    );

    for unresolved in &view.unresolved {
        eprintln!("⚠️  {}", unresolved);
    }
}
