// Trip Ledger - Core Library
// Trip expense aggregation & reporting for a small truck fleet.
// Exposes the pure core (validator, expense, filter, export) and the
// collaborators around it (store, import, config) for the CLI and tests.

pub mod error;
pub mod trip;
pub mod fleet;
pub mod validator;  // InputValidator
pub mod expense;    // ExpenseCalculator + versioned formulas
pub mod filter;     // RecordFilter + read path
pub mod export;     // ExportSerializer
pub mod config;
pub mod store;
pub mod import;

// Re-export commonly used types
pub use error::{
    ConfigError, SerializationError, TruckError, UnresolvedReferenceError, ValidationError,
};
pub use trip::{round2, MonetaryField, TripRecord};
pub use fleet::{normalize_vehicle_number, Fleet, TruckRecord};
pub use validator::{InputValidator, RawTripInput, MAX_AMOUNT};
pub use expense::{BalanceFormula, ExpenseCalculator, ExpenseConfig, FormulaRegistry};
pub use filter::{FilterCriteria, RecordFilter, ResolvedTrip, TripTotals, TripView};
pub use export::{ExportFormat, ExportRow, ExportSerializer, EXPORT_COLUMNS};
pub use config::Settings;
pub use store::{SqliteStore, TripStore};
pub use import::{load_trip_csv, read_trip_csv, ImportRejection, ImportReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
