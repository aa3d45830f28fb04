// 📥 CSV trip import
// Each row goes through the validator on its own: a bad row is rejected
// whole and reported, the rest of the file still loads.

use crate::error::ValidationError;
use crate::trip::TripRecord;
use crate::validator::{InputValidator, RawTripInput};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRejection {
    /// 1-based line in the source file (header is line 1)
    pub line: u64,
    pub error: ValidationError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub accepted: Vec<TripRecord>,
    pub rejected: Vec<ImportRejection>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!(
            "{} accepted, {} rejected",
            self.accepted.len(),
            self.rejected.len()
        )
    }
}

/// Load a trips CSV whose header row uses trip field names
/// (date, truckRef, destination, loadingAmount, ...).
pub fn load_trip_csv(csv_path: &Path) -> Result<ImportReport> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;
    let report = read_trip_csv(file)?;

    info!(path = %csv_path.display(), "{}", report.summary());
    Ok(report)
}

/// Same as `load_trip_csv`, from any reader
pub fn read_trip_csv<R: Read>(reader: R) -> Result<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let validator = InputValidator::new();
    let mut report = ImportReport::default();

    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let mut record = csv::StringRecord::new();

    while rdr.read_record(&mut record).context("Failed to read CSV row")? {
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let row: HashMap<String, String> = record
            .deserialize(Some(&headers))
            .with_context(|| format!("Failed to decode CSV row at line {}", line))?;

        match validator.validate(&RawTripInput::from_pairs(row)) {
            Ok(trip) => report.accepted.push(trip),
            Err(error) => {
                warn!(line, %error, "trip row rejected");
                report.rejected.push(ImportRejection { line, error });
            }
        }
    }

    Ok(report)
}
